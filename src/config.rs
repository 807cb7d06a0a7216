use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use crate::convert::ConvertOptions;

/// Runtime settings for the upload/download service. Every flag can also be
/// supplied through the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "sheetsql", about = "Excel/CSV to SQL converter service")]
pub struct ServiceConfig {
    /// Address to bind
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Where uploads are parked while they are converted
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Where generated .sql scripts are written and served from
    #[arg(long, env = "DOWNLOAD_DIR", default_value = "downloads")]
    pub download_dir: PathBuf,

    /// Served under /static
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Largest accepted multipart body, in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 100 * 1024 * 1024)]
    pub max_upload_bytes: u64,

    /// Fallback filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            upload_dir: PathBuf::from("uploads"),
            download_dir: PathBuf::from("downloads"),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: 100 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Create the upload, download and static directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for d in [&self.upload_dir, &self.download_dir, &self.static_dir] {
            fs::create_dir_all(d).with_context(|| format!("creating directory {}", d.display()))?;
        }
        Ok(())
    }

    /// Conversion settings for scripts produced by this service.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions::new(&self.download_dir)
    }
}

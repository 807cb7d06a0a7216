use anyhow::{Context, Result};
use clap::Parser;
use sheetsql::{config::ServiceConfig, service};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = ServiceConfig::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) configure dirs ───────────────────────────────────────────
    cfg.ensure_dirs()?;
    info!(
        uploads = %cfg.upload_dir.display(),
        downloads = %cfg.download_dir.display(),
        statics = %cfg.static_dir.display(),
        "directories ready"
    );

    // ─── 3) serve ────────────────────────────────────────────────────
    let addr = cfg.socket_addr();
    let routes = service::routes(Arc::new(cfg));
    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, service::shutdown_on(tokio::signal::ctrl_c()))
        .with_context(|| format!("binding {}", addr))?;

    info!("listening on http://{}", bound);
    info!("upload endpoint: POST http://{}/upload", bound);
    server.await;
    info!("stopped");
    Ok(())
}

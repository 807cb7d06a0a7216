// src/service/handlers.rs
use bytes::Buf;
use futures::TryStreamExt;
use serde::Serialize;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempPath;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, error, info, warn};
use warp::{
    http::{
        header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    hyper::Body,
    multipart::{FormData, Part},
    reply::Response,
    Rejection, Reply,
};

use crate::config::ServiceConfig;
use crate::convert::{convert, ConvertOptions};
use crate::error::ConvertError;
use crate::load::FileKind;
use crate::naming::{derive_table_name, is_plain_file_name, sanitize_file_name};

/// Multipart field that carries the upload.
pub const FILE_FIELD: &str = "file";

#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    message: &'static str,
    sql_file: String,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Everything that can go wrong between receiving a form and returning a script name.
#[derive(Debug, Error)]
enum UploadError {
    #[error("No file uploaded. Send a multipart form with a `file` field.")]
    NoFile,

    #[error("Invalid file format. Please upload .csv, .xls, or .xlsx files only.")]
    InvalidFormat,

    #[error("Invalid file name")]
    InvalidName,

    #[error("Failed to read upload: {0}")]
    Form(#[from] warp::Error),

    #[error("Failed to save uploaded file")]
    Save(#[source] io::Error),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl UploadError {
    fn status(&self) -> StatusCode {
        match self {
            UploadError::NoFile
            | UploadError::InvalidFormat
            | UploadError::InvalidName
            | UploadError::Form(_) => StatusCode::BAD_REQUEST,
            UploadError::Save(_) | UploadError::Convert(_) | UploadError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// `{"detail": ...}` with the given status, the shape every error response uses.
pub fn json_error(status: StatusCode, detail: impl Into<String>) -> Response {
    let body = ErrorBody {
        detail: detail.into(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

pub async fn health() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "sheetsql"
    })))
}

/// Save the uploaded file, convert it, delete it, and report the script name.
pub async fn upload(form: FormData, cfg: Arc<ServiceConfig>) -> Result<Response, Rejection> {
    match receive_and_convert(form, &cfg).await {
        Ok(sql_file) => {
            info!(sql_file = %sql_file, "file processed");
            Ok(warp::reply::json(&UploadResponse {
                status: "success",
                message: "File processed successfully",
                sql_file,
            })
            .into_response())
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!("upload failed: {:?}", e);
            } else {
                warn!("upload rejected: {}", e);
            }
            Ok(json_error(status, e.to_string()))
        }
    }
}

async fn receive_and_convert(mut form: FormData, cfg: &ServiceConfig) -> Result<String, UploadError> {
    while let Some(part) = form.try_next().await? {
        if part.name() != FILE_FIELD {
            continue;
        }
        let raw_name = part.filename().ok_or(UploadError::NoFile)?.to_string();
        let kind = FileKind::from_path(&raw_name).ok_or(UploadError::InvalidFormat)?;
        let file_name = sanitize_file_name(&raw_name).ok_or(UploadError::InvalidName)?;
        let table_name = derive_table_name(&file_name);

        // private to this request, even when another upload has the same name
        let upload = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{kind}"))
            .tempfile_in(&cfg.upload_dir)
            .map_err(UploadError::Save)?
            .into_temp_path();
        debug!(file = %raw_name, %kind, table = %table_name, path = %upload.display(), "received upload");

        let result = match save_part(part, &upload).await {
            Ok(()) => {
                convert_blocking(upload.to_path_buf(), kind, table_name, cfg.convert_options()).await
            }
            Err(e) => Err(e),
        };
        remove_upload(upload);

        let script = result?;
        return Ok(script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default());
    }
    Err(UploadError::NoFile)
}

async fn save_part(part: Part, path: &Path) -> Result<(), UploadError> {
    let mut file = fs::File::create(path).await.map_err(UploadError::Save)?;
    let stream = part.stream();
    futures::pin_mut!(stream);
    while let Some(mut chunk) = stream.try_next().await? {
        while chunk.has_remaining() {
            let bytes = chunk.chunk();
            let n = bytes.len();
            file.write_all(bytes).await.map_err(UploadError::Save)?;
            chunk.advance(n);
        }
    }
    file.flush().await.map_err(UploadError::Save)?;
    Ok(())
}

/// The conversion is plain blocking IO + CPU, so keep it off the reactor.
async fn convert_blocking(
    path: PathBuf,
    kind: FileKind,
    table_name: String,
    options: ConvertOptions,
) -> Result<PathBuf, UploadError> {
    let script =
        tokio::task::spawn_blocking(move || convert(&path, kind, &table_name, &options)).await??;
    Ok(script)
}

fn remove_upload(upload: TempPath) {
    let path = upload.to_path_buf();
    match upload.close() {
        Ok(()) => debug!(path = %path.display(), "cleaned up uploaded file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "failed to remove upload: {}", e),
    }
}

/// Serve a generated script from the download directory.
pub async fn download(name: String, cfg: Arc<ServiceConfig>) -> Result<Response, Rejection> {
    if !is_plain_file_name(&name) {
        return Ok(json_error(StatusCode::NOT_FOUND, "File not found"));
    }
    let path = cfg.download_dir.join(&name);

    match fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(json_error(StatusCode::NOT_FOUND, "File not found")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(json_error(StatusCode::NOT_FOUND, "File not found"))
        }
        Err(e) => {
            error!(path = %path.display(), "stat failed: {}", e);
            return Ok(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error downloading file",
            ));
        }
    }

    match fs::read(&path).await {
        Ok(body) => {
            let mut resp = Response::new(Body::from(body));
            let headers = resp.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/sql"));
            if let Ok(v) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)) {
                headers.insert(CONTENT_DISPOSITION, v);
            }
            Ok(resp)
        }
        Err(e) => {
            error!(path = %path.display(), "read failed: {}", e);
            Ok(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error downloading file",
            ))
        }
    }
}

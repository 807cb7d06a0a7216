// src/service/mod.rs
pub mod handlers;

use std::{convert::Infallible, future::Future, io, sync::Arc};
use tracing::{error, info, warn};
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::config::ServiceConfig;
use handlers::json_error;

/// All HTTP routes:
///  - `GET  /health`
///  - `POST /upload` (multipart, field `file`)
///  - `GET  /download/{filename}`
///  - `GET  /static/...`
pub fn routes(
    cfg: Arc<ServiceConfig>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::health);

    let upload = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(cfg.max_upload_bytes))
        .and(with_config(cfg.clone()))
        .and_then(handlers::upload);

    let download = warp::path!("download" / String)
        .and(warp::get())
        .and(with_config(cfg.clone()))
        .and_then(handlers::download);

    let statics = warp::path("static").and(warp::fs::dir(cfg.static_dir.clone()));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    health
        .or(upload)
        .or(download)
        .or(statics)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Resolve once `signal` fires. If the listener could not be installed this
/// never resolves and the server runs until killed.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            error!("failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn with_config(
    cfg: Arc<ServiceConfig>,
) -> impl Filter<Extract = (Arc<ServiceConfig>,), Error = Infallible> + Clone {
    warp::any().map(move || cfg.clone())
}

/// Turn warp's rejections into the same `{"detail": ...}` bodies the handlers use.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else {
        warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };
    Ok(json_error(status, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::glob;
    use serde_json::Value;
    use std::{fs, path::Path, time::Duration};
    use tempfile::{tempdir, TempDir};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    const BOUNDARY: &str = "sheetsql-test-boundary";

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,sheetsql=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn test_config(root: &TempDir) -> Arc<ServiceConfig> {
        let cfg = ServiceConfig {
            upload_dir: root.path().join("uploads"),
            download_dir: root.path().join("downloads"),
            static_dir: root.path().join("static"),
            max_upload_bytes: 64 * 1024,
            ..ServiceConfig::default()
        };
        cfg.ensure_dirs().unwrap();
        Arc::new(cfg)
    }

    fn multipart(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_upload(cfg: &Arc<ServiceConfig>, body: Vec<u8>) -> (StatusCode, Value) {
        let resp = warp::test::request()
            .method("POST")
            .path("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .reply(&routes(cfg.clone()))
            .await;
        let json = serde_json::from_slice(resp.body()).unwrap_or(Value::Null);
        (resp.status(), json)
    }

    fn dir_is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let root = tempdir().unwrap();
        let resp = warp::test::request()
            .path("/health")
            .reply(&routes(test_config(&root)))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn upload_then_download_round_trip() {
        init_test_logging();
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let csv = b"Name,Age\n\"O'Brien\",30\n\"\",\n";
        let (status, body) = post_upload(&cfg, multipart("file", "people.csv", csv)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "File processed successfully");

        let sql_file = body["sql_file"].as_str().unwrap().to_string();
        assert!(sql_file.starts_with("people_") && sql_file.ends_with(".sql"));
        assert!(dir_is_empty(&cfg.upload_dir), "upload should be cleaned up");

        let resp = warp::test::request()
            .path(&format!("/download/{}", sql_file))
            .reply(&routes(cfg.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/sql");
        assert_eq!(
            resp.headers()["content-disposition"],
            format!("attachment; filename=\"{}\"", sql_file).as_str()
        );
        assert_eq!(
            std::str::from_utf8(resp.body()).unwrap(),
            "CREATE TABLE IF NOT EXISTS people (\n    Name TEXT,\n    Age NUMERIC\n);\n\n\
             INSERT INTO people VALUES ('O''Brien', 30);\n\
             INSERT INTO people VALUES ('', NULL);\n"
        );
    }

    #[tokio::test]
    async fn table_name_comes_from_file_name() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let (status, body) =
            post_upload(&cfg, multipart("file", "Q1 sales-report.csv", b"id\n1\n")).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let pattern = format!("{}/Q1_sales_report_*.sql", cfg.download_dir.display());
        let scripts: Vec<_> = glob(&pattern).unwrap().filter_map(Result::ok).collect();
        assert_eq!(scripts.len(), 1);
        let sql = fs::read_to_string(&scripts[0]).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS Q1_sales_report (\n    id NUMERIC\n);"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_same_name_uploads_stay_separate() {
        init_test_logging();
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let mut big = String::from("name\n");
        for _ in 0..5_000 {
            big.push_str("alice\n");
        }

        for round in 0..10 {
            let spawn_upload = |content: Vec<u8>| {
                let cfg = cfg.clone();
                tokio::spawn(async move {
                    post_upload(&cfg, multipart("file", "data.csv", &content)).await
                })
            };
            let alice = spawn_upload(big.clone().into_bytes());
            let bob = spawn_upload(b"name\nbob\n".to_vec());
            let (alice, bob) = (alice.await.unwrap(), bob.await.unwrap());

            assert_eq!(alice.0, StatusCode::OK, "round {round}: {}", alice.1);
            assert_eq!(bob.0, StatusCode::OK, "round {round}: {}", bob.1);

            let read_script = |body: &Value| {
                let name = body["sql_file"].as_str().unwrap();
                fs::read_to_string(cfg.download_dir.join(name)).unwrap()
            };
            let alice_sql = read_script(&alice.1);
            let bob_sql = read_script(&bob.1);
            assert_ne!(alice.1["sql_file"], bob.1["sql_file"]);
            assert_eq!(alice_sql.matches("INSERT INTO data VALUES ('alice');").count(), 5_000);
            assert!(!alice_sql.contains("bob"));
            assert_eq!(bob_sql.matches("INSERT INTO").count(), 1);
            assert!(bob_sql.contains("INSERT INTO data VALUES ('bob');"));
        }
        assert!(dir_is_empty(&cfg.upload_dir));
    }

    #[tokio::test]
    async fn upload_file_is_not_named_after_client() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);
        // a file already sitting at the client's name must survive the upload
        fs::write(cfg.upload_dir.join("people.csv"), "keep me").unwrap();

        let (status, _) = post_upload(&cfg, multipart("file", "people.csv", b"a\n1\n")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fs::read_to_string(cfg.upload_dir.join("people.csv")).unwrap(),
            "keep me"
        );
        assert_eq!(fs::read_dir(&cfg.upload_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn rejects_unsupported_extension() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let (status, body) = post_upload(&cfg, multipart("file", "notes.txt", b"hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["detail"],
            "Invalid file format. Please upload .csv, .xls, or .xlsx files only."
        );
        assert!(dir_is_empty(&cfg.upload_dir));
        assert!(dir_is_empty(&cfg.download_dir));
    }

    #[tokio::test]
    async fn missing_file_field_is_bad_request() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let (status, _) = post_upload(&cfg, multipart("attachment", "people.csv", b"a\n1\n")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn broken_workbook_is_server_error_and_cleaned_up() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let (status, body) =
            post_upload(&cfg, multipart("file", "broken.xlsx", b"definitely not a zip")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["detail"]
                .as_str()
                .unwrap()
                .contains("failed to read spreadsheet"),
            "{body}"
        );
        assert!(dir_is_empty(&cfg.upload_dir));
        assert!(dir_is_empty(&cfg.download_dir));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);

        let big = vec![b'1'; 128 * 1024];
        let (status, _) = post_upload(&cfg, multipart("file", "big.csv", &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn download_unknown_or_unsafe_names_is_not_found() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);
        fs::write(root.path().join("secret.sql"), "nope").unwrap();

        for path in ["/download/missing.sql", "/download/..", "/download/..%2Fsecret.sql"] {
            let resp = warp::test::request()
                .path(path)
                .reply(&routes(cfg.clone()))
                .await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test]
    async fn shutdown_only_follows_a_working_signal() {
        let broken = async { Err::<(), _>(io::Error::other("no signal handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(50), shutdown_on(broken)).await;
        assert!(waited.is_err(), "a failed listener must not stop the server");

        let fired = tokio::time::timeout(Duration::from_millis(50), shutdown_on(async { Ok(()) })).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn serves_static_files() {
        let root = tempdir().unwrap();
        let cfg = test_config(&root);
        fs::write(cfg.static_dir.join("index.html"), "<h1>upload</h1>").unwrap();

        let resp = warp::test::request()
            .path("/static/index.html")
            .reply(&routes(cfg.clone()))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_ref(), b"<h1>upload</h1>");
    }
}

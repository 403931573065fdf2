use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::http::HeaderValue;
use axum::Router;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

/// Background HTTP file server rooted at the project's site directory.
/// Bound on first `start()`; `stop()` is idempotent — calling it on an
/// already-stopped server is a no-op, not an error.
pub struct PreviewHttp {
    root: PathBuf,
    host: String,
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<tokio::task::JoinHandle<()>>,
}

impl PreviewHttp {
    pub fn new(root: PathBuf, host: impl Into<String>, port: u16) -> Self {
        Self {
            root,
            host: host.into(),
            port,
            shutdown_tx: None,
            join_handle: None,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Binds and starts serving. A port already in use surfaces as a
    /// plain `anyhow::Error` — the controller treats that as "a prior
    /// instance of myself is already serving" and does not retry.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.join_handle.is_some() {
            return Ok(());
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let no_cache = SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        );
        let no_pragma = SetResponseHeaderLayer::overriding(PRAGMA, HeaderValue::from_static("no-cache"));

        let serve_dir = ServeDir::new(&self.root);
        let app = Router::new()
            .fallback_service(serve_dir)
            .layer(no_pragma)
            .layer(no_cache)
            .layer(cors);

        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let (tx, rx) = oneshot::channel();
        self.shutdown_tx = Some(tx);

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            if let Err(err) = result {
                tracing::error!(error = %err, "preview http server exited with error");
            }
        });
        self.join_handle = Some(handle);
        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PreviewHttp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_files_with_no_cache_headers() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("index.html"), "<h1>hi</h1>").unwrap();

        let mut server = PreviewHttp::new(tmp.path().to_path_buf(), "127.0.0.1", 0);
        // port 0 lets the OS pick a free port; re-derive it is not
        // possible from this type alone, so bind an ephemeral fixed
        // port instead for a deterministic test.
        server.port = 18733;
        server.start().await.unwrap();

        let resp = reqwest::get("http://127.0.0.1:18733/index.html").await.unwrap();
        assert!(resp.status().is_success());
        let cache_control = resp.headers().get(CACHE_CONTROL).unwrap().to_str().unwrap().to_string();
        assert!(cache_control.contains("no-store"));
        let body = resp.text().await.unwrap();
        assert!(body.contains("<h1>hi</h1>"));

        server.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = PreviewHttp::new(tmp.path().to_path_buf(), "127.0.0.1", 18734);
        server.start().await.unwrap();
        server.stop().await;
        server.stop().await;
    }
}

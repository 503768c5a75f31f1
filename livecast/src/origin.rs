use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, error};

/// Ephemeral static file server for one stream's output directory. Each
/// stream gets its own instance on an OS-assigned port, so segment names
/// never collide across streams and lifetimes stay independent.
pub struct OriginServer {
    base_url: String,
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
}

impl OriginServer {
    pub async fn start(directory: &Path) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("0.0.0.0:0").await?;
        let local_addr = listener.local_addr()?;

        // ServeDir rejects `..` components, so requests cannot escape the root.
        let app = Router::new().fallback_service(ServeDir::new(directory));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("origin server error: {e}");
            }
        });

        let host = local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| "127.0.0.1".to_string());
        let base_url = format!("http://{}:{}", host, local_addr.port());
        debug!(%base_url, root = %directory.display(), "origin server up");

        Ok(Self {
            base_url,
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals shutdown and waits for the listener task to finish, releasing
    /// the port. Safe while requests are in flight.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for OriginServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for OriginServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginServer")
            .field("base_url", &self.base_url)
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn serves_files_from_its_root_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("playlist.m3u8")).unwrap();
        writeln!(f, "#EXTM3U").unwrap();

        let server = OriginServer::start(dir.path()).await.unwrap();
        let port = server.local_addr().port();

        let body = reqwest::get(format!("http://127.0.0.1:{port}/playlist.m3u8"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("#EXTM3U"));

        let res = reqwest::get(format!("http://127.0.0.1:{port}/missing.ts"))
            .await
            .unwrap();
        assert_eq!(http::StatusCode::NOT_FOUND, res.status());

        server.stop().await;
    }

    #[tokio::test]
    async fn two_servers_bind_distinct_ports() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();

        let s1 = OriginServer::start(a.path()).await.unwrap();
        let s2 = OriginServer::start(b.path()).await.unwrap();
        assert_ne!(s1.local_addr().port(), s2.local_addr().port());

        s1.stop().await;
        s2.stop().await;
    }

    #[tokio::test]
    async fn stop_releases_the_port() {
        let dir = tempfile::tempdir().unwrap();
        let server = OriginServer::start(dir.path()).await.unwrap();
        let port = server.local_addr().port();
        server.stop().await;

        // The port must be rebindable once stop returns.
        let rebound = TcpListener::bind(("0.0.0.0", port)).await;
        assert!(rebound.is_ok());
    }
}

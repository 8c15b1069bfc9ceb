use axum::Router;
use dog_download::CancellationToken;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::info;

use crate::{download_router, DownloadState};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "3030";

/// Serves the download router with graceful shutdown
pub struct DownloadServer {
    pub router: Router<()>,
    shutdown: CancellationToken,
}

impl DownloadServer {
    pub fn new(state: DownloadState) -> Self {
        let shutdown = state.shutdown.clone();
        Self {
            router: download_router(state),
            shutdown,
        }
    }

    /// Mount the download routes under `path` of an existing router instead of at the root
    pub fn nest_in(mut self, path: &str, outer: Router<()>) -> Self {
        self.router = outer.nest(path, self.router);
        self
    }

    /// Cancelling this token stops accepting connections and cancels in-flight transfers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// `HTTP_HOST:HTTP_PORT`, falling back to `127.0.0.1:3030`
    pub fn address_from_env() -> String {
        let host = std::env::var("HTTP_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = std::env::var("HTTP_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        format!("{}:{}", host, port)
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "download server listening");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }

    pub async fn listen_from_env(self) -> anyhow::Result<()> {
        let addr = Self::address_from_env();
        self.listen(addr).await
    }
}

//! dog-download-axum: Axum adapter for dog-download.
//!
//! Exposes the download pipeline as a single catch-all GET route that
//! understands the canonical download URL, turns the `Range` header and query
//! parameters into a download attempt and streams the body through a pipe
//! opened only when the first byte is ready.
//!
//! ```rust,no_run
//! use dog_download::{DownloadConfig, DownloadService, MemoryEntityStore};
//! use dog_download_axum::{DownloadServer, DownloadState};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let service = DownloadService::new(DownloadConfig::from_env("DOWNLOAD"));
//! let state = DownloadState::new(service, MemoryEntityStore::new());
//!
//! DownloadServer::new(state).listen_from_env().await
//! # }
//! ```

mod error;
pub mod routes;
pub mod server;
mod state;

pub use error::DownloadAxumError;
pub use routes::download_router;
pub use server::DownloadServer;
pub use state::DownloadState;

pub use axum;

use std::sync::Arc;

use dog_download::{CancellationToken, DownloadService, EntityStore};

/// Shared state of the download routes
#[derive(Clone)]
pub struct DownloadState {
    pub service: Arc<DownloadService>,
    pub entities: Arc<dyn EntityStore>,
    /// Parent of every request's cancellation token
    pub shutdown: CancellationToken,
}

impl DownloadState {
    pub fn new<E: EntityStore + 'static>(service: DownloadService, entities: E) -> Self {
        Self {
            service: Arc::new(service),
            entities: Arc::new(entities),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

use thiserror::Error;

/// Result type for download operations
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Errors that can occur while serving a download
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Blob not found: {what}")]
    NotFound { what: String },

    #[error("Invalid locator: {locator}")]
    InvalidLocator { locator: String },

    #[error("Download forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Range not satisfiable for {total_length} bytes")]
    RangeNotSatisfiable { total_length: u64 },

    #[error("Invalid download URL: {message}")]
    InvalidUrl { message: String },

    #[error("Output sink could not be opened: {source}")]
    Sink {
        #[source]
        source: std::io::Error,
    },

    #[error("Entity storage error: {source}")]
    Storage {
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an invalid locator error
    pub fn invalid_locator<S: Into<String>>(locator: S) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(reason: S) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url<S: Into<String>>(message: S) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Create a storage error from the entity store
    pub fn storage(source: anyhow::Error) -> Self {
        Self::Storage { source }
    }

    /// Invalid locators are reported to clients the same way as missing blobs.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidLocator { .. })
    }
}

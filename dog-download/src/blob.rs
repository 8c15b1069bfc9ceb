use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, SeekFrom};
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncSeekExt};

/// Readable blob content positioned at the requested offset
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Default MIME type for blobs that do not declare one
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A binary content object owned by the storage layer.
///
/// The download pipeline only borrows a blob for the duration of one
/// request; it never caches or mutates it.
#[async_trait]
pub trait Blob: Send + Sync {
    /// Declared length in bytes
    fn length(&self) -> u64;

    /// Declared MIME type, passed through to the client unchanged
    fn mime_type(&self) -> &str;

    /// Declared filename (may be empty)
    fn filename(&self) -> &str;

    /// Open the content stream starting at `offset`.
    async fn open(&self, offset: u64) -> io::Result<BlobReader>;
}

/// Blob held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryBlob {
    data: Bytes,
    mime_type: String,
    filename: String,
}

impl MemoryBlob {
    pub fn new<D: Into<Bytes>>(data: D) -> Self {
        Self {
            data: data.into(),
            mime_type: OCTET_STREAM.to_string(),
            filename: String::new(),
        }
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = filename.into();
        self
    }
}

#[async_trait]
impl Blob for MemoryBlob {
    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    async fn open(&self, offset: u64) -> io::Result<BlobReader> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|start| *start <= self.data.len())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("offset {} past end of {} byte blob", offset, self.data.len()),
                )
            })?;
        Ok(Box::pin(io::Cursor::new(self.data.slice(start..))))
    }
}

/// Blob backed by a file on the local filesystem.
///
/// The length is captured when the handle is created; the file is opened
/// lazily on every [`Blob::open`].
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
    length: u64,
    mime_type: String,
    filename: String,
}

impl FileBlob {
    /// Stat `path` and build a handle named after the file.
    pub async fn from_path<P: Into<PathBuf>>(path: P) -> io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path,
            length: metadata.len(),
            mime_type: OCTET_STREAM.to_string(),
            filename,
        })
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = filename.into();
        self
    }
}

#[async_trait]
impl Blob for FileBlob {
    fn length(&self) -> u64 {
        self.length
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    async fn open(&self, offset: u64) -> io::Result<BlobReader> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(Box::pin(file))
    }
}

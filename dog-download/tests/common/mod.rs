#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream};

use dog_download::{
    Blob, BlobReader, Document, DownloadConfig, DownloadService, Entity, MemoryAuditSink, MemoryBlob, ResponseHead,
};

/// `len` bytes where byte `i` is `i % 251`
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn document_with_blob(len: usize) -> Arc<dyn Entity> {
    Arc::new(
        Document::new("demo", "doc-1")
            .with_blob(MemoryBlob::new(pattern(len)).with_mime_type("image/png").with_filename("photo.png")),
    )
}

pub fn empty_document() -> Arc<dyn Entity> {
    Arc::new(Document::new("demo", "doc-empty"))
}

pub fn service(audit: Arc<MemoryAuditSink>) -> DownloadService {
    DownloadService::new(DownloadConfig::default().with_chunk_size(64)).with_shared_audit_sink(audit)
}

/// Output sink that records what reached it and which head opened it
#[derive(Clone, Default)]
pub struct Recorder {
    pub bytes: Arc<Mutex<Vec<u8>>>,
    pub heads: Arc<Mutex<Vec<ResponseHead>>>,
    pub opened: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn factory(&self) -> impl FnOnce(&ResponseHead) -> io::Result<Recorder> + Send + 'static {
        let recorder = self.clone();
        move |head: &ResponseHead| {
            recorder.opened.fetch_add(1, Ordering::SeqCst);
            recorder.heads.lock().push(head.clone());
            Ok(recorder)
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }
}

impl AsyncWrite for Recorder {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.bytes.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Blob that delivers `ready` bytes and then never produces more
pub struct StallingBlob {
    length: u64,
    reader: Mutex<Option<DuplexStream>>,
    _writer: DuplexStream,
}

impl StallingBlob {
    pub async fn new(length: u64, ready: &[u8]) -> Self {
        let (mut writer, reader) = tokio::io::duplex(1024);
        writer.write_all(ready).await.unwrap();
        Self {
            length,
            reader: Mutex::new(Some(reader)),
            _writer: writer,
        }
    }
}

#[async_trait]
impl Blob for StallingBlob {
    fn length(&self) -> u64 {
        self.length
    }

    fn mime_type(&self) -> &str {
        "video/mp4"
    }

    fn filename(&self) -> &str {
        "clip.mp4"
    }

    async fn open(&self, _offset: u64) -> io::Result<BlobReader> {
        let reader = self
            .reader
            .lock()
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "already opened"))?;
        Ok(Box::pin(reader))
    }
}

//! Byte-range copy from a blob into a lazily opened output sink.

use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Blob, ByteRange};

/// Why a transfer stopped early
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("transfer failed after {written} bytes: {source}")]
    Io {
        written: u64,
        #[source]
        source: io::Error,
    },

    #[error("transfer cancelled after {written} bytes")]
    Cancelled { written: u64 },

    #[error("output sink could not be opened: {source}")]
    SinkOpen {
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Bytes already written to the sink when the transfer stopped
    pub fn written(&self) -> u64 {
        match self {
            TransferError::Io { written, .. } | TransferError::Cancelled { written } => *written,
            TransferError::SinkOpen { .. } => 0,
        }
    }
}

/// Open-on-first-write wrapper around a sink factory
enum DeferredSink<F, W> {
    Pending(Option<F>),
    Open(W),
}

impl<F, W> DeferredSink<F, W>
where
    F: FnOnce() -> io::Result<W>,
    W: AsyncWrite + Unpin,
{
    fn new(factory: F) -> Self {
        DeferredSink::Pending(Some(factory))
    }

    fn get(&mut self) -> Result<&mut W, TransferError> {
        if let DeferredSink::Pending(factory) = self {
            let factory = factory.take().ok_or_else(|| TransferError::SinkOpen {
                source: io::Error::new(io::ErrorKind::Other, "sink factory already failed"),
            })?;
            *self = DeferredSink::Open(factory().map_err(|source| TransferError::SinkOpen { source })?);
        }
        match self {
            DeferredSink::Open(sink) => Ok(sink),
            DeferredSink::Pending(_) => Err(TransferError::SinkOpen {
                source: io::Error::new(io::ErrorKind::Other, "sink not opened"),
            }),
        }
    }
}

/// Copies byte ranges through a fixed-size buffer
#[derive(Debug, Clone, Copy)]
pub struct TransferExecutor {
    chunk_size: usize,
}

impl TransferExecutor {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Copy `range` of `blob` into the sink produced by `sink_factory`.
    ///
    /// The factory runs only once the first chunk has been read, right
    /// before it is written. Read or write failures abort the copy without
    /// retrying; `cancel` is honoured between and during chunk reads/writes.
    /// Returns the number of bytes written.
    pub async fn transfer<F, W>(
        &self,
        blob: &dyn Blob,
        range: ByteRange,
        sink_factory: F,
        cancel: &CancellationToken,
    ) -> Result<u64, TransferError>
    where
        F: FnOnce() -> io::Result<W>,
        W: AsyncWrite + Unpin,
    {
        let mut sink = DeferredSink::new(sink_factory);
        let mut written = 0u64;

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled { written });
        }

        let mut reader = blob
            .open(range.start())
            .await
            .map_err(|source| TransferError::Io { written, source })?;

        let buffer_len = usize::try_from(range.length()).map_or(self.chunk_size, |len| len.min(self.chunk_size));
        let mut buf = vec![0u8; buffer_len];
        let mut remaining = range.length();

        while remaining > 0 {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled { written });
            }

            let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
            let n = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled { written }),
                read = reader.read(&mut buf[..want]) => read.map_err(|source| TransferError::Io { written, source })?,
            };
            if n == 0 {
                return Err(TransferError::Io {
                    written,
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("blob ended {} bytes before the requested range", remaining),
                    ),
                });
            }

            let out = sink.get()?;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::Cancelled { written }),
                write = out.write_all(&buf[..n]) => write.map_err(|source| TransferError::Io { written, source })?,
            }

            written += n as u64;
            remaining -= n as u64;
        }

        let out = sink.get()?;
        out.flush()
            .await
            .map_err(|source| TransferError::Io { written, source })?;
        out.shutdown()
            .await
            .map_err(|source| TransferError::Io { written, source })?;

        debug!(bytes = written, range = %range, "transfer.completed");
        Ok(written)
    }

    /// Open the sink and close it without writing, for empty content.
    pub async fn transfer_empty<F, W>(&self, sink_factory: F) -> Result<u64, TransferError>
    where
        F: FnOnce() -> io::Result<W>,
        W: AsyncWrite + Unpin,
    {
        let mut sink = DeferredSink::new(sink_factory);
        sink.get()?
            .shutdown()
            .await
            .map_err(|source| TransferError::Io { written: 0, source })?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlobReader, MemoryBlob};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// Collects written bytes; fails once `fail_after` bytes have been accepted.
    #[derive(Clone, Default)]
    struct RecordingSink {
        bytes: Arc<Mutex<Vec<u8>>>,
        fail_after: Option<usize>,
        writes: Arc<Mutex<Vec<usize>>>,
    }

    impl AsyncWrite for RecordingSink {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            let mut bytes = self.bytes.lock();
            if let Some(limit) = self.fail_after {
                if bytes.len() >= limit {
                    return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away")));
                }
            }
            bytes.extend_from_slice(buf);
            self.writes.lock().push(buf.len());
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct BrokenBlob;

    #[async_trait]
    impl Blob for BrokenBlob {
        fn length(&self) -> u64 {
            100
        }
        fn mime_type(&self) -> &str {
            "application/octet-stream"
        }
        fn filename(&self) -> &str {
            "broken.bin"
        }
        async fn open(&self, _offset: u64) -> io::Result<BlobReader> {
            Err(io::Error::new(io::ErrorKind::Other, "storage offline"))
        }
    }

    fn blob(len: usize) -> MemoryBlob {
        MemoryBlob::new((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
    }

    #[tokio::test]
    async fn test_copies_exact_range_in_bounded_chunks() {
        let sink = RecordingSink::default();
        let factory_sink = sink.clone();
        let range = ByteRange::new(200, 299).unwrap();

        let written = TransferExecutor::new(32)
            .transfer(&blob(1000), range, move || Ok(factory_sink), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(written, 100);
        let expected: Vec<u8> = (200..300).map(|i| (i % 251) as u8).collect();
        assert_eq!(*sink.bytes.lock(), expected);
        assert!(sink.writes.lock().iter().all(|len| *len <= 32));
    }

    #[tokio::test]
    async fn test_sink_not_opened_when_blob_cannot_be_read() {
        let opened = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&opened);

        let err = TransferExecutor::new(16)
            .transfer(
                &BrokenBlob,
                ByteRange::new(0, 9).unwrap(),
                move || {
                    flag.store(true, Ordering::SeqCst);
                    Ok(RecordingSink::default())
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Io { written: 0, .. }));
        assert!(!opened.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_write_failure_aborts_without_retry() {
        let sink = RecordingSink {
            fail_after: Some(20),
            ..Default::default()
        };
        let factory_sink = sink.clone();

        let err = TransferExecutor::new(10)
            .transfer(&blob(100), ByteRange::new(0, 99).unwrap(), move || Ok(factory_sink), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Io { written: 20, .. }));
        assert_eq!(sink.bytes.lock().len(), 20);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_opens_sink() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let opened = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&opened);

        let err = TransferExecutor::new(10)
            .transfer(
                &blob(100),
                ByteRange::new(0, 99).unwrap(),
                move || {
                    flag.store(true, Ordering::SeqCst);
                    Ok(RecordingSink::default())
                },
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Cancelled { written: 0 }));
        assert!(!opened.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_short_blob_is_an_io_error() {
        struct Liar(MemoryBlob);

        #[async_trait]
        impl Blob for Liar {
            fn length(&self) -> u64 {
                50
            }
            fn mime_type(&self) -> &str {
                self.0.mime_type()
            }
            fn filename(&self) -> &str {
                self.0.filename()
            }
            async fn open(&self, offset: u64) -> io::Result<BlobReader> {
                self.0.open(offset).await
            }
        }

        let err = TransferExecutor::new(8)
            .transfer(
                &Liar(blob(10)),
                ByteRange::new(0, 49).unwrap(),
                || Ok(RecordingSink::default()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            TransferError::Io { written, source } => {
                assert_eq!(written, 10);
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_sink_open_failure_is_reported() {
        let err = TransferExecutor::new(8)
            .transfer(
                &blob(10),
                ByteRange::new(0, 9).unwrap(),
                || Err::<RecordingSink, _>(io::Error::new(io::ErrorKind::Other, "no response")),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::SinkOpen { .. }));
    }

    #[tokio::test]
    async fn test_empty_transfer_opens_sink() {
        let opened = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&opened);
        let written = TransferExecutor::new(8)
            .transfer_empty(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(RecordingSink::default())
            })
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(opened.load(Ordering::SeqCst));
    }
}

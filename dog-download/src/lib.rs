//! # dog-download: Blob download pipeline for DogRS
//!
//! `dog-download` serves the binary content attached to your entities. Given an
//! entity and a locator it finds the blob, asks your permission checkers,
//! works out inline vs attachment, honours `Range` requests and streams the
//! bytes, then writes one audit record for the attempt whatever happened.
//!
//! ## Key Features
//!
//! - **Range requests**: `bytes=start-end`, `bytes=start-` and `bytes=-suffix`, with 206/416 semantics
//! - **Deferred sink**: the response is only opened once there is a byte to send
//! - **Pluggable permissions**: an immutable chain of checkers, first denial wins
//! - **Exactly-once audit**: one record per attempt, even when the request is cancelled or dropped
//! - **Server agnostic**: no HTTP types; `dog-download-axum` binds it to Axum
//!
//! ## Quick Start
//!
//! ```rust
//! use dog_download::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> DownloadResult<()> {
//! let doc = Document::new("demo", "doc-1")
//!     .with_blob(MemoryBlob::new(&b"Hello, world!"[..]).with_mime_type("text/plain"));
//!
//! let service = DownloadService::new(DownloadConfig::default())
//!     .with_audit_sink(MemoryAuditSink::new());
//!
//! let attempt = DownloadAttempt::new("hello.txt")
//!     .with_entity(Arc::new(doc))
//!     .with_reason("preview");
//!
//! let report = service
//!     .download(attempt, Some("bytes=0-4"), |_head| Ok(Vec::<u8>::new()), &CancellationToken::new())
//!     .await?;
//!
//! assert_eq!(report.outcome, Outcome::Completed);
//! assert_eq!(report.bytes_transferred, 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   Transport adapter  │  ← HTTP, routing, response sink
//! ├──────────────────────┤
//! │   DownloadService    │  ← resolve → authorize → negotiate → range → transfer → audit
//! ├──────────────────────┤
//! │   Entity / Blob      │  ← storage layer
//! └──────────────────────┘
//! ```

pub mod audit;
mod blob;
mod config;
mod entity;
mod error;
mod negotiate;
pub mod permission;
mod range;
mod resolver;
mod response;
mod service;
mod transfer;
mod types;
mod url;

pub use audit::{AuditRecord, AuditSink, ChannelAuditSink, MemoryAuditSink, Outcome, TracingAuditSink, EVENT_NAME};
pub use blob::{Blob, BlobReader, FileBlob, MemoryBlob, OCTET_STREAM};
pub use config::{DownloadConfig, DEFAULT_CHUNK_SIZE, DEFAULT_REASON};
pub use entity::{Document, Entity, EntityStore, MemoryEntityStore, Property};
pub use error::{DownloadError, DownloadResult};
pub use negotiate::{ContentNegotiator, Disposition};
pub use permission::{
    AllowReasons, MaxBlobLength, PermissionChecker, PermissionContext, PermissionGate, PermissionGateBuilder,
};
pub use range::{resolve_range, RangeDecision};
pub use resolver::{BlobResolver, Locator, BLOBHOLDER_0, BLOBHOLDER_PREFIX};
pub use response::ResponseHead;
pub use service::{DownloadReport, DownloadService};
pub use transfer::{TransferError, TransferExecutor};
pub use types::{ByteRange, DownloadAttempt, EntityRef, ExtendedInfo, RangeHook};
pub use url::{parse_url, DownloadUrl, SchemeTag, UrlCodec, DEFAULT_FILENAME};

pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Blob, CancellationToken, Document, DownloadAttempt, DownloadConfig, DownloadError, DownloadReport,
        DownloadResult, DownloadService, Entity, MemoryAuditSink, MemoryBlob, Outcome, PermissionGate,
        ResponseHead,
    };
}

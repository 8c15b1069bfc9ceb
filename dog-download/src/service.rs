//! The download orchestrator.
//!
//! [`DownloadService`] drives one attempt through
//! resolve → authorize → negotiate → range → transfer and appends exactly one
//! audit record when the attempt reaches a terminal state.

use std::io;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::AuditGuard;
use crate::{
    resolve_range, AuditSink, Blob, BlobResolver, ByteRange, ContentNegotiator, Disposition, DownloadAttempt,
    DownloadConfig, DownloadError, DownloadResult, DownloadUrl, Entity, Outcome, PermissionContext, PermissionGate,
    RangeDecision, ResponseHead, TracingAuditSink, TransferError, TransferExecutor, UrlCodec, DEFAULT_FILENAME,
};

/// What happened to one download attempt
#[derive(Debug)]
pub struct DownloadReport {
    /// Same id as the attempt's audit record
    pub attempt_id: Uuid,
    pub outcome: Outcome,
    /// Head of the response, `None` when the attempt aborted on I/O
    pub response: Option<ResponseHead>,
    /// Range decision, once the pipeline got that far
    pub range: Option<RangeDecision>,
    pub total_length: Option<u64>,
    pub bytes_transferred: u64,
    /// Cause of a failed outcome
    pub error: Option<DownloadError>,
}

impl DownloadReport {
    fn new(attempt_id: Uuid, outcome: Outcome) -> Self {
        Self {
            attempt_id,
            outcome,
            response: None,
            range: None,
            total_length: None,
            bytes_transferred: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Composes the download pipeline. Embed one per application and share it.
pub struct DownloadService {
    resolver: BlobResolver,
    permissions: PermissionGate,
    negotiator: ContentNegotiator,
    executor: TransferExecutor,
    audit: Arc<dyn AuditSink>,
    urls: UrlCodec,
    config: DownloadConfig,
}

impl DownloadService {
    /// Allow-all permissions and a [`TracingAuditSink`]
    pub fn new(config: DownloadConfig) -> Self {
        Self {
            resolver: BlobResolver::new(),
            permissions: PermissionGate::allow_all(),
            negotiator: ContentNegotiator::new(config.inline_mime_types.iter().cloned()),
            executor: TransferExecutor::new(config.chunk_size),
            audit: Arc::new(TracingAuditSink),
            urls: UrlCodec::new(config.default_scheme),
            config,
        }
    }

    pub fn with_permissions(mut self, permissions: PermissionGate) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_audit_sink<S: AuditSink + 'static>(mut self, sink: S) -> Self {
        self.audit = Arc::new(sink);
        self
    }

    pub fn with_shared_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn permissions(&self) -> &PermissionGate {
        &self.permissions
    }

    pub fn urls(&self) -> &UrlCodec {
        &self.urls
    }

    pub fn resolve_blob(&self, entity: &dyn Entity, locator: Option<&str>) -> DownloadResult<Arc<dyn Blob>> {
        self.resolver.resolve(entity, locator)
    }

    pub fn check_permission(&self, ctx: &PermissionContext<'_>) -> bool {
        self.permissions.check(ctx)
    }

    pub fn decide_disposition(&self, blob: &dyn Blob, inline_override: Option<bool>) -> Disposition {
        self.negotiator.decide(blob, inline_override)
    }

    pub fn build_url(&self, repository: &str, entity_id: &str, locator: Option<&str>, filename: &str) -> String {
        self.urls.build(repository, entity_id, locator, filename)
    }

    pub fn entity_url(&self, entity: &dyn Entity, locator: Option<&str>, filename: Option<&str>) -> String {
        self.urls.entity_url(entity, locator, filename)
    }

    pub fn parse_url(&self, url: &str) -> DownloadResult<DownloadUrl> {
        self.urls.parse(url)
    }

    /// Run one download attempt.
    ///
    /// `sink_factory` receives the response head and is called at most once,
    /// right before the first body byte is written. Not-found, forbidden,
    /// unsatisfiable-range and I/O failures come back as an `Ok` report with
    /// the matching outcome; only a failing sink factory is returned as
    /// [`DownloadError::Sink`]. Either way the attempt has been audited.
    pub async fn download<F, W>(
        &self,
        mut attempt: DownloadAttempt,
        range_header: Option<&str>,
        sink_factory: F,
        cancel: &CancellationToken,
    ) -> DownloadResult<DownloadReport>
    where
        F: FnOnce(&ResponseHead) -> io::Result<W>,
        W: AsyncWrite + Unpin,
    {
        if attempt.reason.trim().is_empty() {
            attempt.reason = self.config.default_reason.clone();
        }
        let mut guard = AuditGuard::new(Arc::clone(&self.audit), &attempt);
        let attempt_id = guard.attempt_id();

        let blob = match self.locate(&attempt) {
            Ok(blob) => blob,
            Err(error) => {
                warn!(%attempt_id, error = %error, "download.not_found");
                return Ok(self.fail(guard, Outcome::NotFound, None, error));
            }
        };
        let total_length = blob.length();
        debug!(%attempt_id, total_length, "download.resolved");

        let ctx = PermissionContext {
            entity: attempt.entity.as_deref(),
            locator: attempt.locator.as_deref(),
            blob: blob.as_ref(),
            reason: &attempt.reason,
            extended_info: &attempt.extended_info,
        };
        if !self.permissions.check(&ctx) {
            warn!(%attempt_id, reason = %attempt.reason, "download.forbidden");
            let error = DownloadError::forbidden(format!("download of '{}' denied", attempt.filename));
            return Ok(self.fail(guard, Outcome::Forbidden, Some(total_length), error));
        }
        debug!(%attempt_id, "download.authorized");

        let disposition = self.negotiator.decide(blob.as_ref(), attempt.inline);
        let filename = if attempt.filename.is_empty() {
            Some(blob.filename())
                .filter(|f| !f.is_empty())
                .unwrap_or(DEFAULT_FILENAME)
                .to_string()
        } else {
            attempt.filename.clone()
        };
        guard.set_filename(&filename);

        let decision = resolve_range(range_header, total_length);
        let (head, range) = match decision {
            RangeDecision::NotSatisfiable => {
                warn!(%attempt_id, range = range_header.unwrap_or_default(), total_length, "download.range_not_satisfiable");
                let mut report = self.fail(
                    guard,
                    Outcome::RangeNotSatisfiable,
                    Some(total_length),
                    DownloadError::RangeNotSatisfiable { total_length },
                );
                report.range = Some(decision);
                return Ok(report);
            }
            RangeDecision::Full => (
                ResponseHead::full(&disposition, &filename, total_length),
                ByteRange::full(total_length),
            ),
            RangeDecision::Partial(range) => (
                ResponseHead::partial(&disposition, &filename, &range, total_length),
                Some(range),
            ),
        };
        debug!(%attempt_id, status = head.status, inline = disposition.inline, "download.negotiated");

        if let (Some(hook), Some(range)) = (&attempt.range_hook, &range) {
            hook(range);
        }

        let sink_head = head.clone();
        let open_sink = move || sink_factory(&sink_head);
        let transferred = match range {
            Some(range) => self.executor.transfer(blob.as_ref(), range, open_sink, cancel).await,
            None => self.executor.transfer_empty(open_sink).await,
        };

        let mut report = DownloadReport::new(attempt_id, Outcome::Completed);
        report.range = Some(decision);
        report.total_length = Some(total_length);

        match transferred {
            Ok(bytes) => {
                info!(%attempt_id, filename = %filename, bytes, status = head.status, "download.completed");
                guard.finish(Outcome::Completed);
                report.response = Some(head);
                report.bytes_transferred = bytes;
                Ok(report)
            }
            Err(TransferError::SinkOpen { source }) => {
                warn!(%attempt_id, error = %source, "download.sink_failed");
                guard.finish(Outcome::IoError);
                Err(DownloadError::Sink { source })
            }
            Err(error) => {
                warn!(%attempt_id, error = %error, "download.io_error");
                guard.finish(Outcome::IoError);
                report.outcome = Outcome::IoError;
                report.bytes_transferred = error.written();
                report.error = Some(DownloadError::from(into_io(error)));
                Ok(report)
            }
        }
    }

    fn locate(&self, attempt: &DownloadAttempt) -> DownloadResult<Arc<dyn Blob>> {
        if let Some(blob) = &attempt.blob {
            return Ok(Arc::clone(blob));
        }
        let entity = attempt
            .entity
            .as_deref()
            .ok_or_else(|| DownloadError::not_found("attempt names neither an entity nor a blob"))?;
        self.resolver.resolve(entity, attempt.locator.as_deref())
    }

    fn fail(&self, guard: AuditGuard, outcome: Outcome, total_length: Option<u64>, error: DownloadError) -> DownloadReport {
        let mut report = DownloadReport::new(guard.attempt_id(), outcome);
        guard.finish(outcome);
        report.response = ResponseHead::for_failure(outcome, total_length);
        report.total_length = total_length;
        report.error = Some(error);
        report
    }
}

impl std::fmt::Debug for DownloadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadService")
            .field("permissions", &self.permissions)
            .field("negotiator", &self.negotiator)
            .field("executor", &self.executor)
            .field("urls", &self.urls)
            .field("config", &self.config)
            .finish()
    }
}

fn into_io(error: TransferError) -> io::Error {
    match error {
        TransferError::Io { source, .. } | TransferError::SinkOpen { source } => source,
        TransferError::Cancelled { written } => io::Error::new(
            io::ErrorKind::Interrupted,
            format!("download cancelled after {} bytes", written),
        ),
    }
}

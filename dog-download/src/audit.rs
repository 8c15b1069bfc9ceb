//! Audit trail of download attempts.
//!
//! Exactly one [`AuditRecord`] is appended per attempt, whatever its
//! outcome. Sinks must tolerate concurrent appends; their failures are
//! logged and swallowed, never surfaced to the download.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{DownloadAttempt, EntityRef, ExtendedInfo};

/// Event name carried by every download audit record
pub const EVENT_NAME: &str = "download";

/// Terminal state of a download attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    NotFound,
    Forbidden,
    RangeNotSatisfiable,
    IoError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::NotFound => "not_found",
            Outcome::Forbidden => "forbidden",
            Outcome::RangeNotSatisfiable => "range_not_satisfiable",
            Outcome::IoError => "io_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged download attempt
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub attempt_id: Uuid,
    pub event: String,
    pub entity: Option<EntityRef>,
    pub locator: Option<String>,
    pub filename: String,
    pub reason: String,
    pub extended_info: ExtendedInfo,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
}

/// Destination of audit records
pub trait AuditSink: Send + Sync {
    fn append(&self, record: AuditRecord) -> anyhow::Result<()>;
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn append(&self, record: AuditRecord) -> anyhow::Result<()> {
        (**self).append(record)
    }
}

/// Emits each record as a structured `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn append(&self, record: AuditRecord) -> anyhow::Result<()> {
        let extended_info = serde_json::to_string(&record.extended_info)?;
        let entity = record
            .entity
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        info!(
            target: "dog_download::audit",
            attempt_id = %record.attempt_id,
            event = %record.event,
            entity = %entity,
            locator = record.locator.as_deref().unwrap_or("-"),
            filename = %record.filename,
            reason = %record.reason,
            outcome = %record.outcome,
            extended_info = %extended_info,
            timestamp = %record.timestamp.to_rfc3339(),
            "download.audit"
        );
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: AuditRecord) -> anyhow::Result<()> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// Hands records to an external writer over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl ChannelAuditSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn append(&self, record: AuditRecord) -> anyhow::Result<()> {
        self.tx
            .send(record)
            .map_err(|_| anyhow::anyhow!("audit receiver closed"))
    }
}

/// Guarantees one record per attempt.
///
/// [`AuditGuard::finish`] records the terminal outcome; dropping an
/// unfinished guard (the attempt's future was abandoned) records `IoError`.
pub(crate) struct AuditGuard {
    sink: Arc<dyn AuditSink>,
    attempt_id: Uuid,
    draft: Option<AuditRecord>,
}

impl AuditGuard {
    pub(crate) fn new(sink: Arc<dyn AuditSink>, attempt: &DownloadAttempt) -> Self {
        let attempt_id = Uuid::new_v4();
        let draft = AuditRecord {
            attempt_id,
            event: EVENT_NAME.to_string(),
            entity: attempt.entity_ref(),
            locator: attempt.locator.clone(),
            filename: attempt.filename.clone(),
            reason: attempt.reason.clone(),
            extended_info: attempt.extended_info.clone(),
            outcome: Outcome::IoError,
            timestamp: Utc::now(),
        };
        Self {
            sink,
            attempt_id,
            draft: Some(draft),
        }
    }

    pub(crate) fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    /// Record the filename actually served once fallbacks are applied
    pub(crate) fn set_filename(&mut self, filename: &str) {
        if let Some(draft) = self.draft.as_mut() {
            draft.filename = filename.to_string();
        }
    }

    pub(crate) fn finish(mut self, outcome: Outcome) {
        self.emit(outcome);
    }

    fn emit(&mut self, outcome: Outcome) {
        let Some(mut record) = self.draft.take() else {
            return;
        };
        record.outcome = outcome;
        record.timestamp = Utc::now();

        let attempt_id = record.attempt_id;
        if let Err(e) = self.sink.append(record) {
            warn!(%attempt_id, error = %e, "audit sink rejected download record");
        }
    }
}

impl Drop for AuditGuard {
    fn drop(&mut self) {
        if self.draft.is_some() {
            warn!(attempt_id = %self.attempt_id, "download abandoned before reaching a terminal state");
            self.emit(Outcome::IoError);
        }
    }
}

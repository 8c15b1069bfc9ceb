use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{Blob, Entity};

/// Free-form context attached to a download attempt and copied into its audit record
pub type ExtendedInfo = BTreeMap<String, String>;

/// Inclusive byte span of a blob.
///
/// Always satisfies `start <= end`; build it through [`ByteRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    /// Returns `None` when `start > end`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The whole content of a non-empty blob.
    pub fn full(total_length: u64) -> Option<Self> {
        total_length
            .checked_sub(1)
            .map(|end| Self { start: 0, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `bytes {start}-{end}/{total}`
    pub fn content_range(&self, total_length: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total_length)
    }
}

impl std::fmt::Display for ByteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Identity of the entity a blob is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub repository: String,
    pub id: String,
}

impl EntityRef {
    pub fn new<R: Into<String>, I: Into<String>>(repository: R, id: I) -> Self {
        Self {
            repository: repository.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.repository, self.id)
    }
}

/// One request to download a blob.
///
/// Either the entity (with an optional locator) or the blob itself must be
/// supplied; when both are present the blob wins and the entity is only
/// used for permission checks and auditing.
#[derive(Clone)]
pub struct DownloadAttempt {
    pub entity: Option<Arc<dyn Entity>>,
    pub locator: Option<String>,
    pub blob: Option<Arc<dyn Blob>>,
    pub filename: String,
    pub reason: String,
    pub extended_info: ExtendedInfo,
    pub inline: Option<bool>,
    /// Told which byte range is about to be sent, right before the transfer starts
    pub range_hook: Option<RangeHook>,
}

/// Per-attempt observer of the byte range being transferred
pub type RangeHook = Arc<dyn Fn(&ByteRange) + Send + Sync>;

impl DownloadAttempt {
    pub fn new<S: Into<String>>(filename: S) -> Self {
        Self {
            entity: None,
            locator: None,
            blob: None,
            filename: filename.into(),
            reason: String::new(),
            extended_info: ExtendedInfo::new(),
            inline: None,
            range_hook: None,
        }
    }

    pub fn with_entity(mut self, entity: Arc<dyn Entity>) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_locator<S: Into<String>>(mut self, locator: S) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_blob(mut self, blob: Arc<dyn Blob>) -> Self {
        self.blob = Some(blob);
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extended_info.insert(key.into(), value.into());
        self
    }

    pub fn with_extended_info(mut self, info: ExtendedInfo) -> Self {
        self.extended_info.extend(info);
        self
    }

    /// Force the inline flag instead of negotiating it from the MIME type.
    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = Some(inline);
        self
    }

    pub fn with_range_hook<H>(mut self, hook: H) -> Self
    where
        H: Fn(&ByteRange) + Send + Sync + 'static,
    {
        self.range_hook = Some(Arc::new(hook));
        self
    }

    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.entity.as_ref().map(|e| e.entity_ref())
    }
}

impl std::fmt::Debug for DownloadAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadAttempt")
            .field("entity", &self.entity_ref())
            .field("locator", &self.locator)
            .field("has_blob", &self.blob.is_some())
            .field("filename", &self.filename)
            .field("reason", &self.reason)
            .field("extended_info", &self.extended_info)
            .field("inline", &self.inline)
            .field("has_range_hook", &self.range_hook.is_some())
            .finish()
    }
}

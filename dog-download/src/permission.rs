//! Pluggable download authorization.
//!
//! A [`PermissionGate`] holds an immutable chain of [`PermissionChecker`]s
//! built once at startup. A download is allowed only when every checker
//! allows it; evaluation stops at the first denial.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::{Blob, Entity, ExtendedInfo};

/// Everything a checker may look at when deciding on one download
pub struct PermissionContext<'a> {
    pub entity: Option<&'a dyn Entity>,
    pub locator: Option<&'a str>,
    pub blob: &'a dyn Blob,
    pub reason: &'a str,
    pub extended_info: &'a ExtendedInfo,
}

/// One download policy
pub trait PermissionChecker: Send + Sync {
    /// `true` to allow the download
    fn check(&self, ctx: &PermissionContext<'_>) -> bool;

    /// Name used in logs when this checker denies a download
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> PermissionChecker for F
where
    F: Fn(&PermissionContext<'_>) -> bool + Send + Sync,
{
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        self(ctx)
    }
}

/// Allows only downloads whose reason is in a fixed set
#[derive(Debug, Clone)]
pub struct AllowReasons {
    reasons: BTreeSet<String>,
}

impl AllowReasons {
    pub fn new<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionChecker for AllowReasons {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        self.reasons.contains(ctx.reason)
    }

    fn name(&self) -> &str {
        "allow-reasons"
    }
}

/// Denies blobs larger than a byte limit
#[derive(Debug, Clone, Copy)]
pub struct MaxBlobLength(pub u64);

impl PermissionChecker for MaxBlobLength {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        ctx.blob.length() <= self.0
    }

    fn name(&self) -> &str {
        "max-blob-length"
    }
}

/// Immutable chain of checkers combined with logical AND
#[derive(Clone)]
pub struct PermissionGate {
    checkers: Arc<[Arc<dyn PermissionChecker>]>,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl PermissionGate {
    /// A gate with no checkers allows everything.
    pub fn allow_all() -> Self {
        Self {
            checkers: Arc::from(Vec::new()),
        }
    }

    pub fn builder() -> PermissionGateBuilder {
        PermissionGateBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        match self.checkers.iter().find(|checker| !checker.check(ctx)) {
            Some(denied_by) => {
                debug!(checker = denied_by.name(), reason = ctx.reason, "download.denied");
                false
            }
            None => true,
        }
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checkers.iter().map(|c| c.name()))
            .finish()
    }
}

#[derive(Default)]
pub struct PermissionGateBuilder {
    checkers: Vec<Arc<dyn PermissionChecker>>,
}

impl PermissionGateBuilder {
    pub fn with_checker<C: PermissionChecker + 'static>(mut self, checker: C) -> Self {
        self.checkers.push(Arc::new(checker));
        self
    }

    pub fn with_shared_checker(mut self, checker: Arc<dyn PermissionChecker>) -> Self {
        self.checkers.push(checker);
        self
    }

    pub fn build(self) -> PermissionGate {
        PermissionGate {
            checkers: self.checkers.into(),
        }
    }
}

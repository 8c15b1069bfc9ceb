use crate::SchemeTag;

/// Default copy buffer size for the transfer loop
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Reason recorded when the caller gives none
pub const DEFAULT_REASON: &str = "download";

/// Configuration for the download pipeline
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Size of the fixed buffer the transfer loop copies through
    pub chunk_size: usize,

    /// MIME types served inline unless the request overrides it
    /// (`type/*` wildcards allowed)
    pub inline_mime_types: Vec<String>,

    /// Scheme tag used when building URLs
    pub default_scheme: SchemeTag,

    /// Reason used for attempts that do not carry one
    pub default_reason: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            inline_mime_types: vec![
                "image/*".to_string(),
                "application/pdf".to_string(),
                "text/plain".to_string(),
            ],
            default_scheme: SchemeTag::File,
            default_reason: DEFAULT_REASON.to_string(),
        }
    }
}

impl DownloadConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `{prefix}__CHUNK_SIZE`, `{prefix}__INLINE_MIME_TYPES`
    /// (comma separated), `{prefix}__DEFAULT_SCHEME` and `{prefix}__DEFAULT_REASON`.
    ///
    /// Unparsable values are ignored.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}__{}", prefix, name));
        let mut config = Self::default();

        if let Some(size) = var("CHUNK_SIZE").and_then(|v| v.trim().parse::<usize>().ok()) {
            config = config.with_chunk_size(size);
        }
        if let Some(types) = var("INLINE_MIME_TYPES") {
            config.inline_mime_types = types
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(scheme) = var("DEFAULT_SCHEME").and_then(|v| v.trim().parse().ok()) {
            config.default_scheme = scheme;
        }
        if let Some(reason) = var("DEFAULT_REASON").filter(|r| !r.trim().is_empty()) {
            config.default_reason = reason;
        }
        config
    }

    /// Set the transfer buffer size (minimum one byte)
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Replace the inline allow-list
    pub fn with_inline_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inline_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_scheme(mut self, scheme: SchemeTag) -> Self {
        self.default_scheme = scheme;
        self
    }

    pub fn with_default_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.default_reason = reason.into();
        self
    }
}

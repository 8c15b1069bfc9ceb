//! Canonical download URLs: `<scheme>/<repository>/<entity id>/<locator>/<filename>`.
//!
//! Every component is percent-encoded on its own, so locators such as
//! `files:files/0/file` and filenames with spaces or slashes survive a
//! round trip. Empty components are not valid on the wire; the builders
//! substitute defaults for them.

use std::str::FromStr;

use crate::{BlobResolver, DownloadError, DownloadResult, Entity, BLOBHOLDER_0};

/// Filename used when neither the caller nor the blob provides one
pub const DEFAULT_FILENAME: &str = "file";

/// Routing tag selecting the transfer strategy. Opaque to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeTag {
    /// `nxfile`: direct file download
    File,
    /// `nxbigblob`: big blob streaming
    BigBlob,
    /// `nxbigzipfile`: zipped bundle
    ZipBundle,
}

impl SchemeTag {
    pub const ALL: [SchemeTag; 3] = [SchemeTag::File, SchemeTag::BigBlob, SchemeTag::ZipBundle];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeTag::File => "nxfile",
            SchemeTag::BigBlob => "nxbigblob",
            SchemeTag::ZipBundle => "nxbigzipfile",
        }
    }
}

impl FromStr for SchemeTag {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| DownloadError::invalid_url(format!("unknown scheme tag '{}'", s)))
    }
}

impl std::fmt::Display for SchemeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded components of a download URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrl {
    pub scheme: SchemeTag,
    pub repository: String,
    pub entity_id: String,
    pub locator: String,
    pub filename: String,
}

impl DownloadUrl {
    pub fn to_path(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.scheme,
            urlencoding::encode(&self.repository),
            urlencoding::encode(&self.entity_id),
            urlencoding::encode(&self.locator),
            urlencoding::encode(&self.filename),
        )
    }
}

impl std::fmt::Display for DownloadUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Builds and parses download URLs for one scheme tag
#[derive(Debug, Clone, Copy)]
pub struct UrlCodec {
    scheme: SchemeTag,
}

impl Default for UrlCodec {
    fn default() -> Self {
        Self::new(SchemeTag::File)
    }
}

impl UrlCodec {
    pub fn new(scheme: SchemeTag) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> SchemeTag {
        self.scheme
    }

    /// Relative URL for a blob. An absent or empty locator becomes
    /// `blobholder:0` and an empty filename becomes [`DEFAULT_FILENAME`].
    pub fn build(&self, repository: &str, entity_id: &str, locator: Option<&str>, filename: &str) -> String {
        let filename = if filename.is_empty() { DEFAULT_FILENAME } else { filename };
        DownloadUrl {
            scheme: self.scheme,
            repository: repository.to_string(),
            entity_id: entity_id.to_string(),
            locator: non_empty(locator).unwrap_or(BLOBHOLDER_0).to_string(),
            filename: filename.to_string(),
        }
        .to_path()
    }

    /// Relative URL for a blob of `entity`.
    ///
    /// An absent filename defaults to the resolved blob's declared filename,
    /// then to [`DEFAULT_FILENAME`].
    pub fn entity_url(&self, entity: &dyn Entity, locator: Option<&str>, filename: Option<&str>) -> String {
        let locator = non_empty(locator);
        let filename = match non_empty(filename) {
            Some(f) => f.to_string(),
            None => BlobResolver::new()
                .resolve(entity, locator)
                .ok()
                .map(|blob| blob.filename().to_string())
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
        };
        self.build(entity.repository(), entity.id(), locator, &filename)
    }

    /// Parse a URL path built by [`UrlCodec::build`], with or without a
    /// leading slash or query string. Any known scheme tag is accepted.
    pub fn parse(&self, url: &str) -> DownloadResult<DownloadUrl> {
        parse_url(url)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse `<scheme>/<repository>/<entity id>/<locator>/<filename>`.
pub fn parse_url(url: &str) -> DownloadResult<DownloadUrl> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.strip_prefix('/').unwrap_or(path);

    let segments: Vec<&str> = path.split('/').collect();
    let [scheme, repository, entity_id, locator, filename] = segments.as_slice() else {
        return Err(DownloadError::invalid_url(format!(
            "expected 5 path segments, found {}",
            segments.len()
        )));
    };

    Ok(DownloadUrl {
        scheme: scheme.parse()?,
        repository: decode_segment("repository", repository)?,
        entity_id: decode_segment("entity id", entity_id)?,
        locator: decode_segment("locator", locator)?,
        filename: decode_segment("filename", filename)?,
    })
}

fn decode_segment(what: &str, raw: &str) -> DownloadResult<String> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| DownloadError::invalid_url(format!("{} is not valid UTF-8", what)))?;
    if decoded.is_empty() {
        return Err(DownloadError::invalid_url(format!("empty {}", what)));
    }
    Ok(decoded.into_owned())
}

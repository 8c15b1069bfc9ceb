use std::sync::Arc;

use crate::{Blob, DownloadError, DownloadResult, Entity, Property};

/// Prefix of index locators into an entity's blob list
pub const BLOBHOLDER_PREFIX: &str = "blobholder:";

/// Locator used when none is given
pub const BLOBHOLDER_0: &str = "blobholder:0";

/// Address of one blob attached to an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `blobholder:<N>`: index into the ordered blob list
    BlobHolder(usize),
    /// Slash-separated path through the property graph, e.g. `files:files/0/file`
    XPath(String),
}

impl Locator {
    pub fn parse(raw: &str) -> DownloadResult<Self> {
        if let Some(index) = raw.strip_prefix(BLOBHOLDER_PREFIX) {
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DownloadError::invalid_locator(raw));
            }
            return index
                .parse()
                .map(Locator::BlobHolder)
                .map_err(|_| DownloadError::invalid_locator(raw));
        }

        let path = raw.trim_matches('/');
        if path.is_empty() || path.split('/').any(str::is_empty) {
            return Err(DownloadError::invalid_locator(raw));
        }
        Ok(Locator::XPath(path.to_string()))
    }
}

impl Default for Locator {
    fn default() -> Self {
        Locator::BlobHolder(0)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::BlobHolder(index) => write!(f, "{}{}", BLOBHOLDER_PREFIX, index),
            Locator::XPath(path) => f.write_str(path),
        }
    }
}

/// Maps an entity plus locator to one of its blobs. Pure lookup, no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobResolver;

impl BlobResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `locator` (default `blobholder:0`) on `entity`.
    ///
    /// Fails with `NotFound` for a missing or non-blob endpoint and with
    /// `InvalidLocator` for unparsable locators.
    pub fn resolve(&self, entity: &dyn Entity, locator: Option<&str>) -> DownloadResult<Arc<dyn Blob>> {
        let locator = match locator {
            Some(raw) => Locator::parse(raw)?,
            None => Locator::default(),
        };

        let blob = match &locator {
            Locator::BlobHolder(index) => entity.blobs().get(*index).cloned(),
            Locator::XPath(path) => {
                let mut segments = path.split('/');
                let root = segments.next().and_then(|name| entity.property(name));
                match segments.try_fold(root, |node, segment| node.map(|n| n.child(segment))) {
                    Some(Some(Property::Blob(blob))) => Some(Arc::clone(blob)),
                    _ => None,
                }
            }
        };

        blob.ok_or_else(|| DownloadError::not_found(format!("{} on {}", locator, entity.entity_ref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, MemoryBlob};

    fn document() -> Document {
        Document::new("demo", "doc-1")
            .with_blob(MemoryBlob::new(&b"main"[..]).with_filename("main.txt"))
            .with_blob(MemoryBlob::new(&b"second"[..]).with_filename("second.txt"))
            .with_property("file:content", Property::blob(MemoryBlob::new(&b"content"[..]).with_filename("content.pdf")))
            .with_property(
                "files:files",
                Property::List(vec![Property::complex([(
                    "file",
                    Property::blob(MemoryBlob::new(&b"attached"[..]).with_filename("attached.png")),
                )])]),
            )
            .with_property("dc:title", Property::scalar("A title"))
    }

    #[test]
    fn test_parse_locators() {
        assert_eq!(Locator::parse("blobholder:0").unwrap(), Locator::BlobHolder(0));
        assert_eq!(Locator::parse("blobholder:12").unwrap(), Locator::BlobHolder(12));
        assert_eq!(Locator::parse("file:content").unwrap(), Locator::XPath("file:content".into()));
        assert_eq!(Locator::parse("/files:files/0/file").unwrap(), Locator::XPath("files:files/0/file".into()));

        for bad in ["blobholder:", "blobholder:-1", "blobholder:x", "", "/", "a//b"] {
            assert!(matches!(Locator::parse(bad), Err(DownloadError::InvalidLocator { .. })), "{bad}");
        }
    }

    #[test]
    fn test_locator_display_round_trips() {
        assert_eq!(Locator::BlobHolder(3).to_string(), "blobholder:3");
        assert_eq!(Locator::default().to_string(), BLOBHOLDER_0);
    }

    #[test]
    fn test_resolve_defaults_to_first_blob() {
        let blob = BlobResolver::new().resolve(&document(), None).unwrap();
        assert_eq!(blob.filename(), "main.txt");
    }

    #[test]
    fn test_resolve_blobholder_index() {
        let blob = BlobResolver::new().resolve(&document(), Some("blobholder:1")).unwrap();
        assert_eq!(blob.filename(), "second.txt");

        let err = BlobResolver::new().resolve(&document(), Some("blobholder:2")).err().unwrap();
        assert!(matches!(err, DownloadError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_xpath() {
        let resolver = BlobResolver::new();
        assert_eq!(resolver.resolve(&document(), Some("file:content")).unwrap().filename(), "content.pdf");
        assert_eq!(resolver.resolve(&document(), Some("files:files/0/file")).unwrap().filename(), "attached.png");
    }

    #[test]
    fn test_resolve_xpath_to_non_blob_or_missing() {
        let resolver = BlobResolver::new();
        for locator in ["dc:title", "files:files/0", "files:files/1/file", "nope:nothing", "file:content/deeper"] {
            let err = resolver.resolve(&document(), Some(locator)).err().unwrap();
            assert!(err.is_not_found(), "{locator}");
        }
    }

    #[test]
    fn test_resolve_on_entity_without_blobs() {
        let empty = Document::new("demo", "empty");
        let err = BlobResolver::new().resolve(&empty, Some("blobholder:0")).err().unwrap();
        assert!(matches!(err, DownloadError::NotFound { .. }));
    }
}

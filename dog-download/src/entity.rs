use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{Blob, EntityRef};

/// A node in an entity's property graph
#[derive(Clone)]
pub enum Property {
    Blob(Arc<dyn Blob>),
    Scalar(String),
    Complex(BTreeMap<String, Property>),
    List(Vec<Property>),
}

impl Property {
    pub fn blob<B: Blob + 'static>(blob: B) -> Self {
        Property::Blob(Arc::new(blob))
    }

    pub fn scalar<S: Into<String>>(value: S) -> Self {
        Property::Scalar(value.into())
    }

    pub fn complex<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Property)>,
        K: Into<String>,
    {
        Property::Complex(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Step into a child: field name for complex values, index for lists.
    pub fn child(&self, segment: &str) -> Option<&Property> {
        match self {
            Property::Complex(fields) => fields.get(segment),
            Property::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Property::Blob(_) | Property::Scalar(_) => None,
        }
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Property::Blob(blob) => write!(f, "Blob({:?}, {} bytes)", blob.filename(), blob.length()),
            Property::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Property::Complex(fields) => f.debug_map().entries(fields.iter()).finish(),
            Property::List(items) => f.debug_list().entries(items.iter()).finish(),
        }
    }
}

/// An addressable entity that blobs are attached to.
pub trait Entity: Send + Sync {
    fn repository(&self) -> &str;

    fn id(&self) -> &str;

    /// Ordered list of attached blobs; index 0 is the primary blob.
    fn blobs(&self) -> Vec<Arc<dyn Blob>>;

    /// Top-level property by name (e.g. `file:content`).
    fn property(&self, name: &str) -> Option<&Property>;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.repository(), self.id())
    }
}

/// In-memory entity
#[derive(Clone)]
pub struct Document {
    repository: String,
    id: String,
    blobs: Vec<Arc<dyn Blob>>,
    properties: BTreeMap<String, Property>,
}

impl Document {
    pub fn new<R: Into<String>, I: Into<String>>(repository: R, id: I) -> Self {
        Self {
            repository: repository.into(),
            id: id.into(),
            blobs: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Append a blob to the ordered blob list.
    pub fn with_blob<B: Blob + 'static>(mut self, blob: B) -> Self {
        self.blobs.push(Arc::new(blob));
        self
    }

    pub fn with_property<S: Into<String>>(mut self, name: S, value: Property) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("repository", &self.repository)
            .field("id", &self.id)
            .field("blobs", &self.blobs.len())
            .field("properties", &self.properties)
            .finish()
    }
}

impl Entity for Document {
    fn repository(&self) -> &str {
        &self.repository
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn blobs(&self) -> Vec<Arc<dyn Blob>> {
        self.blobs.clone()
    }

    fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }
}

/// Lookup of entities by repository and id (the storage layer's side of the seam)
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn entity(&self, repository: &str, id: &str) -> anyhow::Result<Option<Arc<dyn Entity>>>;
}

/// Entity store backed by a map, for embedding and tests
#[derive(Default)]
pub struct MemoryEntityStore {
    entities: RwLock<HashMap<EntityRef, Arc<dyn Entity>>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<E: Entity + 'static>(&self, entity: E) {
        let key = entity.entity_ref();
        self.entities.write().insert(key, Arc::new(entity));
    }

    pub fn remove(&self, entity: &EntityRef) -> Option<Arc<dyn Entity>> {
        self.entities.write().remove(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn entity(&self, repository: &str, id: &str) -> anyhow::Result<Option<Arc<dyn Entity>>> {
        let key = EntityRef::new(repository, id);
        Ok(self.entities.read().get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlob;

    #[test]
    fn test_property_child_navigation() {
        let files = Property::List(vec![
            Property::complex([("file", Property::blob(MemoryBlob::new(&b"a"[..])))]),
            Property::complex([("file", Property::scalar("not a blob"))]),
        ]);

        assert!(matches!(files.child("0").and_then(|p| p.child("file")), Some(Property::Blob(_))));
        assert!(matches!(files.child("1").and_then(|p| p.child("file")), Some(Property::Scalar(_))));
        assert!(files.child("2").is_none());
        assert!(files.child("x").is_none());
    }

    #[tokio::test]
    async fn test_memory_store_lookup() {
        let store = MemoryEntityStore::new();
        store.insert(Document::new("demo", "doc-1").with_blob(MemoryBlob::new(&b"abc"[..])));

        let found = store.entity("demo", "doc-1").await.unwrap().unwrap();
        assert_eq!(found.entity_ref(), EntityRef::new("demo", "doc-1"));
        assert_eq!(found.blobs().len(), 1);

        assert!(store.entity("demo", "doc-2").await.unwrap().is_none());
        assert!(store.entity("other", "doc-1").await.unwrap().is_none());
    }
}

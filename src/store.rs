use std::sync::Arc;

use hashbrown::HashMap;

/// A stored document together with the vector it was hashed under.
///
/// The vector is copied once at insert time, so unhashing on replace or
/// delete never depends on `Document::vector` returning the same data twice.
pub struct StoredDocument<D: ?Sized> {
    pub doc: Arc<D>,
    pub vector: Arc<[f64]>,
}

impl<D: ?Sized> Clone for StoredDocument<D> {
    fn clone(&self) -> Self {
        Self {
            doc: Arc::clone(&self.doc),
            vector: Arc::clone(&self.vector),
        }
    }
}

/// Authoritative id -> document mapping.
///
/// Not synchronized on its own; the index keeps it behind the same lock as
/// the LSH tables so the two never disagree.
pub struct DocumentStore<D: ?Sized> {
    docs: HashMap<Arc<str>, StoredDocument<D>>,
}

impl<D: ?Sized> Default for DocumentStore<D> {
    fn default() -> Self {
        Self {
            docs: HashMap::new(),
        }
    }
}

impl<D: ?Sized> DocumentStore<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `doc` under `id` with its hashed `vector`, returning the entry it
    /// replaced.
    pub fn insert(
        &mut self,
        id: Arc<str>,
        doc: Arc<D>,
        vector: Arc<[f64]>,
    ) -> Option<StoredDocument<D>> {
        self.docs.insert(id, StoredDocument { doc, vector })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<D>> {
        self.docs.get(id).map(|entry| &entry.doc)
    }

    pub fn entry(&self, id: &str) -> Option<&StoredDocument<D>> {
        self.docs.get(id)
    }

    /// The shared key for `id`, so callers can reuse one allocation across tables.
    pub fn key(&self, id: &str) -> Option<&Arc<str>> {
        self.docs.get_key_value(id).map(|(k, _)| k)
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredDocument<D>> {
        self.docs.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &StoredDocument<D>)> {
        self.docs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, VectorDocument};

    fn vector(v: &[f64]) -> Arc<[f64]> {
        Arc::from(v)
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut store: DocumentStore<dyn Document> = DocumentStore::new();
        let id: Arc<str> = Arc::from("doc_1");
        assert!(store
            .insert(
                Arc::clone(&id),
                Arc::new(VectorDocument::new("doc_1", vec![1.0])),
                vector(&[1.0]),
            )
            .is_none());
        let old = store
            .insert(
                Arc::clone(&id),
                Arc::new(VectorDocument::new("doc_1", vec![2.0])),
                vector(&[2.0]),
            )
            .unwrap();
        assert_eq!(old.doc.vector(), &[1.0]);
        assert_eq!(&*old.vector, &[1.0]);
        assert_eq!(store.get("doc_1").unwrap().vector(), &[2.0]);
        assert_eq!(&*store.entry("doc_1").unwrap().vector, &[2.0]);
        assert_eq!(store.len(), 1);

        assert!(store.remove("doc_1").is_some());
        assert!(store.remove("doc_1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_key_shares_allocation() {
        let mut store: DocumentStore<VectorDocument> = DocumentStore::new();
        let id: Arc<str> = Arc::from("a");
        store.insert(
            Arc::clone(&id),
            Arc::new(VectorDocument::new("a", vec![])),
            vector(&[]),
        );
        assert!(Arc::ptr_eq(store.key("a").unwrap(), &id));
        assert!(store.key("b").is_none());
    }
}

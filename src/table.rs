use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::hash::{BucketKey, HyperplaneSet};

/// One LSH hash table: a hyperplane set plus its buckets of document ids.
///
/// Every id lives in exactly one bucket, the one keyed by its current vector.
/// The table does not reconcile stale memberships; re-inserting an id under a
/// new vector requires removing it with the old vector first.
#[derive(Debug, Clone)]
pub struct HashTable {
    hyperplanes: HyperplaneSet,
    slot_size: f64,
    buckets: HashMap<BucketKey, HashSet<Arc<str>>>,
}

impl HashTable {
    pub fn new(hyperplanes: HyperplaneSet, slot_size: f64) -> Self {
        Self {
            hyperplanes,
            slot_size,
            buckets: HashMap::new(),
        }
    }

    pub fn bucket_key(&self, vector: &[f64]) -> BucketKey {
        self.hyperplanes.bucket_key(vector, self.slot_size)
    }

    /// Add `id` to the bucket for `vector`. Idempotent for an identical vector.
    pub fn insert(&mut self, vector: &[f64], id: &Arc<str>) {
        let key = self.bucket_key(vector);
        self.buckets.entry(key).or_default().insert(Arc::clone(id));
    }

    /// Remove `id` from the bucket for `vector`, dropping the bucket once empty.
    ///
    /// Returns whether the id was found there.
    pub fn remove(&mut self, vector: &[f64], id: &str) -> bool {
        let key = self.bucket_key(vector);
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return false;
        };
        let removed = bucket.remove(id);
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        removed
    }

    /// Ids sharing the exact bucket of `vector`, if any.
    pub fn query(&self, vector: &[f64]) -> Option<&HashSet<Arc<str>>> {
        self.buckets.get(&self.bucket_key(vector))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn bucket_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets.values().map(HashSet::len)
    }
}

use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::distance::DistanceMetric;
use crate::document::{Document, ResultDocument};
use crate::error::{KnnError, Result};
use crate::hash::HyperplaneSet;
use crate::lsh::LshIndex;
use crate::metrics::{MetricsCollector, MetricsSnapshot, QueryTimer};
use crate::store::DocumentStore;

/// Configuration for the KNN index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct IndexConfig {
    /// Expected length of every vector.
    pub vector_dimension: usize,
    /// Number of independent hash tables. More tables raise recall and cost.
    pub num_hash_tables: usize,
    /// Hyperplanes per table. More hyperplanes narrow buckets.
    pub num_hyperplanes: usize,
    /// Quantization width `w` of each projection. Larger slots coarsen buckets.
    /// For 512-dimensional vectors around `40` is a reasonable start.
    pub slot_size: f64,
    /// Metric for documents that do not supply their own distance.
    pub distance_metric: DistanceMetric,
    /// Optional RNG seed for reproducible hyperplanes.
    pub seed: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vector_dimension: 512,
            num_hash_tables: 10,
            num_hyperplanes: 10,
            slot_size: 40.0,
            distance_metric: DistanceMetric::Euclidean,
            seed: None,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.vector_dimension == 0 {
            return Err(KnnError::InvalidConfig(
                "vector_dimension must be > 0".into(),
            ));
        }
        if self.num_hash_tables == 0 {
            return Err(KnnError::InvalidConfig("num_hash_tables must be > 0".into()));
        }
        if self.num_hyperplanes == 0 {
            return Err(KnnError::InvalidConfig("num_hyperplanes must be > 0".into()));
        }
        if !self.slot_size.is_finite() || self.slot_size <= 0.0 {
            return Err(KnnError::InvalidConfig(format!(
                "slot_size must be finite and > 0, got {}",
                self.slot_size
            )));
        }
        Ok(())
    }
}

/// Aggregate statistics about the index.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub num_documents: usize,
    pub num_tables: usize,
    pub num_hyperplanes: usize,
    pub dimension: usize,
    pub total_buckets: usize,
    /// Bucket memberships across all tables; `num_documents * num_tables`
    /// whenever no write is in progress.
    pub total_entries: usize,
    pub avg_bucket_size: f64,
    pub max_bucket_size: usize,
    pub memory_estimate_bytes: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "KnnIndex {{ documents: {}, tables: {}, hyperplanes/table: {}, dim: {}, \
             buckets: {}, avg_bucket: {:.1}, max_bucket: {}, mem: ~{:.1}MB }}",
            self.num_documents,
            self.num_tables,
            self.num_hyperplanes,
            self.dimension,
            self.total_buckets,
            self.avg_bucket_size,
            self.max_bucket_size,
            self.memory_estimate_bytes as f64 / (1024.0 * 1024.0),
        )
    }
}

// ---------------------------------------------------------------------------
// Inner state (behind RwLock)
// ---------------------------------------------------------------------------

/// The LSH tables and the document store, only ever touched together.
struct IndexInner<D: ?Sized> {
    lsh: LshIndex,
    store: DocumentStore<D>,
}

impl<D: Document + ?Sized> IndexInner<D> {
    /// Insert or replace `doc`, hashed under the already validated `vector`.
    /// An existing entry is unhashed with its stored vector first.
    fn upsert(&mut self, doc: Arc<D>, vector: Arc<[f64]>) -> Result<()> {
        let id = match self.store.key(doc.id()) {
            Some(key) => Arc::clone(key),
            None => Arc::from(doc.id()),
        };
        if let Some(old) = self.store.entry(&id) {
            self.lsh.remove(&old.vector, &id)?;
        }
        self.lsh.insert(&vector, &id)?;
        self.store.insert(id, doc, vector);
        Ok(())
    }

    /// Fetch the stored vector, unhash it from every table, then drop the document.
    fn remove(&mut self, id: &str) -> Result<Option<Arc<D>>> {
        let Some(entry) = self.store.entry(id) else {
            return Ok(None);
        };
        self.lsh.remove(&entry.vector, id)?;
        Ok(self.store.remove(id).map(|entry| entry.doc))
    }
}

// ---------------------------------------------------------------------------
// KnnIndex
// ---------------------------------------------------------------------------

/// Approximate k-nearest-neighbor index over documents.
///
/// Candidates come from LSH bucket collisions and are re-ranked by exact
/// distance. Thread-safe: queries and lookups share a `parking_lot::RwLock`,
/// adds and deletes take it exclusively, so a write is never partially
/// visible to a reader.
pub struct KnnIndex<D: ?Sized = dyn Document> {
    inner: RwLock<IndexInner<D>>,
    config: IndexConfig,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<D: Document + ?Sized> std::fmt::Debug for KnnIndex<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("KnnIndex")
            .field("num_documents", &inner.store.len())
            .field("config", &self.config)
            .field("has_metrics", &self.metrics.is_some())
            .finish()
    }
}

impl KnnIndex {
    /// Start building an index with the builder pattern.
    pub fn builder() -> KnnIndexBuilder {
        KnnIndexBuilder::new()
    }
}

impl<D: Document + ?Sized> KnnIndex<D> {
    /// Create an index directly from an [`IndexConfig`].
    pub fn new(config: IndexConfig) -> Result<Self> {
        Self::from_parts(config, None, false)
    }

    fn from_parts(
        config: IndexConfig,
        hyperplanes: Option<Vec<HyperplaneSet>>,
        enable_metrics: bool,
    ) -> Result<Self> {
        config.validate()?;

        let lsh = match hyperplanes {
            Some(sets) => {
                if sets.len() != config.num_hash_tables {
                    return Err(KnnError::InvalidConfig(format!(
                        "expected {} hyperplane sets, got {}",
                        config.num_hash_tables,
                        sets.len()
                    )));
                }
                if let Some(bad) = sets.iter().find(|s| {
                    s.dim() != config.vector_dimension || s.len() != config.num_hyperplanes
                }) {
                    return Err(KnnError::InvalidConfig(format!(
                        "hyperplane set shape {}x{} does not match configured {}x{}",
                        bad.len(),
                        bad.dim(),
                        config.num_hyperplanes,
                        config.vector_dimension
                    )));
                }
                LshIndex::from_hyperplane_sets(sets, config.slot_size)?
            }
            None => {
                let mut rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                LshIndex::new(
                    config.vector_dimension,
                    config.num_hash_tables,
                    config.num_hyperplanes,
                    config.slot_size,
                    &mut rng,
                )
            }
        };

        debug!(
            dim = config.vector_dimension,
            tables = config.num_hash_tables,
            hyperplanes = config.num_hyperplanes,
            slot_size = config.slot_size,
            seeded = config.seed.is_some(),
            "built knn index"
        );

        let metrics = enable_metrics.then(|| Arc::new(MetricsCollector::new()));

        Ok(Self {
            inner: RwLock::new(IndexInner {
                lsh,
                store: DocumentStore::new(),
            }),
            config,
            metrics,
        })
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Add a document, replacing any stored document with the same id.
    pub fn add(&self, doc: Arc<D>) -> Result<()> {
        let vector = self.validate_document(&doc)?;

        let mut inner = self.inner.write();
        inner.upsert(Arc::clone(&doc), vector)?;
        drop(inner);

        trace!(id = doc.id(), "added document");
        if let Some(ref m) = self.metrics {
            m.record_adds(1);
        }
        Ok(())
    }

    /// Add many documents under a single write lock.
    ///
    /// Every document is validated first, so either all are added or none.
    pub fn add_batch(&self, docs: impl IntoIterator<Item = Arc<D>>) -> Result<()> {
        let docs = docs
            .into_iter()
            .map(|doc| {
                let vector = self.validate_document(&doc)?;
                Ok((doc, vector))
            })
            .collect::<Result<Vec<_>>>()?;

        let count = docs.len();
        let mut inner = self.inner.write();
        for (doc, vector) in docs {
            inner.upsert(doc, vector)?;
        }
        drop(inner);

        trace!(count, "added document batch");
        if let Some(ref m) = self.metrics {
            m.record_adds(count as u64);
        }
        Ok(())
    }

    /// Check `doc` and copy out the vector it will be hashed under.
    fn validate_document(&self, doc: &D) -> Result<Arc<[f64]>> {
        if doc.id().is_empty() {
            return Err(KnnError::invalid_input("document id must not be empty"));
        }
        let vector: Arc<[f64]> = Arc::from(doc.vector());
        if vector.is_empty() {
            return Err(KnnError::invalid_input(format!(
                "document {} has an empty vector",
                doc.id()
            )));
        }
        self.check_vector(&vector)?;
        Ok(vector)
    }

    /// Length must match the configuration and every coordinate must be finite.
    fn check_vector(&self, vector: &[f64]) -> Result<()> {
        if vector.len() != self.config.vector_dimension {
            return Err(KnnError::DimensionMismatch {
                expected: self.config.vector_dimension,
                got: vector.len(),
            });
        }
        if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
            return Err(KnnError::invalid_input(format!(
                "vector has a non-finite value at index {pos}"
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Query
    // ------------------------------------------------------------------

    /// Find up to `k` approximate nearest neighbors of `vector`.
    ///
    /// Returns results sorted by ascending distance (closest first), ties
    /// ordered by id. Candidates whose distance cannot be computed are left out.
    pub fn query(&self, vector: &[f64], k: usize) -> Result<Vec<ResultDocument<D>>> {
        if vector.is_empty() {
            return Err(KnnError::invalid_input("query vector must not be empty"));
        }
        if k == 0 {
            return Err(KnnError::invalid_input("k must be greater than 0"));
        }
        self.check_vector(vector)?;

        let timer = self.metrics.as_ref().map(|_| QueryTimer::new());
        let inner = self.inner.read();

        let candidates = inner.lsh.query(vector)?;
        let mut skipped = 0u64;
        let mut results: Vec<ResultDocument<D>> = candidates
            .ids
            .iter()
            .filter_map(|id| {
                // Absent ids are tolerated; the store is the source of truth.
                let entry = inner.store.entry(id)?;
                match self.distance(&entry.doc, &entry.vector, vector) {
                    Ok(distance) => Some(ResultDocument {
                        document: Arc::clone(&entry.doc),
                        distance,
                    }),
                    Err(err) => {
                        debug!(id = &**id, error = %err, "skipping candidate");
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();
        drop(inner);

        let num_candidates = candidates.ids.len();
        results.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.document.id().cmp(b.document.id()))
        });
        results.truncate(k);

        debug!(
            candidates = num_candidates,
            skipped,
            returned = results.len(),
            "knn query"
        );

        if let Some(ref m) = self.metrics {
            m.record_buckets(candidates.bucket_hits, candidates.bucket_misses);
            m.record_skipped(skipped);
            if let Some(t) = timer {
                m.record_query(num_candidates as u64, t.elapsed_ns());
            }
        }

        Ok(results)
    }

    fn distance(&self, doc: &D, stored: &[f64], query: &[f64]) -> Result<f64> {
        match doc.distance_to(query) {
            Some(custom) => custom,
            None => self.config.distance_metric.compute(stored, query),
        }
    }

    // ------------------------------------------------------------------
    // Removal / lookup
    // ------------------------------------------------------------------

    /// Delete a document by id.
    ///
    /// Returns `true` when a document was removed. Unknown ids are not an error.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if id.is_empty() {
            return Err(KnnError::invalid_input("document id must not be empty"));
        }

        let removed = self.inner.write().remove(id)?.is_some();

        trace!(id, removed, "delete");
        if removed {
            if let Some(ref m) = self.metrics {
                m.record_delete();
            }
        }
        Ok(removed)
    }

    /// Fetch a stored document. `Ok(None)` when the id is unknown.
    pub fn get(&self, id: &str) -> Result<Option<Arc<D>>> {
        if id.is_empty() {
            return Err(KnnError::invalid_input("document id must not be empty"));
        }
        Ok(self.inner.read().store.get(id).map(Arc::clone))
    }

    /// Check whether a document id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().store.contains(id)
    }

    // ------------------------------------------------------------------
    // Stats / metrics
    // ------------------------------------------------------------------

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.read().store.len()
    }

    /// True when the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.inner.read().store.is_empty()
    }

    /// Compute aggregate statistics about the index.
    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        let tables = inner.lsh.tables();

        let total_buckets: usize = tables.iter().map(|t| t.num_buckets()).sum();
        let total_entries: usize = tables.iter().flat_map(|t| t.bucket_sizes()).sum();
        let max_bucket_size = tables
            .iter()
            .flat_map(|t| t.bucket_sizes())
            .max()
            .unwrap_or(0);

        let avg_bucket_size = if total_buckets > 0 {
            total_entries as f64 / total_buckets as f64
        } else {
            0.0
        };

        let c = &self.config;
        let f64_size = std::mem::size_of::<f64>();
        let id_bytes: usize = inner.store.iter().map(|(id, _)| id.len()).sum();
        let doc_mem = inner.store.len()
            * (c.vector_dimension * f64_size + 2 * std::mem::size_of::<Arc<str>>())
            + id_bytes;
        let table_mem = total_buckets * (c.num_hyperplanes * std::mem::size_of::<i64>() + 48);
        let entry_mem = total_entries * std::mem::size_of::<Arc<str>>();
        let proj_mem = c.num_hash_tables * c.num_hyperplanes * c.vector_dimension * f64_size;

        IndexStats {
            num_documents: inner.store.len(),
            num_tables: c.num_hash_tables,
            num_hyperplanes: c.num_hyperplanes,
            dimension: c.vector_dimension,
            total_buckets,
            total_entries,
            avg_bucket_size,
            max_bucket_size,
            memory_estimate_bytes: doc_mem + table_mem + entry_mem + proj_mem,
        }
    }

    /// Snapshot of runtime metrics (`None` if metrics were not enabled).
    pub fn metrics(&self) -> Option<MetricsSnapshot> {
        self.metrics.as_ref().map(|m| m.snapshot())
    }

    /// Reset metrics counters.
    pub fn reset_metrics(&self) {
        if let Some(ref m) = self.metrics {
            m.reset();
        }
    }

    /// Remove all documents from the index (hyperplanes are preserved).
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.lsh.clear();
        inner.store.clear();
    }

    /// The configuration the index was built with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Parallel batch ops (behind `parallel` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "parallel")]
impl<D: Document + ?Sized> KnnIndex<D> {
    /// Run many queries in parallel; readers share the lock.
    pub fn par_query_batch(
        &self,
        queries: &[Vec<f64>],
        k: usize,
    ) -> Result<Vec<Vec<ResultDocument<D>>>> {
        use rayon::prelude::*;

        queries.par_iter().map(|q| self.query(q, k)).collect()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent builder for [`KnnIndex`].
#[derive(Debug, Default)]
pub struct KnnIndexBuilder {
    config: IndexConfig,
    hyperplanes: Option<Vec<HyperplaneSet>>,
    enable_metrics: bool,
}

impl KnnIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn vector_dimension(mut self, dim: usize) -> Self {
        self.config.vector_dimension = dim;
        self
    }

    pub fn num_hash_tables(mut self, n: usize) -> Self {
        self.config.num_hash_tables = n;
        self
    }

    pub fn num_hyperplanes(mut self, n: usize) -> Self {
        self.config.num_hyperplanes = n;
        self
    }

    pub fn slot_size(mut self, w: f64) -> Self {
        self.config.slot_size = w;
        self
    }

    pub fn distance_metric(mut self, m: DistanceMetric) -> Self {
        self.config.distance_metric = m;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Use explicit hyperplanes instead of random ones, one set per table.
    ///
    /// The sets must match the configured table count, hyperplane count and
    /// dimension.
    pub fn hyperplanes(mut self, sets: Vec<HyperplaneSet>) -> Self {
        self.hyperplanes = Some(sets);
        self
    }

    pub fn enable_metrics(mut self) -> Self {
        self.enable_metrics = true;
        self
    }

    /// Build the index, returning an error on invalid configuration.
    pub fn build<D: Document + ?Sized>(self) -> Result<KnnIndex<D>> {
        KnnIndex::from_parts(self.config, self.hyperplanes, self.enable_metrics)
    }
}

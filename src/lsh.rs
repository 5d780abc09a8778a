use std::sync::Arc;

use hashbrown::HashSet;
use rand::Rng;

use crate::error::{KnnError, Result};
use crate::hash::HyperplaneSet;
use crate::table::HashTable;

/// Multi-table LSH index over document ids.
///
/// Tables share dimension and slot size but hash with independent hyperplanes,
/// so a near neighbor missed by one table can still be found through another.
/// An id is present in every table or in none.
#[derive(Debug, Clone)]
pub struct LshIndex {
    tables: Vec<HashTable>,
    dim: usize,
}

/// Candidate ids for one query, with bucket hit counts for metrics.
#[derive(Debug, Default)]
pub struct Candidates {
    /// Deduplicated ids in first-seen order (table order, then bucket order).
    pub ids: Vec<Arc<str>>,
    pub bucket_hits: u64,
    pub bucket_misses: u64,
}

impl LshIndex {
    /// Build `num_tables` tables of `num_hyperplanes` random hyperplanes each.
    pub fn new(
        dim: usize,
        num_tables: usize,
        num_hyperplanes: usize,
        slot_size: f64,
        rng: &mut impl Rng,
    ) -> Self {
        let tables = (0..num_tables)
            .map(|_| {
                let planes = HyperplaneSet::new(dim, num_hyperplanes, &mut *rng);
                HashTable::new(planes, slot_size)
            })
            .collect();
        Self { tables, dim }
    }

    /// Build from explicit hyperplane sets, one table per set.
    pub fn from_hyperplane_sets(sets: Vec<HyperplaneSet>, slot_size: f64) -> Result<Self> {
        let dim = match sets.first() {
            Some(first) => first.dim(),
            None => {
                return Err(KnnError::InvalidConfig(
                    "at least one hash table is required".into(),
                ))
            }
        };
        if let Some(bad) = sets.iter().find(|s| s.dim() != dim) {
            return Err(KnnError::InvalidConfig(format!(
                "hyperplane sets must share one dimension: expected {dim}, got {}",
                bad.dim()
            )));
        }
        let tables = sets
            .into_iter()
            .map(|set| HashTable::new(set, slot_size))
            .collect();
        Ok(Self { tables, dim })
    }

    /// Insert `id` under `vector` into every table.
    ///
    /// The vector length is checked before any table is touched, so a failed
    /// insert leaves no partial membership.
    pub fn insert(&mut self, vector: &[f64], id: &Arc<str>) -> Result<()> {
        self.check_dim(vector)?;
        for table in &mut self.tables {
            table.insert(vector, id);
        }
        Ok(())
    }

    /// Remove `id` from every table. `vector` must be the one it was inserted with.
    pub fn remove(&mut self, vector: &[f64], id: &str) -> Result<()> {
        self.check_dim(vector)?;
        for table in &mut self.tables {
            table.remove(vector, id);
        }
        Ok(())
    }

    /// Union of the matching bucket from every table, duplicates collapsed.
    pub fn query(&self, vector: &[f64]) -> Result<Candidates> {
        self.check_dim(vector)?;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Candidates::default();
        for table in &self.tables {
            match table.query(vector) {
                Some(bucket) => {
                    out.bucket_hits += 1;
                    for id in bucket {
                        if seen.insert(&**id) {
                            out.ids.push(Arc::clone(id));
                        }
                    }
                }
                None => out.bucket_misses += 1,
            }
        }
        Ok(out)
    }

    pub fn clear(&mut self) {
        for table in &mut self.tables {
            table.clear();
        }
    }

    pub fn tables(&self) -> &[HashTable] {
        &self.tables
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check_dim(&self, vector: &[f64]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(KnnError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        Ok(())
    }
}

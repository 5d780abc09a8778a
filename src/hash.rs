use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{KnnError, Result};

/// Quantized projection coordinates identifying one bucket of a hash table.
///
/// Holds `floor((v · p_i) / w)` for every hyperplane `p_i` of the set that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey(Box<[i64]>);

impl BucketKey {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

impl From<Vec<i64>> for BucketKey {
    fn from(coords: Vec<i64>) -> Self {
        Self(coords.into_boxed_slice())
    }
}

/// The random projection family owned by one hash table.
///
/// Each hyperplane is a Gaussian vector; coordinates are drawn from a standard
/// normal distribution and are not normalized, so their magnitude interacts
/// with the slot size used in [`HyperplaneSet::bucket_key`].
#[derive(Debug, Clone)]
pub struct HyperplaneSet {
    hyperplanes: Vec<Array1<f64>>,
    dim: usize,
}

impl HyperplaneSet {
    /// Draw `count` random hyperplanes of dimension `dim`.
    pub fn new(dim: usize, count: usize, rng: &mut impl Rng) -> Self {
        let hyperplanes = (0..count)
            .map(|_| {
                let v: Vec<f64> = (0..dim).map(|_| rng.sample(StandardNormal)).collect();
                Array1::from_vec(v)
            })
            .collect();
        Self { hyperplanes, dim }
    }

    /// Build a set from explicit hyperplanes, e.g. ones trained or persisted elsewhere.
    pub fn from_hyperplanes(hyperplanes: Vec<Vec<f64>>) -> Result<Self> {
        let dim = match hyperplanes.first() {
            Some(first) if !first.is_empty() => first.len(),
            Some(_) => return Err(KnnError::InvalidConfig("hyperplane must not be empty".into())),
            None => {
                return Err(KnnError::InvalidConfig(
                    "at least one hyperplane is required".into(),
                ))
            }
        };
        if let Some(bad) = hyperplanes.iter().find(|h| h.len() != dim) {
            return Err(KnnError::InvalidConfig(format!(
                "hyperplanes must share one dimension: expected {dim}, got {}",
                bad.len()
            )));
        }
        Ok(Self {
            hyperplanes: hyperplanes.into_iter().map(Array1::from_vec).collect(),
            dim,
        })
    }

    /// Quantize `vector` against every hyperplane with slot width `slot_size`.
    ///
    /// `vector.len()` must equal [`HyperplaneSet::dim`]; callers validate this.
    pub fn bucket_key(&self, vector: &[f64], slot_size: f64) -> BucketKey {
        debug_assert_eq!(vector.len(), self.dim);
        let v = ArrayView1::from(vector);
        let coords = self
            .hyperplanes
            .iter()
            .map(|p| (v.dot(p) / slot_size).floor() as i64)
            .collect::<Vec<_>>();
        BucketKey::from(coords)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of hyperplanes (coordinates per bucket key).
    pub fn len(&self) -> usize {
        self.hyperplanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hyperplanes.is_empty()
    }
}

use ndarray::ArrayView1;

use crate::error::{KnnError, Result};

/// Distance metric applied to candidates whose document does not supply its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance. Range [0, inf).
    #[default]
    Euclidean,
    /// Cosine distance: 1 - cos(a, b). Range [0, 2]. 0 = identical direction.
    Cosine,
    /// Negative dot product (so smaller = more similar). Range (-inf, inf).
    DotProduct,
}

impl DistanceMetric {
    /// Compute the distance between two vectors using this metric.
    ///
    /// Fails with [`KnnError::DimensionMismatch`] when the lengths differ.
    pub fn compute(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        if a.len() != b.len() {
            return Err(KnnError::DimensionMismatch {
                expected: a.len(),
                got: b.len(),
            });
        }
        let (a, b) = (ArrayView1::from(a), ArrayView1::from(b));
        Ok(match self {
            DistanceMetric::Euclidean => euclidean_distance(&a, &b),
            DistanceMetric::Cosine => cosine_distance(&a, &b),
            DistanceMetric::DotProduct => -a.dot(&b),
        })
    }
}

/// Euclidean (L2) distance between two vectors of equal length.
pub fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Cosine distance: 1 - cos(a, b). Zero vectors are treated as orthogonal.
pub fn cosine_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    let dot = a.dot(b);
    let denom = a.dot(a).sqrt() * b.dot(b).sqrt();
    if denom < f64::EPSILON {
        return 1.0;
    }
    1.0 - (dot / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean() {
        let d = DistanceMetric::Euclidean
            .compute(&[0.0, 0.0], &[3.0, 4.0])
            .unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean_is_default() {
        assert_eq!(DistanceMetric::default(), DistanceMetric::Euclidean);
    }

    #[test]
    fn test_cosine_identical() {
        let d = DistanceMetric::Cosine
            .compute(&[1.0, 0.0, 0.0], &[2.0, 0.0, 0.0])
            .unwrap();
        assert!(d.abs() < 1e-12);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let d = DistanceMetric::Cosine.compute(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let d = DistanceMetric::Cosine.compute(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_dot_product_negated() {
        let d = DistanceMetric::DotProduct
            .compute(&[1.0, 2.0], &[3.0, 4.0])
            .unwrap();
        assert_eq!(d, -11.0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = DistanceMetric::Euclidean
            .compute(&[1.0, 2.0, 3.0], &[1.0])
            .unwrap_err();
        assert_eq!(err, KnnError::DimensionMismatch { expected: 3, got: 1 });
    }
}

//! The document capability stored by the index.

use std::sync::Arc;

use crate::error::Result;

/// A document that can be indexed.
///
/// The index only needs an identifier and a vector. A document may also carry
/// its own metric by overriding [`Document::distance_to`]; otherwise the
/// index ranks it with the configured [`DistanceMetric`](crate::DistanceMetric).
pub trait Document: Send + Sync {
    /// Stable, non-empty identifier, unique within one index.
    fn id(&self) -> &str;

    /// The document's vector. Its length must equal the index dimension.
    fn vector(&self) -> &[f64];

    /// Custom distance from this document to `query`.
    ///
    /// `None` means the document has no metric of its own. Returning
    /// `Some(Err(_))` drops the document from that query's results.
    fn distance_to(&self, _query: &[f64]) -> Option<Result<f64>> {
        None
    }
}

/// Plain id + vector document.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    pub id: String,
    pub vector: Vec<f64>,
}

impl VectorDocument {
    pub fn new(id: impl Into<String>, vector: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            vector,
        }
    }
}

impl Document for VectorDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn vector(&self) -> &[f64] {
        &self.vector
    }
}

/// A single nearest-neighbor result.
pub struct ResultDocument<D: ?Sized = dyn Document> {
    /// The stored document.
    pub document: Arc<D>,
    /// Distance from the query vector (lower is closer).
    pub distance: f64,
}

impl<D: ?Sized> Clone for ResultDocument<D> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            distance: self.distance,
        }
    }
}

impl<D: Document + ?Sized> std::fmt::Debug for ResultDocument<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultDocument")
            .field("id", &self.document.id())
            .field("distance", &self.distance)
            .finish()
    }
}

impl<D: Document + ?Sized> ResultDocument<D> {
    /// Shorthand for `self.document.id()`.
    pub fn id(&self) -> &str {
        self.document.id()
    }
}

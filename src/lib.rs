//! # knn_lsh
//!
//! An in-memory approximate k-nearest-neighbor index over documents, using
//! random-hyperplane Locality-Sensitive Hashing (LSH) to find candidates and
//! exact distances to rank them.
//!
//! Each hash table projects a vector onto a few Gaussian hyperplanes and
//! quantizes every projection into slots of width `slot_size`; vectors with
//! the same slot coordinates share a bucket. Several independent tables are
//! queried and their buckets unioned, trading memory for recall.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use knn_lsh::{KnnIndex, VectorDocument};
//!
//! let index: KnnIndex = KnnIndex::builder()
//!     .vector_dimension(5)
//!     .num_hash_tables(3)
//!     .num_hyperplanes(2)
//!     .slot_size(5.0)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! index
//!     .add(Arc::new(VectorDocument::new("image_1.jpeg", vec![0.0, 0.0, 0.0, 0.0, 0.0])))
//!     .unwrap();
//!
//! let results = index.query(&[0.0, 0.0, 0.0, 0.0, 0.0], 2).unwrap();
//! for r in &results {
//!     println!("id={} dist={:.4}", r.id(), r.distance);
//! }
//! assert_eq!(results[0].id(), "image_1.jpeg");
//! ```
//!
//! ## Feature flags
//!
//! | Flag       | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Parallel batch query via rayon                           |
//! | `serde`    | `Serialize`/`Deserialize` for `IndexConfig`, `DistanceMetric` |
//! | `full`     | Enables `parallel` + `serde`                             |

pub mod distance;
pub mod document;
pub mod error;
pub mod hash;
pub mod index;
pub mod lsh;
pub mod metrics;
pub mod store;
pub mod table;

// Re-exports for convenience.
pub use distance::DistanceMetric;
pub use document::{Document, ResultDocument, VectorDocument};
pub use error::{KnnError, Result};
pub use hash::{BucketKey, HyperplaneSet};
pub use index::{IndexConfig, IndexStats, KnnIndex, KnnIndexBuilder};
pub use metrics::{MetricsCollector, MetricsSnapshot};

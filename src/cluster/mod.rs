//! Clustering and matching of embedding vectors.
//!
//! The input is always a slice of equal-length `f32` rows, one per item (for
//! example one per detected face). Rows are never modified.
//!
//! ## Algorithms (implemented)
//!
//! ### DBSCAN
//!
//! Density-based clustering that discovers the number of groups by itself and
//! leaves outliers aside as noise. Neighborhoods are defined by a similarity
//! threshold rather than a distance radius, which suits embeddings compared by
//! angle. Noise carries the reserved id one past the last cluster, so labels
//! form a partition without `Option`.
//!
//! ### kNN matching
//!
//! Labels a new row by majority vote of its `k` most similar rows in a
//! labelled gallery, or reports it as unknown when nothing is similar enough.
//! Candidates come from a [`KdTree`] over the normalized gallery, with a full
//! scan available as the exact reference.
//!
//! ## Similarity
//!
//! Both algorithms score pairs through the [`Similarity`] trait. [`Cosine`]
//! is the default; it refuses zero and non-finite rows, since those come from
//! a failed upstream extraction and would otherwise poison every comparison.
//!
//! ## Usage
//!
//! ```rust
//! use huddle::cluster::{Clustering, Dbscan, KnnClassifier};
//!
//! let data = vec![
//!     vec![1.0, 0.0],
//!     vec![0.99, 0.05],
//!     vec![0.0, 1.0],
//!     vec![0.05, 0.99],
//! ];
//!
//! let assignment = Dbscan::new(0.9, 2).cluster(&data).unwrap();
//! assert_eq!(assignment.cluster_count(), 2);
//! assert_eq!(assignment.labels(), &[0, 0, 1, 1]);
//!
//! // Same thing through the generic trait.
//! let labels = Dbscan::new(0.9, 2).fit_predict(&data).unwrap();
//! assert_eq!(labels, vec![0, 0, 1, 1]);
//!
//! // Name new rows from the clustered ones.
//! let mut knn = KnnClassifier::new(1, 0.9);
//! knn.fit(&data, assignment.labels()).unwrap();
//! let p = knn.predict(&[0.02, 1.0]).unwrap().unwrap();
//! assert_eq!(p.label, 1);
//! ```

mod assignment;
mod dbscan;
mod kdtree;
mod knn;
mod neighbors;
mod similarity;
mod traits;
pub mod util;

pub use assignment::ClusterAssignment;
pub use dbscan::{Dbscan, DbscanParams};
pub use kdtree::{KdTree, Neighbor};
pub use knn::{GallerySearch, KnnClassifier, Prediction};
pub use neighbors::NeighborStrategy;
pub use similarity::{cosine_similarity, Cosine};
pub use traits::{Clustering, Similarity};

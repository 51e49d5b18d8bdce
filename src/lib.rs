//! Density clustering for embedding vectors.
//!
//! `huddle` groups fixed-length embeddings (typically one per detected face)
//! by mutual similarity, and matches new embeddings against labelled ones.
//!
//! The primary public API is under [`cluster`], which provides:
//! - DBSCAN over a similarity threshold, with noise absorption and a reserved noise id
//! - kNN matching with an "unknown" threshold, backed by a KD-tree gallery index
//! - cosine similarity that rejects degenerate vectors

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;

pub use cluster::{
    cosine_similarity, ClusterAssignment, Clustering, Cosine, Dbscan, DbscanParams,
    GallerySearch, KdTree, KnnClassifier, Neighbor, NeighborStrategy, Prediction, Similarity,
};
pub use error::{Error, ErrorKind, Result};

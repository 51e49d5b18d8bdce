use std::ops::RangeInclusive;

use crate::error::Result;

/// Common interface for hard clustering algorithms (one label per point).
pub trait Clustering {
    /// Fit the model (if needed) and return one cluster label per input point.
    ///
    /// Points that belong to no cluster carry the algorithm's noise label.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>>;

    /// The configured number of clusters (if applicable).
    ///
    /// For algorithms that discover the number of clusters dynamically (e.g. DBSCAN),
    /// this returns 0.
    fn n_clusters(&self) -> usize;
}

/// A pairwise similarity score over equal-length vectors.
///
/// Higher means more alike. Implementations must be pure and symmetric:
/// `similarity(a, b) == similarity(b, a)`, no interior state.
pub trait Similarity: Send + Sync {
    /// Score `a` against `b`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyVector`](crate::Error::EmptyVector) /
    ///   [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) for malformed input.
    /// - [`Error::DegenerateVector`](crate::Error::DegenerateVector) when a vector cannot
    ///   be scored.
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32>;

    /// Scores this metric can produce, bounds included.
    ///
    /// Thresholds compared against the metric, such as DBSCAN's `eps`, must
    /// lie in this range. The default is `[-1, 1]`, the range of cosine
    /// similarity; metrics on another scale (a negated distance, say) should
    /// override it.
    fn range(&self) -> RangeInclusive<f32> {
        -1.0..=1.0
    }
}

impl<S: Similarity + ?Sized> Similarity for &S {
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        (**self).similarity(a, b)
    }

    fn range(&self) -> RangeInclusive<f32> {
        (**self).range()
    }
}

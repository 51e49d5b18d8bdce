//! k-nearest-neighbor matching against a labelled gallery of embeddings.
//!
//! Used to put a name on a new face: the `k` gallery entries most similar to
//! the query, among those scoring at least `threshold`, vote on a label. A
//! query with no entry at or above `threshold` is reported as unknown.
//!
//! Candidates come from a [`KdTree`] over the L2-normalized gallery by
//! default, or from a full scan ([`GallerySearch::Exhaustive`]). The tree
//! ranks by angle, so the two agree for [`Cosine`] and any metric that orders
//! pairs the same way.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::kdtree::KdTree;
use super::similarity::Cosine;
use super::traits::Similarity;
use super::util;
use crate::error::{Error, Result};

/// Widens the tree's search radius past the threshold so rounding in the
/// distance never drops an entry the metric would accept.
const RADIUS_SLACK: f32 = 1e-4;

/// Outcome of a successful match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Winning label.
    pub label: usize,
    /// Best similarity among the neighbors that voted for `label`.
    pub similarity: f32,
    /// Number of neighbors that voted for `label`.
    pub votes: usize,
}

/// Where [`KnnClassifier::predict`] gets its candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GallerySearch {
    /// Bounded k-nearest search in a KD-tree over the normalized gallery.
    #[default]
    KdTree,
    /// Score every gallery entry with the metric.
    Exhaustive,
}

/// kNN classifier over a fixed gallery.
#[derive(Debug, Clone)]
pub struct KnnClassifier<S = Cosine> {
    k: usize,
    threshold: f32,
    metric: S,
    search: GallerySearch,
    gallery: Vec<Vec<f32>>,
    labels: Vec<usize>,
    index: KdTree,
}

impl KnnClassifier<Cosine> {
    /// Create an empty classifier using cosine similarity.
    ///
    /// * `k` - Number of neighbors that vote.
    /// * `threshold` - Minimum similarity for a gallery entry to vote; a query
    ///   with no such entry is unknown.
    pub fn new(k: usize, threshold: f32) -> Self {
        Self {
            k,
            threshold,
            metric: Cosine,
            search: GallerySearch::default(),
            gallery: Vec::new(),
            labels: Vec::new(),
            index: KdTree::new(),
        }
    }
}

impl<S: Similarity> KnnClassifier<S> {
    /// Replace the similarity metric. Any fitted gallery is kept.
    ///
    /// Switches to [`GallerySearch::Exhaustive`], since the tree's ordering
    /// only holds for cosine-like metrics. Use [`with_search`](Self::with_search)
    /// afterwards to opt back in.
    pub fn with_metric<T: Similarity>(self, metric: T) -> KnnClassifier<T> {
        KnnClassifier {
            k: self.k,
            threshold: self.threshold,
            metric,
            search: GallerySearch::Exhaustive,
            gallery: self.gallery,
            labels: self.labels,
            index: self.index,
        }
    }

    /// Choose the candidate source. Can be changed before or after `fit`.
    pub fn with_search(mut self, search: GallerySearch) -> Self {
        self.search = search;
        self
    }

    pub fn search(&self) -> GallerySearch {
        self.search
    }

    /// Number of gallery entries.
    pub fn len(&self) -> usize {
        self.gallery.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gallery.is_empty()
    }

    /// Replace the gallery with `embeddings`, labelled by `labels`.
    ///
    /// Every embedding is checked against itself, so degenerate vectors are
    /// rejected here rather than at query time. On error the previous gallery
    /// is left as it was.
    pub fn fit(&mut self, embeddings: &[Vec<f32>], labels: &[usize]) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if !self.threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "threshold",
                message: "must be finite",
            });
        }
        if embeddings.len() != labels.len() {
            return Err(Error::LabelCountMismatch {
                embeddings: embeddings.len(),
                labels: labels.len(),
            });
        }
        util::check_dimensions(embeddings)?;

        let mut index = KdTree::new();
        for e in embeddings {
            self.metric.similarity(e, e)?;
            let mut unit = e.clone();
            util::normalize(&mut unit);
            index.insert(&unit)?;
        }

        self.gallery = embeddings.to_vec();
        self.labels = labels.to_vec();
        self.index = index;
        tracing::debug!(
            entries = self.gallery.len(),
            k = self.k,
            search = ?self.search,
            "knn gallery fitted"
        );
        Ok(())
    }

    /// Label of the closest match, or `None` if nothing is similar enough.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] before [`fit`](Self::fit),
    /// [`Error::DimensionMismatch`] when the query does not match the gallery,
    /// plus whatever the metric reports for a degenerate query.
    pub fn predict(&self, query: &[f32]) -> Result<Option<Prediction>> {
        if self.gallery.is_empty() {
            return Err(Error::EmptyInput);
        }
        if query.len() != self.index.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.index.dim(),
                found: query.len(),
            });
        }
        // Reject a degenerate query even when no candidate would be scored.
        self.metric.similarity(query, query)?;

        let scored = match self.search {
            GallerySearch::KdTree => self.tree_candidates(query)?,
            GallerySearch::Exhaustive => self.scan(query)?,
        };
        if scored.is_empty() {
            tracing::trace!(threshold = self.threshold, "no match above threshold");
            return Ok(None);
        }

        // label -> (votes, summed similarity, best similarity, first rank)
        let mut tally: HashMap<usize, (usize, f32, f32, usize)> = HashMap::new();
        for (rank, &(i, s)) in scored.iter().enumerate() {
            let entry = tally.entry(self.labels[i]).or_insert((0, 0.0, s, rank));
            entry.0 += 1;
            entry.1 += s;
        }

        let winner = tally
            .into_iter()
            .max_by(|a, b| {
                let (va, sa, _, ra) = a.1;
                let (vb, sb, _, rb) = b.1;
                va.cmp(&vb)
                    .then(sa.total_cmp(&sb))
                    .then(rb.cmp(&ra))
            })
            .map(|(label, (votes, _, similarity, _))| Prediction {
                label,
                similarity,
                votes,
            });
        Ok(winner)
    }

    /// [`predict`](Self::predict) for each query, in order.
    pub fn predict_batch(&self, queries: &[Vec<f32>]) -> Result<Vec<Option<Prediction>>> {
        queries.iter().map(|q| self.predict(q)).collect()
    }

    /// Every entry at or above the threshold, most similar first, cut to `k`.
    fn scan(&self, query: &[f32]) -> Result<Vec<(usize, f32)>> {
        let mut scored = Vec::new();
        for (i, g) in self.gallery.iter().enumerate() {
            let s = self.metric.similarity(query, g)?;
            if s >= self.threshold {
                scored.push((i, s));
            }
        }
        Ok(self.rank(scored))
    }

    /// The `k` nearest tree entries, rescored with the metric.
    fn tree_candidates(&self, query: &[f32]) -> Result<Vec<(usize, f32)>> {
        let mut unit = query.to_vec();
        util::normalize(&mut unit);
        // On unit vectors |a - b|² = 2 - 2 cos(a, b).
        let radius = (2.0 - 2.0 * self.threshold).max(0.0) + RADIUS_SLACK;

        let mut scored = Vec::new();
        for hit in self.index.nearest(&unit, self.k, radius)? {
            let s = self.metric.similarity(query, &self.gallery[hit.index])?;
            if s >= self.threshold {
                scored.push((hit.index, s));
            }
        }
        Ok(self.rank(scored))
    }

    fn rank(&self, mut scored: Vec<(usize, f32)>) -> Vec<(usize, f32)> {
        // Equal scores keep gallery order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(self.k);
        scored
    }
}

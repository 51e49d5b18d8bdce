//! DBSCAN over embedding vectors, with similarity instead of distance.
//!
//! # The Algorithm (Ester et al., 1996)
//!
//! DBSCAN groups points by neighborhood density. It does not need the number of
//! clusters up front and it leaves outliers out of every cluster.
//!
//! ## Core Concepts
//!
//! - **Eps (ε)**: Minimum similarity for two points to be neighbors. It must lie
//!   in the metric's [`range`](Similarity::range); for the default cosine
//!   metric that is `[-1, 1]`, and useful values are close to 1.
//! - **MinPts**: Minimum size of a point's ε-neighborhood, the point itself
//!   included, for it to be "core".
//! - **Core point**: Neighborhood size ≥ MinPts.
//! - **Border point**: Not core, but inside the neighborhood of a core point.
//! - **Noise point**: Neither core nor border.
//!
//! ## Algorithm Steps
//!
//! 1. For each point P still unclassified, in input order:
//!    - If |N(P)| < MinPts, mark P as noise. It may still be absorbed later.
//!    - Else P opens the next cluster id and its neighbors seed a FIFO queue.
//!
//! 2. Expansion: pop Q from the queue.
//!    - Unclassified or noise: Q joins the current cluster.
//!    - Already in another cluster: left alone (first expansion to reach it wins).
//!    - If Q is core, its neighbors not yet queued for this cluster are queued.
//!
//! 3. Every point left as noise gets the reserved id `cluster_count`.
//!
//! The expansion is an explicit queue, so a very large, densely connected
//! cluster cannot exhaust the stack. The outer loop and the queue are strictly
//! sequential; only neighborhood computation may run on the rayon pool (see
//! [`NeighborStrategy`]), and every strategy produces the same labels.
//!
//! ## Complexity
//!
//! - **Time**: O(n²) similarity evaluations.
//! - **Space**: O(n) for labels, plus the neighbor rows (O(n²) worst case).
//!
//! ## References
//!
//! Ester et al. (1996). "A Density-Based Algorithm for Discovering Clusters
//! in Large Spatial Databases with Noise." KDD-96.

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::assignment::ClusterAssignment;
use super::neighbors::{NeighborIndex, NeighborStrategy};
use super::similarity::Cosine;
use super::traits::{Clustering, Similarity};
use super::util;
use crate::error::{Error, Result};

/// Parameters of a DBSCAN run.
///
/// `eps` and `min_pts` have no defaults; a sensible value depends on the
/// embedding model and is a caller decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbscanParams {
    /// Similarity threshold: `q` is a neighbor of `p` when `sim(p, q) >= eps`.
    pub eps: f32,
    /// Minimum neighborhood size (self included) for a core point.
    pub min_pts: usize,
    /// How neighborhoods are computed.
    #[serde(default)]
    pub strategy: NeighborStrategy,
}

impl DbscanParams {
    /// Check parameter ranges that do not depend on the metric.
    ///
    /// [`Dbscan::cluster`] also checks `eps` against the metric's
    /// [`range`](Similarity::range).
    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() {
            return Err(Error::InvalidParameter {
                name: "eps",
                message: "must be finite",
            });
        }

        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }

        Ok(())
    }
}

/// Label of one point while a run is in progress.
///
/// Moves only forward: `Unclassified -> Noise -> Cluster`, or straight from
/// `Unclassified` to `Cluster`. A cluster id is never taken back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointLabel {
    Unclassified,
    Noise,
    Cluster(usize),
}

impl PointLabel {
    fn mark_noise(&mut self) {
        debug_assert_eq!(*self, PointLabel::Unclassified);
        if *self == PointLabel::Unclassified {
            *self = PointLabel::Noise;
        }
    }

    /// Join cluster `id` unless already in a cluster. Returns whether the label changed.
    fn join(&mut self, id: usize) -> bool {
        match *self {
            PointLabel::Unclassified | PointLabel::Noise => {
                *self = PointLabel::Cluster(id);
                true
            }
            PointLabel::Cluster(_) => false,
        }
    }
}

/// DBSCAN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Dbscan<S = Cosine> {
    params: DbscanParams,
    metric: S,
}

impl Dbscan<Cosine> {
    /// Create a new DBSCAN clusterer using cosine similarity.
    ///
    /// # Arguments
    ///
    /// * `eps` - Minimum similarity between two neighbors.
    /// * `min_pts` - Minimum neighborhood size (self included) of a core point.
    ///
    /// # Typical Values
    ///
    /// For L2-normalized face embeddings, `eps` around 0.5-0.8 and `min_pts`
    /// of 2-3. Both depend heavily on the embedding model.
    pub fn new(eps: f32, min_pts: usize) -> Self {
        Self::from_params(DbscanParams {
            eps,
            min_pts,
            strategy: NeighborStrategy::default(),
        })
    }

    /// Create a clusterer from a parameter block, e.g. one read from a config file.
    pub fn from_params(params: DbscanParams) -> Self {
        Self {
            params,
            metric: Cosine,
        }
    }
}

impl<S: Similarity> Dbscan<S> {
    /// Set eps (similarity threshold).
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.params.eps = eps;
        self
    }

    /// Set minimum neighborhood size for core classification.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.params.min_pts = min_pts;
        self
    }

    /// Set how neighborhoods are computed.
    pub fn with_strategy(mut self, strategy: NeighborStrategy) -> Self {
        self.params.strategy = strategy;
        self
    }

    /// Replace the similarity metric.
    pub fn with_metric<T: Similarity>(self, metric: T) -> Dbscan<T> {
        Dbscan {
            params: self.params,
            metric,
        }
    }

    /// Current parameters.
    pub fn params(&self) -> &DbscanParams {
        &self.params
    }

    /// The similarity metric in use.
    pub fn metric(&self) -> &S {
        &self.metric
    }

    /// Cluster `data`, one row per point.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`], [`Error::InvalidParameter`], [`Error::EmptyVector`],
    ///   [`Error::DimensionMismatch`]: reported before any similarity is computed.
    /// - [`Error::DegenerateVector`]: some row is zero or non-finite. The whole run
    ///   is abandoned; no partial labels are returned.
    pub fn cluster(&self, data: &[Vec<f32>]) -> Result<ClusterAssignment> {
        let n = data.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        self.params.validate()?;
        if !self.metric.range().contains(&self.params.eps) {
            return Err(Error::InvalidParameter {
                name: "eps",
                message: "must lie within the metric's score range",
            });
        }
        let dim = util::check_dimensions(data)?;

        let DbscanParams {
            eps,
            min_pts,
            strategy,
        } = self.params;
        debug!(points = n, dim, eps, min_pts, ?strategy, "dbscan run starting");
        let started = Instant::now();

        let mut index = NeighborIndex::build(data, &self.metric, eps, strategy)?;
        let mut labels = vec![PointLabel::Unclassified; n];
        // queued_for[i] == Some(c) once i has entered the queue while growing cluster c.
        let mut queued_for: Vec<Option<usize>> = vec![None; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut cluster_count = 0;

        for p in 0..n {
            if labels[p] != PointLabel::Unclassified {
                continue;
            }

            let seeds = index.neighbors(p)?;
            if seeds.len() < min_pts {
                labels[p].mark_noise();
                continue;
            }

            let id = cluster_count;
            cluster_count += 1;
            trace!(seed = p, cluster = id, size = seeds.len(), "opening cluster");

            labels[p].join(id);
            queued_for[p] = Some(id);
            for &q in seeds {
                if queued_for[q] != Some(id) {
                    queued_for[q] = Some(id);
                    queue.push_back(q);
                }
            }

            while let Some(q) = queue.pop_front() {
                if let PointLabel::Cluster(other) = labels[q] {
                    if other != id {
                        continue;
                    }
                }
                labels[q].join(id);

                // Absorbed noise never passes this check: neighborhood sizes are fixed per run.
                let reach = index.neighbors(q)?;
                if reach.len() >= min_pts {
                    for &r in reach {
                        if queued_for[r] != Some(id) {
                            queued_for[r] = Some(id);
                            queue.push_back(r);
                        }
                    }
                }
            }
        }

        let noise_id = cluster_count;
        let out: Vec<usize> = labels
            .into_iter()
            .map(|l| match l {
                PointLabel::Cluster(id) => id,
                PointLabel::Unclassified | PointLabel::Noise => noise_id,
            })
            .collect();
        let assignment = ClusterAssignment::new(out, cluster_count);

        debug!(
            clusters = assignment.cluster_count(),
            noise = assignment.noise_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dbscan run finished"
        );
        Ok(assignment)
    }

    /// Fit and predict, returning labels where noise is `None`.
    pub fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>> {
        Ok(self.cluster(data)?.to_options())
    }
}

impl<S: Similarity> Clustering for Dbscan<S> {
    /// Labels in `0..k` for clusters and `k` for noise, where `k` is the number
    /// of clusters found.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.cluster(data)?.into_labels())
    }

    /// DBSCAN discovers clusters dynamically, so this returns 0.
    ///
    /// To get the actual number of clusters, use [`Dbscan::cluster`].
    fn n_clusters(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Unit vector at `deg` degrees in the plane.
    fn unit(deg: f32) -> Vec<f32> {
        let r = deg.to_radians();
        vec![r.cos(), r.sin()]
    }

    fn at(degrees: &[f32]) -> Vec<Vec<f32>> {
        degrees.iter().map(|&d| unit(d)).collect()
    }

    #[test]
    fn test_dbscan_two_clusters() {
        let data = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.1, 0.0],
            vec![0.98, 0.15, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.1, 0.99, 0.0],
            vec![0.15, 0.98, 0.0],
        ];

        let a = Dbscan::new(0.9, 2).cluster(&data).unwrap();

        assert_eq!(a.cluster_count(), 2);
        assert_eq!(a.labels(), &[0, 0, 0, 1, 1, 1]);
        assert_eq!(a.noise_count(), 0);
    }

    #[test]
    fn test_dbscan_near_identical_pair_and_orthogonal_point() {
        let data = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.999, 0.01, 0.0],
            vec![0.0, 0.0, 1.0],
        ];

        let a = Dbscan::new(0.9, 2).cluster(&data).unwrap();

        assert_eq!(a.cluster_count(), 1);
        assert_eq!(a.labels(), &[0, 0, 1]);
        assert_eq!(a.noise_id(), 1);
    }

    #[test]
    fn test_dbscan_with_noise() {
        let mut data = at(&[0.0, 2.0, 4.0, 6.0]);
        data.push(unit(135.0));
        data.extend(at(&[90.0, 92.0, 94.0]));

        let labels = Dbscan::new(0.99, 3).fit_predict_with_noise(&data).unwrap();

        assert_eq!(labels.len(), 8);
        assert!(labels[4].is_none());
        for (i, label) in labels.iter().enumerate() {
            if i != 4 {
                assert!(label.is_some());
            }
        }
    }

    #[test]
    fn test_dbscan_all_noise() {
        let data = at(&[0.0, 90.0, 180.0, 270.0]);

        let a = Dbscan::new(0.5, 2).cluster(&data).unwrap();

        assert_eq!(a.cluster_count(), 0);
        assert_eq!(a.labels(), &[0, 0, 0, 0]);
        assert_eq!(a.noise_count(), 4);
    }

    #[test]
    fn test_dbscan_all_one_cluster() {
        let data = at(&[0.0, 1.0, 2.0, 3.0]);

        let labels = Dbscan::new(0.99, 2).fit_predict(&data).unwrap();

        assert_eq!(labels, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_dbscan_chain() {
        // Neighbors are 10 degrees apart; the ends are 90 degrees apart.
        let data: Vec<Vec<f32>> = (0..10).map(|i| unit(i as f32 * 10.0)).collect();

        let labels = Dbscan::new(0.98, 2).fit_predict(&data).unwrap();

        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_min_pts_one_gives_singletons() {
        let data = at(&[0.0, 1.0, 90.0, 180.0]);

        let a = Dbscan::new(0.99, 1).cluster(&data).unwrap();

        assert_eq!(a.cluster_count(), 3);
        assert_eq!(a.labels(), &[0, 0, 1, 2]);
        assert_eq!(a.noise_count(), 0);
    }

    #[test]
    fn test_noise_absorbed_as_border() {
        // 0 has too few neighbors when first visited, then 1 turns out to be core.
        let data = at(&[0.0, 10.0, 20.0, 30.0]);

        let a = Dbscan::new(0.97, 3).cluster(&data).unwrap();

        assert_eq!(a.cluster_count(), 1);
        assert_eq!(a.labels(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_border_goes_to_first_cluster() {
        // The point at 16 degrees borders both groups but is core for neither.
        let degrees = [0.0, 3.0, 6.0, 16.0, 26.0, 29.0, 32.0];
        let dbscan = Dbscan::new(0.982, 4);

        let a = dbscan.cluster(&at(&degrees)).unwrap();
        assert_eq!(a.cluster_count(), 2);
        assert_eq!(a.labels(), &[0, 0, 0, 0, 1, 1, 1]);

        let mut reversed = degrees;
        reversed.reverse();
        let b = dbscan.cluster(&at(&reversed)).unwrap();
        assert_eq!(b.cluster_count(), 2);
        assert_eq!(b.labels(), &[0, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_strategies_match() {
        let degrees = [0.0, 3.0, 6.0, 16.0, 26.0, 29.0, 32.0, 120.0, 121.0, 250.0];
        let data = at(&degrees);
        let eager = Dbscan::new(0.982, 2).cluster(&data).unwrap();
        for strategy in [NeighborStrategy::Parallel, NeighborStrategy::Lazy] {
            let other = Dbscan::new(0.982, 2)
                .with_strategy(strategy)
                .cluster(&data)
                .unwrap();
            assert_eq!(eager, other);
        }
    }

    #[test]
    fn test_dbscan_deterministic() {
        let data = at(&[0.0, 5.0, 50.0, 55.0, 60.0, 200.0]);
        let dbscan = Dbscan::new(0.99, 2);
        let first = dbscan.cluster(&data).unwrap();
        for _ in 0..5 {
            assert_eq!(dbscan.cluster(&data).unwrap(), first);
        }
    }

    #[test]
    fn test_dbscan_empty() {
        let data: Vec<Vec<f32>> = vec![];
        let err = Dbscan::new(0.5, 3).cluster(&data).unwrap_err();
        assert_eq!(err, Error::EmptyInput);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_dbscan_invalid_params() {
        let data = vec![vec![1.0, 0.0]];

        for eps in [f32::NAN, f32::INFINITY, 1.5, -1.5] {
            let err = Dbscan::new(eps, 3).cluster(&data).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }

        let err = Dbscan::new(0.5, 0).cluster(&data).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            }
        );
    }

    #[test]
    fn test_dbscan_dimension_mismatch() {
        let data = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let err = Dbscan::new(0.5, 2).cluster(&data).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_dbscan_degenerate_vector_aborts() {
        let data = vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 0.0]];
        for strategy in [
            NeighborStrategy::Eager,
            NeighborStrategy::Parallel,
            NeighborStrategy::Lazy,
        ] {
            let err = Dbscan::new(0.5, 2)
                .with_strategy(strategy)
                .cluster(&data)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DegenerateVector);
        }

        let err = Dbscan::new(0.5, 1).cluster(&[vec![0.0, 0.0]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateVector);
    }

    #[test]
    fn test_custom_metric() {
        /// Negated Euclidean distance.
        struct NegEuclid;
        impl Similarity for NegEuclid {
            fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32> {
                Ok(-a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| (x - y).powi(2))
                    .sum::<f32>()
                    .sqrt())
            }
        }

        let data = vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![0.0, 0.9], vec![0.1, 0.9]];
        let dbscan = Dbscan::new(-0.2, 2).with_metric(&NegEuclid);
        let a = dbscan.cluster(&data).unwrap();
        assert_eq!(a.labels(), &[0, 0, 1, 1]);
        assert_eq!(dbscan.metric().range(), -1.0..=1.0);
    }

    #[test]
    fn test_eps_checked_against_metric_range() {
        /// Negated Euclidean distance, unbounded below.
        struct NegEuclid;
        impl Similarity for NegEuclid {
            fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32> {
                Ok(-util::squared_euclidean(a, b).sqrt())
            }

            fn range(&self) -> std::ops::RangeInclusive<f32> {
                f32::NEG_INFINITY..=0.0
            }
        }

        // Two pairs one unit apart, five units between the pairs.
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 5.0], vec![1.0, 5.0]];
        let dbscan = Dbscan::new(-2.0, 2).with_metric(NegEuclid);
        assert_eq!(dbscan.params().eps, -2.0);
        let a = dbscan.cluster(&data).unwrap();
        assert_eq!(a.labels(), &[0, 0, 1, 1]);

        let err = dbscan.with_eps(0.5).cluster(&data).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidParameter {
                name: "eps",
                message: "must lie within the metric's score range",
            }
        );

        // Cosine keeps its [-1, 1] range.
        let err = Dbscan::new(-2.0, 2).cluster(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_params_from_json() {
        let params: DbscanParams = serde_json::from_str(r#"{"eps": 0.6, "min_pts": 3}"#).unwrap();
        assert_eq!(params.strategy, NeighborStrategy::Eager);
        let dbscan = Dbscan::from_params(params);
        assert_eq!(dbscan.params().min_pts, 3);

        let missing = serde_json::from_str::<DbscanParams>(r#"{"eps": 0.6}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_label_transitions_are_forward_only() {
        let mut l = PointLabel::Unclassified;
        l.mark_noise();
        assert_eq!(l, PointLabel::Noise);
        assert!(l.join(3));
        assert_eq!(l, PointLabel::Cluster(3));
        assert!(!l.join(4));
        assert_eq!(l, PointLabel::Cluster(3));
    }
}

use serde::Serialize;

/// Final labeling produced by one clustering run.
///
/// Every input point gets exactly one label: a cluster id in
/// `0..cluster_count`, or the reserved noise id, which is always equal to
/// `cluster_count`. The value is immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    cluster_count: usize,
}

impl ClusterAssignment {
    pub(crate) fn new(labels: Vec<usize>, cluster_count: usize) -> Self {
        debug_assert!(labels.iter().all(|&l| l <= cluster_count));
        Self {
            labels,
            cluster_count,
        }
    }

    /// One label per input point, in input order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Label of point `i`.
    ///
    /// # Panics
    ///
    /// If `i` is out of bounds.
    pub fn label(&self, i: usize) -> usize {
        self.labels[i]
    }

    /// Number of genuine clusters, noise excluded.
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// The id carried by noise points.
    pub fn noise_id(&self) -> usize {
        self.cluster_count
    }

    pub fn is_noise(&self, i: usize) -> bool {
        self.labels[i] == self.noise_id()
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == self.noise_id()).count()
    }

    /// Number of labeled points.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Indices of the points carrying label `id`, ascending.
    ///
    /// Passing [`noise_id`](Self::noise_id) yields the noise points.
    pub fn members(&self, id: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Point indices grouped by cluster id, one group per genuine cluster.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.cluster_count];
        for (i, &l) in self.labels.iter().enumerate() {
            if l < self.cluster_count {
                groups[l].push(i);
            }
        }
        groups
    }

    /// Indices of the noise points, ascending.
    pub fn noise(&self) -> Vec<usize> {
        self.members(self.noise_id())
    }

    /// Size of each genuine cluster, indexed by cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count];
        for &l in &self.labels {
            if l < self.cluster_count {
                sizes[l] += 1;
            }
        }
        sizes
    }

    /// Labels with noise mapped to `None`.
    pub fn to_options(&self) -> Vec<Option<usize>> {
        self.labels
            .iter()
            .map(|&l| (l < self.cluster_count).then_some(l))
            .collect()
    }

    pub fn into_labels(self) -> Vec<usize> {
        self.labels
    }
}

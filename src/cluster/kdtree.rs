//! KD-tree over embedding rows, for bounded k-nearest queries.
//!
//! Distances are squared Euclidean. On L2-normalized rows that order matches
//! cosine similarity, since `|a - b|² = 2 - 2 cos(a, b)`, which is how
//! [`KnnClassifier`](super::KnnClassifier) uses it.
//!
//! ## Structure
//!
//! Points are inserted one at a time and never removed. The first point is the
//! root and splits on axis 0; every new node splits on the axis after its
//! parent's. A point goes right when its coordinate on the split axis is
//! greater than or equal to the node's. Each node also keeps the bounding box
//! of its whole subtree, grown on the way down during insertion.
//!
//! ## Search
//!
//! [`KdTree::nearest`] walks the tree with an explicit stack, closer child
//! first. Once `k` hits are held, the worst of them becomes the search
//! radius, and a subtree is skipped when its box lies farther away than that
//! radius. Results are exactly those of a full scan: the `k` smallest
//! `(distance, index)` pairs within the radius.

use std::cmp::Ordering;

use super::util;
use crate::error::{Error, Result};

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion index of the point.
    pub index: usize,
    /// Squared Euclidean distance to the query.
    pub sq_distance: f32,
}

impl Neighbor {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.sq_distance
            .total_cmp(&other.sq_distance)
            .then(self.index.cmp(&other.index))
    }
}

#[derive(Debug, Clone)]
struct Node {
    point: Vec<f32>,
    axis: usize,
    /// Bounding box of this node's subtree, itself included.
    min: Vec<f32>,
    max: Vec<f32>,
    left: Option<usize>,
    right: Option<usize>,
}

impl Node {
    /// Squared distance from `query` to this subtree's bounding box.
    ///
    /// Never more than the distance to any point inside the box.
    fn box_distance(&self, query: &[f32]) -> f32 {
        query
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .map(|(&q, (&lo, &hi))| {
                let below = (lo - q).max(0.0);
                let above = (q - hi).max(0.0);
                below * below + above * above
            })
            .sum()
    }
}

/// Insert-only KD-tree. Node `i` holds the `i`-th inserted point.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    dim: usize,
    nodes: Vec<Node>,
}

impl KdTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `points`, inserted in order.
    pub fn from_points(points: &[Vec<f32>]) -> Result<Self> {
        let mut tree = Self::new();
        for p in points {
            tree.insert(p)?;
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dimension of the stored points, 0 while empty.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Add `point` and return its index.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyVector`], [`Error::DimensionMismatch`] against the first
    /// inserted point, or [`Error::DegenerateVector`] for NaN or infinite
    /// components.
    pub fn insert(&mut self, point: &[f32]) -> Result<usize> {
        if point.is_empty() {
            return Err(Error::EmptyVector);
        }
        if !self.nodes.is_empty() && point.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: point.len(),
            });
        }
        check_finite(point)?;

        let id = self.nodes.len();
        let axis = if self.nodes.is_empty() {
            self.dim = point.len();
            0
        } else {
            self.attach(point, id)
        };
        self.nodes.push(Node {
            point: point.to_vec(),
            axis,
            min: point.to_vec(),
            max: point.to_vec(),
            left: None,
            right: None,
        });
        Ok(id)
    }

    /// Walk down from the root, growing each visited box to cover `point`,
    /// and hang `id` under the leaf reached. Returns the new node's axis.
    fn attach(&mut self, point: &[f32], id: usize) -> usize {
        let dim = self.dim;
        let mut cur = 0;
        loop {
            let node = &mut self.nodes[cur];
            for ((lo, hi), &x) in node.min.iter_mut().zip(node.max.iter_mut()).zip(point) {
                *lo = lo.min(x);
                *hi = hi.max(x);
            }
            let axis = node.axis;
            let slot = if point[axis] >= node.point[axis] {
                &mut node.right
            } else {
                &mut node.left
            };
            let next = *slot;
            match next {
                Some(next) => cur = next,
                None => {
                    *slot = Some(id);
                    return (axis + 1) % dim;
                }
            }
        }
    }

    /// Up to `k` points within squared distance `max_sq_distance` of `query`,
    /// closest first. Equal distances come back in insertion order.
    ///
    /// Pass `f32::INFINITY` for an unbounded search.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] when `query` does not match the stored
    /// points, [`Error::DegenerateVector`] for non-finite components.
    pub fn nearest(&self, query: &[f32], k: usize, max_sq_distance: f32) -> Result<Vec<Neighbor>> {
        if self.nodes.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: query.len(),
            });
        }
        check_finite(query)?;

        let mut hits = Hits::new(k, max_sq_distance);
        let mut stack = vec![(0, self.nodes[0].box_distance(query))];
        while let Some((n, bound)) = stack.pop() {
            // The radius may have shrunk since this entry was pushed.
            if !hits.admits(bound) {
                continue;
            }
            let node = &self.nodes[n];
            hits.offer(n, util::squared_euclidean(query, &node.point));

            let left = node.left.map(|c| (c, self.nodes[c].box_distance(query)));
            let right = node.right.map(|c| (c, self.nodes[c].box_distance(query)));
            let (near, far) = match (left, right) {
                (Some(l), Some(r)) if r.1 < l.1 => (Some(r), Some(l)),
                (l, r) => (l, r),
            };
            // Pushed last, popped first.
            for (child, bound) in [far, near].into_iter().flatten() {
                if hits.admits(bound) {
                    stack.push((child, bound));
                }
            }
        }
        Ok(hits.best)
    }
}

fn check_finite(v: &[f32]) -> Result<()> {
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::DegenerateVector {
            reason: "non-finite component",
        });
    }
    Ok(())
}

/// The best hits so far, sorted by `(distance, index)`.
struct Hits {
    k: usize,
    range: f32,
    best: Vec<Neighbor>,
}

impl Hits {
    fn new(k: usize, range: f32) -> Self {
        Self {
            k,
            range,
            best: Vec::new(),
        }
    }

    /// Whether something at squared distance `bound` could still make the cut.
    ///
    /// Inclusive at the current worst: an equal distance with a lower index wins.
    fn admits(&self, bound: f32) -> bool {
        if !(bound <= self.range) {
            return false;
        }
        match self.best.last() {
            Some(worst) if self.best.len() == self.k => bound <= worst.sq_distance,
            _ => true,
        }
    }

    fn offer(&mut self, index: usize, sq_distance: f32) {
        if !(sq_distance <= self.range) {
            return;
        }
        let hit = Neighbor { index, sq_distance };
        let at = self
            .best
            .partition_point(|b| b.cmp_key(&hit) == Ordering::Less);
        if at >= self.k {
            return;
        }
        self.best.insert(at, hit);
        self.best.truncate(self.k);
    }
}

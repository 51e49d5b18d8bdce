//! Eps-neighborhoods over a fixed set of embeddings.
//!
//! Row `i` holds every index `j` with `similarity(i, j) >= eps`, in ascending
//! order, and always contains `i` itself. Rows are identical whichever
//! [`NeighborStrategy`] builds them; only the cost profile differs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::traits::Similarity;
use crate::error::{Error, Result};

/// How neighbor rows are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborStrategy {
    /// All rows up front on the calling thread.
    ///
    /// Evaluates each unordered pair once, so the metric must be symmetric.
    #[default]
    Eager,
    /// All rows up front on the rayon pool, one row per task.
    Parallel,
    /// Rows computed the first time the clusterer asks for them.
    Lazy,
}

pub(crate) struct NeighborIndex<'a, S> {
    data: &'a [Vec<f32>],
    metric: &'a S,
    eps: f32,
    rows: Vec<Option<Vec<usize>>>,
}

impl<'a, S: Similarity> NeighborIndex<'a, S> {
    pub(crate) fn build(
        data: &'a [Vec<f32>],
        metric: &'a S,
        eps: f32,
        strategy: NeighborStrategy,
    ) -> Result<Self> {
        let mut index = Self {
            data,
            metric,
            eps,
            rows: vec![None; data.len()],
        };
        match strategy {
            NeighborStrategy::Eager => index.fill_symmetric()?,
            NeighborStrategy::Parallel => index.fill_parallel()?,
            NeighborStrategy::Lazy => {}
        }
        Ok(index)
    }

    /// Neighbors of `i`, itself included.
    pub(crate) fn neighbors(&mut self, i: usize) -> Result<&[usize]> {
        if self.rows[i].is_none() {
            let row = row(self.data, self.metric, self.eps, i).map_err(PairError::report)?;
            self.rows[i] = Some(row);
        }
        Ok(self.rows[i].as_deref().unwrap_or_default())
    }

    fn fill_symmetric(&mut self) -> Result<()> {
        let n = self.data.len();
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            score(self.data, self.metric, i, i).map_err(PairError::report)?;
            rows[i].push(i);
            for j in (i + 1)..n {
                if score(self.data, self.metric, i, j).map_err(PairError::report)? >= self.eps {
                    rows[i].push(j);
                    rows[j].push(i);
                }
            }
        }
        self.rows = rows.into_iter().map(Some).collect();
        Ok(())
    }

    fn fill_parallel(&mut self) -> Result<()> {
        let (data, metric, eps) = (self.data, self.metric, self.eps);
        let rows: Vec<std::result::Result<Vec<usize>, PairError>> = (0..data.len())
            .into_par_iter()
            .map(|i| row(data, metric, eps, i))
            .collect();

        // Report the first failing row in input order, not whichever thread lost the race.
        self.rows = rows
            .into_iter()
            .map(|r| r.map(Some))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(PairError::report)?;
        Ok(())
    }
}

/// A failed comparison, kept unlogged until it is known to end the run.
struct PairError {
    i: usize,
    j: usize,
    error: Error,
}

impl PairError {
    fn report(self) -> Error {
        tracing::warn!(i = self.i, j = self.j, error = %self.error, "similarity failed, aborting run");
        self.error
    }
}

fn row<S: Similarity>(
    data: &[Vec<f32>],
    metric: &S,
    eps: f32,
    i: usize,
) -> std::result::Result<Vec<usize>, PairError> {
    let mut out = Vec::new();
    for j in 0..data.len() {
        let s = score(data, metric, i, j)?;
        if j == i || s >= eps {
            out.push(j);
        }
    }
    Ok(out)
}

fn score<S: Similarity>(
    data: &[Vec<f32>],
    metric: &S,
    i: usize,
    j: usize,
) -> std::result::Result<f32, PairError> {
    metric
        .similarity(&data[i], &data[j])
        .map_err(|error| PairError { i, j, error })
}

//! Similarity between embedding vectors.
//!
//! The clustering and matching code only ever compares a score against a
//! threshold, so any metric where higher means "more alike" can be plugged in
//! through [`Similarity`].

use super::traits::Similarity;
use super::util;
use crate::error::{Error, Result};

/// Cosine similarity: `dot(a, b) / (|a| |b|)`, in `[-1, 1]`.
///
/// Zero-norm and non-finite vectors are rejected instead of producing NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cosine;

impl Cosine {
    fn check(v: &[f32]) -> Result<f32> {
        if v.iter().any(|x| !x.is_finite()) {
            return Err(Error::DegenerateVector {
                reason: "non-finite component",
            });
        }
        let norm = util::l2_norm(v);
        if norm == 0.0 {
            return Err(Error::DegenerateVector { reason: "zero norm" });
        }
        if !norm.is_finite() {
            return Err(Error::DegenerateVector {
                reason: "norm overflows f32",
            });
        }
        Ok(norm)
    }
}

impl Similarity for Cosine {
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.is_empty() || b.is_empty() {
            return Err(Error::EmptyVector);
        }
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                expected: a.len(),
                found: b.len(),
            });
        }
        let na = Self::check(a)?;
        let nb = Self::check(b)?;

        // Clamp away rounding drift like 1.0000001.
        Ok((util::dot(a, b) / (na * nb)).clamp(-1.0, 1.0))
    }
}

/// Cosine similarity with the default metric.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    Cosine.similarity(a, b)
}

//! Small dense-vector helpers.

use crate::error::{Error, Result};

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Scale `v` to unit length in place.
///
/// Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Check that every vector has the same, non-zero dimension.
///
/// Returns the shared dimension.
pub(crate) fn check_dimensions(data: &[Vec<f32>]) -> Result<usize> {
    let d = data.first().map(Vec::len).ok_or(Error::EmptyInput)?;
    if d == 0 {
        return Err(Error::EmptyVector);
    }
    for v in &data[1..] {
        if v.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: v.len(),
            });
        }
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_norm() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert!((l2_norm(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(squared_euclidean(&[1.0, 2.0], &[4.0, 6.0]), 25.0);
    }

    #[test]
    fn normalize_unit() {
        let mut v = [3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_is_noop() {
        let mut v = [0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn dimensions() {
        assert_eq!(check_dimensions(&[vec![1.0, 2.0], vec![3.0, 4.0]]), Ok(2));
        assert_eq!(check_dimensions(&[]), Err(Error::EmptyInput));
        assert_eq!(check_dimensions(&[vec![]]), Err(Error::EmptyVector));
        assert_eq!(
            check_dimensions(&[vec![1.0, 2.0], vec![1.0]]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }
}

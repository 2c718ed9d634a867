//! Shared numerical helpers for the LP backend.

/// Threshold for treating values as effectively zero.
pub const ZERO_THRESHOLD: f64 = 1e-10;

/// Compute the infinity norm (max absolute value) of a vector.
#[inline]
pub fn norm_inf(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).fold(0.0, f64::max)
}

/// Dot product of two equally sized slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(&ai, &bi)| ai * bi).sum()
}

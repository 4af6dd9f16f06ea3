//! Numeric-safety filter for values that end up in JSON.

/// Maps NaN and ±infinity to `None`, keeps every finite value unchanged.
#[inline]
pub fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

/// Sanitises every element of a series.
pub fn finite_series(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(finite).collect()
}

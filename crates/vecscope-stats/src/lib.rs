//! Similarity and significance math.
//!
//! - [`cosine_similarity`] between two embeddings
//! - [`pearson_correlation`] between two numeric samples
//! - [`p_value_from_t`], the two-tailed Student's t p-value, computed through
//!   the regularized incomplete beta function
//! - [`correlation_p_value`], which ties the two together for a sample
//!   correlation coefficient

mod distribution;

pub use distribution::{ln_gamma, regularized_incomplete_beta, student_t_cdf};

use vecscope_core::{Result, VecscopeError};

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Returns `0.0` when either vector has zero magnitude. Accumulates in `f64`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(VecscopeError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut mag_a = 0.0f64;
    let mut mag_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (mag_a.sqrt() * mag_b.sqrt()))
}

/// Pearson correlation coefficient of two equal-length samples.
///
/// Returns `0.0` when either sample has no variability (or is empty).
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(VecscopeError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.is_empty() {
        return Ok(0.0);
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }

    Ok((cov / denominator).clamp(-1.0, 1.0))
}

/// Two-tailed p-value `2 * (1 - CDF(|t|, df))` of Student's t distribution.
///
/// Evaluated as `I_{df/(df+t²)}(df/2, 1/2)`, the same quantity without the
/// cancellation in `1 - CDF` for large `|t|`. Returns `1.0` for `t == 0`,
/// a NaN `t`, or a non-positive `df`.
pub fn p_value_from_t(t: f64, degrees_of_freedom: f64) -> f64 {
    if t.is_nan() || degrees_of_freedom.is_nan() || degrees_of_freedom <= 0.0 {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = degrees_of_freedom / (degrees_of_freedom + t * t);
    regularized_incomplete_beta(degrees_of_freedom / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// t statistic `r * sqrt((n - 2) / (1 - r²))` of a sample correlation.
///
/// Infinite (signed like `r`) when `|r| == 1`.
pub fn t_statistic(r: f64, n: usize) -> f64 {
    let df = n.saturating_sub(2) as f64;
    let residual = 1.0 - r * r;
    if residual <= 0.0 {
        return f64::INFINITY.copysign(r);
    }
    r * (df / residual).sqrt()
}

/// Two-tailed significance of a correlation `r` measured over `n` pairs.
///
/// Fewer than three pairs leave no degrees of freedom and give `1.0`;
/// a perfect correlation gives `0.0`.
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if 1.0 - r * r <= 0.0 {
        return 0.0;
    }
    p_value_from_t(t_statistic(r, n), (n - 2) as f64)
}

//! # Expanding Window
//!
//! $$
//! \bar x_w=\bar x_{w-1}+\frac{x_w-\bar x_{w-1}}{w},\qquad
//! M_{2,w}=M_{2,w-1}+(x_w-\bar x_{w-1})(x_w-\bar x_w)
//! $$
//!
use tracing::trace;

use super::Normalization;
use super::Statistic;

/// Cumulative statistic from index 0 to each index, using Welford's update for the
/// variances and running sums for the covariance.
///
/// Index `i` is `None` while `i + 1 < window`, or while the normalization divisor
/// `i + 1` (population) / `i` (sample) is not positive.
pub fn compute_expanding(
  x: &[f64],
  y: &[f64],
  window: usize,
  normalization: Normalization,
  statistic: Statistic,
) -> Vec<Option<f64>> {
  let n = x.len().min(y.len());
  let mut out = Vec::with_capacity(n);

  let mut avg_x = 0.0;
  let mut avg_y = 0.0;
  let mut sumsq_x = 0.0;
  let mut sumsq_y = 0.0;
  let mut sum_x = 0.0;
  let mut sum_y = 0.0;
  let mut sum_xy = 0.0;

  for i in 0..n {
    let (xi, yi) = (x[i], y[i]);
    let w = (i + 1) as f64;

    let delta_x = xi - avg_x;
    avg_x += delta_x / w;
    sumsq_x += delta_x * (xi - avg_x);

    let delta_y = yi - avg_y;
    avg_y += delta_y / w;
    sumsq_y += delta_y * (yi - avg_y);

    sum_x += xi;
    sum_y += yi;
    sum_xy += xi * yi;

    let pop_n = normalization.divisor(i + 1);
    if i + 1 < window || pop_n <= 0.0 {
      out.push(None);
      continue;
    }

    let cov = (sum_xy - sum_x * sum_y / w) / pop_n;
    let value = statistic.evaluate(cov, sumsq_x / pop_n, sumsq_y / pop_n);
    if value.is_none() {
      trace!(index = i, ?statistic, "zero variance denominator");
    }
    out.push(value);
  }

  out
}

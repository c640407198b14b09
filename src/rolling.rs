//! # Rolling Statistics
//!
//! $$
//! \operatorname{Cov}_t(x,y)=\frac{1}{n_p}\Big(\sum_{s\in W_t}x_sy_s-\frac{1}{w}\sum_{s\in W_t}x_s\sum_{s\in W_t}y_s\Big)
//! $$
//!
//! Pairwise covariance, correlation or beta over a fixed sliding window or an
//! expanding window, in a single O(n) forward scan.
//!
//! Entries without enough history are `None`, as are entries whose variance
//! denominator is zero. Neither aborts the scan.

pub mod expanding;
pub mod fixed;

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use tracing::debug;

use crate::analytics::correlation::VARIANCE_EPSILON;
use crate::error::AnalyticsError;
use crate::error::Result;
use crate::series::ChangeMatrix;

pub use expanding::compute_expanding;
pub use fixed::compute_fixed;

/// Window discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowMode {
  /// Sliding window of exactly `size` periods.
  Fixed,
  /// Cumulative window from the first observation.
  Expanding,
}

/// Denominator convention for variance and covariance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalization {
  /// Divide by `n`.
  Population,
  /// Divide by `n - 1`.
  Sample,
}

impl Normalization {
  /// Divisor for a window holding `n` observations.
  pub fn divisor(self, n: usize) -> f64 {
    match self {
      Normalization::Population => n as f64,
      Normalization::Sample => n as f64 - 1.0,
    }
  }
}

/// Statistic emitted for each window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Statistic {
  Covariance,
  Correlation,
  /// `cov(x, y) / var(y)`.
  Beta,
}

impl Statistic {
  /// Evaluate the statistic from window moments. Zero variance denominators yield `None`.
  pub(crate) fn evaluate(self, cov: f64, var_x: f64, var_y: f64) -> Option<f64> {
    match self {
      Statistic::Covariance => Some(cov),
      Statistic::Correlation => {
        (var_x > VARIANCE_EPSILON && var_y > VARIANCE_EPSILON).then(|| cov / (var_x.sqrt() * var_y.sqrt()))
      }
      Statistic::Beta => (var_y > VARIANCE_EPSILON).then(|| cov / var_y),
    }
  }
}

/// Parameters of one rolling request.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSpec {
  /// Window length in periods.
  pub size: usize,
  pub mode: WindowMode,
  pub normalization: Normalization,
  pub statistic: Statistic,
  /// Drop the warm-up entries instead of keeping them as `None`.
  pub trim_leading_empty: bool,
}

impl WindowSpec {
  pub fn validate(&self) -> Result<()> {
    if self.size < 1 {
      return Err(AnalyticsError::config("window size must be at least 1"));
    }
    if self.mode == WindowMode::Fixed && self.size == 1 {
      return Err(AnalyticsError::config(
        "fixed window of size 1 has no dispersion",
      ));
    }
    Ok(())
  }

  /// Leading entries that can never hold a value.
  pub fn warmup(&self) -> usize {
    let first_full = self.size.saturating_sub(1);
    match (self.mode, self.normalization) {
      // index 0 of a sample-normalized expanding window divides by zero
      (WindowMode::Expanding, Normalization::Sample) => first_full.max(1),
      _ => first_full,
    }
  }
}

/// Run the scan selected by `spec.mode` over one aligned pair.
///
/// The output has the same length as the inputs; trimming is applied by
/// [`rolling_pair`].
pub fn rolling_statistic(x: &[f64], y: &[f64], spec: &WindowSpec) -> Result<Vec<Option<f64>>> {
  spec.validate()?;

  if x.len() != y.len() {
    return Err(AnalyticsError::config(format!(
      "pair lengths differ: {} vs {}",
      x.len(),
      y.len()
    )));
  }
  if x.len() < spec.size {
    return Err(AnalyticsError::InsufficientData {
      required: spec.size,
      got: x.len(),
    });
  }

  let scan = match spec.mode {
    WindowMode::Fixed => compute_fixed,
    WindowMode::Expanding => compute_expanding,
  };
  Ok(scan(x, y, spec.size, spec.normalization, spec.statistic))
}

/// Dated rolling statistic of `x` against `y`.
#[derive(Clone, Debug, PartialEq)]
pub struct RollingResult {
  pub x: String,
  pub y: String,
  pub dates: Vec<NaiveDate>,
  pub values: Vec<Option<f64>>,
}

impl RollingResult {
  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Points that carry a value.
  pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    self
      .dates
      .iter()
      .zip(&self.values)
      .filter_map(|(d, v)| v.map(|v| (*d, v)))
  }

  pub fn undefined_count(&self) -> usize {
    self.values.iter().filter(|v| v.is_none()).count()
  }
}

/// Rolling statistic between two columns of `changes`, looked up by instrument name.
pub fn rolling_pair(changes: &ChangeMatrix, x: &str, y: &str, spec: &WindowSpec) -> Result<RollingResult> {
  if x == y {
    return Err(AnalyticsError::config(format!(
      "pair names the same instrument twice: {x}"
    )));
  }
  let position = |id: &str| {
    changes
      .position(id)
      .ok_or_else(|| AnalyticsError::config(format!("instrument {id} is not part of the aligned set")))
  };
  let (xi, yi) = (position(x)?, position(y)?);

  let xs = changes.column(xi).to_vec();
  let ys = changes.column(yi).to_vec();
  let mut values = rolling_statistic(&xs, &ys, spec)?;
  let mut dates = changes.dates.clone();

  if spec.trim_leading_empty {
    let cut = spec.warmup().min(values.len());
    values.drain(..cut);
    dates.drain(..cut);
  }

  let result = RollingResult {
    x: x.to_string(),
    y: y.to_string(),
    dates,
    values,
  };
  debug!(
    x,
    y,
    ?spec,
    len = result.len(),
    undefined = result.undefined_count(),
    "rolling statistic computed"
  );

  Ok(result)
}

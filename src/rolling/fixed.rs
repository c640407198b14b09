//! # Fixed Window
//!
//! $$
//! \bar x' = \bar x + \frac{x_{\text{in}}-x_{\text{out}}}{w},\qquad
//! \sigma_x'^2 = \sigma_x^2 + \frac{(x_{\text{in}}-x_{\text{out}})(x_{\text{in}}-\bar x'+x_{\text{out}}-\bar x)}{n_p}
//! $$
//!
use tracing::trace;

use super::Normalization;
use super::Statistic;

/// Sliding-window statistic of exactly `window` observations.
///
/// The first window is accumulated with Welford's update; afterwards each step
/// removes the observation leaving the window and adds the one entering it, so
/// the whole scan is O(n) whatever the window length. The first `window - 1`
/// entries are `None`.
///
/// The sliding update leaves a rounding residue after a volatile stretch, so a
/// window holding `window` identical observations is detected from the length of
/// the current run of equal values and its moments are reset exactly.
pub fn compute_fixed(
  x: &[f64],
  y: &[f64],
  window: usize,
  normalization: Normalization,
  statistic: Statistic,
) -> Vec<Option<f64>> {
  let n = x.len().min(y.len());
  let pop_n = normalization.divisor(window);
  if window == 0 || n < window || pop_n <= 0.0 {
    return vec![None; n];
  }

  let w = window as f64;
  let mut out = Vec::with_capacity(n);

  let mut avg_x = 0.0;
  let mut avg_y = 0.0;
  let mut sumsq_x = 0.0;
  let mut sumsq_y = 0.0;
  let mut sum_x = 0.0;
  let mut sum_y = 0.0;
  let mut sum_xy = 0.0;
  let mut run_x = Run::default();
  let mut run_y = Run::default();

  for i in 0..window {
    let (xi, yi) = (x[i], y[i]);
    let count = (i + 1) as f64;
    run_x.push(xi);
    run_y.push(yi);

    let delta_x = xi - avg_x;
    avg_x += delta_x / count;
    sumsq_x += delta_x * (xi - avg_x);

    let delta_y = yi - avg_y;
    avg_y += delta_y / count;
    sumsq_y += delta_y * (yi - avg_y);

    sum_x += xi;
    sum_y += yi;
    sum_xy += xi * yi;

    if i + 1 < window {
      out.push(None);
    }
  }

  let mut var_x = sumsq_x / pop_n;
  let mut var_y = sumsq_y / pop_n;
  let cov = if run_x.len >= window || run_y.len >= window {
    0.0
  } else {
    (sum_xy - sum_x * sum_y / w) / pop_n
  };
  out.push(emit(statistic, cov, var_x, var_y, window - 1));

  // covariance never reads the variances
  let track_variance = statistic != Statistic::Covariance;

  for i in window..n {
    let (xi_old, yi_old) = (x[i - window], y[i - window]);
    let (xi, yi) = (x[i], y[i]);
    run_x.push(xi);
    run_y.push(yi);
    let flat_x = run_x.len >= window;
    let flat_y = run_y.len >= window;

    if track_variance {
      if flat_x {
        avg_x = xi;
        var_x = 0.0;
      } else {
        let avg_x_new = avg_x + (xi - xi_old) / w;
        var_x += (xi - xi_old) * (xi - avg_x_new + xi_old - avg_x) / pop_n;
        avg_x = avg_x_new;
      }

      if flat_y {
        avg_y = yi;
        var_y = 0.0;
      } else {
        let avg_y_new = avg_y + (yi - yi_old) / w;
        var_y += (yi - yi_old) * (yi - avg_y_new + yi_old - avg_y) / pop_n;
        avg_y = avg_y_new;
      }
    }

    sum_xy += xi * yi - xi_old * yi_old;
    sum_x += xi - xi_old;
    sum_y += yi - yi_old;

    let cov = if flat_x || flat_y {
      0.0
    } else {
      (sum_xy - sum_x * sum_y / w) / pop_n
    };
    out.push(emit(statistic, cov, var_x, var_y, i));
  }

  out
}

/// Length of the trailing run of identical observations.
#[derive(Default)]
struct Run {
  last: Option<f64>,
  len: usize,
}

impl Run {
  fn push(&mut self, value: f64) {
    self.len = match self.last {
      Some(last) if last == value => self.len + 1,
      _ => 1,
    };
    self.last = Some(value);
  }
}

fn emit(statistic: Statistic, cov: f64, var_x: f64, var_y: f64, index: usize) -> Option<f64> {
  let value = statistic.evaluate(cov, var_x, var_y);
  if value.is_none() {
    trace!(index, ?statistic, "zero variance denominator");
  }
  value
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;
  use rand_distr::Normal;
  use tracing_test::traced_test;

  use super::*;
  use crate::rolling::tests::naive_statistic;

  fn changes(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.015).unwrap();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for _ in 0..n {
      let market: f64 = rng.sample(noise);
      let own: f64 = rng.sample(noise);
      x.push(0.8 * market + own);
      y.push(market);
    }
    (x, y)
  }

  fn assert_close(actual: Option<f64>, expected: Option<f64>) {
    match (actual, expected) {
      (Some(a), Some(e)) => assert_abs_diff_eq!(a, e, epsilon = 1e-9),
      (a, e) => assert_eq!(a, e),
    }
  }

  #[test]
  fn sliding_scan_matches_window_recomputation() {
    let (x, y) = changes(1000, 42);

    for window in [3, 10, 21, 63] {
      for normalization in [Normalization::Population, Normalization::Sample] {
        for statistic in [Statistic::Covariance, Statistic::Correlation, Statistic::Beta] {
          let out = compute_fixed(&x, &y, window, normalization, statistic);
          assert_eq!(out.len(), x.len());
          assert!(out[..window - 1].iter().all(Option::is_none));

          for i in (window - 1)..x.len() {
            let lo = i + 1 - window;
            let expected = naive_statistic(&x[lo..=i], &y[lo..=i], normalization, statistic);
            assert_close(out[i], expected);
          }
        }
      }
    }
  }

  #[test]
  fn window_equal_to_length_yields_one_value() {
    let x = [0.01, -0.02, 0.015, 0.0];
    let y = [0.005, -0.01, 0.02, -0.004];
    let out = compute_fixed(&x, &y, 4, Normalization::Sample, Statistic::Beta);

    assert_eq!(&out[..3], &[None, None, None]);
    let expected = naive_statistic(&x, &y, Normalization::Sample, Statistic::Beta).unwrap();
    assert_abs_diff_eq!(out[3].unwrap(), expected, epsilon = 1e-12);
  }

  #[test]
  fn zero_divisor_yields_no_values() {
    let x = [1.0, 2.0, 3.0];
    let out = compute_fixed(&x, &x, 1, Normalization::Sample, Statistic::Covariance);
    assert_eq!(out, vec![None; 3]);
  }

  #[test]
  #[traced_test]
  fn flat_stretch_is_undefined_only_where_flat() {
    // y is constant for the first four observations, then moves
    let x = [0.01, 0.02, -0.01, 0.03, 0.02, -0.02, 0.01];
    let y = [0.0, 0.0, 0.0, 0.0, 0.01, -0.01, 0.02];
    let out = compute_fixed(&x, &y, 3, Normalization::Population, Statistic::Correlation);

    assert_eq!(&out[..4], &[None, None, None, None]);
    assert!(out[4..].iter().all(Option::is_some));
    assert!(logs_contain("zero variance denominator"));
  }

  const VOLATILE_THEN_FLAT: [f64; 12] = [5.0, -0.9, 3.0, -0.8, 7.0, 0.2, 0.2, 0.2, 0.2, 0.2, 1.5, -2.0];
  const PARTNER: [f64; 12] = [1.0, -2.0, 0.5, 3.0, -1.5, 0.7, -0.3, 1.1, 0.4, -0.6, 0.9, -1.2];

  #[test]
  fn flat_window_after_volatile_stretch_is_undefined() {
    let x = VOLATILE_THEN_FLAT;
    let y = PARTNER;

    for normalization in [Normalization::Population, Normalization::Sample] {
      let corr = compute_fixed(&x, &y, 3, normalization, Statistic::Correlation);
      // beta divides by the variance of its second series
      let beta = compute_fixed(&y, &x, 3, normalization, Statistic::Beta);
      let cov = compute_fixed(&x, &y, 3, normalization, Statistic::Covariance);

      for i in 7..=9 {
        assert_eq!(corr[i], None, "correlation at {i}");
        assert_eq!(beta[i], None, "beta at {i}");
        assert_eq!(cov[i], Some(0.0), "covariance at {i}");
      }
      for i in [2, 3, 4, 5, 6, 10, 11] {
        assert!(corr[i].is_some(), "correlation at {i}");
        assert!(beta[i].is_some(), "beta at {i}");
      }
    }
  }

  #[test]
  fn sliding_through_flat_stretch_matches_recomputation() {
    let x = VOLATILE_THEN_FLAT;
    let y = PARTNER;

    for statistic in [Statistic::Covariance, Statistic::Correlation, Statistic::Beta] {
      for (a, b) in [(&x, &y), (&y, &x)] {
        let out = compute_fixed(a, b, 3, Normalization::Sample, statistic);
        for i in 2..a.len() {
          let expected = naive_statistic(&a[i - 2..=i], &b[i - 2..=i], Normalization::Sample, statistic);
          assert_close(out[i], expected);
        }
      }
    }
  }
}

//! # Correlation Matrix
//!
//! $$
//! \rho_{ij}=\frac{\sum_t (r_{ti}-\bar r_i)(r_{tj}-\bar r_j)}{\sqrt{\sum_t (r_{ti}-\bar r_i)^2\sum_t (r_{tj}-\bar r_j)^2}}
//! $$
//!
use ndarray::Array2;
use ndarray::ArrayView1;
use tracing::warn;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::series::ChangeMatrix;

/// Variances at or below this are treated as zero, both in the full-sample matrix
/// and in every rolling window.
pub const VARIANCE_EPSILON: f64 = 1e-15;

/// Full-sample Pearson correlation between every pair of instruments.
///
/// Cells involving a constant column are `None`, the diagonal included.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
  pub instruments: Vec<String>,
  pub values: Array2<Option<f64>>,
}

impl CorrelationMatrix {
  pub fn len(&self) -> usize {
    self.instruments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instruments.is_empty()
  }

  pub fn get(&self, i: usize, j: usize) -> Option<f64> {
    self.values.get((i, j)).copied().flatten()
  }

  /// Look a coefficient up by instrument names.
  pub fn between(&self, a: &str, b: &str) -> Option<f64> {
    let i = self.instruments.iter().position(|id| id == a)?;
    let j = self.instruments.iter().position(|id| id == b)?;
    self.get(i, j)
  }

  /// Instruments whose changes never vary over the sample.
  pub fn undefined_columns(&self) -> Vec<&str> {
    (0..self.len())
      .filter(|&i| self.get(i, i).is_none())
      .map(|i| self.instruments[i].as_str())
      .collect()
  }
}

fn deviations(column: ArrayView1<'_, f64>) -> Vec<f64> {
  let mean = column.mean().unwrap_or(0.0);
  column.iter().map(|v| v - mean).collect()
}

/// Build the correlation matrix over all rows of `changes`.
pub fn correlation_matrix(changes: &ChangeMatrix) -> Result<CorrelationMatrix> {
  let (rows, cols) = changes.values.dim();
  if rows < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      got: rows,
    });
  }

  let devs: Vec<Vec<f64>> = (0..cols).map(|k| deviations(changes.column(k))).collect();
  let sum_sq: Vec<f64> = devs
    .iter()
    .map(|d| d.iter().map(|v| v * v).sum::<f64>())
    .collect();
  let varies: Vec<bool> = sum_sq
    .iter()
    .map(|s| s / rows as f64 > VARIANCE_EPSILON)
    .collect();

  let mut values = Array2::<Option<f64>>::from_elem((cols, cols), None);
  for i in 0..cols {
    if !varies[i] {
      warn!(instrument = %changes.instruments[i], "constant series, correlation undefined");
      continue;
    }
    values[[i, i]] = Some(1.0);

    for j in (i + 1)..cols {
      if !varies[j] {
        continue;
      }
      let cross: f64 = devs[i].iter().zip(&devs[j]).map(|(a, b)| a * b).sum();
      let r = (cross / (sum_sq[i].sqrt() * sum_sq[j].sqrt())).clamp(-1.0, 1.0);
      values[[i, j]] = Some(r);
      values[[j, i]] = Some(r);
    }
  }

  Ok(CorrelationMatrix {
    instruments: changes.instruments.clone(),
    values,
  })
}

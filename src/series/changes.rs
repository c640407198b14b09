//! # Percentage Changes
//!
//! $$
//! r_i^{(k)} = \frac{P_{i+1}^{(k)} - P_i^{(k)}}{P_i^{(k)}}
//! $$
//!
use ndarray::Array2;

use super::AlignedPrices;
use super::ChangeMatrix;
use crate::error::AnalyticsError;
use crate::error::Result;

/// Convert aligned closes into period-over-period percentage changes.
///
/// The output has one row fewer than the input and drops the first date. A base
/// price that is zero or negative fails the whole transform.
pub fn percentage_changes(aligned: &AlignedPrices) -> Result<ChangeMatrix> {
  let (rows, cols) = aligned.prices.dim();
  if rows < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      got: rows,
    });
  }

  let mut values = Array2::<f64>::zeros((rows - 1, cols));
  for k in 0..cols {
    let column = aligned.prices.column(k);
    for i in 0..rows - 1 {
      let base = column[i];
      if base <= 0.0 {
        return Err(AnalyticsError::ArithmeticDomain {
          instrument: aligned.instruments[k].clone(),
          date: aligned.dates[i],
          price: base,
        });
      }
      values[[i, k]] = (column[i + 1] - base) / base;
    }
  }

  Ok(ChangeMatrix {
    instruments: aligned.instruments.clone(),
    dates: aligned.dates[1..].to_vec(),
    values,
  })
}

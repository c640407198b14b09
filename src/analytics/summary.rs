//! # Multivariate Summary
//!
//! $$
//! \sigma_{\text{annual}} = \sigma_{\text{period}}\sqrt{N_{\text{periods/year}}}
//! $$
//!
//! Per-instrument maximum change and horizon-scaled standard deviation.

use ndarray_stats::QuantileExt;
use statrs::statistics::Statistics;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::series::ChangeMatrix;
use crate::series::SamplingPeriod;
use crate::series::StdDevHorizons;

/// Summary statistics of one instrument's percentage changes.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentSummary {
  pub name: String,
  /// Largest single-period change.
  pub max_change: f64,
  /// Sample std-dev, raw and scaled to longer horizons.
  pub std_dev: StdDevHorizons,
}

/// Summarise every column of `changes`.
pub fn summarize(changes: &ChangeMatrix, period: SamplingPeriod) -> Result<Vec<InstrumentSummary>> {
  let rows = changes.nrows();
  if rows < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      got: rows,
    });
  }

  let summaries = changes
    .instruments
    .iter()
    .enumerate()
    .map(|(k, name)| {
      let column = changes.column(k);
      let max_change = *column.max_skipnan();
      let std_dev = column.iter().std_dev();

      InstrumentSummary {
        name: name.clone(),
        max_change,
        std_dev: period.scale_std_dev(std_dev),
      }
    })
    .collect();

  Ok(summaries)
}

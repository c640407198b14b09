//! # Analytics
//!
//! $$
//! \mathbf C = D^{-1/2}\,\Sigma\,D^{-1/2},\qquad D=\operatorname{diag}(\Sigma)
//! $$
//!
//! Full-sample analytics over a percentage-change matrix: the Pearson correlation
//! matrix and per-instrument dispersion statistics.

pub mod correlation;
pub mod summary;

use std::fmt;

use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;

use crate::error::Result;
use crate::series::ChangeMatrix;
use crate::series::SamplingPeriod;

pub use correlation::correlation_matrix;
pub use correlation::CorrelationMatrix;
pub use summary::summarize;
pub use summary::InstrumentSummary;

/// Correlation matrix plus per-instrument summary for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationReport {
  pub period: SamplingPeriod,
  /// Number of change rows the statistics were computed over.
  pub observations: usize,
  pub matrix: CorrelationMatrix,
  pub summaries: Vec<InstrumentSummary>,
}

/// Compute the full-sample report for `changes`.
pub fn correlation_report(changes: &ChangeMatrix, period: SamplingPeriod) -> Result<CorrelationReport> {
  Ok(CorrelationReport {
    period,
    observations: changes.nrows(),
    matrix: correlation_matrix(changes)?,
    summaries: summarize(changes, period)?,
  })
}

fn fmt_cell(value: Option<f64>) -> Cell {
  match value {
    Some(v) => Cell::new(&format!("{v:.4}")),
    None => Cell::new("-"),
  }
}

impl CorrelationReport {
  /// Render the matrix and summary rows as a text table.
  pub fn to_table(&self) -> Table {
    let mut table = Table::new();

    let mut header = vec![Cell::new("")];
    header.extend(self.matrix.instruments.iter().map(|id| Cell::new(id)));
    header.extend(["max", "sd", "sd month", "sd year"].map(Cell::new));
    table.add_row(Row::new(header));

    for (i, summary) in self.summaries.iter().enumerate() {
      let mut row = vec![Cell::new(&summary.name)];
      row.extend((0..self.matrix.len()).map(|j| fmt_cell(self.matrix.get(i, j))));
      row.push(fmt_cell(Some(summary.max_change)));
      row.push(fmt_cell(summary.std_dev.daily.or(Some(summary.std_dev.monthly))));
      row.push(fmt_cell(Some(summary.std_dev.monthly)));
      row.push(fmt_cell(Some(summary.std_dev.annual)));
      table.add_row(Row::new(row));
    }

    table
  }
}

impl fmt::Display for CorrelationReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{:?} changes, {} observations", self.period, self.observations)?;
    write!(f, "{}", self.to_table())
  }
}

//! # Errors
//!
//! $$
//! \text{fatal}: \text{request}\to\bot,\qquad \text{local}: t\mapsto\texttt{None}
//! $$
//!
//! Request-level failures. Faults that only affect one index of a rolling series
//! (a zero variance denominator) are not errors; they surface as `None` entries.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while aligning, transforming or analysing price histories.
#[derive(Debug, Error)]
pub enum AnalyticsError {
  /// Too few aligned dates (or fewer dates than the requested window).
  #[error("insufficient data: required {required}, got {got}")]
  InsufficientData { required: usize, got: usize },

  /// Percentage change from a zero or negative base price.
  #[error("non-positive base price {price} for {instrument} on {date}")]
  ArithmeticDomain {
    instrument: String,
    date: NaiveDate,
    price: f64,
  },

  /// Invalid window spec, range or pair selection.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// Input series breaks the ordering/finiteness contract.
  #[error("invalid series {instrument}: {reason}")]
  InvalidSeries { instrument: String, reason: String },

  /// A [`crate::source::PriceSource`] failed to deliver a series.
  #[error("failed to load price history for {instrument}")]
  DataSource {
    instrument: String,
    #[source]
    source: anyhow::Error,
  },
}

impl AnalyticsError {
  pub(crate) fn config(msg: impl Into<String>) -> Self {
    Self::Configuration(msg.into())
  }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

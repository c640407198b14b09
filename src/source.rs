//! # Price Sources
//!
//! $$
//! \text{load}:\ (\text{instrument}, [t_0, t_1]) \to \{(t, P_t)\}
//! $$
//!
//! Contract of the external price-history store, plus a parallel prefetch stage
//! that completes before any analytics run.

use std::collections::HashMap;

use anyhow::anyhow;
use rayon::prelude::*;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::series::DateRange;
use crate::series::InstrumentSeries;

/// Supplies close-price histories.
///
/// Implementations may return a superset of `range`; callers restrict it.
pub trait PriceSource: Sync {
  fn load(&self, instrument: &str, range: &DateRange) -> anyhow::Result<InstrumentSeries>;
}

/// Price source backed by series already in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
  series: HashMap<String, InstrumentSeries>,
}

impl InMemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, series: InstrumentSeries) {
    self.series.insert(series.id().to_string(), series);
  }
}

impl FromIterator<InstrumentSeries> for InMemorySource {
  fn from_iter<I: IntoIterator<Item = InstrumentSeries>>(iter: I) -> Self {
    let mut source = Self::new();
    for s in iter {
      source.insert(s);
    }
    source
  }
}

impl PriceSource for InMemorySource {
  fn load(&self, instrument: &str, range: &DateRange) -> anyhow::Result<InstrumentSeries> {
    self
      .series
      .get(instrument)
      .map(|s| s.within(range))
      .ok_or_else(|| anyhow!("unknown instrument {instrument}"))
  }
}

/// Load every instrument in parallel and return the series in request order.
///
/// The first failure aborts the whole prefetch.
pub fn prefetch<S: PriceSource + ?Sized>(
  source: &S,
  instruments: &[String],
  range: &DateRange,
) -> Result<Vec<InstrumentSeries>> {
  debug!(count = instruments.len(), from = %range.from, to = %range.to, "prefetching price series");

  instruments
    .par_iter()
    .map(|id| {
      source
        .load(id, range)
        .map(|s| s.within(range))
        .map_err(|err| AnalyticsError::DataSource {
          instrument: id.clone(),
          source: err,
        })
    })
    .collect()
}

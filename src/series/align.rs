//! # Alignment
//!
//! $$
//! \mathcal D = \bigcap_{k=1}^{K} \{\,t : P_t^{(k)}\ \text{observed}\,\}
//! $$
//!
//! Merges independent close-price histories onto one sorted date axis.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::Array2;
use tracing::debug;

use super::AlignedPrices;
use super::DateRange;
use super::FillPolicy;
use super::InstrumentSeries;
use super::SamplingPeriod;
use crate::error::AnalyticsError;
use crate::error::Result;

/// Bucket each observation inside `range` by sampling period; the last close of a
/// bucket wins.
fn bucketed(series: &InstrumentSeries, range: &DateRange, period: SamplingPeriod) -> BTreeMap<NaiveDate, f64> {
  let mut out = BTreeMap::new();
  for &(date, close) in series.points() {
    if range.contains(date) {
      out.insert(period.bucket(date), close);
    }
  }
  out
}

fn intersect_dates(maps: &[BTreeMap<NaiveDate, f64>]) -> Vec<NaiveDate> {
  let Some((first, rest)) = maps.split_first() else {
    return Vec::new();
  };

  first
    .keys()
    .copied()
    .filter(|date| rest.iter().all(|m| m.contains_key(date)))
    .collect()
}

fn forward_fill_dates(maps: &[BTreeMap<NaiveDate, f64>]) -> Vec<NaiveDate> {
  // every instrument needs a first observation before any date is usable
  let firsts: Option<Vec<NaiveDate>> = maps.iter().map(|m| m.keys().next().copied()).collect();
  let Some(start) = firsts.and_then(|f| f.into_iter().max()) else {
    return Vec::new();
  };

  let union: BTreeSet<NaiveDate> = maps
    .iter()
    .flat_map(|m| m.range(start..).map(|(d, _)| *d))
    .collect();
  union.into_iter().collect()
}

fn last_close_at(map: &BTreeMap<NaiveDate, f64>, date: NaiveDate) -> Option<f64> {
  map.range(..=date).next_back().map(|(_, close)| *close)
}

/// Align `series` on the dates inside `range`.
///
/// Column order follows the input order. Fails with
/// [`AnalyticsError::InsufficientData`] when fewer than two dates survive.
pub fn align_series(
  series: &[InstrumentSeries],
  range: &DateRange,
  period: SamplingPeriod,
  fill: FillPolicy,
) -> Result<AlignedPrices> {
  if series.is_empty() {
    return Err(AnalyticsError::config("at least one instrument is required"));
  }

  let mut seen = HashSet::new();
  for s in series {
    if !seen.insert(s.id()) {
      return Err(AnalyticsError::config(format!(
        "instrument {} requested more than once",
        s.id()
      )));
    }
  }

  let maps: Vec<_> = series.iter().map(|s| bucketed(s, range, period)).collect();

  let dates = match fill {
    FillPolicy::Intersect => intersect_dates(&maps),
    FillPolicy::ForwardFill => forward_fill_dates(&maps),
  };

  let observed: BTreeSet<NaiveDate> = maps.iter().flat_map(|m| m.keys().copied()).collect();
  debug!(
    instruments = series.len(),
    ?period,
    ?fill,
    kept = dates.len(),
    dropped = observed.len().saturating_sub(dates.len()),
    "aligned price series"
  );

  if dates.len() < 2 {
    return Err(AnalyticsError::InsufficientData {
      required: 2,
      got: dates.len(),
    });
  }

  let mut prices = Array2::<f64>::zeros((dates.len(), series.len()));
  for (col, map) in maps.iter().enumerate() {
    for (row, date) in dates.iter().enumerate() {
      prices[[row, col]] = match fill {
        FillPolicy::Intersect => map.get(date).copied(),
        FillPolicy::ForwardFill => last_close_at(map, *date),
      }
      .ok_or_else(|| AnalyticsError::InvalidSeries {
        instrument: series[col].id().to_string(),
        reason: format!("no close on or before {date}"),
      })?;
    }
  }

  Ok(AlignedPrices {
    instruments: series.iter().map(|s| s.id().to_string()).collect(),
    dates,
    prices,
  })
}

//! # Series
//!
//! $$
//! r_t^{(k)} = \frac{P_t^{(k)} - P_{t-1}^{(k)}}{P_{t-1}^{(k)}}
//! $$
//!
//! Price-history containers, the common date axis and the sampling conventions
//! shared by every analytics stage.

pub mod align;
pub mod changes;

use chrono::Datelike;
use chrono::Days;
use chrono::Months;
use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;

use crate::error::AnalyticsError;
use crate::error::Result;

pub use align::align_series;
pub use changes::percentage_changes;

/// Conventional trading days per month (square-root-of-time scaling).
pub const TRADING_DAYS_PER_MONTH: f64 = 21.0;
/// Conventional trading days per year (square-root-of-time scaling).
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Months per year.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Sampling frequency of a request. Drives date bucketing and annualization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplingPeriod {
  Daily,
  Monthly,
}

/// Std-dev of one instrument scaled to each horizon available for its period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StdDevHorizons {
  /// Raw daily std-dev. `None` for monthly sampling.
  pub daily: Option<f64>,
  pub monthly: f64,
  pub annual: f64,
}

impl SamplingPeriod {
  /// Scale a per-period std-dev with the square-root-of-time rule.
  pub fn scale_std_dev(self, std_dev: f64) -> StdDevHorizons {
    match self {
      SamplingPeriod::Daily => StdDevHorizons {
        daily: Some(std_dev),
        monthly: std_dev * TRADING_DAYS_PER_MONTH.sqrt(),
        annual: std_dev * TRADING_DAYS_PER_YEAR.sqrt(),
      },
      SamplingPeriod::Monthly => StdDevHorizons {
        daily: None,
        monthly: std_dev,
        annual: std_dev * MONTHS_PER_YEAR.sqrt(),
      },
    }
  }

  /// Date key an observation is bucketed under.
  pub(crate) fn bucket(self, date: NaiveDate) -> NaiveDate {
    match self {
      SamplingPeriod::Daily => date,
      SamplingPeriod::Monthly => month_end(date),
    }
  }
}

fn month_end(date: NaiveDate) -> NaiveDate {
  date
    .with_day0(0)
    .and_then(|first| first.checked_add_months(Months::new(1)))
    .and_then(|next| next.pred_opt())
    .unwrap_or(date)
}

/// Inclusive calendar range `[from, to]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
  pub from: NaiveDate,
  pub to: NaiveDate,
}

impl DateRange {
  pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
    if from > to {
      return Err(AnalyticsError::config(format!(
        "date range start {from} is after end {to}"
      )));
    }
    Ok(Self { from, to })
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.from <= date && date <= self.to
  }

  /// Move `from` back by `window + 1` periods so that the first full window ends
  /// on the originally requested start date.
  pub fn extend_for_window(&self, period: SamplingPeriod, window: usize) -> Result<Self> {
    let steps = window as u64 + 1;
    let from = match period {
      SamplingPeriod::Daily => self.from.checked_sub_days(Days::new(steps)),
      SamplingPeriod::Monthly => u32::try_from(steps)
        .ok()
        .and_then(|m| self.from.checked_sub_months(Months::new(m))),
    }
    .ok_or_else(|| {
      AnalyticsError::config(format!(
        "look-back of {steps} periods from {} is out of the calendar range",
        self.from
      ))
    })?;

    Ok(Self { from, to: self.to })
  }
}

/// How dates missing from some instruments are handled during alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillPolicy {
  /// Keep only dates present in every series.
  #[default]
  Intersect,
  /// Keep every date on which all instruments have started trading, carrying
  /// each instrument's last close forward.
  ForwardFill,
}

/// Closing-price history of one instrument, strictly increasing by date.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentSeries {
  id: String,
  points: Vec<(NaiveDate, f64)>,
}

impl InstrumentSeries {
  pub fn new(id: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Result<Self> {
    let id = id.into();

    for w in points.windows(2) {
      if w[1].0 <= w[0].0 {
        return Err(AnalyticsError::InvalidSeries {
          instrument: id,
          reason: format!("date {} does not follow {}", w[1].0, w[0].0),
        });
      }
    }

    if let Some((date, price)) = points.iter().find(|(_, p)| !p.is_finite()) {
      return Err(AnalyticsError::InvalidSeries {
        instrument: id,
        reason: format!("non-finite close {price} on {date}"),
      });
    }

    Ok(Self { id, points })
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn points(&self) -> &[(NaiveDate, f64)] {
    &self.points
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Sub-series restricted to `range`.
  pub fn within(&self, range: &DateRange) -> Self {
    Self {
      id: self.id.clone(),
      points: self
        .points
        .iter()
        .copied()
        .filter(|(d, _)| range.contains(*d))
        .collect(),
    }
  }
}

/// Close prices on a common date axis. Rows follow `dates`, columns follow `instruments`.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedPrices {
  pub instruments: Vec<String>,
  pub dates: Vec<NaiveDate>,
  pub prices: Array2<f64>,
}

/// Period-over-period percentage changes. Row `i` is dated by the later of the two
/// prices it was formed from.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeMatrix {
  pub instruments: Vec<String>,
  pub dates: Vec<NaiveDate>,
  pub values: Array2<f64>,
}

impl ChangeMatrix {
  pub fn nrows(&self) -> usize {
    self.values.nrows()
  }

  pub fn ncols(&self) -> usize {
    self.values.ncols()
  }

  pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
    self.values.column(index)
  }

  /// Column index of an instrument.
  pub fn position(&self, instrument: &str) -> Option<usize> {
    self.instruments.iter().position(|id| id == instrument)
  }
}

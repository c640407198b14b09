//! # Analytics Engine
//!
//! $$
//! \{P^{(k)}\}\xrightarrow{\text{align}}\mathbf P\xrightarrow{\Delta\%}\mathbf R\to(\mathbf C,\ \rho_t,\ \beta_t,\ \operatorname{Cov}_t)
//! $$
//!
//! High-level orchestration: date-range look-back, alignment, percentage changes
//! and dispatch to the full-sample or rolling analytics.

use std::collections::HashSet;

use tracing::debug;

use crate::analytics::correlation_report;
use crate::analytics::CorrelationReport;
use crate::error::AnalyticsError;
use crate::error::Result;
use crate::rolling::rolling_pair;
use crate::rolling::RollingResult;
use crate::rolling::WindowSpec;
use crate::series::align_series;
use crate::series::percentage_changes;
use crate::series::ChangeMatrix;
use crate::series::DateRange;
use crate::series::FillPolicy;
use crate::series::InstrumentSeries;
use crate::series::SamplingPeriod;
use crate::source::prefetch;
use crate::source::PriceSource;

/// Runtime configuration for [`AnalyticsEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalyticsEngineConfig {
  /// Sampling period of every request served by the engine.
  pub period: SamplingPeriod,
  /// Handling of dates missing from some instruments.
  pub fill: FillPolicy,
}

impl AnalyticsEngineConfig {
  /// Configuration with the default (intersecting) fill policy.
  pub fn new(period: SamplingPeriod) -> Self {
    Self {
      period,
      fill: FillPolicy::default(),
    }
  }
}

/// Single entry point for correlation and rolling-statistics requests.
///
/// Holds no state besides its configuration, so one engine can serve
/// concurrent requests.
#[derive(Clone, Debug)]
pub struct AnalyticsEngine {
  config: AnalyticsEngineConfig,
}

impl AnalyticsEngine {
  pub fn new(config: AnalyticsEngineConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &AnalyticsEngineConfig {
    &self.config
  }

  /// Align `series` inside `range` and convert them to percentage changes.
  pub fn changes(&self, series: &[InstrumentSeries], range: &DateRange) -> Result<ChangeMatrix> {
    let aligned = align_series(series, range, self.config.period, self.config.fill)?;
    percentage_changes(&aligned)
  }

  /// Full-sample correlation matrix and summary of `series` inside `range`.
  pub fn correlation(&self, series: &[InstrumentSeries], range: &DateRange) -> Result<CorrelationReport> {
    let changes = self.changes(series, range)?;
    correlation_report(&changes, self.config.period)
  }

  /// One rolling result per pair.
  ///
  /// `series` must reach back far enough for the look-back: `range.from` is moved
  /// back by `spec.size + 1` periods before alignment so the first full window
  /// lands on the requested start date. Each pair is aligned on its own dates, so
  /// its result does not depend on the other pairs of the request.
  pub fn rolling(
    &self,
    series: &[InstrumentSeries],
    pairs: &[(String, String)],
    range: &DateRange,
    spec: &WindowSpec,
  ) -> Result<Vec<RollingResult>> {
    validate_pairs(pairs, spec)?;
    let extended = range.extend_for_window(self.config.period, spec.size)?;

    let lookup = |id: &str| {
      series
        .iter()
        .find(|s| s.id() == id)
        .ok_or_else(|| AnalyticsError::config(format!("no price series supplied for {id}")))
    };

    debug!(
      pairs = pairs.len(),
      from = %extended.from,
      to = %extended.to,
      "rolling request"
    );

    pairs
      .iter()
      .map(|(x, y)| {
        let selected = [lookup(x)?.clone(), lookup(y)?.clone()];
        let changes = self.changes(&selected, &extended)?;
        rolling_pair(&changes, x, y, spec)
      })
      .collect()
  }

  /// [`AnalyticsEngine::correlation`] over series fetched from `source`.
  pub fn correlation_from_source<S: PriceSource + ?Sized>(
    &self,
    source: &S,
    instruments: &[String],
    range: &DateRange,
  ) -> Result<CorrelationReport> {
    let series = prefetch(source, instruments, range)?;
    self.correlation(&series, range)
  }

  /// [`AnalyticsEngine::rolling`] over series fetched from `source`, including the
  /// look-back extension.
  pub fn rolling_from_source<S: PriceSource + ?Sized>(
    &self,
    source: &S,
    pairs: &[(String, String)],
    range: &DateRange,
    spec: &WindowSpec,
  ) -> Result<Vec<RollingResult>> {
    let instruments = validate_pairs(pairs, spec)?;
    let extended = range.extend_for_window(self.config.period, spec.size)?;
    let series = prefetch(source, &instruments, &extended)?;
    self.rolling(&series, pairs, range, spec)
  }
}

/// Validate a rolling request and list its distinct instruments in first-seen order.
fn validate_pairs(pairs: &[(String, String)], spec: &WindowSpec) -> Result<Vec<String>> {
  spec.validate()?;
  if pairs.is_empty() {
    return Err(AnalyticsError::config("at least one instrument pair is required"));
  }

  let mut seen = HashSet::new();
  let mut instruments = Vec::new();
  for (x, y) in pairs {
    if x == y {
      return Err(AnalyticsError::config(format!(
        "pair names the same instrument twice: {x}"
      )));
    }
    for id in [x, y] {
      if seen.insert(id.as_str()) {
        instruments.push(id.clone());
      }
    }
  }

  Ok(instruments)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::Days;
  use chrono::Months;
  use chrono::NaiveDate;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;
  use rand_distr::Normal;
  use tracing_test::traced_test;

  use super::*;
  use crate::rolling::Normalization;
  use crate::rolling::Statistic;
  use crate::rolling::WindowMode;
  use crate::source::InMemorySource;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  fn prices_from_changes(changes: &[f64]) -> Vec<f64> {
    let mut out = vec![100.0];
    for r in changes {
      let last = *out.last().unwrap();
      out.push(last * (1.0 + r));
    }
    out
  }

  fn random_changes(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0003, 0.01).unwrap();
    (0..n).map(|_| rng.sample(noise)).collect()
  }

  fn daily(id: &str, start: NaiveDate, closes: &[f64]) -> InstrumentSeries {
    InstrumentSeries::new(id, start.iter_days().zip(closes.iter().copied()).collect()).unwrap()
  }

  fn pair(x: &str, y: &str) -> (String, String) {
    (x.to_string(), y.to_string())
  }

  fn engine(period: SamplingPeriod) -> AnalyticsEngine {
    AnalyticsEngine::new(AnalyticsEngineConfig::new(period))
  }

  #[test]
  fn correlation_report_end_to_end() {
    let start = d(2024, 1, 1);
    let base = random_changes(120, 1);
    let a = prices_from_changes(&base);
    let b: Vec<f64> = a.iter().map(|p| p * 3.0).collect();
    let c = prices_from_changes(&random_changes(120, 2));

    let series = vec![daily("A", start, &a), daily("B", start, &b), daily("C", start, &c)];
    let range = DateRange::new(start, d(2024, 12, 31)).unwrap();

    let report = engine(SamplingPeriod::Daily).correlation(&series, &range).unwrap();

    assert_eq!(report.observations, 120);
    assert_abs_diff_eq!(report.matrix.between("A", "B").unwrap(), 1.0, epsilon = 1e-9);
    for i in 0..3 {
      assert_eq!(report.matrix.get(i, i), Some(1.0));
      for j in 0..3 {
        assert_abs_diff_eq!(
          report.matrix.get(i, j).unwrap(),
          report.matrix.get(j, i).unwrap(),
          epsilon = 1e-9
        );
      }
    }
    let h = report.summaries[0].std_dev;
    assert_abs_diff_eq!(h.annual, h.daily.unwrap() * 252f64.sqrt(), epsilon = 1e-12);
  }

  #[test]
  fn daily_look_back_covers_requested_start() {
    let start = d(2024, 1, 1);
    let closes = prices_from_changes(&random_changes(90, 3));
    let other = prices_from_changes(&random_changes(90, 4));
    let series = vec![daily("X", start, &closes), daily("Y", start, &other)];

    let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 31)).unwrap();
    let spec = WindowSpec::new(5, WindowMode::Fixed, Normalization::Sample, Statistic::Beta, false);

    let out = engine(SamplingPeriod::Daily)
      .rolling(&series, &[pair("X", "Y")], &range, &spec)
      .unwrap();
    let result = &out[0];

    // prices from Feb 24, first change dated Feb 25
    assert_eq!(result.dates[0], range.from - Days::new(5));
    assert_eq!(result.dates.last(), Some(&range.to));
    assert!(result.values[..4].iter().all(Option::is_none));
    let at_start = result.dates.iter().position(|d| *d == range.from).unwrap();
    assert!(result.values[at_start].is_some());
  }

  #[test]
  fn monthly_look_back_covers_requested_start() {
    let first = d(2022, 1, 31);
    let changes = random_changes(30, 5);
    let closes = prices_from_changes(&changes);
    let month_ends = |n: usize| -> Vec<(NaiveDate, f64)> {
      (0..n)
        .map(|i| (first.checked_add_months(Months::new(i as u32)).unwrap(), closes[i]))
        .collect()
    };
    let x = InstrumentSeries::new("X", month_ends(30)).unwrap();
    let y_points = month_ends(30).into_iter().map(|(d, p)| (d, p.sqrt())).collect();
    let y = InstrumentSeries::new("Y", y_points).unwrap();

    let range = DateRange::new(d(2024, 1, 31), d(2024, 6, 30)).unwrap();
    let spec = WindowSpec::new(3, WindowMode::Fixed, Normalization::Population, Statistic::Correlation, true);

    let out = engine(SamplingPeriod::Monthly)
      .rolling(&[x, y], &[pair("X", "Y")], &range, &spec)
      .unwrap();
    let result = &out[0];

    // look-back starts at 2023-09-30; the first full window ends 2023-12-31
    assert_eq!(result.dates[0], d(2023, 12, 31));
    assert!(result.dates.contains(&range.from));
    assert_eq!(result.undefined_count(), 0);
  }

  #[test]
  fn rolling_rejects_same_instrument_pair() {
    let spec = WindowSpec::new(3, WindowMode::Fixed, Normalization::Sample, Statistic::Beta, false);
    let range = DateRange::new(d(2024, 1, 1), d(2024, 2, 1)).unwrap();

    let err = engine(SamplingPeriod::Daily)
      .rolling(&[], &[pair("X", "X")], &range, &spec)
      .unwrap_err();
    assert!(matches!(err, AnalyticsError::Configuration(_)));
  }

  #[test]
  fn rolling_rejects_short_history() {
    let start = d(2024, 1, 1);
    let series = vec![
      daily("X", start, &[1.0, 1.1, 1.2, 1.1]),
      daily("Y", start, &[2.0, 2.1, 2.0, 2.2]),
    ];
    let range = DateRange::new(d(2024, 1, 3), d(2024, 1, 4)).unwrap();
    let spec = WindowSpec::new(10, WindowMode::Expanding, Normalization::Sample, Statistic::Covariance, false);

    let err = engine(SamplingPeriod::Daily)
      .rolling(&series, &[pair("X", "Y")], &range, &spec)
      .unwrap_err();
    assert!(matches!(err, AnalyticsError::InsufficientData { required: 10, got: 3 }));
  }

  #[test]
  #[traced_test]
  fn source_backed_requests_prefetch_then_compute() {
    let start = d(2024, 1, 1);
    let source: InMemorySource = ["A", "B", "C"]
      .into_iter()
      .enumerate()
      .map(|(k, id)| daily(id, start, &prices_from_changes(&random_changes(200, 10 + k as u64))))
      .collect();

    let engine = engine(SamplingPeriod::Daily);
    let range = DateRange::new(d(2024, 3, 1), d(2024, 6, 30)).unwrap();
    let ids: Vec<String> = vec!["A".into(), "B".into(), "C".into()];

    let report = engine.correlation_from_source(&source, &ids, &range).unwrap();
    assert_eq!(report.matrix.instruments, ids);

    let spec = WindowSpec::new(20, WindowMode::Expanding, Normalization::Population, Statistic::Correlation, false);
    let rolled = engine
      .rolling_from_source(&source, &[pair("A", "B"), pair("C", "A")], &range, &spec)
      .unwrap();

    assert_eq!(rolled.len(), 2);
    assert_eq!((rolled[1].x.as_str(), rolled[1].y.as_str()), ("C", "A"));
    assert!(rolled.iter().all(|r| r.values[..19].iter().all(Option::is_none)));
    assert!(logs_contain("prefetching price series"));
    assert!(logs_contain("rolling request"));
  }

  #[test]
  fn pair_result_ignores_other_pairs_in_the_request() {
    let start = d(2024, 1, 1);
    let a = daily("A", start, &prices_from_changes(&random_changes(90, 21)));
    let b = daily("B", start, &prices_from_changes(&random_changes(90, 22)));
    let d_series = daily("D", start, &prices_from_changes(&random_changes(90, 23)));
    // C only trades every third day
    let c_closes = prices_from_changes(&random_changes(90, 24));
    let c_points = start
      .iter_days()
      .zip(c_closes)
      .step_by(3)
      .collect();
    let c = InstrumentSeries::new("C", c_points).unwrap();

    let series = vec![a, b, c, d_series];
    let range = DateRange::new(d(2024, 1, 15), d(2024, 3, 15)).unwrap();
    let spec = WindowSpec::new(5, WindowMode::Fixed, Normalization::Sample, Statistic::Correlation, true);
    let engine = engine(SamplingPeriod::Daily);

    let alone = engine.rolling(&series, &[pair("A", "B")], &range, &spec).unwrap();
    let together = engine
      .rolling(&series, &[pair("A", "B"), pair("C", "D")], &range, &spec)
      .unwrap();

    assert_eq!(alone[0], together[0]);
    assert_eq!(together[0].dates[1] - together[0].dates[0], chrono::Duration::days(1));
    assert_eq!(together[1].dates[1] - together[1].dates[0], chrono::Duration::days(3));
  }

  #[test]
  fn missing_series_is_a_configuration_error() {
    let start = d(2024, 1, 1);
    let series = vec![daily("X", start, &[1.0, 1.1, 1.2, 1.1])];
    let range = DateRange::new(start, d(2024, 1, 4)).unwrap();
    let spec = WindowSpec::new(2, WindowMode::Fixed, Normalization::Sample, Statistic::Covariance, false);

    let err = engine(SamplingPeriod::Daily)
      .rolling(&series, &[pair("X", "Y")], &range, &spec)
      .unwrap_err();
    assert!(matches!(err, AnalyticsError::Configuration(_)));
  }
}

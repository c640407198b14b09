//! # correlation-rs
//!
//! $$
//! \rho_{xy}=\frac{\operatorname{Cov}(x,y)}{\sigma_x\sigma_y},\qquad \beta_{xy}=\frac{\operatorname{Cov}(x,y)}{\sigma_y^2}
//! $$
//!
//! Correlation and rolling-statistics analytics over the closing-price histories
//! of financial instruments.
//!
//! ## Modules
//!
//! | Module        | Description                                                                              |
//! |---------------|------------------------------------------------------------------------------------------|
//! | [`series`]    | Price histories, date alignment, percentage changes and sampling conventions.            |
//! | [`analytics`] | Full-sample Pearson correlation matrix and annualized dispersion summary.                |
//! | [`rolling`]   | Fixed and expanding window covariance, correlation and beta in a single O(n) scan.       |
//! | [`source`]    | Price-store contract and the parallel prefetch stage.                                    |
//! | [`engine`]    | Request orchestration: look-back extension, alignment and dispatch.                     |
//! | [`error`]     | Request-level error taxonomy.                                                            |
//!
//! Every computation is a pure function of its inputs; the engine keeps no state
//! between requests and may be shared across threads.
//!
//! ## Example Usage
//!
//! ```rust
//! use correlation_rs::engine::AnalyticsEngine;
//! use correlation_rs::engine::AnalyticsEngineConfig;
//! use correlation_rs::rolling::{Normalization, Statistic, WindowMode, WindowSpec};
//! use correlation_rs::series::SamplingPeriod;
//!
//! let engine = AnalyticsEngine::new(AnalyticsEngineConfig::new(SamplingPeriod::Daily));
//! let spec = WindowSpec::new(63, WindowMode::Fixed, Normalization::Sample, Statistic::Beta, true);
//! let betas = engine.rolling(&series, &pairs, &range, &spec)?;
//! ```

pub mod analytics;
pub mod engine;
pub mod error;
pub mod rolling;
pub mod series;
pub mod source;

pub use error::AnalyticsError;
pub use error::Result;

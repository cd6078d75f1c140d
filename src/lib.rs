//! Forecasts daily event counts (cargo thefts) from a sparse history log.
//!
//! The pipeline loads a CSV event log, zero-fills it into a dense daily
//! series, fits an additive trend + seasonality model, forecasts a horizon
//! with uncertainty bands and highlights the future days whose forecast
//! crosses a threshold. A monthly linear trend predictor is included as a
//! second, simpler model.

pub mod chart;
pub mod cli;
pub mod config;
pub mod decomposition;
pub mod densify;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod history;
pub mod interactive;
pub mod progress;
pub mod regression;
pub mod session;
pub mod utils;

pub use config::AppConfig;
pub use decomposition::{DecompositionForecaster, DecompositionSettings};
pub use densify::{DensePoint, DenseSeries, densify};
pub use engine::{ForecastEngine, ForecastPoint, ForecastResult, Forecaster};
pub use error::{ForecastError, Result};
pub use highlight::{HighlightRule, HighlightSet, highlight};
pub use history::{AppendOutcome, ConfirmOverwrite, EventRecord, HistoryLog, HistoryStore};
pub use session::{ForecastSession, SessionState};

use crate::decomposition::DecompositionForecaster;
use crate::densify::{DenseSeries, densify};
use crate::engine::{ForecastEngine, ForecastResult, Forecaster, check_horizon};
use crate::error::{ForecastError, Result};
use crate::highlight::{HighlightRule, HighlightSet, highlight};
use crate::history::{AppendOutcome, ConfirmOverwrite, EventRecord, HistoryLog, HistoryStore};

/// Progress of a forecasting session.
///
/// Moves forward `Loaded -> Densified -> Fitted -> Predicted -> Highlighted`.
/// A successful append drops back to `Densified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    Densified,
    Fitted,
    Predicted,
    Highlighted,
}

/// Owns one event log together with everything derived from it.
///
/// The dense series, fitted model and last forecast are caches over the log;
/// every successful append discards them, so the next forecast always
/// reflects the persisted history.
pub struct ForecastSession<F: Forecaster = DecompositionForecaster> {
    store: HistoryStore,
    log: HistoryLog,
    dense: Option<DenseSeries>,
    engine: ForecastEngine<F>,
    last_forecast: Option<ForecastResult>,
    state: SessionState,
}

impl<F: Forecaster> ForecastSession<F> {
    /// Loads the log behind `store` and starts a session on it.
    pub fn open(store: HistoryStore, forecaster: F) -> Result<Self> {
        let log = store.load()?;
        Ok(Self {
            store,
            log,
            dense: None,
            engine: ForecastEngine::new(forecaster),
            last_forecast: None,
            state: SessionState::Loaded,
        })
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn engine(&self) -> &ForecastEngine<F> {
        &self.engine
    }

    pub fn last_forecast(&self) -> Option<&ForecastResult> {
        self.last_forecast.as_ref()
    }

    /// Dense daily view of the log, built on first use.
    pub fn dense_series(&mut self) -> Result<&DenseSeries> {
        self.ensure_dense()?;
        self.dense
            .as_ref()
            .ok_or(ForecastError::EmptyLog)
    }

    /// Fits the model on the current dense series.
    pub fn fit(&mut self) -> Result<()> {
        self.ensure_dense()?;
        let dense = self.dense.as_ref().ok_or(ForecastError::EmptyLog)?;
        self.engine.fit(dense)?;
        self.state = SessionState::Fitted;
        Ok(())
    }

    /// Appends a user supplied record, persisting it and invalidating caches.
    ///
    /// `confirm` is asked once if the date is already logged. A declined
    /// overwrite leaves the session exactly as it was.
    pub fn append<C>(&mut self, date: &str, count: &str, confirm: &mut C) -> Result<AppendOutcome>
    where
        C: ConfirmOverwrite + ?Sized,
    {
        let outcome = self.store.append(&self.log, date, count, confirm)?;
        self.apply(&outcome)?;
        Ok(outcome)
    }

    /// Typed variant of [`ForecastSession::append`].
    pub fn append_record<C>(&mut self, record: EventRecord, confirm: &mut C) -> Result<AppendOutcome>
    where
        C: ConfirmOverwrite + ?Sized,
    {
        let outcome = self.store.append_record(&self.log, record, confirm)?;
        self.apply(&outcome)?;
        Ok(outcome)
    }

    /// Logs `date` with a count of zero unless it is already present.
    ///
    /// This is the "current query" shortcut: when nothing was recorded for
    /// yesterday, the training span is extended up to it.
    ///
    /// # Returns
    /// * `Result<bool>` - `true` if a record was added.
    pub fn append_if_missing(&mut self, date: chrono::NaiveDate) -> Result<bool> {
        if self.log.contains(date) {
            return Ok(false);
        }
        let mut never = |_: EventRecord, _: u32| false;
        let outcome = self.append_record(EventRecord { date, count: 0 }, &mut never)?;
        Ok(outcome.changed())
    }

    /// Forecasts `horizon_days` past the last logged date.
    ///
    /// Fits first if the log changed since the last fit.
    ///
    /// # Errors
    /// * `ForecastError::Predict` for a negative or oversized horizon.
    /// * `ForecastError::EmptyLog` or `ForecastError::Fit` from the earlier stages.
    pub fn forecast(&mut self, horizon_days: i64) -> Result<&ForecastResult> {
        check_horizon(horizon_days)?;
        self.ensure_dense()?;
        let dense = self.dense.as_ref().ok_or(ForecastError::EmptyLog)?;
        let result = self.engine.forecast(dense, horizon_days)?;
        self.state = SessionState::Predicted;
        Ok(&*self.last_forecast.insert(result))
    }

    /// Highlights notable days of the last forecast.
    ///
    /// # Errors
    /// * `ForecastError::Predict` if nothing has been forecast since the last change.
    pub fn highlight(&mut self, rule: &HighlightRule) -> Result<HighlightSet> {
        let result = self
            .last_forecast
            .as_ref()
            .ok_or_else(|| ForecastError::Predict("no forecast available, run a forecast first".to_string()))?;
        let set = highlight(result, result.training_end(), rule);
        self.state = SessionState::Highlighted;
        Ok(set)
    }

    /// Forecasts and highlights in one call.
    pub fn run(&mut self, horizon_days: i64, rule: &HighlightRule) -> Result<(ForecastResult, HighlightSet)> {
        let result = self.forecast(horizon_days)?.clone();
        let set = self.highlight(rule)?;
        Ok((result, set))
    }

    fn ensure_dense(&mut self) -> Result<()> {
        if self.dense.is_none() {
            self.dense = Some(densify(&self.log)?);
            if self.state == SessionState::Loaded {
                self.state = SessionState::Densified;
            }
        }
        Ok(())
    }

    fn apply(&mut self, outcome: &AppendOutcome) -> Result<()> {
        if !outcome.changed() {
            return Ok(());
        }
        self.log = outcome.log().clone();
        self.engine.invalidate();
        self.last_forecast = None;
        self.dense = Some(densify(&self.log)?);
        self.state = SessionState::Densified;
        tracing::info!(records = self.log.len(), "history updated, model will be refitted");
        Ok(())
    }
}

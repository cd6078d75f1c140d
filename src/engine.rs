use crate::densify::DenseSeries;
use crate::error::{ForecastError, Result};

/// Longest horizon accepted by [`ForecastEngine`], ten years of days.
pub const MAX_HORIZON_DAYS: i64 = 3660;

/// Forecast for a single day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: chrono::NaiveDate,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Predictions covering the training span followed by the requested horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    points: Vec<ForecastPoint>,
    training_end: chrono::NaiveDate,
}

impl ForecastResult {
    /// Builds a result from points in ascending date order.
    pub fn new(points: Vec<ForecastPoint>, training_end: chrono::NaiveDate) -> Self {
        Self { points, training_end }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn training_end(&self) -> chrono::NaiveDate {
        self.training_end
    }

    /// Entries up to and including the training end date.
    pub fn fitted(&self) -> &[ForecastPoint] {
        &self.points[..self.split_index()]
    }

    /// Entries strictly after the training end date.
    pub fn future(&self) -> &[ForecastPoint] {
        &self.points[self.split_index()..]
    }

    fn split_index(&self) -> usize {
        self.points.partition_point(|p| p.date <= self.training_end)
    }
}

/// Additive forecasting capability.
///
/// `fit` turns a dense daily series into model state, `predict` evaluates
/// that state from the first training day through `horizon_days` past the
/// last one.
pub trait Forecaster {
    type Model;

    fn fit(&self, series: &DenseSeries) -> Result<Self::Model>;

    fn predict(&self, model: &Self::Model, horizon_days: i64) -> Result<ForecastResult>;
}

/// Holds the fitted model for one history log and refits on demand.
///
/// The model is dropped by [`ForecastEngine::invalidate`] whenever the log
/// changes; [`ForecastEngine::forecast`] fits again before predicting, so a
/// stale model is never used.
pub struct ForecastEngine<F: Forecaster> {
    forecaster: F,
    model: Option<F::Model>,
}

impl<F: Forecaster> ForecastEngine<F> {
    pub fn new(forecaster: F) -> Self {
        Self { forecaster, model: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&F::Model> {
        self.model.as_ref()
    }

    /// Fits a model on `series`, replacing any previous one.
    ///
    /// # Errors
    /// * `ForecastError::Fit` if the forecaster rejects the series. The
    ///   previous model is discarded either way.
    pub fn fit(&mut self, series: &DenseSeries) -> Result<&F::Model> {
        self.model = None;
        let model = self.forecaster.fit(series)?;
        tracing::info!(days = series.len(), "model fitted");
        Ok(&*self.model.insert(model))
    }

    /// Predicts with the current model.
    ///
    /// # Errors
    /// * `ForecastError::Predict` if `horizon_days` is negative or above
    ///   [`MAX_HORIZON_DAYS`], or no model has been fitted since the last
    ///   invalidation.
    pub fn predict(&self, horizon_days: i64) -> Result<ForecastResult> {
        check_horizon(horizon_days)?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ForecastError::Predict("no fitted model, fit the series first".to_string()))?;
        self.forecaster.predict(model, horizon_days)
    }

    /// Predicts `horizon_days` ahead, fitting on `series` first when the
    /// current model has been invalidated.
    pub fn forecast(&mut self, series: &DenseSeries, horizon_days: i64) -> Result<ForecastResult> {
        check_horizon(horizon_days)?;
        if self.model.is_none() {
            self.fit(series)?;
        }
        self.predict(horizon_days)
    }

    /// Drops the fitted model.
    pub fn invalidate(&mut self) {
        if self.model.take().is_some() {
            tracing::debug!("fitted model invalidated");
        }
    }
}

pub(crate) fn check_horizon(horizon_days: i64) -> Result<()> {
    if horizon_days < 0 {
        return Err(ForecastError::Predict(format!(
            "horizon must be zero or more days, got {}",
            horizon_days
        )));
    }
    if horizon_days > MAX_HORIZON_DAYS {
        return Err(ForecastError::Predict(format!(
            "horizon of {} days exceeds the limit of {} days",
            horizon_days, MAX_HORIZON_DAYS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::densify::densify;
    use crate::history::{EventRecord, HistoryLog};

    /// Predicts the series mean everywhere and counts fits.
    struct MeanForecaster {
        fits: std::cell::Cell<usize>,
    }

    struct MeanModel {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        mean: f64,
    }

    impl Forecaster for MeanForecaster {
        type Model = MeanModel;

        fn fit(&self, series: &DenseSeries) -> Result<MeanModel> {
            self.fits.set(self.fits.get() + 1);
            let values = series.values();
            if values.len() < 2 {
                return Err(ForecastError::too_few(2, values.len()));
            }
            Ok(MeanModel {
                start: series.start().unwrap(),
                end: series.end().unwrap(),
                mean: values.iter().sum::<f64>() / values.len() as f64,
            })
        }

        fn predict(&self, model: &MeanModel, horizon_days: i64) -> Result<ForecastResult> {
            let last = model.end + chrono::Duration::days(horizon_days);
            let points = model
                .start
                .iter_days()
                .take_while(|d| *d <= last)
                .map(|date| ForecastPoint { date, point: model.mean, lower: 0.0, upper: 2.0 * model.mean })
                .collect();
            Ok(ForecastResult::new(points, model.end))
        }
    }

    fn series(records: &[(u32, u32)]) -> DenseSeries {
        let log: HistoryLog = records
            .iter()
            .map(|&(day, count)| EventRecord {
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                count,
            })
            .collect();
        densify(&log).unwrap()
    }

    fn engine() -> ForecastEngine<MeanForecaster> {
        ForecastEngine::new(MeanForecaster { fits: std::cell::Cell::new(0) })
    }

    #[test]
    fn test_forecast_fits_once() {
        let mut engine = engine();
        let data = series(&[(1, 2), (4, 2)]);
        engine.forecast(&data, 3).unwrap();
        engine.forecast(&data, 5).unwrap();
        assert_eq!(engine.forecaster.fits.get(), 1);
    }

    #[test]
    fn test_invalidate_forces_refit() {
        let mut engine = engine();
        engine.forecast(&series(&[(1, 2), (4, 2)]), 1).unwrap();
        engine.invalidate();
        assert!(!engine.is_fitted());

        let result = engine.forecast(&series(&[(1, 2), (6, 2)]), 1).unwrap();
        assert_eq!(engine.forecaster.fits.get(), 2);
        assert_eq!(result.training_end(), chrono::NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    }

    #[test]
    fn test_negative_horizon_rejected_before_fit() {
        let mut engine = engine();
        let err = engine.forecast(&series(&[(1, 2), (4, 2)]), -1).unwrap_err();
        assert!(matches!(err, ForecastError::Predict(_)));
        assert_eq!(engine.forecaster.fits.get(), 0);
    }

    #[test]
    fn test_oversized_horizon_rejected_before_fit() {
        let mut engine = engine();
        let data = series(&[(1, 2), (4, 2)]);
        assert!(engine.forecast(&data, MAX_HORIZON_DAYS).is_ok());
        engine.invalidate();

        let err = engine.forecast(&data, 100_000_000).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit"));
        assert_eq!(engine.forecaster.fits.get(), 1);
        assert!(!engine.is_fitted());
    }

    #[test]
    fn test_predict_without_model() {
        assert!(matches!(engine().predict(1), Err(ForecastError::Predict(_))));
    }

    #[test]
    fn test_fit_failure_clears_model() {
        let mut engine = engine();
        engine.fit(&series(&[(1, 2), (4, 2)])).unwrap();
        assert!(engine.fit(&series(&[(1, 2)])).is_err());
        assert!(!engine.is_fitted());
    }

    #[test]
    fn test_fitted_and_future_split() {
        let mut engine = engine();
        let result = engine.forecast(&series(&[(1, 2), (3, 2)]), 2).unwrap();
        assert_eq!(result.fitted().len(), 3);
        assert_eq!(result.future().len(), 2);
        assert!(result.future().iter().all(|p| p.date > result.training_end()));
    }
}

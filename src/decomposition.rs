//! Seasonal decomposition forecaster built on `augurs`.
//!
//! # Algorithm
//!
//! - For series covering at least two weeks: MSTL (Multiple Seasonal-Trend
//!   decomposition) with a weekly period, plus a yearly period once two full
//!   years are available. The deseasonalised remainder is forecast with a
//!   non-seasonal AutoETS trend model.
//! - For shorter series: plain non-seasonal AutoETS.
//!
//! Both the historical fit and the future days carry prediction intervals at
//! the configured width.

use augurs::ets::AutoETS;
use augurs::ets::trend::AutoETSTrendModel;
use augurs::forecaster::Forecaster as Pipeline;
use augurs::mstl::MSTLModel;

use crate::densify::DenseSeries;
use crate::engine::{ForecastPoint, ForecastResult, Forecaster};
use crate::error::{ForecastError, Result};

/// Days needed before the weekly period is used (two full weeks).
const MIN_WEEKLY_DAYS: usize = 14;

/// Days needed before the yearly period is used (two full years).
const MIN_YEARLY_DAYS: usize = 730;

const WEEKLY_PERIOD: usize = 7;

const YEARLY_PERIOD: usize = 365;

/// Tuning for [`DecompositionForecaster`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecompositionSettings {
    /// Coverage of the lower/upper band, e.g. 0.8 for an 80% interval.
    pub interval_width: f64,
    /// Fewest daily observations accepted by `fit`.
    pub min_observations: usize,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
}

impl Default for DecompositionSettings {
    fn default() -> Self {
        Self {
            interval_width: 0.8,
            min_observations: 7,
            weekly_seasonality: true,
            yearly_seasonality: true,
        }
    }
}

enum FittedPipeline {
    Seasonal(Pipeline<MSTLModel<AutoETSTrendModel>>),
    Trend(Pipeline<AutoETS>),
}

impl FittedPipeline {
    fn predict(&self, horizon: usize, level: f64) -> Result<augurs::Forecast> {
        let forecast = match self {
            FittedPipeline::Seasonal(pipeline) => pipeline.predict(horizon, level),
            FittedPipeline::Trend(pipeline) => pipeline.predict(horizon, level),
        };
        forecast.map_err(|e| ForecastError::Predict(e.to_string()))
    }

    fn predict_in_sample(&self, level: f64) -> Result<augurs::Forecast> {
        let forecast = match self {
            FittedPipeline::Seasonal(pipeline) => pipeline.predict_in_sample(level),
            FittedPipeline::Trend(pipeline) => pipeline.predict_in_sample(level),
        };
        forecast.map_err(|e| ForecastError::Predict(e.to_string()))
    }
}

/// Fitted state of a [`DecompositionForecaster`].
pub struct DecompositionModel {
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    observations: usize,
    periods: Vec<usize>,
    level: f64,
    pipeline: FittedPipeline,
}

impl std::fmt::Debug for DecompositionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecompositionModel")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("observations", &self.observations)
            .field("periods", &self.periods)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl DecompositionModel {
    pub fn training_start(&self) -> chrono::NaiveDate {
        self.start
    }

    pub fn training_end(&self) -> chrono::NaiveDate {
        self.end
    }

    /// Seasonal periods, in days, removed before the trend was fitted.
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    pub fn has_weekly(&self) -> bool {
        self.periods.contains(&WEEKLY_PERIOD)
    }

    pub fn has_yearly(&self) -> bool {
        self.periods.contains(&YEARLY_PERIOD)
    }
}

/// Built-in [`Forecaster`] using MSTL decomposition with an AutoETS trend.
#[derive(Debug, Clone, Default)]
pub struct DecompositionForecaster {
    settings: DecompositionSettings,
}

impl DecompositionForecaster {
    pub fn new(settings: DecompositionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DecompositionSettings {
        &self.settings
    }

    /// Seasonal periods that fit a series of `days` observations.
    fn seasonal_periods(&self, days: usize) -> Vec<usize> {
        let mut periods = Vec::new();
        if self.settings.weekly_seasonality && days >= MIN_WEEKLY_DAYS {
            periods.push(WEEKLY_PERIOD);
        }
        if self.settings.yearly_seasonality && days >= MIN_YEARLY_DAYS {
            periods.push(YEARLY_PERIOD);
        }
        periods
    }
}

impl Forecaster for DecompositionForecaster {
    type Model = DecompositionModel;

    fn fit(&self, series: &DenseSeries) -> Result<DecompositionModel> {
        let required = self.settings.min_observations.max(1);
        let (start, end) = match (series.start(), series.end()) {
            (Some(start), Some(end)) if series.len() >= required => (start, end),
            _ => return Err(ForecastError::too_few(required, series.len())),
        };

        let values = series.values();
        let periods = self.seasonal_periods(values.len());

        let pipeline = if periods.is_empty() {
            let mut pipeline = Pipeline::new(AutoETS::non_seasonal());
            pipeline
                .fit(&values)
                .map_err(|e| ForecastError::fit(format!("ETS fit error: {}", e)))?;
            FittedPipeline::Trend(pipeline)
        } else {
            let trend = AutoETS::non_seasonal().into_trend_model();
            let mut pipeline = Pipeline::new(MSTLModel::new(periods.clone(), trend));
            pipeline
                .fit(&values)
                .map_err(|e| ForecastError::fit(format!("MSTL fit error: {}", e)))?;
            FittedPipeline::Seasonal(pipeline)
        };

        tracing::debug!(observations = values.len(), periods = ?periods, "decomposition fitted");

        Ok(DecompositionModel {
            start,
            end,
            observations: values.len(),
            periods,
            level: self.settings.interval_width,
            pipeline,
        })
    }

    fn predict(&self, model: &DecompositionModel, horizon_days: i64) -> Result<ForecastResult> {
        let horizon = usize::try_from(horizon_days).map_err(|_| {
            ForecastError::Predict(format!("horizon must be zero or more days, got {}", horizon_days))
        })?;

        let in_sample = model.pipeline.predict_in_sample(model.level)?;
        let mut points = to_points(model.start, model.observations, &in_sample)?;

        if horizon > 0 {
            let ahead = model.pipeline.predict(horizon, model.level)?;
            let first = model
                .end
                .succ_opt()
                .ok_or_else(|| ForecastError::Predict("date out of range".to_string()))?;
            points.extend(to_points(first, horizon, &ahead)?);
        }

        Ok(ForecastResult::new(points, model.end))
    }
}

/// Lays `forecast` out on `len` consecutive days starting at `first`.
///
/// The band always brackets the point estimate; a forecast without
/// intervals gets a zero-width band.
fn to_points(first: chrono::NaiveDate, len: usize, forecast: &augurs::Forecast) -> Result<Vec<ForecastPoint>> {
    if forecast.point.len() != len {
        return Err(ForecastError::Predict(format!(
            "model returned {} values for {} days",
            forecast.point.len(),
            len
        )));
    }

    let bounds = |i: usize, point: f64| match &forecast.intervals {
        Some(intervals) => (
            intervals.lower.get(i).copied().unwrap_or(point).min(point),
            intervals.upper.get(i).copied().unwrap_or(point).max(point),
        ),
        None => (point, point),
    };

    Ok(first
        .iter_days()
        .zip(&forecast.point)
        .enumerate()
        .map(|(i, (date, &point))| {
            let (lower, upper) = bounds(i, point);
            ForecastPoint { date, point, lower, upper }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::densify::densify;
    use crate::history::{EventRecord, HistoryLog};
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series_from(start: chrono::NaiveDate, counts: &[u32]) -> DenseSeries {
        let log: HistoryLog = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| EventRecord {
                date: start + chrono::Duration::days(i as i64),
                count,
            })
            .collect();
        densify(&log).unwrap()
    }

    /// Irregular small counts, never constant.
    fn counts(days: usize) -> Vec<u32> {
        (0..days).map(|i| ((i * 7 + i / 3) % 5) as u32).collect()
    }

    #[test]
    fn test_fit_requires_min_observations() {
        let forecaster = DecompositionForecaster::default();
        let series = series_from(date(2024, 1, 1), &[3, 0, 1]);
        let err = forecaster.fit(&series).unwrap_err();
        assert!(matches!(err, ForecastError::Fit { .. }));
        assert!(err.to_string().contains("need at least 7 observations, got 3"));
    }

    #[test]
    fn test_seasonal_periods_follow_span() {
        let forecaster = DecompositionForecaster::default();
        assert!(forecaster.seasonal_periods(13).is_empty());
        assert_eq!(forecaster.seasonal_periods(14), vec![7]);
        assert_eq!(forecaster.seasonal_periods(729), vec![7]);
        assert_eq!(forecaster.seasonal_periods(730), vec![7, 365]);

        let yearly_only = DecompositionForecaster::new(DecompositionSettings {
            weekly_seasonality: false,
            ..Default::default()
        });
        assert_eq!(yearly_only.seasonal_periods(800), vec![365]);
    }

    #[test]
    fn test_predict_zero_horizon_matches_training_dates() {
        let forecaster = DecompositionForecaster::default();
        let series = series_from(date(2024, 1, 1), &counts(10));
        let model = forecaster.fit(&series).unwrap();
        assert!(model.periods().is_empty());

        let result = forecaster.predict(&model, 0).unwrap();
        let predicted: Vec<_> = result.points().iter().map(|p| p.date).collect();
        let trained: Vec<_> = series.dates().collect();
        assert_eq!(predicted, trained);
        assert!(result.future().is_empty());
    }

    #[test]
    fn test_predict_extends_horizon() {
        let forecaster = DecompositionForecaster::default();
        let model = forecaster.fit(&series_from(date(2024, 1, 1), &counts(20))).unwrap();
        assert!(model.has_weekly());

        let result = forecaster.predict(&model, 45).unwrap();
        assert_eq!(result.points().len(), 65);
        assert_eq!(result.future().len(), 45);
        assert_eq!(result.future()[0].date, date(2024, 1, 21));
        assert_eq!(result.points().last().unwrap().date, date(2024, 3, 5));
    }

    #[test]
    fn test_negative_horizon() {
        let forecaster = DecompositionForecaster::default();
        let model = forecaster.fit(&series_from(date(2024, 1, 1), &counts(10))).unwrap();
        assert!(matches!(forecaster.predict(&model, -3), Err(ForecastError::Predict(_))));
    }

    #[test]
    fn test_bands_bracket_points() {
        let forecaster = DecompositionForecaster::default();
        let model = forecaster.fit(&series_from(date(2024, 1, 1), &counts(60))).unwrap();
        let result = forecaster.predict(&model, 30).unwrap();

        for p in result.points() {
            assert!(p.lower <= p.point && p.point <= p.upper);
        }
        let first = result.future().first().unwrap();
        let last = result.future().last().unwrap();
        assert!(last.upper - last.lower >= first.upper - first.lower);
    }

    #[test]
    fn test_weekly_pattern_is_captured() {
        let forecaster = DecompositionForecaster::default();
        // 2024-01-01 is a Monday; events every Friday, fewer on Tuesdays,
        // plus one extra every fifth day so the remainder is not flat
        let counts: Vec<u32> = (0..56)
            .map(|i| {
                let weekly = match i % 7 {
                    4 => 3,
                    1 => 1,
                    _ => 0,
                };
                weekly + u32::from(i % 5 == 0)
            })
            .collect();
        let model = forecaster.fit(&series_from(date(2024, 1, 1), &counts)).unwrap();
        assert!(model.has_weekly());
        assert!(!model.has_yearly());

        let result = forecaster.predict(&model, 7).unwrap();
        let peak = result
            .future()
            .iter()
            .max_by(|a, b| a.point.total_cmp(&b.point))
            .unwrap();
        assert_eq!(peak.date.weekday(), chrono::Weekday::Fri);
    }

    #[test]
    fn test_yearly_period_needs_two_years() {
        let forecaster = DecompositionForecaster::default();
        let model = forecaster.fit(&series_from(date(2021, 1, 1), &counts(800))).unwrap();
        assert!(model.has_yearly());
        assert_eq!(model.training_end(), date(2023, 3, 11));
    }
}

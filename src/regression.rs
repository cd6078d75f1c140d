use crate::error::{ForecastError, Result};

/// One row of the monthly statistics file.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MonthlyObservation {
    /// Period index, 1 for the first month of the series.
    pub month: f64,
    /// Number of events in that month.
    pub thefts: f64,
}

/// Ordinary least squares line `thefts = intercept + slope * month`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearTrend {
    /// Fits the line through `observations`.
    ///
    /// # Errors
    /// * `ForecastError::Fit` when fewer than two distinct months are present.
    pub fn fit(observations: &[MonthlyObservation]) -> Result<Self> {
        let n = observations.len();
        if n < 2 {
            return Err(ForecastError::too_few(2, n));
        }

        let mean_x = observations.iter().map(|o| o.month).sum::<f64>() / n as f64;
        let mean_y = observations.iter().map(|o| o.thefts).sum::<f64>() / n as f64;
        let sxx: f64 = observations.iter().map(|o| (o.month - mean_x).powi(2)).sum();
        let sxy: f64 = observations
            .iter()
            .map(|o| (o.month - mean_x) * (o.thefts - mean_y))
            .sum();

        if sxx == 0.0 {
            // every row has the same month
            return Err(ForecastError::fit("all observations share one month"));
        }

        let slope = sxy / sxx;
        let trend = LinearTrend {
            intercept: mean_y - slope * mean_x,
            slope,
        };
        tracing::debug!(intercept = trend.intercept, slope = trend.slope, rows = n, "linear trend fitted");
        Ok(trend)
    }

    pub fn predict(&self, month: f64) -> f64 {
        self.intercept + self.slope * month
    }

    /// Prediction rounded half-to-even, as a whole number of events.
    pub fn predict_rounded(&self, month: f64) -> i64 {
        self.predict(month).round_ties_even() as i64
    }
}

/// Reads the monthly statistics CSV (`month`, `thefts` columns).
///
/// # Errors
/// * `ForecastError::Io` if the file cannot be opened.
/// * `ForecastError::Format` if a column is missing or a value is not numeric.
pub fn load_monthly<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<MonthlyObservation>> {
    let file = std::fs::File::open(path.as_ref()).map_err(|e| ForecastError::io(path.as_ref(), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut observations = Vec::new();
    for result in reader.deserialize::<MonthlyObservation>() {
        let record = result.map_err(|e| ForecastError::format(path.as_ref(), e.to_string()))?;
        observations.push(record);
    }
    Ok(observations)
}

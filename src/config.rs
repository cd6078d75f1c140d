use crate::decomposition::DecompositionSettings;
use crate::engine::MAX_HORIZON_DAYS;
use crate::highlight::HighlightRule;

/// Column names of the history file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub date_column: String,
    pub value_column: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            value_column: "Value".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days predicted past the last logged date when none is given.
    pub horizon_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { horizon_days: 45 }
    }
}

/// Output settings for rendered charts.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub output: std::path::PathBuf,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            output: std::path::PathBuf::from("forecast.svg"),
        }
    }
}

/// Complete application configuration.
///
/// Every section and field is optional in the TOML file:
///
/// ```toml
/// [history]
/// date_column = "Date"
/// value_column = "Value"
///
/// [engine]
/// interval_width = 0.8
/// min_observations = 7
///
/// [highlight]
/// threshold = 0.04
/// inclusive = true
///
/// [forecast]
/// horizon_days = 45
///
/// [chart]
/// output = "forecast.svg"
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub history: HistoryConfig,
    pub engine: DecompositionSettings,
    pub highlight: HighlightRule,
    pub forecast: ForecastConfig,
    pub chart: ChartSettings,
}

impl AppConfig {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        anyhow::Ok(config)
    }

    /// Loads the configuration file at `path`, or the defaults when `path` is `None`.
    ///
    /// # Errors
    /// * If the file cannot be read or parsed, or holds out-of-range values.
    pub fn load<P: AsRef<std::path::Path>>(path: Option<P>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
                    anyhow::anyhow!("Failed to read config {}: {}", path.as_ref().display(), e)
                })?;
                Self::from_toml(&text)
                    .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.as_ref().display(), e))
            }
            None => anyhow::Ok(Self::default()),
        }
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        let width = self.engine.interval_width;
        if !(width > 0.0 && width < 1.0) {
            anyhow::bail!("engine.interval_width must be between 0 and 1, got {}", width);
        }
        if !self.highlight.threshold.is_finite() {
            anyhow::bail!("highlight.threshold must be a finite number");
        }
        if !(0..=MAX_HORIZON_DAYS).contains(&self.forecast.horizon_days) {
            anyhow::bail!(
                "forecast.horizon_days must be between 0 and {}, got {}",
                MAX_HORIZON_DAYS,
                self.forecast.horizon_days
            );
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            anyhow::bail!("chart.width and chart.height must be positive");
        }
        anyhow::Ok(())
    }
}

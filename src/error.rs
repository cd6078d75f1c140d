use thiserror::Error;

/// Errors produced by the forecasting pipeline.
///
/// Every variant is reported to the caller as-is. Nothing here is retried
/// internally; the driving loop decides whether to re-prompt or give up.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Persisted data could not be parsed.
    #[error("Invalid data in {path}: {reason}")]
    Format { path: String, reason: String },

    /// User supplied date or count was rejected.
    #[error("Invalid input '{input}': {reason}")]
    Validation { input: String, reason: String },

    /// There is no record to derive a daily span from.
    #[error("History log is empty, nothing to densify")]
    EmptyLog,

    /// The model could not be fitted.
    #[error("Cannot fit model: {reason}")]
    Fit { reason: String },

    /// The prediction request was rejected.
    #[error("Cannot predict: {0}")]
    Predict(String),

    /// Storage failure while reading or writing the backing file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ForecastError {
    pub(crate) fn format<P: AsRef<std::path::Path>>(path: P, reason: impl Into<String>) -> Self {
        ForecastError::Format {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ForecastError::Validation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn fit(reason: impl Into<String>) -> Self {
        ForecastError::Fit { reason: reason.into() }
    }

    /// Fit failure for a series shorter than the model accepts.
    pub(crate) fn too_few(required: usize, actual: usize) -> Self {
        Self::fit(format!("need at least {} observations, got {}", required, actual))
    }

    pub(crate) fn io<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        ForecastError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

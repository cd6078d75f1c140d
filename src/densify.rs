use crate::error::{ForecastError, Result};
use crate::history::HistoryLog;

/// One calendar day of a dense series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensePoint {
    pub date: chrono::NaiveDate,
    pub value: u32,
}

/// Calendar-complete daily series derived from a [`HistoryLog`].
///
/// Holds exactly one point per day between the first and last logged dates,
/// inclusive. Never persisted; rebuild it whenever the log changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseSeries {
    points: Vec<DensePoint>,
}

impl DenseSeries {
    pub fn points(&self) -> &[DensePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<chrono::NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn end(&self) -> Option<chrono::NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn dates(&self) -> impl Iterator<Item = chrono::NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Observed values as floats, in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value as f64).collect()
    }
}

/// Expands a sparse event log into a daily series, zero-filling missing days.
///
/// Walks the span of the log one day at a time while advancing through the
/// ordered records, so every day is visited once.
///
/// # Arguments
/// * `log` - The event log.
///
/// # Returns
/// * `Result<DenseSeries>` - `last - first + 1` points with consecutive dates.
///
/// # Errors
/// * `ForecastError::EmptyLog` if the log has no records.
pub fn densify(log: &HistoryLog) -> Result<DenseSeries> {
    let (first, last) = match (log.first_date(), log.last_date()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ForecastError::EmptyLog),
    };

    let span = (last - first).num_days() as usize + 1;
    let mut points = Vec::with_capacity(span);
    let mut records = log.records().peekable();

    for day in first.iter_days().take(span) {
        let value = match records.peek() {
            Some(record) if record.date == day => {
                let count = record.count;
                records.next();
                count
            }
            _ => 0,
        };
        points.push(DensePoint { date: day, value });
    }

    tracing::debug!(
        start = %first,
        end = %last,
        days = points.len(),
        events = log.len(),
        "densified history"
    );
    Ok(DenseSeries { points })
}

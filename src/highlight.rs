use crate::engine::{ForecastPoint, ForecastResult};

/// Selection rule for notable forecast days.
///
/// A future day is highlighted when its point estimate is above `threshold`,
/// or at/above it when `inclusive` is set.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HighlightRule {
    pub threshold: f64,
    pub inclusive: bool,
}

impl Default for HighlightRule {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            inclusive: false,
        }
    }
}

impl HighlightRule {
    pub fn new(threshold: f64, inclusive: bool) -> Self {
        Self { threshold, inclusive }
    }

    pub fn matches(&self, value: f64) -> bool {
        if self.inclusive {
            value >= self.threshold
        } else {
            value > self.threshold
        }
    }
}

/// Future forecast days that passed a [`HighlightRule`], in date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightSet {
    points: Vec<ForecastPoint>,
}

impl HighlightSet {
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = chrono::NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }
}

/// Picks the forecast days after `training_end` whose point estimate passes `rule`.
///
/// # Arguments
/// * `result` - Forecast covering history and horizon.
/// * `training_end` - Last observed day; it and anything before are never selected.
/// * `rule` - Threshold and strictness.
///
/// # Returns
/// * `HighlightSet` - Possibly empty, ordered by date.
pub fn highlight(result: &ForecastResult, training_end: chrono::NaiveDate, rule: &HighlightRule) -> HighlightSet {
    let mut points: Vec<ForecastPoint> = result
        .points()
        .iter()
        .filter(|p| p.date > training_end && rule.matches(p.point))
        .copied()
        .collect();
    points.sort_by_key(|p| p.date);

    tracing::debug!(
        threshold = rule.threshold,
        inclusive = rule.inclusive,
        selected = points.len(),
        "highlighted forecast days"
    );
    HighlightSet { points }
}

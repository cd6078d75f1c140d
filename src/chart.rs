use plotters::prelude::*;

use crate::config::ChartSettings;
use crate::engine::ForecastResult;
use crate::highlight::HighlightSet;
use crate::history::HistoryLog;
use crate::regression::{LinearTrend, MonthlyObservation};
use crate::utils;

const PURPLE: RGBColor = RGBColor(128, 0, 128);

/// Creates the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir_exist<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    anyhow::Ok(())
}

/// Renders a forecast chart to an SVG file.
///
/// Draws, on a shared day axis:
/// - one vertical stem per logged day with events (red)
/// - the fitted curve over the training span (blue)
/// - the future band between lower and upper bounds (light green) and the
///   future point estimate (green)
/// - a marker and date label for every highlighted day (purple)
///
/// # Arguments
/// * `result` - Forecast to plot.
/// * `highlights` - Days to annotate.
/// * `log` - Sparse history, used for the event stems.
/// * `settings` - Output path and size.
///
/// # Returns
/// * `anyhow::Result<()>` - Success or a drawing/I/O error.
pub fn render_forecast(
    result: &ForecastResult,
    highlights: &HighlightSet,
    log: &HistoryLog,
    settings: &ChartSettings,
) -> anyhow::Result<()> {
    let first = result
        .points()
        .first()
        .ok_or_else(|| anyhow::anyhow!("Nothing to plot: forecast is empty"))?
        .date;
    let last = result.points().last().map_or(first, |p| p.date);
    let x_of = |date: chrono::NaiveDate| (date - first).num_days() as f64;

    let max_count = log.records().map(|r| r.count as f64).fold(0.0, f64::max);
    let y_max = result
        .points()
        .iter()
        .map(|p| p.upper)
        .fold(max_count.max(1.0), f64::max)
        * 1.1;
    let y_min = result
        .points()
        .iter()
        .map(|p| p.lower)
        .fold(-0.3, f64::min);
    let x_max = x_of(last).max(1.0);

    ensure_parent_dir_exist(&settings.output)?;
    let root = SVGBackend::new(&settings.output, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Event forecast", ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("PERIOD")
        .y_desc("VALUES")
        .x_label_formatter(&|x| utils::format_date(first + chrono::Duration::days(x.round() as i64)))
        .draw()?;

    chart
        .draw_series(log.records().filter(|r| r.count > 0).map(|r| {
            let x = x_of(r.date);
            PathElement::new(vec![(x, 0.0), (x, r.count as f64)], RED.mix(0.7))
        }))?
        .label("Events")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .draw_series(LineSeries::new(
            result.fitted().iter().map(|p| (x_of(p.date), p.point)),
            BLUE,
        ))?
        .label("Fit")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    let future = result.future();
    if !future.is_empty() {
        let band: Vec<(f64, f64)> = future
            .iter()
            .map(|p| (x_of(p.date), p.upper))
            .chain(future.iter().rev().map(|p| (x_of(p.date), p.lower)))
            .collect();
        chart
            .draw_series(std::iter::once(Polygon::new(band, GREEN.mix(0.3).filled())))?
            .label("Probability std deviation")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], GREEN.mix(0.3).filled()));

        chart
            .draw_series(LineSeries::new(
                future.iter().map(|p| (x_of(p.date), p.point)),
                GREEN,
            ))?
            .label("Predict")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));
    }

    chart.draw_series(
        highlights
            .points()
            .iter()
            .map(|p| Circle::new((x_of(p.date), p.point), 3, PURPLE.filled())),
    )?;
    chart.draw_series(highlights.points().iter().map(|p| {
        Text::new(
            utils::format_date(p.date),
            (x_of(p.date), p.upper.max(p.point) + (y_max - y_min) * 0.02),
            ("sans-serif", 11).into_font(),
        )
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = %settings.output.display(), highlights = highlights.len(), "forecast chart written");
    anyhow::Ok(())
}

/// Renders the monthly linear trend chart to an SVG file.
///
/// Bars show the history, the line is the fitted trend and the marker is the
/// rounded prediction for `target_month`.
pub fn render_trend(
    observations: &[MonthlyObservation],
    trend: &LinearTrend,
    target_month: f64,
    settings: &ChartSettings,
) -> anyhow::Result<()> {
    if observations.is_empty() {
        anyhow::bail!("Nothing to plot: no monthly observations");
    }

    let prediction = trend.predict_rounded(target_month) as f64;
    let x_min = observations.iter().map(|o| o.month).fold(target_month, f64::min) - 1.0;
    let x_max = observations.iter().map(|o| o.month).fold(target_month, f64::max) + 1.0;
    let y_max = observations
        .iter()
        .map(|o| o.thefts.round())
        .fold(prediction.max(1.0), f64::max)
        * 1.15;

    ensure_parent_dir_exist(&settings.output)?;
    let root = SVGBackend::new(&settings.output, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Forecast for month {}: {}", target_month, prediction),
            ("sans-serif", 24).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Historical series")
        .y_desc("Number of thefts")
        .draw()?;

    chart
        .draw_series(observations.iter().map(|o| {
            Rectangle::new([(o.month - 0.4, 0.0), (o.month + 0.4, o.thefts.round())], BLACK.filled())
        }))?
        .label("Thefts")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLACK.filled()));

    chart
        .draw_series(LineSeries::new(
            [x_min, x_max].into_iter().map(|m| (m, trend.predict(m))),
            RED.stroke_width(2),
        ))?
        .label("Linear regression")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .draw_series(std::iter::once(Circle::new((target_month, prediction), 5, GREEN.filled())))?
        .label(format!("Prediction: {}", prediction))
        .legend(|(x, y)| Circle::new((x + 10, y), 4, GREEN.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = %settings.output.display(), "trend chart written");
    anyhow::Ok(())
}

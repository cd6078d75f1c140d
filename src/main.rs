use event_forecast::cli::{self, Command};
use event_forecast::{
    AppConfig, DecompositionForecaster, EventRecord, ForecastSession, HistoryStore, chart, interactive, progress,
    regression, utils,
};

/// Main entry point of the application.
///
/// This function orchestrates the workflow:
/// 1. Parses command-line arguments.
/// 2. Initialises logging and loads the configuration.
/// 3. Dispatches to the selected subcommand.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Success or an error if any step fails.
fn main() -> anyhow::Result<()> {
    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let mut config = AppConfig::load(args.config.as_ref())?;

    match args.command {
        Command::Forecast { data, days, threshold, inclusive, chart, current } => {
            if let Some(threshold) = threshold {
                config.highlight.threshold = threshold;
            }
            if inclusive {
                config.highlight.inclusive = true;
            }
            if let Some(chart) = chart {
                config.chart.output = chart;
            }
            let horizon = days.unwrap_or(config.forecast.horizon_days);
            run_forecast(&data, horizon, current, &config)?;
        }
        Command::Append { data, date, count, overwrite } => {
            run_append(&data, &date, &count, overwrite, &config)?;
        }
        Command::Menu { data, chart } => {
            if let Some(chart) = chart {
                config.chart.output = chart;
            }
            run_menu(&data, &config)?;
        }
        Command::Trend { data, month, chart } => {
            if let Some(chart) = chart {
                config.chart.output = chart;
            }
            run_trend(&data, month, &config)?;
        }
    }

    tracing::debug!(elapsed = total_start.elapsed().as_secs_f64(), "done");
    Ok(())
}

/// Installs the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` raises the level from `warn`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Checks that the input file exists and is a regular file.
fn check_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Input path is not a file: {}", path.display());
    }
    anyhow::Ok(())
}

fn open_session(data: &std::path::Path, config: &AppConfig) -> anyhow::Result<ForecastSession> {
    check_path(data)?;
    let store = HistoryStore::new(data).with_columns(&config.history.date_column, &config.history.value_column);
    let session = ForecastSession::open(store, DecompositionForecaster::new(config.engine.clone()))?;
    println!("📄 Loaded {} records from {}", session.log().len(), data.display());
    anyhow::Ok(session)
}

/// Forecasts `horizon` days, prints the highlighted days and writes the chart.
fn run_forecast(data: &std::path::Path, horizon: i64, current: bool, config: &AppConfig) -> anyhow::Result<()> {
    let mut session = open_session(data, config)?;

    if current {
        let yesterday = utils::day_before(chrono::Local::now().date_naive());
        if session.append_if_missing(yesterday)? {
            println!("✅ Added {} with 0 events", utils::format_date(yesterday));
        }
    }

    let start = std::time::Instant::now();
    let (result, highlights) =
        progress::with_spinner("Fitting model...", || session.run(horizon, &config.highlight))?;
    println!(
        "📈 Forecast of {} days after {} computed in {:?} seconds",
        horizon,
        utils::format_date(result.training_end()),
        start.elapsed().as_secs_f64()
    );

    if highlights.is_empty() {
        println!("No day above {}", config.highlight.threshold);
    } else {
        println!("Days above {}:", config.highlight.threshold);
        for p in highlights.points() {
            println!(
                " - {}: {:.3} [{:.3}, {:.3}]",
                utils::format_date(p.date),
                p.point,
                p.lower,
                p.upper
            );
        }
    }

    chart::render_forecast(&result, &highlights, session.log(), &config.chart)?;
    println!("✅ Chart written to {}", config.chart.output.display());
    anyhow::Ok(())
}

/// Appends one record, asking on stdin before overwriting unless `overwrite` is set.
fn run_append(data: &std::path::Path, date: &str, count: &str, overwrite: bool, config: &AppConfig) -> anyhow::Result<()> {
    let mut session = open_session(data, config)?;

    let outcome = if overwrite {
        session.append(date, count, &mut |_: EventRecord, _: u32| true)?
    } else {
        let mut input = std::io::stdin().lock();
        let mut output = std::io::stdout();
        let mut failure = None;
        let mut confirm = interactive::confirm_with(&mut input, &mut output, &mut failure);
        let outcome = session.append(date, count, &mut confirm)?;
        drop(confirm);
        if let Some(e) = failure {
            anyhow::bail!("Failed to ask for confirmation: {}", e);
        }
        outcome
    };
    if outcome.changed() {
        println!("✅ History updated, {} records in {}", session.log().len(), data.display());
    } else {
        println!("Operation cancelled.");
    }
    anyhow::Ok(())
}

fn run_menu(data: &std::path::Path, config: &AppConfig) -> anyhow::Result<()> {
    let mut session = open_session(data, config)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    interactive::InteractionController::new(&mut session, config, stdin.lock(), stdout.lock()).run()
}

/// Fits the monthly linear trend and predicts `month` (default: the month after the last).
fn run_trend(data: &std::path::Path, month: Option<f64>, config: &AppConfig) -> anyhow::Result<()> {
    check_path(data)?;
    let observations = regression::load_monthly(data)?;
    let trend = regression::LinearTrend::fit(&observations)?;

    let target = month.unwrap_or_else(|| {
        observations
            .iter()
            .map(|o| o.month)
            .fold(0.0, f64::max)
            + 1.0
    });
    println!(
        "📈 Predicted events for month {}: {}",
        target,
        trend.predict_rounded(target)
    );

    chart::render_trend(&observations, &trend, target, &config.chart)?;
    println!("✅ Chart written to {}", config.chart.output.display());
    anyhow::Ok(())
}

/// Subcommand selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Fit the additive model and forecast.
    Forecast {
        data: std::path::PathBuf,
        days: Option<i64>,
        threshold: Option<f64>,
        inclusive: bool,
        chart: Option<std::path::PathBuf>,
        current: bool,
    },
    /// Add or overwrite one record of the history file.
    Append {
        data: std::path::PathBuf,
        date: String,
        count: String,
        overwrite: bool,
    },
    /// Interactive menu.
    Menu {
        data: std::path::PathBuf,
        chart: Option<std::path::PathBuf>,
    },
    /// Monthly linear trend prediction.
    Trend {
        data: std::path::PathBuf,
        month: Option<f64>,
        chart: Option<std::path::PathBuf>,
    },
}

/// Structure representing command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub config: Option<std::path::PathBuf>,
    pub verbose: u8,
    pub command: Command,
}

/// Command-line arguments parser using Clap.
impl Args {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    ///
    /// # Errors
    /// * If required arguments are missing or invalid.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let path = |m: &clap::ArgMatches, id: &str| m.get_one::<String>(id).map(std::path::PathBuf::from);
        let data = |m: &clap::ArgMatches| path(m, "data").unwrap_or_default();

        let command = match matches.subcommand() {
            Some(("append", m)) => Command::Append {
                data: data(m),
                date: m.get_one::<String>("date").cloned().unwrap_or_default(),
                count: m.get_one::<String>("count").cloned().unwrap_or_default(),
                overwrite: m.get_flag("overwrite"),
            },
            Some(("menu", m)) => Command::Menu {
                data: data(m),
                chart: path(m, "chart"),
            },
            Some(("trend", m)) => Command::Trend {
                data: data(m),
                month: m.get_one::<f64>("month").copied(),
                chart: path(m, "chart"),
            },
            Some((_, m)) => Command::Forecast {
                data: data(m),
                days: m.get_one::<i64>("days").copied(),
                threshold: m.get_one::<f64>("threshold").copied(),
                inclusive: m.get_flag("inclusive"),
                chart: path(m, "chart"),
                current: m.get_flag("current"),
            },
            None => unreachable!("subcommand is required"),
        };

        Args {
            config: matches.get_one::<String>("config").map(std::path::PathBuf::from),
            verbose: matches.get_count("verbose"),
            command,
        }
    }
}

fn data_arg(help: &'static str) -> clap::Arg {
    clap::Arg::new("data")
        .short('d')
        .long("data")
        .help(help)
        .required(true)
        .num_args(1)
}

fn chart_arg() -> clap::Arg {
    clap::Arg::new("chart")
        .short('o')
        .long("chart")
        .help("Path of the SVG chart to write (default from config: forecast.svg)")
        .num_args(1)
}

/// Builds the clap command tree.
pub fn command() -> clap::Command {
    clap::Command::new("event-forecast")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Forecast daily event counts from a sparse history log")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML configuration file")
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug)")
                .global(true)
                .action(clap::ArgAction::Count),
        )
        .subcommand(
            clap::Command::new("forecast")
                .about("Fit the additive model and forecast the next days")
                .arg(data_arg("CSV history file with date and count columns"))
                .arg(
                    clap::Arg::new("days")
                        .short('n')
                        .long("days")
                        .help("Days to forecast past the last logged date (default from config: 45)")
                        .num_args(1)
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(i64)),
                )
                .arg(
                    clap::Arg::new("threshold")
                        .short('t')
                        .long("threshold")
                        .help("Highlight days whose forecast exceeds this value")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_finite_f64)),
                )
                .arg(
                    clap::Arg::new("inclusive")
                        .long("inclusive")
                        .help("Also highlight days equal to the threshold")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    clap::Arg::new("current")
                        .long("current")
                        .help("Log yesterday as a day without events if it is missing")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(chart_arg()),
        )
        .subcommand(
            clap::Command::new("append")
                .about("Add a record to the history file")
                .arg(data_arg("CSV history file with date and count columns"))
                .arg(
                    clap::Arg::new("date")
                        .long("date")
                        .help("Event date (YYYY-MM-DD)")
                        .required(true)
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("count")
                        .long("count")
                        .help("Number of events on that date")
                        .required(true)
                        .allow_hyphen_values(true)
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("overwrite")
                        .short('y')
                        .long("overwrite")
                        .help("Replace an existing record without asking")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            clap::Command::new("menu")
                .about("Interactive menu to update the history and forecast")
                .arg(data_arg("CSV history file with date and count columns"))
                .arg(chart_arg()),
        )
        .subcommand(
            clap::Command::new("trend")
                .about("Predict one month with a linear trend over monthly totals")
                .arg(data_arg("CSV file with month and thefts columns"))
                .arg(
                    clap::Arg::new("month")
                        .short('m')
                        .long("month")
                        .help("Month index to predict (default: the one after the last)")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_finite_f64)),
                )
                .arg(chart_arg()),
        )
}

/// Validates that a value is a finite number.
///
/// # Arguments
/// * `s` - String representation of the number.
///
/// # Returns
/// * `Result<f64>` - Validated number.
fn parse_finite_f64(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err("Must be a finite number".to_string()),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

use std::io::{BufRead, Write};

use crate::config::AppConfig;
use crate::engine::Forecaster;
use crate::history::EventRecord;
use crate::session::ForecastSession;
use crate::{chart, progress, utils};

/// Menu driven front end over a [`ForecastSession`].
///
/// Reads answers line by line from `input` and writes prompts and reports to
/// `output`, so it runs the same on a terminal or against scripted input.
/// Core errors are reported and the menu is shown again; end of input ends
/// the session.
pub struct InteractionController<'a, F: Forecaster, R, W> {
    session: &'a mut ForecastSession<F>,
    config: &'a AppConfig,
    input: R,
    output: W,
    today: chrono::NaiveDate,
}

impl<'a, F, R, W> InteractionController<'a, F, R, W>
where
    F: Forecaster,
    R: BufRead,
    W: Write,
{
    pub fn new(session: &'a mut ForecastSession<F>, config: &'a AppConfig, input: R, output: W) -> Self {
        Self {
            session,
            config,
            input,
            output,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Overrides the current date used for the "current query" shortcut.
    pub fn with_today(mut self, today: chrono::NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Runs the menu until the user exits or input ends.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            writeln!(self.output, "1. View / update historical data")?;
            writeln!(self.output, "2. Make a forecast")?;
            writeln!(self.output, "3. Exit")?;
            let Some(choice) = self.prompt("Choose an option: ")? else {
                break;
            };

            let step = match choice.as_str() {
                "1" => self.view_and_update(),
                "2" => self.forecast_menu(),
                "3" => break,
                _ => {
                    writeln!(self.output, "Invalid choice, try again.")?;
                    continue;
                }
            };
            if let Err(e) = step {
                writeln!(self.output, "❌ {}", e)?;
            }
        }

        writeln!(self.output, "Session finished by the user.")?;
        anyhow::Ok(())
    }

    fn view_and_update(&mut self) -> anyhow::Result<()> {
        write!(self.output, "{}", self.session.log())?;
        if !self.ask_yes_no("Update the data? (y/N): ")? {
            return anyhow::Ok(());
        }

        let Some(date) = self.prompt("Event date (YYYY-MM-DD): ")? else {
            return anyhow::Ok(());
        };
        let Some(count) = self.prompt("Number of events: ")? else {
            return anyhow::Ok(());
        };

        let mut failure = None;
        let mut confirm = confirm_with(&mut self.input, &mut self.output, &mut failure);
        let outcome = self.session.append(&date, &count, &mut confirm)?;
        drop(confirm);
        if let Some(e) = failure {
            return Err(e.into());
        }
        if outcome.changed() {
            writeln!(self.output, "✅ Data updated")?;
        } else {
            writeln!(self.output, "Operation cancelled.")?;
        }

        self.offer_current_query()?;
        self.forecast_and_report()
    }

    fn forecast_menu(&mut self) -> anyhow::Result<()> {
        self.offer_current_query()?;
        self.forecast_and_report()
    }

    /// Asks whether the forecast should start from yesterday and, if so,
    /// logs yesterday as a day without events.
    fn offer_current_query(&mut self) -> anyhow::Result<()> {
        let yesterday = utils::day_before(self.today);
        if self.session.log().contains(yesterday) {
            return anyhow::Ok(());
        }

        writeln!(self.output, "1. Current query (count {} as a day without events)", utils::format_date(yesterday))?;
        writeln!(self.output, "2. Retroactive query")?;
        if let Some(choice) = self.prompt("Choose an option: ")? {
            if choice == "1" && self.session.append_if_missing(yesterday)? {
                writeln!(self.output, "✅ Added {} with 0 events", utils::format_date(yesterday))?;
            }
        }
        anyhow::Ok(())
    }

    fn forecast_and_report(&mut self) -> anyhow::Result<()> {
        let default_days = self.config.forecast.horizon_days;
        let Some(answer) = self.prompt(&format!("Number of days to forecast [{}]: ", default_days))? else {
            return anyhow::Ok(());
        };
        let horizon = if answer.is_empty() {
            default_days
        } else {
            answer
                .parse::<i64>()
                .map_err(|e| anyhow::anyhow!("Not a valid number of days '{}': {}", answer, e))?
        };

        let rule = self.config.highlight;
        let session = &mut *self.session;
        let (result, highlights) = progress::with_spinner("Fitting model...", || session.run(horizon, &rule))?;

        writeln!(
            self.output,
            "📈 Forecast from {} to {} ({} days ahead)",
            utils::format_date(result.training_end()),
            result
                .points()
                .last()
                .map_or_else(|| "-".to_string(), |p| utils::format_date(p.date)),
            horizon
        )?;
        if highlights.is_empty() {
            writeln!(self.output, "No day above {}", rule.threshold)?;
        } else {
            writeln!(self.output, "Days above {}:", rule.threshold)?;
            for p in highlights.points() {
                writeln!(
                    self.output,
                    " - {}: {:.3} [{:.3}, {:.3}]",
                    utils::format_date(p.date),
                    p.point,
                    p.lower,
                    p.upper
                )?;
            }
        }

        chart::render_forecast(&result, &highlights, self.session.log(), &self.config.chart)?;
        writeln!(self.output, "Chart written to {}", self.config.chart.output.display())?;
        anyhow::Ok(())
    }

    fn prompt(&mut self, question: &str) -> anyhow::Result<Option<String>> {
        Ok(read_answer(&mut self.input, &mut self.output, question)?)
    }

    fn ask_yes_no(&mut self, question: &str) -> anyhow::Result<bool> {
        Ok(self.prompt(question)?.is_some_and(|answer| is_yes(&answer)))
    }
}

/// Builds an overwrite confirmation that asks on `output` and reads the
/// answer from `input`.
///
/// A prompt that cannot be written or read declines the overwrite; the I/O
/// error is left in `failure` for the caller to report after the append.
pub fn confirm_with<'a, R: BufRead, W: Write>(
    input: &'a mut R,
    output: &'a mut W,
    failure: &'a mut Option<std::io::Error>,
) -> impl FnMut(EventRecord, u32) -> bool + 'a {
    move |existing: EventRecord, replacement: u32| {
        let question = format!(
            "An entry already exists for {} ({} events). Overwrite with {}? (y/N): ",
            utils::format_date(existing.date),
            existing.count,
            replacement
        );
        match read_answer(input, output, &question) {
            Ok(answer) => answer.is_some_and(|answer| is_yes(&answer)),
            Err(e) => {
                *failure = Some(e);
                false
            }
        }
    }
}

/// Writes `question` and reads one trimmed line, `None` at end of input.
pub fn read_answer<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> std::io::Result<Option<String>> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes" | "s" | "sim")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposition::DecompositionForecaster;
    use crate::history::HistoryStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        path: std::path::PathBuf,
        config: AppConfig,
    }

    /// Nine days of history ending on 2024-01-09.
    const HISTORY: &str = "Date,Value\n2024-01-01,1\n2024-01-02,0\n2024-01-05,2\n2024-01-09,1\n";

    fn fixture(contents: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(&path, contents).unwrap();
        let mut config = AppConfig::default();
        config.chart.output = dir.path().join("forecast.svg");
        Fixture { _dir: dir, path, config }
    }

    fn run_script(fixture: &Fixture, script: &str, today: chrono::NaiveDate) -> (String, ForecastSession) {
        let mut session =
            ForecastSession::open(HistoryStore::new(&fixture.path), DecompositionForecaster::default()).unwrap();
        let mut output = Vec::new();
        InteractionController::new(&mut session, &fixture.config, script.as_bytes(), &mut output)
            .with_today(today)
            .run()
            .unwrap();
        (String::from_utf8(output).unwrap(), session)
    }

    fn date(d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_exit() {
        let fx = fixture("Date,Value\n2024-01-01,1\n2024-01-02,0\n");
        let (out, _) = run_script(&fx, "3\n", date(3));
        assert!(out.contains("Session finished"));
    }

    #[test]
    fn test_invalid_choice_reprompts() {
        let fx = fixture("Date,Value\n2024-01-01,1\n2024-01-02,0\n");
        let (out, _) = run_script(&fx, "9\n3\n", date(3));
        assert!(out.contains("Invalid choice"));
    }

    #[test]
    fn test_forecast_with_current_query() {
        let fx = fixture(HISTORY);
        let (out, session) = run_script(&fx, "2\n1\n10\n3\n", date(11));

        assert_eq!(session.log().get(date(10)), Some(0));
        assert_eq!(session.last_forecast().unwrap().training_end(), date(10));
        assert!(out.contains("Chart written to"));
        assert!(fx.config.chart.output.exists());
    }

    #[test]
    fn test_update_declined_overwrite() {
        let fx = fixture(HISTORY);
        let before = std::fs::read(&fx.path).unwrap();
        // update, date, count, decline overwrite, retroactive query, default horizon, exit
        let (out, session) = run_script(&fx, "1\ny\n2024-01-01\n5\nn\n2\n\n3\n", date(20));

        assert!(out.contains("Operation cancelled"));
        assert_eq!(session.log().get(date(1)), Some(1));
        assert_eq!(std::fs::read(&fx.path).unwrap(), before);
        assert_eq!(session.last_forecast().unwrap().future().len(), 45);
    }

    #[test]
    fn test_update_with_invalid_count_reports_error() {
        let fx = fixture(HISTORY);
        let (out, session) = run_script(&fx, "1\ny\n2024-01-07\nlots\n3\n", date(10));
        assert!(out.contains("❌ Invalid input 'lots'"));
        assert_eq!(session.log().len(), 4);
    }

    /// Writer whose flush always fails.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_read_answer_propagates_output_errors() {
        let err = read_answer(&mut "y\n".as_bytes(), &mut BrokenPipe, "Overwrite? ").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_confirm_reports_prompt_failure() {
        let existing = EventRecord { date: date(1), count: 1 };

        let mut input: &[u8] = b"y\n";
        let mut broken = BrokenPipe;
        let mut failure = None;
        let mut confirm = confirm_with(&mut input, &mut broken, &mut failure);
        assert!(!confirm(existing, 3));
        drop(confirm);
        assert_eq!(failure.unwrap().kind(), std::io::ErrorKind::BrokenPipe);

        let mut input: &[u8] = b"sim\n";
        let mut output = Vec::new();
        let mut failure = None;
        let mut confirm = confirm_with(&mut input, &mut output, &mut failure);
        assert!(confirm(existing, 3));
        drop(confirm);
        assert!(failure.is_none());
        assert!(String::from_utf8(output).unwrap().contains("Overwrite with 3?"));
    }

    #[test]
    fn test_bad_horizon_reports_error() {
        let fx = fixture("Date,Value\n2024-01-01,1\n2024-01-02,0\n");
        let (out, _) = run_script(&fx, "2\n-4\n3\n", date(3));
        assert!(out.contains("❌ Cannot predict"));
    }
}

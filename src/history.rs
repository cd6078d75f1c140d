use crate::error::{ForecastError, Result};
use crate::utils;

/// Single day of the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventRecord {
    pub date: chrono::NaiveDate,
    pub count: u32,
}

/// Header of the file a log was read from, kept so a rewrite looks the same.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    headers: Vec<String>,
    date_idx: usize,
    value_idx: usize,
}

/// Sparse event log, at most one count per date, always ordered by date.
///
/// A log loaded from a file also remembers that file's header and, when it
/// has columns beyond date and count, the raw fields of every row, so saving
/// it back loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    records: std::collections::BTreeMap<chrono::NaiveDate, u32>,
    layout: Option<Layout>,
    rows: std::collections::BTreeMap<chrono::NaiveDate, Vec<String>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count logged for `date`, if any.
    pub fn get(&self, date: chrono::NaiveDate) -> Option<u32> {
        self.records.get(&date).copied()
    }

    pub fn contains(&self, date: chrono::NaiveDate) -> bool {
        self.records.contains_key(&date)
    }

    pub fn first_date(&self) -> Option<chrono::NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<chrono::NaiveDate> {
        self.records.keys().next_back().copied()
    }

    /// Records in ascending date order.
    pub fn records(&self) -> impl Iterator<Item = EventRecord> + '_ {
        self.records
            .iter()
            .map(|(&date, &count)| EventRecord { date, count })
    }

    /// Returns a copy of the log with `record` set, replacing any previous count.
    ///
    /// Extra fields of a replaced row are kept.
    fn with_record(&self, record: EventRecord) -> Self {
        let mut updated = self.clone();
        updated.records.insert(record.date, record.count);
        updated
    }
}

impl FromIterator<EventRecord> for HistoryLog {
    fn from_iter<I: IntoIterator<Item = EventRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.date, r.count)).collect(),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>5}  {:<10}  {:>5}", "#", "Date", "Value")?;
        for (i, record) in self.records().enumerate() {
            writeln!(
                f,
                "{:>5}  {:<10}  {:>5}",
                i,
                utils::format_date(record.date),
                record.count
            )?;
        }
        Ok(())
    }
}

/// Decides whether an existing record may be overwritten.
///
/// Implemented for any `FnMut(EventRecord, u32) -> bool`, so tests and
/// front ends can pass a closure. The first argument is the record already
/// in the log, the second the count that would replace it.
pub trait ConfirmOverwrite {
    fn confirm_overwrite(&mut self, existing: EventRecord, replacement: u32) -> bool;
}

impl<F> ConfirmOverwrite for F
where
    F: FnMut(EventRecord, u32) -> bool,
{
    fn confirm_overwrite(&mut self, existing: EventRecord, replacement: u32) -> bool {
        self(existing, replacement)
    }
}

/// Result of an append request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The date was new.
    Inserted(HistoryLog),
    /// The date existed and the caller agreed to replace it.
    Replaced { log: HistoryLog, previous: u32 },
    /// The date existed and the caller declined; the log is the one passed in.
    Declined(HistoryLog),
}

impl AppendOutcome {
    pub fn log(&self) -> &HistoryLog {
        match self {
            AppendOutcome::Inserted(log) => log,
            AppendOutcome::Replaced { log, .. } => log,
            AppendOutcome::Declined(log) => log,
        }
    }

    pub fn into_log(self) -> HistoryLog {
        match self {
            AppendOutcome::Inserted(log) => log,
            AppendOutcome::Replaced { log, .. } => log,
            AppendOutcome::Declined(log) => log,
        }
    }

    /// `true` when the log was modified and persisted.
    pub fn changed(&self) -> bool {
        !matches!(self, AppendOutcome::Declined(_))
    }
}

/// CSV backed storage for the event log.
///
/// The file holds one row per event date with a date column and an integer
/// count column. Zero-filled days are never written.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: std::path::PathBuf,
    date_column: String,
    value_column: String,
}

impl HistoryStore {
    /// Creates a store for `path` using the default `Date`/`Value` columns.
    pub fn new<P: Into<std::path::PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            date_column: "Date".to_string(),
            value_column: "Value".to_string(),
        }
    }

    /// Overrides the column names used for reading and writing.
    pub fn with_columns(mut self, date_column: &str, value_column: &str) -> Self {
        self.date_column = date_column.to_string();
        self.value_column = value_column.to_string();
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the event log from the backing file.
    ///
    /// Row order in the file does not matter. Column names are matched
    /// case-insensitively. Additional columns are not interpreted but are
    /// carried in the log so [`HistoryStore::save`] writes them back.
    ///
    /// # Returns
    /// * `Result<HistoryLog>` - The parsed log.
    ///
    /// # Errors
    /// * `ForecastError::Io` if the file cannot be opened.
    /// * `ForecastError::Format` if a required column is missing, a date or
    ///   count cannot be parsed, or the same date appears twice.
    pub fn load(&self) -> Result<HistoryLog> {
        let file = std::fs::File::open(&self.path).map_err(|e| ForecastError::io(&self.path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| ForecastError::format(&self.path, e.to_string()))?
            .clone();
        let date_idx = self.column_index(&headers, &self.date_column)?;
        let value_idx = self.column_index(&headers, &self.value_column)?;
        let has_extra_columns = headers.len() > 2;

        let mut records = std::collections::BTreeMap::new();
        let mut rows = std::collections::BTreeMap::new();
        for result in reader.records() {
            let row = result.map_err(|e| ForecastError::format(&self.path, e.to_string()))?;
            let line = row.position().map_or(0, |p| p.line());

            let raw_date = row.get(date_idx).unwrap_or_default();
            let date = utils::parse_date(raw_date).ok_or_else(|| {
                ForecastError::format(&self.path, format!("line {}: unparsable date '{}'", line, raw_date))
            })?;

            let raw_count = row.get(value_idx).unwrap_or_default();
            let count = utils::parse_count(raw_count).ok_or_else(|| {
                ForecastError::format(
                    &self.path,
                    format!("line {}: '{}' is not a non-negative integer", line, raw_count),
                )
            })?;

            if records.insert(date, count).is_some() {
                return Err(ForecastError::format(
                    &self.path,
                    format!("line {}: duplicate date {}", line, utils::format_date(date)),
                ));
            }
            if has_extra_columns {
                rows.insert(date, row.iter().map(String::from).collect());
            }
        }

        tracing::debug!(path = %self.path.display(), records = records.len(), "history loaded");
        Ok(HistoryLog {
            records,
            layout: Some(Layout {
                headers: headers.iter().map(String::from).collect(),
                date_idx,
                value_idx,
            }),
            rows,
        })
    }

    /// Writes the whole log back to the backing file.
    ///
    /// The rows are written to a temporary file next to the target, which is
    /// then renamed over it. Readers see either the old or the new file,
    /// never a partial one.
    ///
    /// A log that came from [`HistoryStore::load`] keeps the header text and
    /// column order it was read with, along with any extra fields; rows added
    /// since leave those fields empty. Other logs get the configured column
    /// names.
    pub fn save(&self, log: &HistoryLog) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| ForecastError::io(&dir, e))?;
        {
            let layout = log.layout.clone().unwrap_or_else(|| Layout {
                headers: vec![self.date_column.clone(), self.value_column.clone()],
                date_idx: 0,
                value_idx: 1,
            });
            let width = layout.headers.len();

            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            writer
                .write_record(&layout.headers)
                .map_err(|e| self.write_error(e))?;
            for record in log.records() {
                let mut row = log.rows.get(&record.date).cloned().unwrap_or_default();
                row.resize(width, String::new());
                row[layout.date_idx] = utils::format_date(record.date);
                row[layout.value_idx] = record.count.to_string();
                writer.write_record(&row).map_err(|e| self.write_error(e))?;
            }
            writer.flush().map_err(|e| ForecastError::io(&self.path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| ForecastError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| ForecastError::io(&self.path, e.error))?;

        tracing::info!(path = %self.path.display(), records = log.len(), "history saved");
        Ok(())
    }

    /// Appends a user supplied (date, count) pair and persists the result.
    ///
    /// # Arguments
    /// * `log` - Current log, left untouched.
    /// * `date` - Date text as typed by the user.
    /// * `count` - Count text as typed by the user.
    /// * `confirm` - Asked once when `date` is already logged.
    ///
    /// # Returns
    /// * `Result<AppendOutcome>` - The new log, or the unchanged one if the
    ///   overwrite was declined.
    ///
    /// # Errors
    /// * `ForecastError::Validation` if the date or count is invalid.
    /// * `ForecastError::Io` if persisting fails; the file keeps its old content.
    pub fn append<C>(&self, log: &HistoryLog, date: &str, count: &str, confirm: &mut C) -> Result<AppendOutcome>
    where
        C: ConfirmOverwrite + ?Sized,
    {
        let date = utils::parse_input_date(date)?;
        let count = utils::parse_input_count(count)?;
        self.append_record(log, EventRecord { date, count }, confirm)
    }

    /// Typed variant of [`HistoryStore::append`].
    pub fn append_record<C>(&self, log: &HistoryLog, record: EventRecord, confirm: &mut C) -> Result<AppendOutcome>
    where
        C: ConfirmOverwrite + ?Sized,
    {
        let previous = log.get(record.date);
        if let Some(existing) = previous {
            let existing = EventRecord { date: record.date, count: existing };
            if !confirm.confirm_overwrite(existing, record.count) {
                tracing::warn!(date = %record.date, "overwrite declined, log unchanged");
                return Ok(AppendOutcome::Declined(log.clone()));
            }
        }

        let updated = log.with_record(record);
        self.save(&updated)?;

        Ok(match previous {
            Some(previous) => AppendOutcome::Replaced { log: updated, previous },
            None => AppendOutcome::Inserted(updated),
        })
    }

    fn column_index(&self, headers: &csv::StringRecord, name: &str) -> Result<usize> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| ForecastError::format(&self.path, format!("missing required column '{}'", name)))
    }

    fn write_error(&self, e: csv::Error) -> ForecastError {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => ForecastError::io(&self.path, io),
            other => ForecastError::io(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
            ),
        }
    }
}

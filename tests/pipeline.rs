use event_forecast::{
    AppendOutcome, DecompositionForecaster, EventRecord, ForecastError, ForecastSession, HighlightRule, HistoryStore,
    densify, highlight,
};

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_history(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("cargo_thefts_dates.csv");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_densify_example() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "Date,Value\n2024-01-03,5\n2024-01-01,2\n");
    let log = HistoryStore::new(&path).load().unwrap();

    let series = densify(&log).unwrap();
    let pairs: Vec<_> = series.points().iter().map(|p| (p.date, p.value)).collect();
    assert_eq!(
        pairs,
        vec![(date(2024, 1, 1), 2), (date(2024, 1, 2), 0), (date(2024, 1, 3), 5)]
    );
}

#[test]
fn test_declined_overwrite_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "Date,Value\n2024-01-01,2\n2024-01-03,5\n");
    let before = std::fs::read(&path).unwrap();
    let store = HistoryStore::new(&path);
    let log = store.load().unwrap();

    let outcome = store
        .append(&log, "2024-01-01", "9", &mut |_: EventRecord, _: u32| false)
        .unwrap();

    assert_eq!(outcome, AppendOutcome::Declined(log.clone()));
    assert_eq!(outcome.log().get(date(2024, 1, 1)), Some(2));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_append_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "Date,Value\n2024-01-01,2\n2024-01-03,5\n");
    let store = HistoryStore::new(&path);
    let log = store.load().unwrap();

    store
        .append(&log, "2024-01-04", "3", &mut |_: EventRecord, _: u32| true)
        .unwrap();
    let reloaded = store.load().unwrap();

    let hits: Vec<_> = reloaded.records().filter(|r| r.date == date(2024, 1, 4)).collect();
    assert_eq!(hits, vec![EventRecord { date: date(2024, 1, 4), count: 3 }]);

    let series = densify(&reloaded).unwrap();
    assert_eq!(series.start(), Some(date(2024, 1, 1)));
    assert_eq!(series.end(), Some(date(2024, 1, 4)));
    assert_eq!(series.points().last().unwrap().value, 3);
}

#[test]
fn test_session_forecast_and_highlight() {
    let dir = tempfile::tempdir().unwrap();
    let mut contents = String::from("Date,Value\n");
    // sparse thefts over ten weeks, mostly on Tuesdays
    let start = date(2024, 1, 2);
    for week in 0..10 {
        let day = start + chrono::Duration::days(week * 7);
        contents.push_str(&format!("{},1\n", day));
    }
    contents.push_str("2024-03-15,2\n");
    let path = write_history(&dir, &contents);

    let mut session =
        ForecastSession::open(HistoryStore::new(&path), DecompositionForecaster::default()).unwrap();
    let training: Vec<_> = session.dense_series().unwrap().dates().collect();

    let historical = session.forecast(0).unwrap().clone();
    let dates: Vec<_> = historical.points().iter().map(|p| p.date).collect();
    assert_eq!(dates, training);

    let rule = HighlightRule::new(0.04, true);
    let (result, highlights) = session.run(30, &rule).unwrap();
    assert_eq!(result.future().len(), 30);
    for p in result.points() {
        assert!(p.lower <= p.point && p.point <= p.upper);
    }
    assert!(highlights.dates().all(|d| d > result.training_end()));
    assert!(highlights.points().iter().all(|p| p.point >= 0.04));
    assert_eq!(highlights, highlight(&result, result.training_end(), &rule));

    let mut sorted: Vec<_> = highlights.dates().collect();
    sorted.sort();
    assert_eq!(sorted, highlights.dates().collect::<Vec<_>>());
}

#[test]
fn test_errors_surface_to_caller() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "Date,Value\n2024-01-01,2\n2024-01-05,1\n2024-01-10,3\n");
    let mut session =
        ForecastSession::open(HistoryStore::new(&path), DecompositionForecaster::default()).unwrap();

    assert!(matches!(session.forecast(-1), Err(ForecastError::Predict(_))));
    assert!(matches!(
        session.append("not a date", "1", &mut |_: EventRecord, _: u32| true),
        Err(ForecastError::Validation { .. })
    ));
    // the session stays usable after a failure
    assert_eq!(session.forecast(2).unwrap().future().len(), 2);
}

#[test]
fn test_append_keeps_columns_it_does_not_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "date,value,Region\n2024-01-01,2,SP\n2024-01-03,5,RJ\n");
    let store = HistoryStore::new(&path);
    let log = store.load().unwrap();

    store
        .append(&log, "2024-01-04", "3", &mut |_: EventRecord, _: u32| true)
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "date,value,Region\n2024-01-01,2,SP\n2024-01-03,5,RJ\n2024-01-04,3,\n"
    );
    assert_eq!(store.load().unwrap().get(date(2024, 1, 4)), Some(3));
}

#[test]
fn test_failed_write_keeps_previous_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "Date,Value\n2024-01-01,2\n");
    let before = std::fs::read(&path).unwrap();
    let log = HistoryStore::new(&path).load().unwrap();

    // a store pointed at a directory cannot replace it with a file
    let blocked = dir.path().join("blocked");
    std::fs::create_dir(&blocked).unwrap();
    let err = HistoryStore::new(&blocked)
        .append(&log, "2024-01-02", "1", &mut |_: EventRecord, _: u32| true)
        .unwrap_err();

    assert!(matches!(err, ForecastError::Io { .. }));
    assert!(blocked.is_dir());
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_malformed_file_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_history(&dir, "Day,Value\n2024-01-01,2\n");
    assert!(matches!(
        ForecastSession::open(HistoryStore::new(&path), DecompositionForecaster::default()),
        Err(ForecastError::Format { .. })
    ));
}

#[test]
fn test_demo_files_load() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");

    let config = event_forecast::AppConfig::load(Some(root.join("forecast.toml"))).unwrap();
    assert_eq!(config.highlight, HighlightRule::new(0.04, true));

    let log = HistoryStore::new(root.join("cargo_thefts_dates.csv")).load().unwrap();
    assert_eq!(log.len(), 10);

    let monthly = event_forecast::regression::load_monthly(root.join("statistic_data.csv")).unwrap();
    let trend = event_forecast::regression::LinearTrend::fit(&monthly).unwrap();
    assert!(trend.slope > 0.0);
}

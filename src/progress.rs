/// Creates a ticking spinner showing `message`.
///
/// Drawn on stderr; indicatif hides it automatically when stderr is not a
/// terminal, so piped output stays clean.
pub fn spinner(message: &str) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new_spinner();
    let style = indicatif::ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Runs a blocking step behind a spinner.
///
/// The spinner is cleared when `step` returns, whether it failed or not.
///
/// # Arguments
/// * `message` - Shown next to the spinner.
/// * `step` - The work to run.
///
/// # Returns
/// * Whatever `step` returns.
pub fn with_spinner<T, E>(message: &str, step: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let pb = spinner(message);
    let result = step();
    pb.finish_and_clear();
    result
}

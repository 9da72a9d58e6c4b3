//! Tracing subscriber setup for hosts embedding the runtime.

/// Initialize the global tracing subscriber.
///
/// The subscriber writes compact human-readable output to stderr. The
/// `RUST_LOG` environment variable overrides `level` when set.
///
/// # Arguments
///
/// * `level` - Minimum log level to display, e.g. `"warn"`.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // Ignore the error if a subscriber is already installed (tests).
    let _ = subscriber.try_init();
}

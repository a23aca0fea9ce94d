//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Install a global fmt subscriber for the given configuration.
///
/// `RUST_LOG` takes precedence over `config.level`. Does nothing if a global
/// subscriber is already installed, so a host that sets up its own tracing
/// keeps it.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(config.with_target)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

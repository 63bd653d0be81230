// Infrastructure: tracing subscriber for the command-line entry point.
// Logs go to stderr; stdout carries only the result JSON.

use crate::domain::value_objects::LogLevel;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_FILTER: &str = "info";

/// Filter directive: `RUST_LOG` when set, else the configured level, else info
pub fn filter_directive(env: Option<&str>, level: Option<LogLevel>) -> String {
    match (env.map(str::trim).filter(|s| !s.is_empty()), level) {
        (Some(directive), _) => directive.to_string(),
        (None, Some(level)) => level.as_filter().to_string(),
        (None, None) => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber. Only the first call has effect.
pub fn init(level: Option<LogLevel>) {
    INIT.get_or_init(|| {
        let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let directive = filter_directive(env.as_deref(), level);
        let filter = EnvFilter::try_new(&directive)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init();
    });
}

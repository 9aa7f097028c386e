//! Logging infrastructure for Cyclefit.
//!
//! Logs go to stderr so stdout stays clean for command output and `--json`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count: 0 warn, 1 info, 2+ debug.
///
/// Only our own crates get the raised level; dependencies stay at warn.
pub fn directive_for_verbosity(verbosity: u8) -> String {
    let level = match verbosity {
        0 => return "warn".to_string(),
        1 => "info",
        _ => "debug",
    };
    format!("warn,cycle_core={level},cyclefit={level}")
}

/// Initialize logging for a `-v` count
///
/// `RUST_LOG` overrides the verbosity when set.
pub fn init_with_verbosity(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(verbosity)));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("cycle_core=debug"))
        .try_init();
}

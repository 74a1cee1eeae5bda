//! Diagnostic logging setup for the command-line tools
//!
//! Logs always go to stderr so stdout carries nothing but the tool's result.
//! Verbosity comes from `-v` flags only; the environment is not consulted.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count
pub fn filter_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // lopdf reports recoverable parse problems through `log`; they are noise here.
    format!("{},lopdf=off", level)
}

/// Install the global subscriber; later calls are no-ops
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(verbosity)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

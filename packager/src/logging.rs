//! Log output for the packager binary.
//!
//! The library emits records through the `log` facade. The binary installs a
//! `tracing-subscriber` formatter on stderr; its `tracing-log` bridge picks up
//! those records, so no module needs to know which backend is active.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Map the CLI verbosity flags to a level filter.
///
/// # Examples
///
/// ```
/// use electron_dist::logging::level_for;
/// use tracing_subscriber::filter::LevelFilter;
///
/// assert_eq!(level_for(0, true), LevelFilter::ERROR);
/// assert_eq!(level_for(0, false), LevelFilter::INFO);
/// assert_eq!(level_for(1, false), LevelFilter::DEBUG);
/// assert_eq!(level_for(3, false), LevelFilter::TRACE);
/// ```
#[must_use]
pub const fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Build the filter for `level`. Directives in `RUST_LOG` refine it.
#[must_use]
pub fn filter_for(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the stderr subscriber at `level`.
///
/// # Errors
///
/// Returns an error if a global subscriber or `log` logger is already set.
pub fn init(level: LevelFilter) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
}

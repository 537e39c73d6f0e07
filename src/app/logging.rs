//! `tracing` subscriber setup.
//!
//! A non-empty `RUST_LOG` decides the filter; otherwise `-v`/`-vv` raise the
//! default level and `-q` lowers it. While the TUI owns the terminal, logs
//! must not reach stderr: they go to `--log-file` or nowhere.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::AppError;

pub fn level_for(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    }
}

/// Filter directives: `rust_log` when set, else the level from the flags.
pub fn filter_directives(rust_log: Option<&str>, verbose: u8, quiet: bool) -> String {
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => directives.to_string(),
        None => level_for(verbose, quiet).as_str().to_ascii_lowercase(),
    }
}

/// Install the global subscriber.
///
/// Without `--log-file`, an already-installed subscriber is kept. With one,
/// failing to install is an error, since the file would stay empty.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>, tui: bool) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::new(filter_directives(rust_log.as_deref(), verbose, quiet));
    let builder = fmt().with_env_filter(filter).with_target(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::new(2, format!("Failed to open log file '{}': {e}", path.display())))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| AppError::new(2, format!("Cannot log to '{}': {e}", path.display())))
        }
        None => {
            let installed = if tui {
                builder.with_writer(std::io::sink).try_init()
            } else {
                builder.with_writer(std::io::stderr).try_init()
            };
            // A subscriber may already be set (tests, embedding); keep it.
            let _ = installed;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0, false), Level::INFO);
        assert_eq!(level_for(1, false), Level::DEBUG);
        assert_eq!(level_for(3, false), Level::TRACE);
        assert_eq!(level_for(2, true), Level::WARN);
    }

    #[test]
    fn rust_log_takes_precedence_over_flags() {
        assert_eq!(filter_directives(Some("debug"), 0, false), "debug");
        assert_eq!(filter_directives(Some("dpe_hub=trace"), 0, true), "dpe_hub=trace");
        assert_eq!(filter_directives(None, 1, false), "debug");
        assert_eq!(filter_directives(Some("  "), 0, true), "warn");

        let filter = EnvFilter::new(filter_directives(Some("debug"), 0, false));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn log_file_reports_an_unusable_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dpe.log");

        // Whichever call installs first, a subscriber is global afterwards.
        init_logging(0, false, None, true).unwrap();
        let err = init_logging(0, false, Some(&path), true).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}

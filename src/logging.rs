//! Tracing subscriber for one run.
//!
//! Two layers: compact stderr output filtered by the CLI verbosity (or
//! `LINEAGEOS_INFO_LOG` / `RUST_LOG`), and a plain-text log file that always
//! records debug and above, so every skip decision ends up in the file.
//!
//! The subscriber is not installed globally; `main` scopes it to the run with
//! `tracing::subscriber::with_default`.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "LINEAGEOS_INFO_LOG";

/// Verbosity level derived from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Logging settings for one run.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub verbosity: Verbosity,
    /// Truncated when the subscriber is built.
    pub file: Option<PathBuf>,
    pub no_color: bool,
}

/// Build the subscriber described by `config`. Creates the log file.
pub fn build_subscriber(config: &LogConfig) -> Result<impl Subscriber + Send + Sync + 'static> {
    let file_layer = match &config.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    let stderr_is_tty = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!config.no_color && stderr_is_tty)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(build_env_filter(config.verbosity));

    Ok(tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer))
}

/// `LINEAGEOS_INFO_LOG` > `RUST_LOG` > CLI verbosity.
fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(verbosity.default_level().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
    }

    #[test]
    fn default_level_mapping() {
        assert_eq!(Verbosity::Quiet.default_level(), Level::ERROR);
        assert_eq!(Verbosity::Normal.default_level(), Level::INFO);
        assert_eq!(Verbosity::Verbose.default_level(), Level::DEBUG);
    }

    #[test]
    fn scoped_subscriber_writes_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let config = LogConfig {
            verbosity: Verbosity::Quiet,
            file: Some(path.clone()),
            no_color: true,
        };

        let subscriber = build_subscriber(&config).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(device = "Acme Zeta", "Skip: no maintainers");
            tracing::debug!("details");
        });

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("Skip: no maintainers"));
        assert!(log.contains("device=\"Acme Zeta\""));
        assert!(log.contains("details"));
    }

    #[test]
    fn unwritable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            verbosity: Verbosity::Normal,
            file: Some(dir.path().join("missing").join("run.log")),
            no_color: true,
        };
        assert!(build_subscriber(&config).is_err());
    }
}

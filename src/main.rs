//! `lineageos-info` — turn the LineageOS wiki device database into CSV reports
//! and a README top list.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load and validate the config ([`config::load_config`]), CLI flags win.
//! 3. Build the run's log subscriber ([`logging`]).
//! 4. Parse every device descriptor ([`device`]), dating it via git ([`git`]).
//! 5. Rank ([`rank`]) and filter ([`filter`]) the devices.
//! 6. Write one CSV per target version and patch the README ([`report`], [`readme`]);
//!    [`composer`] drives steps 4–6.
//! 7. Render the requested report.

mod cli;
mod composer;
mod config;
mod device;
mod filter;
mod git;
mod logging;
mod models;
mod rank;
mod readme;
mod report;

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, ReportFormat};
use composer::Composer;
use config::load_config;
use git::{CommitDates, GitCommitDates, NoCommitDates};
use logging::{LogConfig, Verbosity};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base = std::env::current_dir()?;
    let mut config = load_config(&base, cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    let log_config = LogConfig {
        verbosity: Verbosity::from_flags(cli.verbose, cli.quiet),
        file: config.log.path().map(Path::to_path_buf),
        no_color: cli.no_color,
    };
    let subscriber = logging::build_subscriber(&log_config)?;

    let dates: Box<dyn CommitDates> = if config.input.git_dates {
        Box::new(GitCommitDates)
    } else {
        Box::new(NoCommitDates)
    };

    let composer = Composer {
        config: &config,
        dates: dates.as_ref(),
        today: chrono::Local::now().date_naive(),
        show_progress: !cli.quiet && !cli.verbose,
    };

    let report = tracing::subscriber::with_default(subscriber, || {
        let result = composer.run();
        if let Err(err) = &result {
            tracing::error!("{:#}", err);
        }
        result
    })?;

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(&report, cli.verbose, cli.quiet)?;
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

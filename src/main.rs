//! Cinder - a glob-driven stylesheet compiler with dependency-aware
//! incremental rebuilds.

mod build;
mod cli;
mod compiler;
mod config;
mod deps;
mod logger;
mod manifest;
mod resolver;
mod watch;

use anyhow::{Result, bail};
use build::{ABORT, run_build};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use std::path::Path;
use std::sync::atomic::Ordering;
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static Config = Box::leak(Box::new(load_config(cli)?));

    ctrlc::set_handler(|| ABORT.store(true, Ordering::SeqCst))?;

    match &cli.command {
        Commands::Build { build_args } => build_once(config, build_args.force),
        Commands::Watch { build_args } => {
            // Initial build; per-unit failures are reported and watching
            // continues, only fatal errors abort
            run_build(config, build_args.force)?.log_summary();
            watch_for_changes_blocking(config)
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<Config> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found.");
    }

    let mut config = Config::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}

/// Run a single build and exit non-zero on failures.
fn build_once(config: &'static Config, force: bool) -> Result<()> {
    let report = run_build(config, force)?;
    report.log_summary();

    if report.aborted() {
        bail!("Build aborted");
    }
    if report.failed() > 0 {
        bail!("{} unit(s) failed to compile", report.failed());
    }
    Ok(())
}

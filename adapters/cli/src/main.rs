#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays scripted placement sessions.

mod config;
mod scenario;
mod scene;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::{config::CliConfig, scenario::Scenario};

/// Replays placement sessions against an analytic scene and logs the outcome.
#[derive(Debug, Parser)]
#[command(name = "buildgrid")]
#[command(about = "Replays grid placement sessions against an analytic scene")]
struct Cli {
    /// TOML file with `[grid]`, `[session]` and `[palette]` tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// TOML scenario to replay instead of the built-in demo
    #[arg(long)]
    scenario: Option<PathBuf>,
}

/// Entry point for the Buildgrid command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    let scenario = match cli.scenario.as_deref() {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo()?,
    };

    let report = scenario.run(&config)?;
    for session in &report.sessions {
        info!(
            "`{}` {:?} at {} facing {}° in {:?} ({} rejected)",
            session.object,
            session.state,
            session.position,
            session.rotation_degrees,
            session.cell,
            session.rejections
        );
    }
    info!("{} occupied cells", report.occupied_cells);
    Ok(())
}

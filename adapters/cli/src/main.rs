#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted Tactica session on the headless
//! stage.

mod config;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tactica_core::Stage;
use tactica_world::query;

use crate::{config::SessionConfig, session::Session};

/// Command-line arguments accepted by the `tactica` binary.
#[derive(Debug, Parser)]
#[command(name = "tactica", about = "Runs a scripted turn-based grid session")]
struct CliArgs {
    /// TOML file describing the grid, the units and the input script.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Overrides the side length of the grid.
    #[arg(long, value_name = "SIZE")]
    grid_size: Option<f32>,

    /// Overrides the number of cells along each grid axis.
    #[arg(long, value_name = "COUNT")]
    subdivisions: Option<u32>,
}

impl CliArgs {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(size) = self.grid_size {
            config.grid.size = size;
        }
        if let Some(subdivisions) = self.subdivisions {
            config.grid.subdivisions = subdivisions;
        }
        config.validate().context("session config rejected")?;
        Ok(config)
    }
}

/// Entry point for the Tactica command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let config = args.session_config()?;
    let mut session = Session::new(&config)?;
    println!("{}", query::welcome_banner(session.world()));

    futures::executor::block_on(session.run_script(&config.script))?;

    for unit in query::units(session.world()) {
        if let Some(pose) = session.stage().unit_pose(unit.id()) {
            println!(
                "{} ({}) at ({:.2}, {:.2}, {:.2})",
                unit.name(),
                unit.id(),
                pose.position.x,
                pose.position.y,
                pose.position.z
            );
        }
    }
    for line in session.log_lines() {
        println!("{line}");
    }
    Ok(())
}

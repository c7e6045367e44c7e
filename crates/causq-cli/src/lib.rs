//! Command-line driver for the causq query engine.
//!
//! Loads a binary model directory and dispatches the query subcommands:
//! `purge`, `missing`, `hyperpath`, `batch`, `cutoffs`, `bench`.

pub mod args;
pub mod driver;
pub mod resolve;

use anyhow::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    driver::run(args::CliArgs::parse())
}

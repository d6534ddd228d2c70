mod cli;

use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run().context("Running fizil")
}

//! Entry point wiring the CLI surface and configuration file to the
//! renderer: the interactive window by default, plus the `still`, `check`
//! and `fallback` utilities that run without a GPU.

mod check;
mod cli;
mod export;
mod run;

use anyhow::{Context, Result};
use cli::Command;
use heroconfig::HeroConfig;

fn main() -> Result<()> {
    let cli = cli::parse();
    let config = HeroConfig::discover(cli.config.as_deref()).context("failed to load configuration")?;
    run::initialise_tracing(config.log.filter.as_deref());

    match cli.command {
        Some(Command::Run(args)) => run::run(&config, args),
        Some(Command::Still(args)) => export::still(&config, args),
        Some(Command::Check(args)) => check::check(args),
        Some(Command::Fallback(args)) => export::fallback(&config, args),
        None => run::run(&config, cli.run),
    }
}

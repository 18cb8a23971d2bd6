//! extreload - live reload for browser extensions during development.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use extreload::cli::{self, Cli, Commands};
use extreload::config::ExtReloadConfig;
use extreload::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    logger::set_verbose(cli.verbose);
    let config = ExtReloadConfig::load(&cli)?;
    logger::set_verbose(config.reload.verbose);

    match &cli.command {
        Commands::Dev { .. } => cli::dev::run_dev(config),
        Commands::Patch { .. } => cli::patch::patch_once(&config).map(|_| ()),
        Commands::Id => cli::key::print_identity(&config),
        Commands::RotateKey => cli::key::rotate_key(&config),
    }
}

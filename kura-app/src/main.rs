use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use kura_common::observability::init_logging;
use kura_config::{KuraConfig, KuraConfigLoader, default_config_path};
use serde::Serialize;
use tether::build_from_config;
mod cli;
mod tether;

const APP_NAME: &str = "kura";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over files, flags win over both)
    let mut cfg = load_config(&cli)?;
    cli.apply_overrides(&mut cfg);

    let log_path = init_logging(cfg.logging.to_log_config(APP_NAME))?;
    tracing::debug!(log_path = %log_path.display(), "kura.start");

    let tether = build_from_config(&cfg)?;
    match &cli.command {
        Command::Status => print_json(&tether.status()),
        Command::Analyze { texts } => print_json(&tether.analyze_all(texts).await),
        Command::Verify { claim } => print_json(&tether.verify(claim).await),
    }
}

fn load_config(cli: &Cli) -> Result<KuraConfig> {
    let loader = KuraConfigLoader::new();
    let loader = match (&cli.config, default_config_path()) {
        (Some(path), _) => loader.with_file(path),
        (None, Some(path)) => loader.with_optional_file(path),
        (None, None) => loader,
    };
    loader.load().context("failed to load configuration")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

//! Line-oriented driver for the dice roll pipeline.
//!
//! Reads commands from stdin and prints ranges, corrections, decisions and
//! completed rolls. Suitable for scripted testing:
//!
//! ```bash
//! printf '#place d6 Weighted\n1 2\n' | cargo run -p dice-cli -- --seed 7
//! ```

mod headless;

use anyhow::{Context, Result};
use dice_core::PipelineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = load_config(&args).await?;
    headless::run_headless(config).await
}

/// Build the pipeline configuration from `--config`/`DICE_CONFIG` and flags.
async fn load_config(args: &[String]) -> Result<PipelineConfig> {
    let path = flag_value(args, "--config").or_else(|| std::env::var("DICE_CONFIG").ok());

    let mut config = match path {
        Some(path) => PipelineConfig::load(&path)
            .await
            .with_context(|| format!("failed to load config from {path}"))?,
        None => PipelineConfig::new(),
    };

    if let Some(seed) = flag_value(args, "--seed") {
        let seed = seed
            .parse()
            .with_context(|| format!("invalid --seed value: {seed}"))?;
        config = config.with_seed(seed);
    }
    if let Some(turn) = flag_value(args, "--turn") {
        let turn = turn
            .parse()
            .with_context(|| format!("invalid --turn value: {turn}"))?;
        config = config.with_starting_turn(turn);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn print_help() {
    println!("dice - resolve physical dice rolls through an effect pipeline");
    println!();
    println!("USAGE:");
    println!("    dice [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>   Load pipeline configuration from JSON");
    println!("    --seed <n>        Seed alternate-face sampling");
    println!("    --turn <n>        Turn number of the first roll");
    println!("    -h, --help        Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    DICE_CONFIG       Config path used when --config is absent");
    println!("    RUST_LOG          Log filter (default: warn)");
}

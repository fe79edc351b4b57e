//! Command line entry point for margin ratings
//!
//! Reads one or more JSON game lists, rates each independently and prints
//! the ratings as a table or as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use margin_ratings::config::{validate_config, AppConfig};
use margin_ratings::rating::games_from_json;
use margin_ratings::{PenaltySelection, RatingEngine, RatingReport};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Margin Ratings - team strength ratings from game scores
#[derive(Parser)]
#[command(
    name = "margin-ratings",
    version,
    about = "Rate teams from home-minus-away scoring margins",
    long_about = "Margin Ratings fits a paired-comparison model to game results: each \
                 margin is explained by a shared home advantage plus the difference of \
                 the two team ratings. Ratings come from a cross-validated elastic net \
                 and are reported centered on zero next to an unpenalized least squares fit."
)]
struct Args {
    /// Game list files
    #[arg(
        short,
        long,
        value_name = "FILE",
        num_args = 1..,
        required_unless_present = "dry_run",
        help = "JSON files with arrays of game records"
    )]
    games: Vec<PathBuf>,

    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Use the one-standard-error rule
    #[arg(
        long,
        help = "Pick the strongest penalty within one standard error of the best"
    )]
    one_se: bool,

    /// Mixing ratio override
    #[arg(
        long,
        value_name = "RATIO",
        help = "Share of the penalty applied as L1 (1.0 = lasso)"
    )]
    mixing_ratio: Option<f64>,

    /// Margin cap override
    #[arg(long, value_name = "POINTS", help = "Largest margin a game may contribute")]
    margin_cap: Option<f64>,

    /// Print JSON instead of a table
    #[arg(long, help = "Print the full rating report as JSON")]
    json: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without rating")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if args.one_se {
        config.rating.selection = PenaltySelection::OneStandardError;
    }

    if let Some(mixing_ratio) = args.mixing_ratio {
        config.rating.mixing_ratio = mixing_ratio;
    }

    if let Some(margin_cap) = args.margin_cap {
        config.rating.margin_cap = margin_cap;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Display configuration summary
fn display_banner(config: &AppConfig) {
    info!("Margin Ratings {}", margin_ratings::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Mixing ratio: {}", config.rating.mixing_ratio);
    info!("   Selection: {}", config.rating.selection);
    info!("   Margin cap: {}", config.rating.margin_cap);
}

fn rate_file(engine: &RatingEngine, path: &Path) -> Result<RatingReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read games file {}", path.display()))?;
    let games = games_from_json(&raw)
        .with_context(|| format!("Failed to load games from {}", path.display()))?;

    info!("Loaded {} games from {}", games.len(), path.display());
    engine.rate(&games)
}

fn print_table(path: &Path, report: &RatingReport) {
    println!("{}", path.display());
    if report.is_empty() {
        println!("  no scored games");
        return;
    }

    println!("  {:>4}  {:<32} {:>8} {:>8}", "#", "team", "rating", "ols");
    for (rank, rating) in report.ratings.iter().enumerate() {
        let reference = rating
            .reference_rating
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>4}  {:<32} {:>8.2} {:>8}",
            rank + 1,
            rating.team,
            rating.rating,
            reference
        );
    }

    if let Some(summary) = &report.summary {
        println!(
            "  {} games ({} dropped), home advantage {:.2}, penalty {:.4} ({}), R² {:.3}",
            report.games_used,
            report.games_dropped,
            summary.regularized.home_advantage,
            summary.penalty,
            summary.selection,
            summary.regularized.r_squared
        );
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        return Ok(());
    }

    let engine = RatingEngine::new(config.rating.clone())?;

    let mut failures = 0;
    for path in &args.games {
        match rate_file(&engine, path) {
            Ok(report) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_table(path, &report);
                }
            }
            Err(e) => {
                error!("Skipping {}: {:#}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures == args.games.len() && failures > 0 {
        anyhow::bail!("No games file could be rated");
    }

    Ok(())
}

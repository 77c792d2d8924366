//! Engagement Pulse - prints the dashboard report for a post metrics CSV as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use engagement_pulse::config::Config;
use engagement_pulse::data::{DataLoader, MetricDeriver};
use engagement_pulse::stats::DashboardReport;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "engagement-pulse")]
#[command(author, version, about = "Social media engagement metrics report", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "engagement-pulse.toml")]
    config: PathBuf,

    /// CSV file to analyze (overrides the config file)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Assumed campaign cost used for ROI
    #[arg(long, env = "ENGAGEMENT_CAMPAIGN_COST")]
    campaign_cost: Option<f64>,

    /// Report all 24 hours in the hourly trend, zero-filling empty hours
    #[arg(long)]
    zero_fill_hours: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, origin) = Config::load(&cli.config)?;
    if let Some(source) = cli.source {
        config.source.path = source;
    }
    if let Some(cost) = cli.campaign_cost {
        config.pipeline.campaign_cost = cost;
    }
    if cli.zero_fill_hours {
        config.pipeline.zero_fill_hours = true;
    }

    // Logs go to stderr; stdout carries the report.
    let log_level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("{}", origin);
    config.validate()?;

    let loader = DataLoader::with_options(config.loader_options());
    let table = loader
        .load_csv(&config.source.path)
        .with_context(|| format!("Failed to load {}", config.source.path.display()))?;
    let derived = MetricDeriver::derive(&table, config.pipeline.campaign_cost)?;
    let report = DashboardReport::build(&derived, config.hour_fill())?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);

    Ok(())
}

//! Quantsim CLI - command-line front end exercising `run` and
//! `run_streaming` against local CSV fixtures, standing in for the HTTP
//! request layer a production deployment would put in front of this crate.

mod fixtures;
mod logging;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use quantsim_core::config::BacktestConfig;
use quantsim_core::universe::StaticUniverse;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quantsim")]
#[command(author, version, about = "Sandboxed strategy backtester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest to completion and print the aggregate result as JSON.
    Run(RunArgs),

    /// Run a backtest and print each event as a server-sent-events line as
    /// it arrives.
    Stream(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a directory of `<SYMBOL>.csv` fixture files.
    #[arg(long)]
    fixtures: PathBuf,

    /// Path to a `.rhai` strategy source file.
    #[arg(long)]
    strategy: PathBuf,

    /// Comma-separated instrument symbols making up the universe.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Universe identifier the resolved symbol list is registered under.
    #[arg(long, default_value = "quicktest")]
    universe_id: String,

    #[arg(long)]
    start: NaiveDate,

    #[arg(long)]
    end: NaiveDate,

    #[arg(long, default_value_t = 100_000.0)]
    initial_capital: f64,

    #[arg(long, default_value_t = 1.0)]
    position_size: f64,

    #[arg(long, default_value_t = 0.0)]
    commission: f64,

    #[arg(long, default_value_t = 0.0)]
    slippage: f64,

    #[arg(long)]
    universe_limit: Option<usize>,

    #[arg(long, default_value_t = 20)]
    sample_trades_limit: usize,

    #[arg(long, default_value_t = 10)]
    max_concurrency: usize,
}

impl RunArgs {
    fn into_config(self) -> Result<BacktestConfig> {
        let strategy_source = std::fs::read_to_string(&self.strategy)
            .with_context(|| format!("reading strategy source {}", self.strategy.display()))?;

        Ok(BacktestConfig {
            strategy_source,
            universe_id: self.universe_id,
            start_date: self.start,
            end_date: self.end,
            initial_capital: self.initial_capital,
            position_size: self.position_size,
            max_positions: None,
            commission: self.commission,
            slippage: self.slippage,
            interval: "1d".to_string(),
            universe_limit: self.universe_limit,
            sample_trades_limit: self.sample_trades_limit,
            max_concurrency: self.max_concurrency,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_command(args).await,
        Commands::Stream(args) => stream_command(args).await,
    }
}

async fn run_command(args: RunArgs) -> Result<()> {
    let fixtures_dir = args.fixtures.clone();
    let symbols = args.symbols.clone();
    let universe_id = args.universe_id.clone();
    let config = args.into_config()?;

    let provider = fixtures::load_fixture_dir(&fixtures_dir)?;
    let universe = StaticUniverse::new().with_universe(universe_id, symbols);

    let result = tokio::task::spawn_blocking(move || {
        quantsim_orchestrator::run(&config, &provider, &universe)
    })
    .await
    .context("backtest task panicked")??;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn stream_command(args: RunArgs) -> Result<()> {
    let fixtures_dir = args.fixtures.clone();
    let symbols = args.symbols.clone();
    let universe_id = args.universe_id.clone();
    let config = args.into_config()?;

    let provider = fixtures::load_fixture_dir(&fixtures_dir)?;
    let provider: Arc<dyn quantsim_core::data::MarketDataProvider> = Arc::new(provider);
    let universe: Arc<dyn quantsim_core::universe::UniverseResolver> =
        Arc::new(StaticUniverse::new().with_universe(universe_id, symbols));

    let mut handle = quantsim_orchestrator::run_streaming(config, provider, universe)?;
    while let Some(event) = handle.next().await {
        print!("{}", event.to_sse_line());
    }
    Ok(())
}

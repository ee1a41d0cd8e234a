//! # Run a put-selling backtest
//! premia-backtest run --strategy put-selling --data data/spy.csv --ticker SPY
//!
//! # Run an iron condor with overridden parameters
//! premia-backtest run --strategy iron-condor --data data/spy.csv --config config/condor.toml

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use premia_backtest::backtest::BacktestEngine;
use premia_backtest::config::BacktestConfig;
use premia_backtest::data::BarLoader;
use premia_backtest::metrics::MetricsCalculator;
use premia_backtest::pricing::BlackScholes;
use premia_backtest::risk::PositionSizer;
use premia_backtest::strategy::{
    CoveredCallStrategy, IronCondorStrategy, PutSellingStrategy, Strategy, StrategyKind,
};
use premia_backtest::StrikeSelector;

#[derive(Parser)]
#[command(name = "premia-backtest")]
#[command(about = "Options-selling strategy backtester with model-priced options")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest over a CSV bar series
    Run {
        /// Strategy to run
        #[arg(short, long, value_enum)]
        strategy: StrategyKind,

        /// Path to the daily bar CSV file
        #[arg(short, long)]
        data: String,

        /// Ticker label for reporting
        #[arg(short, long, default_value = "SPY")]
        ticker: String,

        /// Path to a TOML configuration file (defaults apply if omitted)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn build_strategy(kind: StrategyKind, config: &BacktestConfig) -> Box<dyn Strategy> {
    let model = BlackScholes::new(config.engine.risk_free_rate);
    let selector = StrikeSelector::new(config.selector.clone());
    let sizer = PositionSizer::new(config.sizer);

    match kind {
        StrategyKind::PutSelling => Box::new(PutSellingStrategy::new(
            config.put_selling.clone(),
            model,
            selector,
            sizer,
        )),
        StrategyKind::IronCondor => Box::new(IronCondorStrategy::new(
            config.iron_condor.clone(),
            model,
            selector,
            sizer,
        )),
        StrategyKind::CoveredCall => Box::new(CoveredCallStrategy::new(
            config.covered_call.clone(),
            model,
            selector,
        )),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            strategy,
            data,
            ticker,
            config,
        } => {
            let config = match config {
                Some(path) => BacktestConfig::from_file(path)?,
                None => BacktestConfig::default(),
            };

            let bars = BarLoader::load_csv(&data)?;
            let engine = BacktestEngine::new(
                config.engine.clone(),
                build_strategy(strategy, &config),
            );
            let result = engine.run(&ticker, &bars)?;
            let metrics = MetricsCalculator::compute(&result);

            println!(
                "{} {} | {} -> {} ({} bars)",
                result.ticker,
                result.strategy.as_str(),
                result.start_date,
                result.end_date,
                result.bars_processed,
            );
            println!(
                "Equity: {:.2} -> {:.2}  ({} entries, {} skipped no-strike, {} bars without vol)",
                result.initial_equity,
                result.final_equity,
                result.entry_transitions,
                result.skipped_no_strike,
                result.skipped_no_volatility,
            );
            if !result.ledger.open_positions().is_empty() {
                println!(
                    "Still open at series end: {}",
                    result.ledger.open_positions().len()
                );
            }
            println!("{}", metrics.summary());
        }
    }

    Ok(())
}

// src/main.rs
mod analysis;
mod commands;
mod config;
mod pipeline;
mod runner;
mod statements;
mod storage;
mod utils;

use analysis::roic::{ANALYSIS_MIN_IGR_PCT, DEFAULT_MIN_IGR_PCT, DEFAULT_MIN_ROIC_PCT};
use analysis::valuation::{DEFAULT_DISCOUNT_RATE, DEFAULT_TERMINAL_GROWTH_RATE};
use clap::{Parser, Subcommand};
use config::ScreenerConfig;
use std::path::PathBuf;
use utils::AppError;

/// Fundamentals screener: DCF valuation, margin-of-safety filter,
/// profitability screen and ROIC/IGR filter over per-ticker CSV tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding one folder of CSV tables per ticker
    #[arg(long, global = true, env = "SCREENER_DATA_DIR", default_value = "saham")]
    data_dir: PathBuf,

    /// Directory for the batch outputs (shortlist CSV, analysis text, ROIC JSON)
    #[arg(short, long, global = true, env = "SCREENER_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Maximum tickers processed at once (default: twice the CPU count)
    #[arg(short, long, global = true, env = "SCREENER_WORKERS")]
    workers: Option<usize>,

    /// Debug logging for this crate (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct RateArgs {
    /// Discount rate as a fraction
    #[arg(long, env = "SCREENER_DISCOUNT_RATE", default_value_t = DEFAULT_DISCOUNT_RATE)]
    discount_rate: f64,

    /// Terminal growth rate as a fraction
    #[arg(long, env = "SCREENER_GROWTH_RATE", default_value_t = DEFAULT_TERMINAL_GROWTH_RATE)]
    growth_rate: f64,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct BandArgs {
    /// Lowest margin of safety kept, in percent
    #[arg(long, env = "SCREENER_MIN_MARGIN", default_value_t = 0.0)]
    min_margin: f64,

    /// Highest margin of safety kept, in percent
    #[arg(long, env = "SCREENER_MAX_MARGIN", default_value_t = 100.0)]
    max_margin: f64,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct FloorArgs {
    /// Minimum ROIC, in percent
    #[arg(long, env = "SCREENER_MIN_ROIC", default_value_t = DEFAULT_MIN_ROIC_PCT)]
    min_roic: f64,

    /// Minimum internal growth rate, in percent
    #[arg(long, env = "SCREENER_MIN_IGR", default_value_t = DEFAULT_MIN_IGR_PCT)]
    min_igr: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Value tickers and write <TICKER>_dcf_analysis.txt into each ticker folder
    Dcf {
        /// Only this ticker (default: every folder in the data directory)
        #[arg(short, long)]
        ticker: Option<String>,

        /// Process only the first N tickers (0 = all)
        #[arg(long, env = "SCREENER_LIMIT")]
        limit: Option<usize>,

        #[command(flatten)]
        rates: RateArgs,
    },
    /// Read DCF reports back and write the margin-of-safety shortlist CSV
    Filter {
        #[command(flatten)]
        band: BandArgs,
    },
    /// Profitability screen over the shortlist
    Analyze {
        /// Ticker list CSV (default: the shortlist in the output directory)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// ROIC/IGR filter over the shortlist
    Roic {
        /// Ticker list CSV (default: the shortlist in the output directory)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        floors: FloorArgs,
    },
    /// Per-year ROIC/IGR breakdown for one ticker
    RoicReport {
        ticker: String,

        /// Minimum ROIC, in percent
        #[arg(long, default_value_t = DEFAULT_MIN_ROIC_PCT)]
        min_roic: f64,

        /// Minimum internal growth rate, in percent
        #[arg(long, default_value_t = ANALYSIS_MIN_IGR_PCT)]
        min_igr: f64,
    },
    /// DCF, margin filter, profitability screen and ROIC/IGR filter in one go
    Run {
        /// Process only the first N tickers (0 = all)
        #[arg(long, env = "SCREENER_LIMIT")]
        limit: Option<usize>,

        #[command(flatten)]
        rates: RateArgs,

        #[command(flatten)]
        band: BandArgs,

        #[command(flatten)]
        floors: FloorArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments, then set up logging (RUST_LOG wins over --verbose)
    let args = Args::parse();
    utils::logging::setup_logging(args.verbose);
    tracing::debug!("Starting with args: {:?}", args);

    // 2. Validate shared settings
    let cfg = ScreenerConfig::new(args.data_dir, args.output_dir, args.workers)?;

    // 3. Dispatch
    let summary = match args.command {
        Command::Dcf { ticker, limit, rates } => {
            let params = config::dcf_params(rates.discount_rate, rates.growth_rate)?;
            commands::dcf(&cfg, ticker, limit, params).await?
        }
        Command::Filter { band } => {
            let band = config::margin_band(band.min_margin, band.max_margin)?;
            commands::filter_reports(&cfg, band)?
        }
        Command::Analyze { input } => commands::analyze(&cfg, input).await?,
        Command::Roic { input, floors } => {
            let floors = config::roic_floors(floors.min_roic, floors.min_igr)?;
            commands::roic(&cfg, input, floors).await?
        }
        Command::RoicReport { ticker, min_roic, min_igr } => {
            let floors = config::roic_floors(min_roic, min_igr)?;
            commands::roic_report(&cfg.data_dir, &ticker, floors)?
        }
        Command::Run { limit, rates, band, floors } => {
            let params = config::dcf_params(rates.discount_rate, rates.growth_rate)?;
            let band = config::margin_band(band.min_margin, band.max_margin)?;
            let floors = config::roic_floors(floors.min_roic, floors.min_igr)?;
            commands::run_all(&cfg, limit, params, band, floors).await?
        }
    };

    // 4. Final Report
    tracing::info!("--------------------");
    tracing::info!("Processing Summary:");
    tracing::info!("  Succeeded: {}", summary.succeeded);
    tracing::info!("  Failed:    {}", summary.failed);
    tracing::info!("--------------------");

    Ok(())
}

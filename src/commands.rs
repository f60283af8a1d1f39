// src/commands.rs
// One function per CLI stage. Each stage fans tickers out through the runner
// and writes its batch output once every worker has finished.

use crate::analysis::filter::{self, MarginBand, MarginSummary};
use crate::analysis::profitability::ScreeningResult;
use crate::analysis::roic::{RoicFloors, RoicMode};
use crate::analysis::valuation::DcfParams;
use crate::config::ScreenerConfig;
use crate::pipeline::{self, DcfOutcome, RoicOutcome};
use crate::runner::{run_per_ticker, TickerOutcome, TickerRun};
use crate::statements::loader::{discover_tickers, read_ticker_list};
use crate::statements::models::TickerPaths;
use crate::storage::{self, reports, StorageManager, SHORTLIST_FILE};
use crate::utils::AppError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Success/failure tally for the final log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn from_runs<T: TickerOutcome>(runs: &[TickerRun<T>]) -> Self {
        let succeeded = runs.iter().filter(|r| r.succeeded()).count();
        Self {
            succeeded,
            failed: runs.len() - succeeded,
        }
    }

    fn add(self, other: Self) -> Self {
        Self {
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
        }
    }
}

/// Replaces a panicked job with the outcome type's own failure value.
fn settle<T>(runs: Vec<TickerRun<T>>, on_panic: impl Fn(String, String) -> T) -> Vec<T> {
    runs.into_iter()
        .map(|run| match run.outcome {
            Ok(outcome) => outcome,
            Err(cause) => on_panic(run.ticker, cause),
        })
        .collect()
}

fn select_tickers(
    cfg: &ScreenerConfig,
    ticker: Option<String>,
    limit: Option<usize>,
) -> Result<Vec<String>, AppError> {
    match ticker {
        Some(t) => Ok(vec![t]),
        None => {
            let tickers = discover_tickers(&cfg.data_dir, limit)?;
            tracing::info!("Found {} tickers under {}", tickers.len(), cfg.data_dir.display());
            Ok(tickers)
        }
    }
}

fn shortlist_path(cfg: &ScreenerConfig, input: Option<PathBuf>) -> PathBuf {
    input.unwrap_or_else(|| cfg.output_dir.join(SHORTLIST_FILE))
}

async fn dcf_stage(
    cfg: &ScreenerConfig,
    storage: Arc<StorageManager>,
    tickers: Vec<String>,
    params: DcfParams,
) -> (Vec<DcfOutcome>, BatchSummary) {
    let data_dir = cfg.data_dir.clone();
    let runs = run_per_ticker(tickers, cfg.workers, move |ticker: &str| {
        let paths = TickerPaths::new(&data_dir, ticker);
        let outcome = pipeline::run_dcf(&paths, params);
        if let Err(e) = storage.save_dcf_report(&paths, &outcome) {
            tracing::error!("{}: could not write DCF report: {}", ticker, e);
        }
        outcome
    })
    .await;

    let summary = BatchSummary::from_runs(&runs);
    let outcomes = settle(runs, |ticker, cause| DcfOutcome {
        ticker,
        params,
        currency: None,
        result: Err(cause),
    });
    (outcomes, summary)
}

async fn screen_stage(
    cfg: &ScreenerConfig,
    tickers: Vec<String>,
) -> (Vec<ScreeningResult>, BatchSummary) {
    let data_dir = cfg.data_dir.clone();
    let runs = run_per_ticker(tickers, cfg.workers, move |ticker: &str| {
        pipeline::run_screen(&TickerPaths::new(&data_dir, ticker))
    })
    .await;

    let summary = BatchSummary::from_runs(&runs);
    let results = settle(runs, |ticker, cause| ScreeningResult::failed(&ticker, cause));
    (results, summary)
}

async fn roic_stage(
    cfg: &ScreenerConfig,
    tickers: Vec<String>,
    floors: RoicFloors,
) -> (Vec<RoicOutcome>, BatchSummary) {
    let data_dir = cfg.data_dir.clone();
    let runs = run_per_ticker(tickers, cfg.workers, move |ticker: &str| {
        pipeline::run_roic(&TickerPaths::new(&data_dir, ticker), floors, RoicMode::Screening)
    })
    .await;

    let summary = BatchSummary::from_runs(&runs);
    let outcomes = settle(runs, |ticker, cause| RoicOutcome {
        ticker,
        evaluation: Err(cause),
    });
    (outcomes, summary)
}

/// Values every selected ticker and writes one DCF report per ticker folder.
pub async fn dcf(
    cfg: &ScreenerConfig,
    ticker: Option<String>,
    limit: Option<usize>,
    params: DcfParams,
) -> Result<BatchSummary, AppError> {
    let storage = Arc::new(StorageManager::new(&cfg.output_dir)?);
    let tickers = select_tickers(cfg, ticker, limit)?;
    let (_, summary) = dcf_stage(cfg, storage, tickers, params).await;
    Ok(summary)
}

/// Scans written DCF reports and keeps those inside the margin band.
pub fn filter_reports(cfg: &ScreenerConfig, band: MarginBand) -> Result<BatchSummary, AppError> {
    let storage = StorageManager::new(&cfg.output_dir)?;
    let summaries = storage::scan_dcf_reports(&cfg.data_dir)?;
    let scanned = summaries.len();
    let shortlist = filter::filter(summaries, band);
    storage.save_shortlist(&shortlist)?;

    tracing::info!(
        "{} of {} tickers have a margin of safety between {}% and {}%",
        shortlist.len(),
        scanned,
        band.min,
        band.max
    );
    Ok(BatchSummary {
        succeeded: shortlist.len(),
        failed: scanned - shortlist.len(),
    })
}

/// Profitability screen over the tickers of a shortlist CSV.
pub async fn analyze(
    cfg: &ScreenerConfig,
    input: Option<PathBuf>,
) -> Result<BatchSummary, AppError> {
    let storage = StorageManager::new(&cfg.output_dir)?;
    let tickers = read_ticker_list(&shortlist_path(cfg, input))?;
    tracing::info!("Screening profitability for {} tickers", tickers.len());

    let (results, summary) = screen_stage(cfg, tickers).await;
    storage.save_financial_analysis(&results)?;
    Ok(summary)
}

/// ROIC/IGR filter over the tickers of a shortlist CSV.
pub async fn roic(
    cfg: &ScreenerConfig,
    input: Option<PathBuf>,
    floors: RoicFloors,
) -> Result<BatchSummary, AppError> {
    let storage = StorageManager::new(&cfg.output_dir)?;
    let tickers = read_ticker_list(&shortlist_path(cfg, input))?;
    tracing::info!("Evaluating ROIC/IGR for {} tickers", tickers.len());

    let (outcomes, summary) = roic_stage(cfg, tickers, floors).await;
    storage.save_roic_shortlist(&outcomes)?;
    Ok(summary)
}

/// Per-year ROIC/IGR breakdown for one ticker, printed to stdout.
pub fn roic_report(
    data_dir: &Path,
    ticker: &str,
    floors: RoicFloors,
) -> Result<BatchSummary, AppError> {
    let paths = TickerPaths::new(data_dir, ticker);
    let outcome = pipeline::run_roic(&paths, floors, RoicMode::Analysis);
    match &outcome.evaluation {
        Ok(evaluation) => {
            print!("{}", reports::render_roic_analysis(ticker, floors, evaluation));
            Ok(BatchSummary {
                succeeded: usize::from(evaluation.passed),
                failed: usize::from(!evaluation.passed),
            })
        }
        Err(e) => Err(AppError::Processing(format!("{}: {}", ticker, e))),
    }
}

/// DCF for every ticker, then the margin filter in memory, then the
/// profitability and ROIC/IGR stages over the shortlist.
pub async fn run_all(
    cfg: &ScreenerConfig,
    limit: Option<usize>,
    params: DcfParams,
    band: MarginBand,
    floors: RoicFloors,
) -> Result<BatchSummary, AppError> {
    let storage = Arc::new(StorageManager::new(&cfg.output_dir)?);
    let tickers = select_tickers(cfg, None, limit)?;

    let (outcomes, mut summary) = dcf_stage(cfg, Arc::clone(&storage), tickers, params).await;
    let summaries: Vec<MarginSummary> = outcomes
        .iter()
        .filter_map(|o| {
            let valuation = o.result.as_ref().ok()?;
            Some(MarginSummary::from_valuation(&o.ticker, valuation))
        })
        .collect();
    let shortlist = filter::filter(summaries, band);
    storage.save_shortlist(&shortlist)?;
    tracing::info!("{} of {} tickers passed the margin filter", shortlist.len(), outcomes.len());

    let shortlisted: Vec<String> = shortlist.into_iter().map(|s| s.ticker).collect();
    let (results, screen_summary) = screen_stage(cfg, shortlisted.clone()).await;
    storage.save_financial_analysis(&results)?;

    let (roic_outcomes, roic_summary) = roic_stage(cfg, shortlisted, floors).await;
    storage.save_roic_shortlist(&roic_outcomes)?;
    let survivors = roic_outcomes.iter().filter(|o| o.passed()).count();
    tracing::info!("{} tickers passed the ROIC/IGR filter", survivors);

    summary = summary.add(screen_summary).add(roic_summary);
    Ok(summary)
}

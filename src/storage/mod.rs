// src/storage/mod.rs
pub mod reports;

use crate::analysis::filter::MarginSummary;
use crate::analysis::profitability::ScreeningResult;
use crate::pipeline::{DcfOutcome, RoicOutcome};
use crate::statements::models::TickerPaths;
use crate::utils::error::StorageError;
use crate::utils::format::parse_grouped;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const SHORTLIST_FILE: &str = "filtered_dcf_results.csv";
pub const FINANCIAL_ANALYSIS_FILE: &str = "filtered_financial_analysis.txt";
pub const ROIC_SHORTLIST_FILE: &str = "filtered_roic_igr.json";
const DCF_REPORT_SUFFIX: &str = "_dcf_analysis.txt";
const SHORTLIST_HEADER: [&str; 4] =
    ["ticker", "intrinsic value per share", "market price", "margin of safety"];

// --- Patterns for reading a written DCF report back (Lazy Static) ---
static MARGIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Current Margin of Safety: (-?[\d.,]+)%").expect("Failed to compile MARGIN_RE")
});
static PER_SHARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Estimated Intrinsic Value Per Share \(Current\): (-?[\d.,]+)")
        .expect("Failed to compile PER_SHARE_RE")
});
static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Current Market Price: (-?[\d.,]+)").expect("Failed to compile PRICE_RE")
});

fn capture_number(re: &Regex, content: &str) -> Option<f64> {
    re.captures(content)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_grouped(m.as_str()))
}

/// Recovers the current-valuation figures from a rendered DCF report.
pub fn read_margin_summary(ticker: &str, content: &str) -> MarginSummary {
    MarginSummary {
        ticker: ticker.to_string(),
        intrinsic_value_per_share: capture_number(&PER_SHARE_RE, content),
        market_price: capture_number(&PRICE_RE, content),
        margin_of_safety: capture_number(&MARGIN_RE, content),
    }
}

fn collect_reports(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), StorageError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_reports(&path, found)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.ends_with(DCF_REPORT_SUFFIX))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Walks `data_dir` for DCF reports; the parent folder names the ticker.
/// Unreadable reports are logged and skipped. Sorted by ticker.
pub fn scan_dcf_reports(data_dir: &Path) -> Result<Vec<MarginSummary>, StorageError> {
    let mut paths = Vec::new();
    collect_reports(data_dir, &mut paths)?;

    let mut summaries = Vec::new();
    for path in paths {
        let ticker = match path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
            Some(t) => t.to_string(),
            None => continue,
        };
        match fs::read_to_string(&path) {
            Ok(content) => summaries.push(read_margin_summary(&ticker, &content)),
            Err(e) => tracing::error!("Error reading {}: {}", path.display(), e),
        }
    }
    summaries.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    tracing::debug!("Found {} DCF reports under {}", summaries.len(), data_dir.display());
    Ok(summaries)
}

#[derive(Debug, Serialize)]
struct RoicPercentages {
    roic: f64,
    igr: f64,
}

#[derive(Debug, Serialize)]
struct RoicShortlistEntry {
    ticker: String,
    historical_data: BTreeMap<String, RoicPercentages>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager writing batch outputs under `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }

    /// Writes the DCF report next to the ticker's input tables.
    pub fn save_dcf_report(
        &self,
        paths: &TickerPaths,
        outcome: &DcfOutcome,
    ) -> Result<PathBuf, StorageError> {
        if !paths.dir.exists() {
            fs::create_dir_all(&paths.dir)?;
        }
        let file_path = paths.dcf_report();
        fs::write(&file_path, reports::render_dcf_report(outcome))?;
        tracing::debug!("Saved DCF report to {}", file_path.display());
        Ok(file_path)
    }

    /// Writes the margin-of-safety shortlist CSV (header even when empty).
    pub fn save_shortlist(&self, shortlist: &[MarginSummary]) -> Result<PathBuf, StorageError> {
        let file_path = self.path(SHORTLIST_FILE);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&file_path)?;
        writer.write_record(SHORTLIST_HEADER)?;
        for row in shortlist {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!("Saved {} shortlisted tickers to {}", shortlist.len(), file_path.display());
        Ok(file_path)
    }

    /// Writes the table of tickers that pass every profitability check.
    pub fn save_financial_analysis(
        &self,
        results: &[ScreeningResult],
    ) -> Result<PathBuf, StorageError> {
        let passing: Vec<&ScreeningResult> = results.iter().filter(|r| r.passes_all()).collect();
        let file_path = self.path(FINANCIAL_ANALYSIS_FILE);
        fs::write(&file_path, reports::render_financial_analysis(&passing))?;

        tracing::info!(
            "Saved financial analysis ({} of {} passing) to {}",
            passing.len(),
            results.len(),
            file_path.display()
        );
        Ok(file_path)
    }

    /// Writes passing tickers with per-year ROIC/IGR percentages (2 decimals).
    pub fn save_roic_shortlist(&self, outcomes: &[RoicOutcome]) -> Result<PathBuf, StorageError> {
        let entries: Vec<RoicShortlistEntry> = outcomes
            .iter()
            .filter_map(|o| match &o.evaluation {
                Ok(eval) if eval.passed => Some(RoicShortlistEntry {
                    ticker: o.ticker.clone(),
                    historical_data: eval
                        .records
                        .iter()
                        .map(|r| {
                            (
                                r.year.to_string(),
                                RoicPercentages {
                                    roic: round2(r.roic * 100.0),
                                    igr: round2(r.igr * 100.0),
                                },
                            )
                        })
                        .collect(),
                }),
                _ => None,
            })
            .collect();

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let file_path = self.path(ROIC_SHORTLIST_FILE);
        fs::write(&file_path, json)?;

        tracing::info!("Saved {} ROIC/IGR survivors to {}", entries.len(), file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::roic::{RoicEvaluation, RoicRecord};
    use crate::analysis::valuation::DcfParams;
    use tempfile::TempDir;

    #[test]
    fn test_read_margin_summary_from_report_text() {
        let content = "Estimated Intrinsic Value Per Share (Current): 1,102.50 IDR\n\
                       Current Market Price: 1,000.00 IDR\n\
                       Current Margin of Safety: -10.25%\n";
        let summary = read_margin_summary("AAA", content);
        assert_eq!(summary.intrinsic_value_per_share, Some(1102.5));
        assert_eq!(summary.market_price, Some(1000.0));
        assert_eq!(summary.margin_of_safety, Some(-10.25));

        let empty = read_margin_summary("BBB", "No Free Cash Flow data available.");
        assert_eq!(empty.margin_of_safety, None);
    }

    #[test]
    fn test_scan_reads_back_written_reports() {
        let tmp = TempDir::new().unwrap();
        crate::pipeline::fixtures::write_ticker(tmp.path(), "AAA");
        let storage = StorageManager::new(tmp.path().join("out")).unwrap();
        let paths = TickerPaths::new(tmp.path(), "AAA");
        let outcome = crate::pipeline::run_dcf(&paths, DcfParams::default());
        storage.save_dcf_report(&paths, &outcome).unwrap();

        let summaries = scan_dcf_reports(tmp.path()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].ticker, "AAA");
        assert_eq!(summaries[0].margin_of_safety, Some(2.5));
        assert_eq!(summaries[0].intrinsic_value_per_share, Some(102.5));
    }

    #[test]
    fn test_save_shortlist_writes_header_and_rows() {
        let tmp = TempDir::new().unwrap();
        let storage = StorageManager::new(tmp.path()).unwrap();
        let path = storage.save_shortlist(&[MarginSummary {
            ticker: "AAA".into(),
            intrinsic_value_per_share: Some(102.5),
            market_price: Some(100.0),
            margin_of_safety: Some(2.5),
        }]).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "ticker,intrinsic value per share,market price,margin of safety\nAAA,102.5,100.0,2.5\n"
        );

        let empty = storage.save_shortlist(&[]).unwrap();
        assert_eq!(fs::read_to_string(empty).unwrap().lines().count(), 1, "Header only");
    }

    #[test]
    fn test_save_roic_shortlist_rounds_and_filters() {
        let tmp = TempDir::new().unwrap();
        let storage = StorageManager::new(tmp.path()).unwrap();
        let record = RoicRecord {
            year: 2023,
            nopat: 80.0,
            invested_capital_beginning: 400.0,
            invested_capital_ending: 440.0,
            roic: 0.123456,
            reinvestment_rate: 0.5,
            igr: 0.061728,
            passes: true,
        };
        let passed = RoicOutcome {
            ticker: "AAA".into(),
            evaluation: Ok(RoicEvaluation {
                records: vec![record],
                skipped: vec![],
                aborted: None,
                passed: true,
            }),
        };
        let failed = RoicOutcome { ticker: "BBB".into(), evaluation: Err("Missing".into()) };

        let path = storage.save_roic_shortlist(&[passed, failed]).unwrap();
        let text = fs::read_to_string(path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["ticker"], "AAA");
        assert_eq!(list[0]["historical_data"]["2023"]["roic"], 12.35);
        assert_eq!(list[0]["historical_data"]["2023"]["igr"], 6.17);
    }
}

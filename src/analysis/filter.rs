// src/analysis/filter.rs
use crate::analysis::valuation::ValuationResult;
use crate::utils::format::as_rendered;
use serde::{Deserialize, Serialize};

/// Current-valuation figures for one ticker, as carried into the shortlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    #[serde(alias = "kode")]
    pub ticker: String,
    #[serde(rename = "intrinsic value per share")]
    pub intrinsic_value_per_share: Option<f64>,
    #[serde(rename = "market price")]
    pub market_price: Option<f64>,
    #[serde(rename = "margin of safety")]
    pub margin_of_safety: Option<f64>,
}

impl MarginSummary {
    /// Figures are taken at the 2 decimals the DCF report prints, so the
    /// in-memory shortlist equals the one recovered from written reports.
    pub fn from_valuation(ticker: &str, valuation: &ValuationResult) -> Self {
        let shown = |value: Option<f64>| value.map(|v| as_rendered(v, 2));
        Self {
            ticker: ticker.to_string(),
            intrinsic_value_per_share: shown(valuation.intrinsic_value_per_share),
            market_price: shown(valuation.current_market_price),
            margin_of_safety: shown(valuation.margin_of_safety),
        }
    }
}

/// Inclusive margin-of-safety band, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginBand {
    pub min: f64,
    pub max: f64,
}

impl Default for MarginBand {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

impl MarginBand {
    pub fn contains(&self, margin: f64) -> bool {
        margin >= self.min && margin <= self.max
    }
}

/// Keeps summaries whose margin is present and inside `band`, in input order.
pub fn filter(summaries: Vec<MarginSummary>, band: MarginBand) -> Vec<MarginSummary> {
    summaries
        .into_iter()
        .filter(|s| s.margin_of_safety.map_or(false, |m| band.contains(m)))
        .collect()
}

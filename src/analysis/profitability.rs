// src/analysis/profitability.rs
// Leverage, net income trend and free cash flow trend checks.

use crate::analysis::aligner::{trend, TrendSeries, YearMap};
use crate::statements::models::{FinancialStatement, Metric};
use serde::Serialize;

pub const EQUITY_NON_POSITIVE: &str = "Equity Zero/Negative";
pub const DATA_MISSING: &str = "Data Missing";
pub const NO_DATA: &str = "No Data";
const NOT_EVALUATED: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    pub ticker: String,
    pub der_ok: bool,
    pub profit_ok: bool,
    pub fcf_ok: bool,
    pub der_value: String,
    pub net_income_status: String,
    pub fcf_status: String,
    pub error: Option<String>,
}

impl ScreeningResult {
    /// Result for a ticker whose inputs could not be read; every check fails.
    pub fn failed(ticker: &str, error: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            der_ok: false,
            profit_ok: false,
            fcf_ok: false,
            der_value: NOT_EVALUATED.to_string(),
            net_income_status: NOT_EVALUATED.to_string(),
            fcf_status: NOT_EVALUATED.to_string(),
            error: Some(error.into()),
        }
    }

    pub fn passes_all(&self) -> bool {
        self.error.is_none() && self.der_ok && self.profit_ok && self.fcf_ok
    }
}

/// Lower bound a trend series must respect, plus the wording of its statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrendRule {
    /// Net income: every value > 0.
    StrictlyPositive,
    /// Free cash flow: every value >= 0.
    NonNegative,
}

impl TrendRule {
    fn admits(&self, value: f64) -> bool {
        match self {
            TrendRule::StrictlyPositive => value > 0.0,
            TrendRule::NonNegative => value >= 0.0,
        }
    }

    fn growing(&self) -> &'static str {
        match self {
            TrendRule::StrictlyPositive => "Positive & Growing",
            TrendRule::NonNegative => "Non-Negative & Growing",
        }
    }

    fn not_growing(&self) -> &'static str {
        match self {
            TrendRule::StrictlyPositive => "Positive but Not Growing",
            TrendRule::NonNegative => "Non-Negative but Not Growing",
        }
    }

    fn single_point(&self) -> &'static str {
        match self {
            TrendRule::StrictlyPositive => "Positive (Single Data Point)",
            TrendRule::NonNegative => "Non-Negative (Single Data Point)",
        }
    }

    fn violated(&self) -> &'static str {
        match self {
            TrendRule::StrictlyPositive => "Contains Non-Positive Values",
            TrendRule::NonNegative => "Contains Negative Values",
        }
    }
}

/// Debt-to-equity on the latest balance-sheet year. Returns (ok, der_value).
pub fn check_leverage(balance_sheet: &YearMap) -> (bool, String) {
    if !balance_sheet.has_metric(&Metric::TotalLiabilities)
        || !balance_sheet.has_metric(&Metric::StockholdersEquity)
    {
        return (false, DATA_MISSING.to_string());
    }

    let (liabilities, equity) = match balance_sheet.latest_year() {
        Some(year) => (
            balance_sheet.get(year, &Metric::TotalLiabilities).unwrap_or(0.0),
            balance_sheet.get(year, &Metric::StockholdersEquity).unwrap_or(0.0),
        ),
        None => (0.0, 0.0),
    };

    if equity <= 0.0 {
        return (false, EQUITY_NON_POSITIVE.to_string());
    }
    let der = liabilities / equity;
    (der < 1.0, format!("{:.2}", der))
}

fn check_trend(series: Option<TrendSeries>, rule: TrendRule) -> (bool, String) {
    let series = match series {
        Some(series) => series,
        None => return (false, DATA_MISSING.to_string()),
    };
    if series.is_empty() {
        return (false, NO_DATA.to_string());
    }

    // one point per dated column; same-year columns stay separate
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let (ok, status) = match values.as_slice() {
        all if !all.iter().all(|v| rule.admits(*v)) => (false, rule.violated()),
        _ if series.len() == 1 => (true, rule.single_point()),
        [.., previous, latest] if latest > previous => (true, rule.growing()),
        _ => (false, rule.not_growing()),
    };
    (ok, status.to_string())
}

/// Net income must be strictly positive throughout and rising in the latest period.
pub fn check_profit_trend(income: &FinancialStatement) -> (bool, String) {
    check_trend(trend(income, &Metric::NetIncome), TrendRule::StrictlyPositive)
}

/// Free cash flow must never be negative and must rise in the latest period.
pub fn check_fcf_trend(cashflow: &FinancialStatement) -> (bool, String) {
    check_trend(trend(cashflow, &Metric::FreeCashFlow), TrendRule::NonNegative)
}

/// Runs all three checks: leverage over a `DropAbsent` year map, the trends
/// over the dated statement columns.
pub fn screen(
    ticker: &str,
    balance_sheet: &YearMap,
    income: &FinancialStatement,
    cashflow: &FinancialStatement,
) -> ScreeningResult {
    let (der_ok, der_value) = check_leverage(balance_sheet);
    let (profit_ok, net_income_status) = check_profit_trend(income);
    let (fcf_ok, fcf_status) = check_fcf_trend(cashflow);

    tracing::debug!(
        "{}: DER {} ({}), net income {} ({}), FCF {} ({})",
        ticker,
        der_value,
        der_ok,
        net_income_status,
        profit_ok,
        fcf_status,
        fcf_ok
    );

    ScreeningResult {
        ticker: ticker.to_string(),
        der_ok,
        profit_ok,
        fcf_ok,
        der_value,
        net_income_status,
        fcf_status,
        error: None,
    }
}

// src/statements/models.rs
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which of the three statement tables a [`FinancialStatement`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    BalanceSheet,
    Income,
    CashFlow,
}

impl StatementKind {
    /// File name suffix used by the data source, e.g. `BBCA.JK_financials.csv`.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "balance_sheet",
            StatementKind::Income => "financials",
            StatementKind::CashFlow => "cashflow",
        }
    }
}

/// Line items the analysis reads. Anything else is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    TotalLiabilities,
    StockholdersEquity,
    OrdinarySharesNumber,
    InvestedCapital,
    NetIncome,
    Ebit,
    TaxRateForCalcs,
    FreeCashFlow,
    Other(String),
}

impl Metric {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Total Liabilities Net Minority Interest" => Metric::TotalLiabilities,
            "Stockholders Equity" => Metric::StockholdersEquity,
            "Ordinary Shares Number" => Metric::OrdinarySharesNumber,
            "Invested Capital" => Metric::InvestedCapital,
            "Net Income" => Metric::NetIncome,
            "EBIT" => Metric::Ebit,
            "Tax Rate For Calcs" => Metric::TaxRateForCalcs,
            "Free Cash Flow" => Metric::FreeCashFlow,
            other => Metric::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Metric::TotalLiabilities => "Total Liabilities Net Minority Interest",
            Metric::StockholdersEquity => "Stockholders Equity",
            Metric::OrdinarySharesNumber => "Ordinary Shares Number",
            Metric::InvestedCapital => "Invested Capital",
            Metric::NetIncome => "Net Income",
            Metric::Ebit => "EBIT",
            Metric::TaxRateForCalcs => "Tax Rate For Calcs",
            Metric::FreeCashFlow => "Free Cash Flow",
            Metric::Other(label) => label,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One line item: raw cell text per period, index-aligned with
/// [`FinancialStatement::periods`].
#[derive(Debug, Clone)]
pub struct StatementRow {
    pub metric: Metric,
    pub values: Vec<String>,
}

/// A statement table as written by the data source: period labels across,
/// line items down. Cells stay raw text; the aligner decides what an empty
/// or malformed cell means.
#[derive(Debug, Clone)]
pub struct FinancialStatement {
    pub kind: StatementKind,
    pub periods: Vec<String>,
    pub rows: Vec<StatementRow>,
}

impl FinancialStatement {
    pub fn new(kind: StatementKind, periods: Vec<String>) -> Self {
        Self { kind, periods, rows: Vec::new() }
    }

    /// Adds a row, padding or truncating its cells to the period count.
    pub fn push_row(&mut self, label: &str, mut values: Vec<String>) {
        values.resize(self.periods.len(), String::new());
        self.rows.push(StatementRow { metric: Metric::from_label(label), values });
    }

    /// Last row carrying `metric` (duplicated labels: the later row wins).
    pub fn row(&self, metric: &Metric) -> Option<&StatementRow> {
        self.rows.iter().rev().find(|r| &r.metric == metric)
    }
}

/// Daily closes, ascending by date.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<(NaiveDate, f64)>) -> Self {
        // stable: same-day rows keep file order, so the later one is "last"
        points.sort_by_key(|(date, _)| *date);
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Last close observed within calendar `year`.
    pub fn last_close_in_year(&self, year: i32) -> Option<f64> {
        self.points
            .iter()
            .rev()
            .find(|(date, _)| date.year() == year)
            .map(|(_, close)| *close)
    }
}

/// Key/value facts about the company (`sharesOutstanding`, `currentPrice`, ...).
#[derive(Debug, Clone, Default)]
pub struct CompanyInfo {
    values: BTreeMap<String, String>,
}

impl CompanyInfo {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// `None` when the key is absent, `Some(Err(raw))` when present but not a number.
    pub fn number(&self, key: &str) -> Option<Result<f64, String>> {
        self.get(key).map(|raw| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| raw.to_string())
        })
    }

    /// Reporting currency code, used only as a label.
    pub fn currency(&self) -> Option<&str> {
        self.get("currency").map(str::trim).filter(|c| !c.is_empty())
    }
}

/// File layout of one ticker folder under the data directory.
#[derive(Debug, Clone)]
pub struct TickerPaths {
    pub ticker: String,
    pub dir: PathBuf,
}

impl TickerPaths {
    pub fn new<P: AsRef<Path>>(data_dir: P, ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            dir: data_dir.as_ref().join(ticker),
        }
    }

    fn file(&self, suffix: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.{}", self.ticker, suffix, ext))
    }

    pub fn statement(&self, kind: StatementKind) -> PathBuf {
        self.file(kind.file_suffix(), "csv")
    }

    pub fn prices(&self) -> PathBuf {
        self.file("historical_prices", "csv")
    }

    pub fn company_info(&self) -> PathBuf {
        self.file("company_info", "csv")
    }

    pub fn dcf_report(&self) -> PathBuf {
        self.file("dcf_analysis", "txt")
    }
}

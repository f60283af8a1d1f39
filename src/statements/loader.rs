// src/statements/loader.rs
// Reads the per-ticker CSV tables written by the data source.

use crate::analysis::aligner::{parse_period, parse_value};
use crate::statements::models::{
    CompanyInfo, FinancialStatement, PriceSeries, StatementKind, TickerPaths,
};
use crate::utils::error::DataError;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const CLOSE_COLUMN: &str = "Close";
const TICKER_COLUMNS: [&str; 3] = ["ticker", "kode", "Kode"];

fn require(path: &Path) -> Result<(), DataError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DataError::MissingInput(path.to_path_buf()))
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>, DataError> {
    require(path)?;
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    Ok(reader)
}

/// Loads a statement table: first column is the line item, the remaining
/// header cells are period labels.
pub fn load_statement(path: &Path, kind: StatementKind) -> Result<FinancialStatement, DataError> {
    let mut reader = open_reader(path)?;
    let periods: Vec<String> = reader.headers()?.iter().skip(1).map(str::to_string).collect();
    let mut statement = FinancialStatement::new(kind, periods);

    for (line_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            DataError::Parse(format!("{} line {}: {}", path.display(), line_num + 2, e))
        })?;
        let label = record.get(0).unwrap_or("").trim();
        if label.is_empty() {
            continue;
        }
        let values = record.iter().skip(1).map(str::to_string).collect();
        statement.push_row(label, values);
    }

    tracing::debug!(
        "Loaded {:?} from {} ({} rows, {} periods)",
        statement.kind,
        path.display(),
        statement.rows.len(),
        statement.periods.len()
    );
    Ok(statement)
}

/// Loads daily closes. Rows with an unparseable date or close are skipped.
pub fn load_prices(path: &Path) -> Result<PriceSeries, DataError> {
    let mut reader = open_reader(path)?;
    let close_idx = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == CLOSE_COLUMN)
        .ok_or_else(|| {
            DataError::Parse(format!("No '{}' column in {}", CLOSE_COLUMN, path.display()))
        })?;

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result?;
        let date = record.get(0).and_then(parse_period);
        let close = record.get(close_idx).and_then(parse_value);
        match (date, close) {
            (Some(date), Some(close)) => points.push((date, close)),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!("Skipped {} unusable price rows in {}", skipped, path.display());
    }
    let prices = PriceSeries::new(points);
    if prices.is_empty() {
        tracing::warn!("No usable closing prices in {}", path.display());
    } else {
        tracing::debug!("Loaded {} closes from {}", prices.len(), path.display());
    }
    Ok(prices)
}

/// Loads the key/value company info table (`,Value` header).
pub fn load_company_info(path: &Path) -> Result<CompanyInfo, DataError> {
    let mut reader = open_reader(path)?;
    let mut values = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        if let (Some(key), Some(value)) = (record.get(0), record.get(1)) {
            values.insert(key.trim().to_string(), value.to_string());
        }
    }
    Ok(CompanyInfo::new(values))
}

/// Tables needed for the DCF valuation. Company info is optional.
#[derive(Debug, Clone)]
pub struct DcfTables {
    pub cashflow: FinancialStatement,
    pub balance_sheet: FinancialStatement,
    pub prices: PriceSeries,
    pub company_info: Option<CompanyInfo>,
}

pub fn load_dcf_tables(paths: &TickerPaths) -> Result<DcfTables, DataError> {
    let cashflow_path = paths.statement(StatementKind::CashFlow);
    let prices_path = paths.prices();
    let balance_path = paths.statement(StatementKind::BalanceSheet);
    // report the first missing file in a fixed order
    for path in [&cashflow_path, &prices_path, &balance_path] {
        require(path)?;
    }

    let info_path = paths.company_info();
    let company_info = if info_path.is_file() {
        Some(load_company_info(&info_path)?)
    } else {
        tracing::debug!("No company info for {}", paths.ticker);
        None
    };

    Ok(DcfTables {
        cashflow: load_statement(&cashflow_path, StatementKind::CashFlow)?,
        balance_sheet: load_statement(&balance_path, StatementKind::BalanceSheet)?,
        prices: load_prices(&prices_path)?,
        company_info,
    })
}

/// The three statements used by the profitability screen and ROIC/IGR engine.
#[derive(Debug, Clone)]
pub struct StatementSet {
    pub balance_sheet: FinancialStatement,
    pub income: FinancialStatement,
    pub cashflow: FinancialStatement,
}

pub fn load_statement_set(paths: &TickerPaths) -> Result<StatementSet, DataError> {
    let kinds = [StatementKind::BalanceSheet, StatementKind::Income, StatementKind::CashFlow];
    for kind in kinds {
        require(&paths.statement(kind))?;
    }
    let load = |kind| load_statement(&paths.statement(kind), kind);
    Ok(StatementSet {
        balance_sheet: load(StatementKind::BalanceSheet)?,
        income: load(StatementKind::Income)?,
        cashflow: load(StatementKind::CashFlow)?,
    })
}

/// Ticker folders under `data_dir`, sorted, optionally truncated to `limit`.
pub fn discover_tickers(data_dir: &Path, limit: Option<usize>) -> Result<Vec<String>, DataError> {
    if !data_dir.is_dir() {
        return Err(DataError::MissingInput(data_dir.to_path_buf()));
    }
    let mut tickers = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            tickers.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    tickers.sort();
    if let Some(limit) = limit.filter(|n| *n > 0) {
        tickers.truncate(limit);
    }
    Ok(tickers)
}

/// Tickers listed in a shortlist CSV (`ticker` column, or legacy `kode`).
pub fn read_ticker_list(path: &Path) -> Result<Vec<String>, DataError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| TICKER_COLUMNS.contains(&h.trim()))
        .ok_or_else(|| {
            DataError::Parse(format!("No ticker column found in {}", path.display()))
        })?;

    let mut tickers = Vec::new();
    for result in reader.records() {
        let record = result?;
        match record.get(column).map(str::trim) {
            Some(ticker) if !ticker.is_empty() => tickers.push(ticker.to_string()),
            _ => {}
        }
    }
    Ok(tickers)
}

// src/pipeline.rs
// Per-ticker glue: load tables, align them, run one engine, capture errors
// in the returned value so a bad ticker never stops the batch.

use crate::analysis::aligner::{align, trend, ReductionMode};
use crate::analysis::profitability::{self, ScreeningResult};
use crate::analysis::roic::{self, RoicEvaluation, RoicFloors, RoicMode};
use crate::analysis::valuation::{
    self, DcfParams, SharesOutstanding, ValuationInputs, ValuationResult,
};
use crate::runner::TickerOutcome;
use crate::statements::loader::{load_dcf_tables, load_statement_set};
use crate::statements::models::{Metric, StatementKind, TickerPaths};
use crate::utils::error::DataError;

const MISSING_FILES: &str = "Missing one or more required financial files.";

/// DCF valuation of one ticker, or the reason it could not be valued.
#[derive(Debug, Clone)]
pub struct DcfOutcome {
    pub ticker: String,
    pub params: DcfParams,
    pub currency: Option<String>,
    pub result: Result<ValuationResult, String>,
}

impl TickerOutcome for DcfOutcome {
    fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

pub fn run_dcf(paths: &TickerPaths, params: DcfParams) -> DcfOutcome {
    let mut currency = None;
    let result = value_ticker(paths, params, &mut currency);
    if let Err(e) = &result {
        tracing::warn!("{}: DCF not computed: {}", paths.ticker, e);
    }
    DcfOutcome {
        ticker: paths.ticker.clone(),
        params,
        currency,
        result,
    }
}

fn value_ticker(
    paths: &TickerPaths,
    params: DcfParams,
    currency: &mut Option<String>,
) -> Result<ValuationResult, String> {
    let tables = load_dcf_tables(paths).map_err(|e| match e {
        DataError::MissingInput(path) => {
            format!("Error: required data not found at {}", path.display())
        }
        other => format!("Error reading data files: {}", other),
    })?;

    let fcf = trend(&tables.cashflow, &Metric::FreeCashFlow).ok_or_else(|| {
        let missing = DataError::MissingRow {
            metric: Metric::FreeCashFlow.label().to_string(),
            path: paths.statement(StatementKind::CashFlow),
        };
        format!("Error: {}", missing)
    })?;

    let mut extra_warnings = Vec::new();
    let mut latest_reported = None;
    let mut current_price = None;
    if let Some(info) = &tables.company_info {
        *currency = info.currency().map(str::to_string);
        match info.number("sharesOutstanding") {
            Some(Ok(shares)) => latest_reported = Some(shares),
            Some(Err(raw)) => extra_warnings.push(format!(
                "Could not convert sharesOutstanding ('{}') to a number.",
                raw
            )),
            None => {}
        }
        match info.number("currentPrice") {
            Some(Ok(price)) => current_price = Some(price),
            Some(Err(_)) => {
                extra_warnings.push("Could not convert currentPrice to float.".to_string())
            }
            None => {}
        }
    }

    let balance = align(&tables.balance_sheet, ReductionMode::DropAbsent);
    let inputs = ValuationInputs {
        fcf,
        shares: SharesOutstanding {
            by_year: balance.series(&Metric::OrdinarySharesNumber).into_iter().collect(),
            latest_reported,
        },
        prices: tables.prices,
        current_price,
    };

    let mut result = valuation::value(&inputs, params)
        .ok_or_else(|| "No Free Cash Flow data available.".to_string())?;
    extra_warnings.append(&mut result.warnings);
    result.warnings = extra_warnings;
    Ok(result)
}

impl TickerOutcome for ScreeningResult {
    fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Profitability screen for one ticker. Input problems become an error result.
pub fn run_screen(paths: &TickerPaths) -> ScreeningResult {
    let statements = match load_statement_set(paths) {
        Ok(s) => s,
        Err(DataError::MissingInput(_)) => {
            return ScreeningResult::failed(&paths.ticker, MISSING_FILES)
        }
        Err(e) => {
            let message = format!("Error reading financial files: {}", e);
            return ScreeningResult::failed(&paths.ticker, message);
        }
    };

    profitability::screen(
        &paths.ticker,
        &align(&statements.balance_sheet, ReductionMode::DropAbsent),
        &statements.income,
        &statements.cashflow,
    )
}

/// ROIC/IGR evaluation of one ticker, or why it could not be evaluated.
#[derive(Debug, Clone)]
pub struct RoicOutcome {
    pub ticker: String,
    pub evaluation: Result<RoicEvaluation, String>,
}

impl RoicOutcome {
    pub fn passed(&self) -> bool {
        matches!(&self.evaluation, Ok(eval) if eval.passed)
    }
}

impl TickerOutcome for RoicOutcome {
    fn succeeded(&self) -> bool {
        self.evaluation.is_ok()
    }
}

pub fn run_roic(paths: &TickerPaths, floors: RoicFloors, mode: RoicMode) -> RoicOutcome {
    let evaluation = load_statement_set(paths)
        .map_err(|e| match e {
            DataError::MissingInput(_) => MISSING_FILES.to_string(),
            other => format!("Error reading financial files: {}", other),
        })
        .and_then(|statements| {
            let income = align(&statements.income, ReductionMode::DefaultToZero);
            let balance = align(&statements.balance_sheet, ReductionMode::DefaultToZero);
            let cashflow = align(&statements.cashflow, ReductionMode::DefaultToZero);
            if income.is_empty() || balance.is_empty() || cashflow.is_empty() {
                return Err("Financial statements contain no usable periods.".to_string());
            }
            Ok(roic::evaluate(&income, &balance, floors, mode))
        });

    if let Err(e) = &evaluation {
        tracing::debug!("{}: ROIC/IGR not evaluated: {}", paths.ticker, e);
    }
    RoicOutcome {
        ticker: paths.ticker.clone(),
        evaluation,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;

    /// Writes a complete, healthy ticker folder: growing FCF and net income,
    /// low leverage, ROIC 20% and IGR 10% in 2023.
    pub fn write_ticker(data_dir: &Path, ticker: &str) {
        let dir = data_dir.join(ticker);
        fs::create_dir_all(&dir).unwrap();
        let file = |suffix: &str| dir.join(format!("{}_{}", ticker, suffix));
        fs::write(
            file("cashflow.csv"),
            ",2023-12-31,2022-12-31\nFree Cash Flow,75,60\n",
        )
        .unwrap();
        fs::write(
            file("balance_sheet.csv"),
            ",2023-12-31,2022-12-31\n\
             Total Liabilities Net Minority Interest,80,90\n\
             Stockholders Equity,100,100\n\
             Ordinary Shares Number,10,10\n\
             Invested Capital,440,400\n",
        )
        .unwrap();
        fs::write(
            file("financials.csv"),
            ",2023-12-31,2022-12-31\nNet Income,20,10\nEBIT,100,90\nTax Rate For Calcs,0.2,0.2\n",
        )
        .unwrap();
        fs::write(
            file("historical_prices.csv"),
            "Date,Close,Volume\n2022-12-30 00:00:00,50,1\n2023-12-29 00:00:00,80,1\n",
        )
        .unwrap();
        fs::write(
            file("company_info.csv"),
            ",Value\nsharesOutstanding,10\ncurrentPrice,100\ncurrency,IDR\n",
        )
        .unwrap();
    }
}

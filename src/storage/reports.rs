// src/storage/reports.rs
// Plain-text renderings of the per-ticker and batch results.
// Output must depend only on the inputs so reruns are byte-identical.

use crate::analysis::profitability::ScreeningResult;
use crate::analysis::roic::{RoicEvaluation, RoicFloors, RoicRecord, SkippedYear};
use crate::analysis::valuation::ValuationResult;
use crate::pipeline::DcfOutcome;
use crate::utils::format::{percent, with_thousands};
use std::fmt::Write;

const RULE: &str = "------------------------------------------------------------";

fn money(value: f64, decimals: usize, currency: Option<&str>) -> String {
    match currency {
        Some(code) => format!("{} {}", with_thousands(value, decimals), code),
        None => with_thousands(value, decimals),
    }
}

fn opt_or_na(value: Option<f64>, render: impl Fn(f64) -> String) -> String {
    value.map(render).unwrap_or_else(|| "N/A".to_string())
}

/// Renders `<TICKER>_dcf_analysis.txt`.
pub fn render_dcf_report(outcome: &DcfOutcome) -> String {
    let mut lines: Vec<String> = vec![
        format!("--- DCF Calculation for {} ---", outcome.ticker),
        format!("Discount Rate: {}", percent(outcome.params.discount_rate * 100.0)),
        format!("Terminal Growth Rate: {}", percent(outcome.params.terminal_growth_rate * 100.0)),
    ];

    match &outcome.result {
        Err(message) => lines.push(message.clone()),
        Ok(result) => render_valuation(&mut lines, result, outcome.currency.as_deref()),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_valuation(lines: &mut Vec<String>, result: &ValuationResult, currency: Option<&str>) {
    lines.push(String::new());
    lines.push(format!(
        "Latest Free Cash Flow (FCF) used for Gordon Growth Model: {}",
        money(result.latest_fcf, 0, currency)
    ));
    if result.params.is_defined() {
        lines.push(format!(
            "Estimated Intrinsic Value (using Simple Gordon Growth Model): {}",
            money(result.intrinsic_value_total, 0, currency)
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Total Estimated Intrinsic Value (Current): {}",
        money(result.intrinsic_value_total, 0, currency)
    ));
    if let Some(per_share) = result.intrinsic_value_per_share {
        lines.push(format!(
            "Estimated Intrinsic Value Per Share (Current): {}",
            money(per_share, 2, currency)
        ));
        match result.current_market_price {
            Some(price) => {
                lines.push(format!("Current Market Price: {}", money(price, 2, currency)));
                lines.push(format!(
                    "Current Margin of Safety: {}",
                    opt_or_na(result.margin_of_safety, percent)
                ));
            }
            None => lines.push(
                "Current market price not available for Margin of Safety calculation.".to_string(),
            ),
        }
    }

    if !result.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings:".to_string());
        lines.extend(result.warnings.iter().map(|w| format!("- {}", w)));
    }

    lines.push(String::new());
    lines.push("--- Historical DCF Analysis ---".to_string());
    lines.push(table_row(
        "Year",
        "Total Intrinsic Value",
        "Intrinsic Value Per Share",
        "Market Price",
        "Margin of Safety",
    ));
    lines.push(table_row(
        &"-".repeat(6),
        &"-".repeat(25),
        &"-".repeat(30),
        &"-".repeat(15),
        &"-".repeat(18),
    ));
    for row in &result.history {
        lines.push(table_row(
            &row.year.to_string(),
            &with_thousands(row.intrinsic_value_total, 0),
            &opt_or_na(row.intrinsic_value_per_share, |v| with_thousands(v, 2)),
            &opt_or_na(row.market_price, |v| with_thousands(v, 2)),
            &opt_or_na(row.margin_of_safety, percent),
        ));
    }
}

fn table_row(year: &str, total: &str, per_share: &str, price: &str, margin: &str) -> String {
    format!("{:<6} {:<25} {:<30} {:<15} {:<18}", year, total, per_share, price, margin)
        .trim_end()
        .to_string()
}

/// Renders `filtered_financial_analysis.txt` from the tickers that passed every check.
pub fn render_financial_analysis(passing: &[&ScreeningResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Financial Analysis of Stocks Passing Screening ---");
    if passing.is_empty() {
        let _ = writeln!(out, "No stocks met all financial criteria.");
    } else {
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:<25} {:<25} {:<12} {:<30} {}",
            "Ticker",
            "DER < 1",
            "Profit Positive & Growing",
            "FCF Non-Neg & Growing",
            "DER Value",
            "Net Income Status",
            "FCF Status"
        );
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:<25} {:<25} {:<12} {:<30} {}",
            "-".repeat(8),
            "-".repeat(10),
            "-".repeat(25),
            "-".repeat(25),
            "-".repeat(12),
            "-".repeat(30),
            "-".repeat(30)
        );
        for r in passing {
            let _ = writeln!(
                out,
                "{:<8} {:<10} {:<25} {:<25} {:<12} {:<30} {}",
                r.ticker,
                r.der_ok,
                r.profit_ok,
                r.fcf_ok,
                r.der_value,
                r.net_income_status,
                r.fcf_status
            );
        }
    }

    let _ = writeln!(out, "\n--- Summary ---");
    if passing.is_empty() {
        let _ = writeln!(out, "No stocks met all financial criteria.");
    } else {
        let _ = writeln!(out, "Stocks with good financials across all criteria:");
        for r in passing {
            let _ = writeln!(out, "{}", r.ticker);
        }
    }
    out
}

enum YearLine<'a> {
    Evaluated(&'a RoicRecord),
    Skipped(&'a SkippedYear),
}

impl YearLine<'_> {
    fn year(&self) -> i32 {
        match self {
            YearLine::Evaluated(r) => r.year,
            YearLine::Skipped(s) => s.year,
        }
    }
}

/// Human-readable ROIC/IGR breakdown for one ticker.
pub fn render_roic_analysis(
    ticker: &str,
    floors: RoicFloors,
    evaluation: &RoicEvaluation,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Calculating ROIC and IGR for {} with min ROIC {} and min IGR {}",
        ticker,
        percent(floors.min_roic_pct),
        percent(floors.min_igr_pct)
    );
    let _ = writeln!(out, "{}", RULE);

    let mut years: Vec<YearLine> = evaluation
        .records
        .iter()
        .map(YearLine::Evaluated)
        .chain(evaluation.skipped.iter().map(YearLine::Skipped))
        .collect();
    years.sort_by_key(YearLine::year);

    for line in years {
        let _ = writeln!(out, "Year: {}", line.year());
        match line {
            YearLine::Skipped(s) => {
                let _ = writeln!(out, "  Skipping {}: {}", s.year, s.reason);
            }
            YearLine::Evaluated(r) => render_roic_year(&mut out, r, floors),
        }
        let _ = writeln!(out, "{}", RULE);
    }

    if let Some(reason) = &evaluation.aborted {
        let _ = writeln!(out, "Evaluation stopped: {}", reason);
    }
    let _ = writeln!(
        out,
        "Overall: {}",
        if evaluation.passed { "PASS" } else { "FAIL" }
    );
    out
}

fn render_roic_year(out: &mut String, r: &RoicRecord, floors: RoicFloors) {
    let _ = writeln!(out, "  NOPAT: {}", with_thousands(r.nopat, 2));
    let _ = writeln!(
        out,
        "  Invested Capital (Beginning of Period): {}",
        with_thousands(r.invested_capital_beginning, 2)
    );
    if r.invested_capital_beginning == 0.0 {
        let _ = writeln!(
            out,
            "  ROIC: Cannot calculate (Invested Capital is zero), reported as 0.00%"
        );
    } else {
        let _ = writeln!(out, "  ROIC: {}", percent(r.roic * 100.0));
    }
    let _ = writeln!(
        out,
        "  Delta Invested Capital: {}",
        with_thousands(r.delta_invested_capital(), 2)
    );
    if r.nopat == 0.0 {
        let _ = writeln!(out, "  Reinvestment Rate: Cannot calculate (NOPAT is zero).");
    } else {
        let _ = writeln!(out, "  Reinvestment Rate: {}", percent(r.reinvestment_rate * 100.0));
    }
    let _ = writeln!(out, "  Internal Growth Rate (g): {}", percent(r.igr * 100.0));

    let verdict = |value: f64, floor: f64| {
        if value >= floor {
            "meets or exceeds"
        } else {
            "is below"
        }
    };
    let _ = writeln!(
        out,
        "  ROIC ({}) {} minimum ({}).",
        percent(r.roic * 100.0),
        verdict(r.roic * 100.0, floors.min_roic_pct),
        percent(floors.min_roic_pct)
    );
    let _ = writeln!(
        out,
        "  Internal Growth Rate ({}) {} expectation ({}).",
        percent(r.igr * 100.0),
        verdict(r.igr * 100.0, floors.min_igr_pct),
        percent(floors.min_igr_pct)
    );
}

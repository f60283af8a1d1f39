// src/analysis/roic.rs
// NOPAT, ROIC, reinvestment rate and internal growth rate per fiscal year.

use crate::analysis::aligner::YearMap;
use crate::statements::models::Metric;
use serde::Serialize;

pub const DEFAULT_MIN_ROIC_PCT: f64 = 10.0;
pub const DEFAULT_MIN_IGR_PCT: f64 = 2.5;
/// IGR floor used by the single-ticker analysis.
pub const ANALYSIS_MIN_IGR_PCT: f64 = 2.25;

/// Minimum ROIC and IGR, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoicFloors {
    pub min_roic_pct: f64,
    pub min_igr_pct: f64,
}

impl Default for RoicFloors {
    fn default() -> Self {
        Self {
            min_roic_pct: DEFAULT_MIN_ROIC_PCT,
            min_igr_pct: DEFAULT_MIN_IGR_PCT,
        }
    }
}

impl RoicFloors {
    pub fn admits(&self, roic: f64, igr: f64) -> bool {
        roic * 100.0 >= self.min_roic_pct && igr * 100.0 >= self.min_igr_pct
    }
}

/// Caller intent. The batch filter and the single-ticker analysis treat a
/// zero beginning invested capital differently and both behaviors are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoicMode {
    /// Batch filter: a zero-capital year is skipped (not failed) and
    /// evaluation stops at the first failing year.
    Screening,
    /// Single-ticker report: a zero-capital year reports ROIC 0 and every
    /// year is evaluated so the report is complete.
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoicRecord {
    pub year: i32,
    pub nopat: f64,
    pub invested_capital_beginning: f64,
    pub invested_capital_ending: f64,
    pub roic: f64,
    pub reinvestment_rate: f64,
    pub igr: f64,
    pub passes: bool,
}

impl RoicRecord {
    pub fn delta_invested_capital(&self) -> f64 {
        self.invested_capital_ending - self.invested_capital_beginning
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedYear {
    pub year: i32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoicEvaluation {
    pub records: Vec<RoicRecord>,
    pub skipped: Vec<SkippedYear>,
    /// Why evaluation stopped early, if it did.
    pub aborted: Option<String>,
    pub passed: bool,
}

/// Evaluates every year from the second income-statement year onward.
///
/// Year `i` uses year `i-1` invested capital as its beginning capital.
/// Missing EBIT or tax rate, or missing ending capital, aborts the whole
/// ticker. Overall pass needs at least one evaluated year and every
/// evaluated year clearing both floors.
pub fn evaluate(
    income: &YearMap,
    balance_sheet: &YearMap,
    floors: RoicFloors,
    mode: RoicMode,
) -> RoicEvaluation {
    let years = income.years();
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut aborted = None;

    for pair in years.windows(2) {
        let (previous, current) = (pair[0], pair[1]);

        let (ebit, tax_rate) = match (
            income.get(current, &Metric::Ebit),
            income.get(current, &Metric::TaxRateForCalcs),
        ) {
            (Some(ebit), Some(tax_rate)) => (ebit, tax_rate),
            _ => {
                aborted = Some(format!("{}: Missing EBIT or Tax Rate.", current));
                break;
            }
        };
        let nopat = ebit * (1.0 - tax_rate);

        let beginning = match balance_sheet.get(previous, &Metric::InvestedCapital) {
            Some(capital) => capital,
            None => {
                skipped.push(SkippedYear {
                    year: current,
                    reason: format!("Missing Invested Capital for previous year ({}).", previous),
                });
                continue;
            }
        };
        if beginning == 0.0 && mode == RoicMode::Screening {
            skipped.push(SkippedYear {
                year: current,
                reason: format!("Invested Capital for previous year ({}) is zero.", previous),
            });
            continue;
        }
        let roic = if beginning != 0.0 { nopat / beginning } else { 0.0 };

        let ending = match balance_sheet.get(current, &Metric::InvestedCapital) {
            Some(capital) => capital,
            None => {
                aborted = Some(format!(
                    "{}: Missing Invested Capital for current year.",
                    current
                ));
                break;
            }
        };

        let reinvestment_rate = if nopat != 0.0 { (ending - beginning) / nopat } else { 0.0 };
        let igr = roic * reinvestment_rate;
        let passes = floors.admits(roic, igr);

        tracing::trace!(
            "{}: NOPAT {:.2}, ROIC {:.4}, reinvestment {:.4}, IGR {:.4}, passes {}",
            current,
            nopat,
            roic,
            reinvestment_rate,
            igr,
            passes
        );

        records.push(RoicRecord {
            year: current,
            nopat,
            invested_capital_beginning: beginning,
            invested_capital_ending: ending,
            roic,
            reinvestment_rate,
            igr,
            passes,
        });

        if !passes && mode == RoicMode::Screening {
            aborted = Some(format!(
                "{}: ROIC {:.2}% / IGR {:.2}% below floors.",
                current,
                roic * 100.0,
                igr * 100.0
            ));
            break;
        }
    }

    let passed = aborted.is_none() && !records.is_empty() && records.iter().all(|r| r.passes);

    RoicEvaluation { records, skipped, aborted, passed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn income(rows: &[(i32, f64, f64)]) -> YearMap {
        let mut flat = Vec::new();
        for (year, ebit, tax) in rows {
            flat.push((*year, Metric::Ebit, *ebit));
            flat.push((*year, Metric::TaxRateForCalcs, *tax));
        }
        YearMap::from_rows(&flat)
    }

    fn capital(rows: &[(i32, f64)]) -> YearMap {
        let flat: Vec<_> = rows
            .iter()
            .map(|(year, ic)| (*year, Metric::InvestedCapital, *ic))
            .collect();
        YearMap::from_rows(&flat)
    }

    #[test]
    fn test_worked_example_passes() {
        let inc = income(&[(2022, 90.0, 0.2), (2023, 100.0, 0.2)]);
        let bs = capital(&[(2022, 400.0), (2023, 440.0)]);
        let floors = RoicFloors { min_roic_pct: 10.0, min_igr_pct: 5.0 };

        let eval = evaluate(&inc, &bs, floors, RoicMode::Screening);
        assert!(eval.passed, "Expected pass: {:?}", eval);
        assert_eq!(eval.records.len(), 1);

        let rec = &eval.records[0];
        assert_eq!(rec.year, 2023);
        assert!(approx(rec.nopat, 80.0));
        assert!(approx(rec.roic, 0.20));
        assert!(approx(rec.reinvestment_rate, 0.5));
        assert!(approx(rec.igr, 0.10));
        assert!(approx(rec.delta_invested_capital(), 40.0));
    }

    #[test]
    fn test_single_year_is_not_a_vacuous_pass() {
        let eval = evaluate(
            &income(&[(2023, 100.0, 0.2)]),
            &capital(&[(2023, 440.0)]),
            RoicFloors::default(),
            RoicMode::Screening,
        );
        assert!(eval.records.is_empty());
        assert!(!eval.passed);
    }

    #[test]
    fn test_missing_ebit_aborts_everything() {
        // 2023 lacks EBIT entirely; 2024 would pass but is never reached
        let rows = vec![
            (2022, Metric::Ebit, 100.0),
            (2022, Metric::TaxRateForCalcs, 0.2),
            (2023, Metric::TaxRateForCalcs, 0.2),
            (2024, Metric::Ebit, 100.0),
            (2024, Metric::TaxRateForCalcs, 0.2),
        ];
        let inc = YearMap::from_rows(&rows);
        let bs = capital(&[(2022, 400.0), (2023, 400.0), (2024, 800.0)]);

        let eval = evaluate(&inc, &bs, RoicFloors::default(), RoicMode::Screening);
        assert!(!eval.passed);
        assert!(eval.records.is_empty(), "Nothing after the abort is evaluated");
        assert_eq!(eval.aborted.as_deref(), Some("2023: Missing EBIT or Tax Rate."));
    }

    #[test]
    fn test_zero_beginning_capital_policies() {
        let inc = income(&[(2021, 0.0, 0.0), (2022, 100.0, 0.2), (2023, 100.0, 0.2)]);
        let bs = capital(&[(2021, 0.0), (2022, 400.0), (2023, 440.0)]);
        let floors = RoicFloors { min_roic_pct: 10.0, min_igr_pct: 5.0 };

        let batch = evaluate(&inc, &bs, floors, RoicMode::Screening);
        assert_eq!(batch.skipped.len(), 1, "2022 skipped for zero beginning capital");
        assert_eq!(batch.skipped[0].year, 2022);
        assert_eq!(batch.records.len(), 1);
        assert!(batch.passed, "Skipped years do not fail the ticker");

        let report = evaluate(&inc, &bs, floors, RoicMode::Analysis);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].roic, 0.0, "Zero capital reported as ROIC 0");
        assert!(!report.records[0].passes);
        assert!(report.records[1].passes);
        assert!(!report.passed, "A failing reported year fails the ticker");
    }

    #[test]
    fn test_failing_year_stops_batch_but_not_report() {
        let inc = income(&[(2021, 10.0, 0.0), (2022, 1.0, 0.0), (2023, 100.0, 0.0)]);
        let bs = capital(&[(2021, 100.0), (2022, 100.0), (2023, 200.0)]);
        let floors = RoicFloors::default();

        let batch = evaluate(&inc, &bs, floors, RoicMode::Screening);
        assert_eq!(batch.records.len(), 1);
        assert!(batch.aborted.is_some());
        assert!(!batch.passed);

        let report = evaluate(&inc, &bs, floors, RoicMode::Analysis);
        assert_eq!(report.records.len(), 2, "Report keeps evaluating");
        assert!(report.aborted.is_none());
        assert!(!report.passed);
    }

    #[test]
    fn test_missing_ending_capital_aborts() {
        let inc = income(&[(2022, 100.0, 0.2), (2023, 100.0, 0.2)]);
        let bs = capital(&[(2022, 400.0)]);
        let eval = evaluate(&inc, &bs, RoicFloors::default(), RoicMode::Analysis);
        assert!(!eval.passed);
        assert!(eval.aborted.unwrap().contains("current year"));
    }

    #[test]
    fn test_zero_nopat_gives_zero_reinvestment() {
        let inc = income(&[(2022, 50.0, 0.2), (2023, 0.0, 0.2)]);
        let bs = capital(&[(2022, 400.0), (2023, 500.0)]);
        let eval = evaluate(&inc, &bs, RoicFloors::default(), RoicMode::Analysis);
        assert_eq!(eval.records[0].reinvestment_rate, 0.0);
        assert_eq!(eval.records[0].igr, 0.0);
    }
}

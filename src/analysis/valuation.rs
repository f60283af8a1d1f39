// src/analysis/valuation.rs
// Single-stage Gordon Growth valuation of free cash flow.

use crate::analysis::aligner::TrendSeries;
use crate::statements::models::PriceSeries;
use crate::utils::format::with_thousands;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;
pub const DEFAULT_TERMINAL_GROWTH_RATE: f64 = 0.025;

/// Discount and perpetual growth rates, as fractions (0.10 = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcfParams {
    pub discount_rate: f64,
    pub terminal_growth_rate: f64,
}

impl Default for DcfParams {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            terminal_growth_rate: DEFAULT_TERMINAL_GROWTH_RATE,
        }
    }
}

impl DcfParams {
    /// The perpetuity only converges when r > g.
    pub fn is_defined(&self) -> bool {
        self.discount_rate > self.terminal_growth_rate
    }

    /// `fcf * (1 + g) / (r - g)`, or exactly 0 when r <= g.
    pub fn gordon_growth(&self, fcf: f64) -> f64 {
        if !self.is_defined() {
            return 0.0;
        }
        fcf * (1.0 + self.terminal_growth_rate) / (self.discount_rate - self.terminal_growth_rate)
    }
}

/// Share counts available for per-share figures.
#[derive(Debug, Clone, Default)]
pub struct SharesOutstanding {
    /// `Ordinary Shares Number` from the balance sheet, per fiscal year.
    pub by_year: BTreeMap<i32, f64>,
    /// `sharesOutstanding` from company info.
    pub latest_reported: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ValuationInputs {
    pub fcf: TrendSeries,
    pub shares: SharesOutstanding,
    pub prices: PriceSeries,
    pub current_price: Option<f64>,
}

/// One row of the historical table: that year's FCF valued as if it were the latest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalValuation {
    pub year: i32,
    pub free_cash_flow: f64,
    pub intrinsic_value_total: f64,
    pub intrinsic_value_per_share: Option<f64>,
    pub market_price: Option<f64>,
    pub margin_of_safety: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    pub params: DcfParams,
    pub latest_year: i32,
    pub latest_fcf: f64,
    pub intrinsic_value_total: f64,
    pub intrinsic_value_per_share: Option<f64>,
    pub current_market_price: Option<f64>,
    pub margin_of_safety: Option<f64>,
    pub warnings: Vec<String>,
    pub history: Vec<HistoricalValuation>,
}

/// `((per_share - price) / price) * 100`; absent unless both exist and price != 0.
pub fn margin_of_safety(per_share: Option<f64>, price: Option<f64>) -> Option<f64> {
    match (per_share, price) {
        (Some(value), Some(price)) if price != 0.0 => Some((value - price) / price * 100.0),
        _ => None,
    }
}

fn per_share(total: f64, shares: Option<f64>) -> Option<f64> {
    shares.filter(|s| *s > 0.0).map(|s| total / s)
}

/// Share count per FCF year: the balance-sheet series when there is one,
/// otherwise the company-info figure repeated for every year.
fn resolve_year_shares(
    shares: &SharesOutstanding,
    fcf_years: &[i32],
    warnings: &mut Vec<String>,
) -> BTreeMap<i32, f64> {
    if !shares.by_year.is_empty() {
        return shares.by_year.clone();
    }
    match shares.latest_reported {
        Some(latest) => {
            warnings.push(format!(
                "Using latest sharesOutstanding ({}) for all historical DCF calculations due to lack of historical data.",
                with_thousands(latest, 0)
            ));
            fcf_years.iter().map(|year| (*year, latest)).collect()
        }
        None => {
            warnings.push(
                "No shares outstanding data available; per-share values cannot be calculated."
                    .to_string(),
            );
            BTreeMap::new()
        }
    }
}

/// Values the latest FCF and every historical FCF observation.
/// Returns `None` when there is no FCF observation at all.
pub fn value(inputs: &ValuationInputs, params: DcfParams) -> Option<ValuationResult> {
    let (latest_date, latest_fcf) = inputs.fcf.latest()?;
    let latest_year = latest_date.year();
    let mut warnings = Vec::new();

    if !params.is_defined() {
        tracing::warn!(
            "Discount rate {} <= terminal growth {}; intrinsic value set to 0",
            params.discount_rate,
            params.terminal_growth_rate
        );
        warnings.push(
            "Discount rate must be greater than terminal growth rate for Gordon Growth Model. Cannot calculate intrinsic value."
                .to_string(),
        );
    }

    let year_shares = resolve_year_shares(&inputs.shares, &inputs.fcf.years(), &mut warnings);

    let intrinsic_value_total = params.gordon_growth(latest_fcf);
    let current_shares = year_shares
        .get(&latest_year)
        .copied()
        .or(inputs.shares.latest_reported);
    let intrinsic_value_per_share = per_share(intrinsic_value_total, current_shares);
    if intrinsic_value_per_share.is_none() {
        warnings.push(
            "Cannot calculate current intrinsic value per share: Shares outstanding data not available or is zero."
                .to_string(),
        );
    }

    let history = inputs
        .fcf
        .iter()
        .map(|(date, fcf)| {
            let year = date.year();
            let total = params.gordon_growth(*fcf);
            let value_per_share = per_share(total, year_shares.get(&year).copied());
            let market_price = inputs.prices.last_close_in_year(year);
            HistoricalValuation {
                year,
                free_cash_flow: *fcf,
                intrinsic_value_total: total,
                intrinsic_value_per_share: value_per_share,
                market_price,
                margin_of_safety: margin_of_safety(value_per_share, market_price),
            }
        })
        .collect();

    Some(ValuationResult {
        params,
        latest_year,
        latest_fcf,
        intrinsic_value_total,
        intrinsic_value_per_share,
        current_market_price: inputs.current_price,
        margin_of_safety: margin_of_safety(intrinsic_value_per_share, inputs.current_price),
        warnings,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
    }

    fn fcf(points: &[(i32, f64)]) -> TrendSeries {
        TrendSeries::new(points.iter().map(|(y, v)| (d(*y), *v)).collect())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    #[test]
    fn test_gordon_growth_default_rates() {
        let params = DcfParams::default();
        let value = params.gordon_growth(1_000_000.0);
        assert!(approx(value, 1_000_000.0 * 1.025 / 0.075), "got {}", value);
        assert_eq!(value.round(), 13_666_667.0);
    }

    #[test]
    fn test_undefined_rates_yield_zero_and_warning() {
        let params = DcfParams { discount_rate: 0.02, terminal_growth_rate: 0.02 };
        let inputs = ValuationInputs {
            fcf: fcf(&[(2022, 500.0), (2023, 800.0)]),
            shares: SharesOutstanding { by_year: [(2023, 10.0)].into(), latest_reported: None },
            ..Default::default()
        };
        let result = value(&inputs, params).expect("fcf present");
        assert_eq!(result.intrinsic_value_total, 0.0);
        assert!(result.history.iter().all(|h| h.intrinsic_value_total == 0.0));
        assert!(
            result.warnings.iter().any(|w| w.contains("Discount rate must be greater")),
            "Warning should be recorded: {:?}",
            result.warnings
        );
    }

    #[test]
    fn test_margin_of_safety_rules() {
        assert_eq!(margin_of_safety(Some(150.0), Some(100.0)), Some(50.0));
        assert_eq!(margin_of_safety(Some(150.0), Some(0.0)), None);
        assert_eq!(margin_of_safety(Some(150.0), None), None);
        assert_eq!(margin_of_safety(None, Some(100.0)), None);
    }

    #[test]
    fn test_current_valuation_uses_latest_year_shares_and_price() {
        let total_target = 1_500.0;
        let latest_fcf = total_target * 0.075 / 1.025;
        let inputs = ValuationInputs {
            fcf: fcf(&[(2022, 100.0), (2023, latest_fcf)]),
            shares: SharesOutstanding {
                by_year: [(2022, 20.0), (2023, 10.0)].into(),
                latest_reported: Some(99.0),
            },
            prices: PriceSeries::new(vec![(d(2022), 4.0)]),
            current_price: Some(100.0),
        };
        let result = value(&inputs, DcfParams::default()).unwrap();
        assert_eq!(result.latest_year, 2023);
        assert!(approx(result.intrinsic_value_total, 1_500.0));
        assert!(approx(result.intrinsic_value_per_share.unwrap(), 150.0));
        assert!(approx(result.margin_of_safety.unwrap(), 50.0));
        assert!(result.warnings.is_empty(), "No warnings expected: {:?}", result.warnings);
    }

    #[test]
    fn test_history_values_each_year_independently() {
        let inputs = ValuationInputs {
            fcf: fcf(&[(2021, 75.0), (2022, 150.0), (2023, 300.0)]),
            shares: SharesOutstanding {
                by_year: [(2021, 1.0), (2022, 2.0)].into(),
                latest_reported: None,
            },
            prices: PriceSeries::new(vec![(d(2021), 1_025.0), (d(2023), 10.0)]),
            current_price: None,
        };
        let result = value(&inputs, DcfParams::default()).unwrap();
        assert_eq!(result.history.len(), 3);

        let y2021 = &result.history[0];
        assert!(approx(y2021.intrinsic_value_total, 1_025.0));
        assert!(approx(y2021.intrinsic_value_per_share.unwrap(), 1_025.0));
        assert!(approx(y2021.margin_of_safety.unwrap(), 0.0));

        let y2022 = &result.history[1];
        assert!(approx(y2022.intrinsic_value_per_share.unwrap(), 1_025.0));
        assert_eq!(y2022.market_price, None, "No prices in 2022");
        assert_eq!(y2022.margin_of_safety, None);

        let y2023 = &result.history[2];
        assert_eq!(y2023.intrinsic_value_per_share, None, "Shares unresolved stays absent");
        assert_eq!(y2023.market_price, Some(10.0));
        assert_eq!(y2023.margin_of_safety, None);
    }

    #[test]
    fn test_company_info_shares_broadcast_with_warning() {
        let inputs = ValuationInputs {
            fcf: fcf(&[(2022, 75.0), (2023, 150.0)]),
            shares: SharesOutstanding { by_year: BTreeMap::new(), latest_reported: Some(1_000.0) },
            ..Default::default()
        };
        let result = value(&inputs, DcfParams::default()).unwrap();
        assert!(result.history.iter().all(|h| h.intrinsic_value_per_share.is_some()));
        assert!(result.warnings[0].starts_with("Using latest sharesOutstanding (1,000)"));
    }

    #[test]
    fn test_no_fcf_means_no_valuation() {
        assert!(value(&ValuationInputs::default(), DcfParams::default()).is_none());
    }

    #[test]
    fn test_zero_shares_leave_per_share_absent() {
        let inputs = ValuationInputs {
            fcf: fcf(&[(2023, 150.0)]),
            shares: SharesOutstanding { by_year: [(2023, 0.0)].into(), latest_reported: None },
            prices: PriceSeries::default(),
            current_price: Some(10.0),
        };
        let result = value(&inputs, DcfParams::default()).unwrap();
        assert_eq!(result.intrinsic_value_per_share, None);
        assert_eq!(result.margin_of_safety, None);
        assert!(result.warnings.iter().any(|w| w.contains("not available or is zero")));
    }
}

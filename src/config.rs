// src/config.rs
use crate::analysis::filter::MarginBand;
use crate::analysis::roic::RoicFloors;
use crate::analysis::valuation::DcfParams;
use crate::runner::default_workers;
use crate::utils::AppError;
use std::path::PathBuf;

/// Validated settings shared by every command.
#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
}

impl ScreenerConfig {
    pub fn new(
        data_dir: PathBuf,
        output_dir: PathBuf,
        workers: Option<usize>,
    ) -> Result<Self, AppError> {
        let workers = match workers {
            Some(0) => return Err(AppError::Config("--workers must be at least 1".to_string())),
            Some(n) => n,
            None => default_workers(),
        };
        Ok(Self {
            data_dir,
            output_dir,
            workers,
        })
    }
}

fn require_finite(name: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AppError::Config(format!("{} must be a finite number, got {}", name, value)))
    }
}

/// Rates must be finite. r <= g is allowed but yields zero valuations.
pub fn dcf_params(discount_rate: f64, growth_rate: f64) -> Result<DcfParams, AppError> {
    let params = DcfParams {
        discount_rate: require_finite("--discount-rate", discount_rate)?,
        terminal_growth_rate: require_finite("--growth-rate", growth_rate)?,
    };
    if !params.is_defined() {
        tracing::warn!(
            "Discount rate ({}) is not greater than growth rate ({}); intrinsic values will be 0",
            discount_rate,
            growth_rate
        );
    }
    Ok(params)
}

pub fn margin_band(min: f64, max: f64) -> Result<MarginBand, AppError> {
    let band = MarginBand {
        min: require_finite("--min-margin", min)?,
        max: require_finite("--max-margin", max)?,
    };
    if band.min > band.max {
        return Err(AppError::Config(format!(
            "--min-margin ({}) is greater than --max-margin ({})",
            min, max
        )));
    }
    Ok(band)
}

pub fn roic_floors(min_roic_pct: f64, min_igr_pct: f64) -> Result<RoicFloors, AppError> {
    Ok(RoicFloors {
        min_roic_pct: require_finite("--min-roic", min_roic_pct)?,
        min_igr_pct: require_finite("--min-igr", min_igr_pct)?,
    })
}

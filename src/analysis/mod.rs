// src/analysis/mod.rs
pub mod aligner;
pub mod filter;
pub mod profitability;
pub mod roic;
pub mod valuation;

// Re-export key analysis types for convenience
#[allow(unused_imports)]
pub use aligner::{align, trend, ReductionMode, TrendSeries, YearMap};
#[allow(unused_imports)]
pub use filter::{MarginBand, MarginSummary};
#[allow(unused_imports)]
pub use profitability::ScreeningResult;
#[allow(unused_imports)]
pub use roic::{RoicEvaluation, RoicFloors, RoicMode, RoicRecord};
#[allow(unused_imports)]
pub use valuation::{DcfParams, SharesOutstanding, ValuationInputs, ValuationResult};

// src/statements/mod.rs
pub mod loader;
pub mod models;

// Re-export key input types for convenience
#[allow(unused_imports)]
pub use models::{CompanyInfo, FinancialStatement, Metric, PriceSeries, StatementKind, TickerPaths};

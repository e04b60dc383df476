//! Report generation
//!
//! Daily, weekly, monthly and performance reports built from the metrics
//! aggregator and the cached insight state. Reports are stored behind `Arc`
//! and never mutated after generation, so a report fetched twice serialises
//! identically however much the underlying counters move in between.

mod export;
mod generator;
mod types;


pub use export::{export, export_json, metrics_csv, ExportData, ExportFormat, ExportScope};
pub use generator::{
    performance_advice, ReportGenerator, ReportInputs, CACHING_ADVICE_MS,
    ERROR_HANDLING_ADVICE_RATE,
};
pub use types::*;

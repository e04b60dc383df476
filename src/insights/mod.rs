//! Insight engine
//!
//! Turns accumulated metrics into human-readable insights, recommendations
//! and alerts. Analysis is lazy: nothing runs in the background, and a read
//! only recomputes once the last analysis is older than the configured
//! interval (one hour by default).
//!
//! Automated insights and recommendations are replaced on every recompute.
//! Alerts are appended and kept until [`InsightEngine::clear_alerts`] is
//! called, or trimmed to `max_alerts` when a retention limit is configured.

mod engine;
mod types;

#[cfg(test)]
mod engine_tests;

pub use engine::{
    analyze, predict_next_week, AnalysisSource, InsightEngine, DECLINE_GROWTH_PERCENT,
    HIGH_ENGAGEMENT_RATE, HIGH_ERROR_RATE, LOW_ENGAGEMENT_RATE, SLOW_RESPONSE_MS,
    SURGE_GROWTH_PERCENT,
};
pub use types::*;

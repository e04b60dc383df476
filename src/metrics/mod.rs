//! Metrics aggregation
//!
//! Visitor buckets (daily, ISO-weekly, monthly), new/returning
//! classification, page views with bounce tracking, response-time samples
//! and demographic tallies.
//!
//! ## Bounded memory
//!
//! Only the response-time buffer has a cap (`response_sample_capacity`,
//! FIFO eviction). Every other map grows with the number of distinct
//! pages, endpoints and visitors for the life of the process.

mod aggregator;
mod types;
mod user_agent;


pub use aggregator::{month_key, week_key, MetricsAggregator};
pub use types::*;
pub use user_agent::{browser_family, DeviceClass};

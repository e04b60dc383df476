//! Metrics type definitions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reported uptime; nothing measures it
pub const REPORTED_UPTIME: f64 = 99.9;

/// Pages below this share of the mean views-per-page are underperforming
pub const UNDERPERFORMING_RATIO: f64 = 0.3;

/// Timestamped response-time sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerformanceSample {
    pub endpoint: String,
    pub response_time_ms: f64,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// View count of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageViews {
    pub page: String,
    pub views: u64,
}

/// Mean latency of one endpoint over the retained samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointLatency {
    pub endpoint: String,
    pub avg_time_ms: f64,
    pub samples: usize,
}

/// Count of one interaction type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InteractionCount {
    pub kind: String,
    pub count: u64,
}

/// Daily visitor bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// Conversion funnel: view -> like -> favorite -> contact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConversionFunnel {
    pub view: u64,
    pub like: u64,
    pub favorite: u64,
    pub contact: u64,
}

impl ConversionFunnel {
    /// Counts `kind` if it is a funnel step
    pub fn record(&mut self, kind: &str) -> bool {
        let step = match kind {
            "view" => &mut self.view,
            "like" => &mut self.like,
            "favorite" => &mut self.favorite,
            "contact" => &mut self.contact,
            _ => return false,
        };
        *step += 1;
        true
    }
}

/// Demographic tallies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Demographics {
    pub countries: BTreeMap<String, u64>,
    pub devices: BTreeMap<String, u64>,
    pub browsers: BTreeMap<String, u64>,
    pub referrers: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VisitorSummary {
    /// New plus returning visitors
    pub total: u64,
    pub new_visitors: u64,
    pub returning_visitors: u64,
    /// YYYY-MM-DD -> visits
    pub daily: BTreeMap<String, u64>,
    /// YYYY-Www -> visits
    pub weekly: BTreeMap<String, u64>,
    /// YYYY-MM -> visits
    pub monthly: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageViewSummary {
    pub total: u64,
    pub pages: BTreeMap<String, u64>,
    pub bounces: BTreeMap<String, u64>,
    pub average_time_spent_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngagementSummary {
    pub total: u64,
    pub rate: f64,
    pub types: BTreeMap<String, u64>,
    pub funnel: ConversionFunnel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerformanceSummary {
    pub average_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub error_rate: f64,
    pub errors: u64,
    pub api_calls: u64,
    pub uptime: f64,
}

/// Full metrics view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsSnapshot {
    pub visitors: VisitorSummary,
    pub page_views: PageViewSummary,
    pub engagement: EngagementSummary,
    pub performance: PerformanceSummary,
    pub demographics: Demographics,
    pub generated_at: DateTime<Utc>,
}

/// Percentage change between the mean of the first and second half
///
/// The first half is the shorter one for odd lengths. Returns 0.0 when the
/// series is too short or the first half averages zero.
pub fn growth_rate(series: &[u64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let (first, second) = series.split_at(series.len() / 2);
    let first_avg = first.iter().sum::<u64>() as f64 / first.len() as f64;
    let second_avg = second.iter().sum::<u64>() as f64 / second.len() as f64;

    if first_avg == 0.0 {
        0.0
    } else {
        (second_avg - first_avg) / first_avg * 100.0
    }
}

/// Nearest-rank percentile over an unsorted sample set
pub fn nearest_rank_percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = ((percentile.clamp(0.0, 100.0) / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

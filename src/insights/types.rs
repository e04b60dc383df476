//! Insight type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interactions::RankedItem;
use crate::metrics::PageViews;

/// Kind of automated observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    TrafficSurge,
    TrafficDecline,
    HighEngagement,
    PopularInteraction,
    TopContent,
}

/// How much an insight matters to the site owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Positive,
    Info,
}

/// Automatically derived observation about traffic, engagement or content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub impact: Impact,
    pub generated_at: DateTime<Utc>,
    /// Supporting page list (top content only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageViews>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    ContentStrategy,
    ImproveEngagement,
    OptimizePerformance,
    ImproveContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

/// Suggested action derived from the current metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Pages the recommendation refers to (underperforming content only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageViews>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PerformanceWarning,
    ErrorRateHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

/// Operational alert; alerts accumulate across analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub generated_at: DateTime<Utc>,
}

/// Heuristic forecasts stored with the last analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Predictions {
    /// 7 x mean of the last 7 daily visitor counts, rounded
    pub next_week_visitors: u64,
    pub trending_items: Vec<RankedItem>,
}

/// Everything one analysis pass looks at
///
/// Gathered in one go by an [`AnalysisSource`] so the rules themselves stay
/// pure functions of their input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisInput {
    /// Daily visitor counts for the last 7 days, oldest first
    pub last_7_days: Vec<u64>,
    pub engagement_rate: f64,
    /// Most frequent interaction type and its count
    pub top_interaction: Option<(String, u64)>,
    pub average_response_ms: f64,
    pub error_rate: f64,
    /// Top 5 pages by views
    pub top_pages: Vec<PageViews>,
    pub underperforming_pages: Vec<PageViews>,
    /// Top 5 items by popularity score
    pub trending_items: Vec<RankedItem>,
}

/// Output of one analysis pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub automated: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub alerts: Vec<Alert>,
    pub predictions: Predictions,
}

/// Insight state as returned to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InsightView {
    pub automated: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub alerts: Vec<Alert>,
    pub predictions: Predictions,
    /// Watermark of the last completed analysis; `None` before the first
    pub last_updated: Option<DateTime<Utc>>,
}

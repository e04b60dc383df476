//! Report type definitions

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::insights::{Insight, Predictions, Priority, Recommendation};
use crate::metrics::{
    ConversionFunnel, DailyCount, Demographics, EndpointLatency, InteractionCount, PageViews,
};

/// Report flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Daily,
    Weekly,
    Monthly,
    Performance,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Performance => "performance",
        }
    }
}

impl Default for ReportType {
    fn default() -> Self {
        ReportType::Weekly
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "performance" => Ok(Self::Performance),
            _ => Err(EngineError::UnknownReportType(s.to_string())),
        }
    }
}

/// Inclusive date range a report covers; both ends are `None` for
/// performance reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportPeriod {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportPeriod {
    pub fn for_type(report_type: ReportType, today: NaiveDate) -> Self {
        let days_back = match report_type {
            ReportType::Daily => 0,
            ReportType::Weekly => 6,
            ReportType::Monthly => 29,
            ReportType::Performance => {
                return Self {
                    start: None,
                    end: None,
                }
            }
        };
        Self {
            start: Some(today - Duration::days(days_back)),
            end: Some(today),
        }
    }
}

// ===== Payloads =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DailyReport {
    /// Visitors tracked today
    pub visitors: u64,
    /// Page views tracked today
    pub page_views: u64,
    pub top_pages: Vec<PageViews>,
    /// Interactions tracked today
    pub interactions: u64,
    /// Last 5 automated insights
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WeeklyVisitors {
    pub total: u64,
    pub daily: Vec<DailyCount>,
    /// Percent change between the first and second half of the week
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WeeklyEngagement {
    pub total: u64,
    pub rate: f64,
    pub top_interactions: Vec<InteractionCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ContentSummary {
    pub top_pages: Vec<PageViews>,
    pub average_time_spent_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WeeklyReport {
    pub visitors: WeeklyVisitors,
    pub engagement: WeeklyEngagement,
    pub content: ContentSummary,
    pub demographics: Demographics,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyVisitors {
    /// Visits over the last 30 days
    pub total: u64,
    /// Distinct visitors seen exactly once
    pub new_visitors: u64,
    pub returning_visitors: u64,
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyEngagement {
    pub total: u64,
    pub funnel: ConversionFunnel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyPerformance {
    pub average_response_time_ms: f64,
    pub error_rate: f64,
    pub uptime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyReport {
    pub visitors: MonthlyVisitors,
    pub engagement: MonthlyEngagement,
    pub performance: MonthlyPerformance,
    pub predictions: Predictions,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponseTimeSummary {
    pub average_ms: f64,
    pub p95_ms: f64,
    pub slowest_endpoints: Vec<EndpointLatency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorSummary {
    pub rate: f64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceAdviceKind {
    ResponseTime,
    ErrorHandling,
}

/// Rule-based advice attached to performance reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerformanceAdvice {
    pub kind: PerformanceAdviceKind,
    pub message: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PerformanceReport {
    pub response_time: ResponseTimeSummary,
    pub errors: ErrorSummary,
    /// Calls per endpoint
    pub api_usage: BTreeMap<String, u64>,
    pub uptime: f64,
    pub recommendations: Vec<PerformanceAdvice>,
}

/// Type-specific report body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportPayload {
    Daily(DailyReport),
    Weekly(WeeklyReport),
    Monthly(MonthlyReport),
    Performance(PerformanceReport),
}

/// Generated report; immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Report {
    /// `"{type}_{millis}"`, suffixed with `_{n}` on a same-millisecond clash
    pub id: String,
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub data: ReportPayload,
}

//! Data export
//!
//! JSON export of any engine section and a flat `metric,value` CSV of
//! headline metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::insights::InsightView;
use crate::metrics::MetricsSnapshot;

use super::types::Report;

/// Section of engine state to export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    Metrics,
    Insights,
    Reports,
    #[default]
    All,
}

impl FromStr for ExportScope {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metrics" => Ok(Self::Metrics),
            "insights" => Ok(Self::Insights),
            "reports" => Ok(Self::Reports),
            "all" => Ok(Self::All),
            other => Err(EngineError::Config(format!("unknown export scope: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(EngineError::Config(format!("unknown export format: {}", other))),
        }
    }
}

/// Borrowed engine state handed to the exporter
pub struct ExportData<'a> {
    pub metrics: &'a MetricsSnapshot,
    pub insights: &'a InsightView,
    /// Newest first
    pub reports: &'a [&'a Report],
}

#[derive(Serialize)]
struct ExportSections<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<&'a MetricsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    insights: Option<&'a InsightView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reports: Option<&'a [&'a Report]>,
}

#[derive(Serialize)]
struct ExportEnvelope<'a> {
    exported_at: DateTime<Utc>,
    scope: ExportScope,
    data: ExportSections<'a>,
}

/// Renders the requested scope in the requested format
pub fn export(
    scope: ExportScope,
    format: ExportFormat,
    data: &ExportData<'_>,
    now: DateTime<Utc>,
) -> EngineResult<String> {
    match format {
        ExportFormat::Json => export_json(scope, data, now),
        ExportFormat::Csv => Ok(metrics_csv(data.metrics)),
    }
}

/// JSON envelope `{exported_at, scope, data}` with only the requested sections
pub fn export_json(
    scope: ExportScope,
    data: &ExportData<'_>,
    now: DateTime<Utc>,
) -> EngineResult<String> {
    let wants = |section: ExportScope| scope == ExportScope::All || scope == section;
    let envelope = ExportEnvelope {
        exported_at: now,
        scope,
        data: ExportSections {
            metrics: wants(ExportScope::Metrics).then_some(data.metrics),
            insights: wants(ExportScope::Insights).then_some(data.insights),
            reports: wants(ExportScope::Reports).then_some(data.reports),
        },
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Headline metrics as `metric,value` rows
pub fn metrics_csv(snapshot: &MetricsSnapshot) -> String {
    let rows: [(&str, String); 13] = [
        ("visitors", snapshot.visitors.total.to_string()),
        ("new_visitors", snapshot.visitors.new_visitors.to_string()),
        ("returning_visitors", snapshot.visitors.returning_visitors.to_string()),
        ("page_views", snapshot.page_views.total.to_string()),
        (
            "average_time_spent_ms",
            format!("{:.1}", snapshot.page_views.average_time_spent_ms),
        ),
        ("engagement", snapshot.engagement.total.to_string()),
        ("engagement_rate", format!("{:.4}", snapshot.engagement.rate)),
        (
            "average_response_time_ms",
            format!("{:.1}", snapshot.performance.average_response_time_ms),
        ),
        (
            "p95_response_time_ms",
            format!("{:.1}", snapshot.performance.p95_response_time_ms),
        ),
        ("error_rate", format!("{:.4}", snapshot.performance.error_rate)),
        ("errors", snapshot.performance.errors.to_string()),
        ("api_calls", snapshot.performance.api_calls.to_string()),
        ("uptime", format!("{:.1}", snapshot.performance.uptime)),
    ];

    let mut csv = String::from("metric,value\n");
    for (metric, value) in rows {
        let _ = writeln!(csv, "{},{}", metric, value);
    }
    for (page, views) in &snapshot.page_views.pages {
        let _ = writeln!(csv, "{},{}", csv_field(&format!("page_views:{}", page)), views);
    }
    csv
}

/// Quotes a field containing a separator, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

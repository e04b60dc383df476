//! Report generation and storage

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EngineError, EngineResult};
use crate::insights::{InsightView, Priority};
use crate::metrics::{growth_rate, MetricsAggregator, REPORTED_UPTIME};

use super::types::{
    ContentSummary, DailyReport, ErrorSummary, MonthlyEngagement, MonthlyPerformance,
    MonthlyReport, MonthlyVisitors, PerformanceAdvice, PerformanceAdviceKind, PerformanceReport,
    Report, ReportPayload, ReportPeriod, ReportType, ResponseTimeSummary, WeeklyEngagement,
    WeeklyReport, WeeklyVisitors,
};

/// Mean response time (ms) above which caching is advised
pub const CACHING_ADVICE_MS: f64 = 500.0;
/// Error rate above which better error handling is advised
pub const ERROR_HANDLING_ADVICE_RATE: f64 = 0.01;

const DAILY_TOP_PAGES: usize = 5;
const DAILY_INSIGHTS: usize = 5;
const WEEKLY_TOP_PAGES: usize = 10;
const WEEKLY_TOP_INTERACTIONS: usize = 5;
const SLOWEST_ENDPOINTS: usize = 5;

/// Read-only inputs a report is built from
pub struct ReportInputs<'a> {
    pub metrics: &'a MetricsAggregator,
    /// Cached insight state; building a report never triggers analysis
    pub insights: &'a InsightView,
}

#[derive(Debug, Default)]
struct ReportStore {
    by_id: HashMap<String, Arc<Report>>,
    /// Insertion order, oldest first
    order: Vec<Arc<Report>>,
}

/// Builds reports and keeps every generated report for later lookup
#[derive(Debug, Default)]
pub struct ReportGenerator {
    store: RwLock<ReportStore>,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, ReportStore>> {
        self.store
            .read()
            .map_err(|_| EngineError::LockPoisoned("report store"))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, ReportStore>> {
        self.store
            .write()
            .map_err(|_| EngineError::LockPoisoned("report store"))
    }

    pub fn generate(
        &self,
        report_type: ReportType,
        inputs: &ReportInputs<'_>,
    ) -> EngineResult<Arc<Report>> {
        self.generate_at(report_type, inputs, Utc::now())
    }

    /// Builds a report as of `now` and stores it
    pub fn generate_at(
        &self,
        report_type: ReportType,
        inputs: &ReportInputs<'_>,
        now: DateTime<Utc>,
    ) -> EngineResult<Arc<Report>> {
        let data = match report_type {
            ReportType::Daily => ReportPayload::Daily(daily_report(inputs, now)?),
            ReportType::Weekly => ReportPayload::Weekly(weekly_report(inputs, now)?),
            ReportType::Monthly => ReportPayload::Monthly(monthly_report(inputs, now)?),
            ReportType::Performance => ReportPayload::Performance(performance_report(inputs)?),
        };

        let mut store = self.write()?;
        let base_id = format!("{}_{}", report_type, now.timestamp_millis());
        let mut id = base_id.clone();
        let mut sequence = 1;
        while store.by_id.contains_key(&id) {
            id = format!("{}_{}", base_id, sequence);
            sequence += 1;
        }

        let report = Arc::new(Report {
            id: id.clone(),
            report_type,
            generated_at: now,
            period: ReportPeriod::for_type(report_type, now.date_naive()),
            data,
        });
        store.by_id.insert(id, Arc::clone(&report));
        store.order.push(Arc::clone(&report));

        tracing::info!(report_id = %report.id, report_type = %report_type, "Report generated");
        Ok(report)
    }

    pub fn get_report(&self, id: &str) -> EngineResult<Option<Arc<Report>>> {
        Ok(self.read()?.by_id.get(id).cloned())
    }

    /// Stored reports, newest first, optionally filtered by type
    pub fn get_reports(&self, report_type: Option<ReportType>) -> EngineResult<Vec<Arc<Report>>> {
        let store = self.read()?;
        let mut reports: Vec<Arc<Report>> = store
            .order
            .iter()
            .rev()
            .filter(|r| report_type.map_or(true, |t| r.report_type == t))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(reports)
    }

    pub fn len(&self) -> EngineResult<usize> {
        Ok(self.read()?.order.len())
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.read()?.order.is_empty())
    }
}

fn daily_report(inputs: &ReportInputs<'_>, now: DateTime<Utc>) -> EngineResult<DailyReport> {
    let today = now.date_naive();
    let metrics = inputs.metrics;
    let automated = &inputs.insights.automated;
    let recent = automated.len().saturating_sub(DAILY_INSIGHTS);

    Ok(DailyReport {
        visitors: metrics.visitors_on(today)?,
        page_views: metrics.page_views_on(today)?,
        top_pages: metrics.top_pages(DAILY_TOP_PAGES)?,
        interactions: metrics.interactions_on(today)?,
        insights: automated[recent..].to_vec(),
    })
}

fn weekly_report(inputs: &ReportInputs<'_>, now: DateTime<Utc>) -> EngineResult<WeeklyReport> {
    let metrics = inputs.metrics;
    let daily = metrics.daily_series(7, now.date_naive())?;
    let counts: Vec<u64> = daily.iter().map(|d| d.count).collect();

    Ok(WeeklyReport {
        visitors: WeeklyVisitors {
            total: counts.iter().sum(),
            growth: growth_rate(&counts),
            daily,
        },
        engagement: WeeklyEngagement {
            total: metrics.total_interactions()?,
            rate: metrics.engagement_rate()?,
            top_interactions: metrics.top_interaction_types(WEEKLY_TOP_INTERACTIONS)?,
        },
        content: ContentSummary {
            top_pages: metrics.top_pages(WEEKLY_TOP_PAGES)?,
            average_time_spent_ms: metrics.average_time_spent()?,
        },
        demographics: metrics.demographics()?,
        insights: inputs.insights.automated.clone(),
        recommendations: inputs.insights.recommendations.clone(),
    })
}

fn monthly_report(inputs: &ReportInputs<'_>, now: DateTime<Utc>) -> EngineResult<MonthlyReport> {
    let metrics = inputs.metrics;
    let counts: Vec<u64> = metrics
        .daily_series(30, now.date_naive())?
        .iter()
        .map(|d| d.count)
        .collect();
    let (new_visitors, returning_visitors) = metrics.visitor_counts()?;

    Ok(MonthlyReport {
        visitors: MonthlyVisitors {
            total: counts.iter().sum(),
            new_visitors,
            returning_visitors,
            growth: growth_rate(&counts),
        },
        engagement: MonthlyEngagement {
            total: metrics.total_interactions()?,
            funnel: metrics.funnel()?,
        },
        performance: MonthlyPerformance {
            average_response_time_ms: metrics.average_response_time()?,
            error_rate: metrics.error_rate()?,
            uptime: REPORTED_UPTIME,
        },
        predictions: inputs.insights.predictions.clone(),
        insights: inputs.insights.automated.clone(),
        recommendations: inputs.insights.recommendations.clone(),
    })
}

fn performance_report(inputs: &ReportInputs<'_>) -> EngineResult<PerformanceReport> {
    let metrics = inputs.metrics;
    let average_ms = metrics.average_response_time()?;
    let error_rate = metrics.error_rate()?;

    Ok(PerformanceReport {
        response_time: ResponseTimeSummary {
            average_ms,
            p95_ms: metrics.percentile(95.0)?,
            slowest_endpoints: metrics.slowest_endpoints(SLOWEST_ENDPOINTS)?,
        },
        errors: ErrorSummary {
            rate: error_rate,
            total: metrics.error_count()?,
        },
        api_usage: metrics.api_calls()?,
        uptime: REPORTED_UPTIME,
        recommendations: performance_advice(average_ms, error_rate),
    })
}

/// Caching advice above 500ms mean, error-handling advice above 1% errors
pub fn performance_advice(average_ms: f64, error_rate: f64) -> Vec<PerformanceAdvice> {
    let mut advice = Vec::new();
    if average_ms > CACHING_ADVICE_MS {
        advice.push(PerformanceAdvice {
            kind: PerformanceAdviceKind::ResponseTime,
            message: "Consider caching to improve response times".to_string(),
            priority: Priority::High,
        });
    }
    if error_rate > ERROR_HANDLING_ADVICE_RATE {
        advice.push(PerformanceAdvice {
            kind: PerformanceAdviceKind::ErrorHandling,
            message: "Improve error handling and input validation".to_string(),
            priority: Priority::Medium,
        });
    }
    advice
}

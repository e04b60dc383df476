//! Insight engine implementation

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};

use crate::config::DEFAULT_INSIGHT_INTERVAL_MINUTES;
use crate::error::{EngineError, EngineResult};
use crate::metrics::growth_rate;

use super::types::{
    Alert, AlertKind, Analysis, AnalysisInput, Impact, Insight, InsightKind, InsightView,
    Predictions, Priority, Recommendation, RecommendationKind, Severity,
};

/// Growth (percent) above which traffic is a surge
pub const SURGE_GROWTH_PERCENT: f64 = 20.0;
/// Growth (percent) below which traffic is declining
pub const DECLINE_GROWTH_PERCENT: f64 = -10.0;
/// Engagement rate above which engagement is called out as high
pub const HIGH_ENGAGEMENT_RATE: f64 = 0.15;
/// Engagement rate below which an engagement recommendation is made
pub const LOW_ENGAGEMENT_RATE: f64 = 0.05;
/// Mean response time (ms) that raises a performance alert
pub const SLOW_RESPONSE_MS: f64 = 1000.0;
/// Error rate that raises a critical alert
pub const HIGH_ERROR_RATE: f64 = 0.05;

/// Supplies the data an analysis pass needs
pub trait AnalysisSource {
    fn analysis_input(&self, now: DateTime<Utc>) -> EngineResult<AnalysisInput>;
}

/// Runs every analysis rule over `input`
///
/// Rules are independent; the output order of each list follows rule order
/// (traffic, engagement, performance, content).
pub fn analyze(input: &AnalysisInput, now: DateTime<Utc>) -> Analysis {
    let mut analysis = Analysis::default();
    analyze_traffic(input, now, &mut analysis);
    analyze_engagement(input, now, &mut analysis);
    analyze_performance(input, now, &mut analysis);
    analyze_content(input, now, &mut analysis);
    analysis.predictions = Predictions {
        next_week_visitors: predict_next_week(&input.last_7_days),
        trending_items: input.trending_items.clone(),
    };
    analysis
}

/// 7 x mean of the daily series, rounded
pub fn predict_next_week(daily: &[u64]) -> u64 {
    if daily.is_empty() {
        return 0;
    }
    let mean = daily.iter().sum::<u64>() as f64 / daily.len() as f64;
    (mean * 7.0).round() as u64
}

fn insight(
    kind: InsightKind,
    impact: Impact,
    title: String,
    description: String,
    now: DateTime<Utc>,
) -> Insight {
    Insight {
        kind,
        title,
        description,
        impact,
        generated_at: now,
        pages: Vec::new(),
    }
}

fn analyze_traffic(input: &AnalysisInput, now: DateTime<Utc>, out: &mut Analysis) {
    let growth = growth_rate(&input.last_7_days);

    if growth > SURGE_GROWTH_PERCENT {
        out.automated.push(insight(
            InsightKind::TrafficSurge,
            Impact::High,
            "Traffic surge detected".to_string(),
            format!("Traffic grew {:.1}% over the last 7 days", growth),
            now,
        ));
    } else if growth < DECLINE_GROWTH_PERCENT {
        out.automated.push(insight(
            InsightKind::TrafficDecline,
            Impact::Medium,
            "Traffic decline".to_string(),
            format!("Traffic fell {:.1}% over the last 7 days", growth.abs()),
            now,
        ));
        out.recommendations.push(Recommendation {
            kind: RecommendationKind::ContentStrategy,
            title: "Improve content strategy".to_string(),
            description: "Publish new content or promote existing items".to_string(),
            priority: Priority::High,
            pages: Vec::new(),
        });
    }
}

fn analyze_engagement(input: &AnalysisInput, now: DateTime<Utc>, out: &mut Analysis) {
    let rate = input.engagement_rate;

    if rate > HIGH_ENGAGEMENT_RATE {
        out.automated.push(insight(
            InsightKind::HighEngagement,
            Impact::Positive,
            "Excellent engagement".to_string(),
            format!("Engagement rate of {:.1}%", rate * 100.0),
            now,
        ));
    } else if rate < LOW_ENGAGEMENT_RATE {
        out.recommendations.push(Recommendation {
            kind: RecommendationKind::ImproveEngagement,
            title: "Improve engagement".to_string(),
            description: "Add more interactive elements or improve existing content".to_string(),
            priority: Priority::Medium,
            pages: Vec::new(),
        });
    }

    if let Some((kind, count)) = &input.top_interaction {
        out.automated.push(insight(
            InsightKind::PopularInteraction,
            Impact::Info,
            format!("{} is the most popular interaction", kind),
            format!("{} interactions recorded", count),
            now,
        ));
    }
}

fn analyze_performance(input: &AnalysisInput, now: DateTime<Utc>, out: &mut Analysis) {
    if input.average_response_ms > SLOW_RESPONSE_MS {
        out.alerts.push(Alert {
            kind: AlertKind::PerformanceWarning,
            title: "High response time".to_string(),
            description: format!("Average response time: {:.0}ms", input.average_response_ms),
            severity: Severity::Warning,
            generated_at: now,
        });
        out.recommendations.push(Recommendation {
            kind: RecommendationKind::OptimizePerformance,
            title: "Optimize performance".to_string(),
            description: "Consider caching or optimizing slow queries".to_string(),
            priority: Priority::High,
            pages: Vec::new(),
        });
    }

    if input.error_rate > HIGH_ERROR_RATE {
        out.alerts.push(Alert {
            kind: AlertKind::ErrorRateHigh,
            title: "High error rate".to_string(),
            description: format!("{:.2}% of calls failed", input.error_rate * 100.0),
            severity: Severity::Critical,
            generated_at: now,
        });
    }
}

fn analyze_content(input: &AnalysisInput, now: DateTime<Utc>, out: &mut Analysis) {
    if let Some(top) = input.top_pages.first() {
        let mut top_content = insight(
            InsightKind::TopContent,
            Impact::Positive,
            "Most popular content".to_string(),
            format!("{} leads with {} views", top.page, top.views),
            now,
        );
        top_content.pages = input.top_pages.clone();
        out.automated.push(top_content);
    }

    if !input.underperforming_pages.is_empty() {
        out.recommendations.push(Recommendation {
            kind: RecommendationKind::ImproveContent,
            title: "Improve underperforming content".to_string(),
            description: format!(
                "{} pages need attention",
                input.underperforming_pages.len()
            ),
            priority: Priority::Medium,
            pages: input.underperforming_pages.clone(),
        });
    }
}

#[derive(Debug, Default)]
struct InsightState {
    view: InsightView,
}

/// Cached insight lists behind a time watermark
///
/// Reads within `interval` of the last analysis return the cached lists.
/// The first read after that recomputes under the same lock, so concurrent
/// readers of a stale window trigger exactly one recompute.
#[derive(Debug)]
pub struct InsightEngine {
    state: Mutex<InsightState>,
    interval: Duration,
    /// `None` keeps every alert until cleared
    max_alerts: Option<usize>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_INSIGHT_INTERVAL_MINUTES), None)
    }
}

impl InsightEngine {
    pub fn new(interval: Duration, max_alerts: Option<usize>) -> Self {
        Self {
            state: Mutex::new(InsightState::default()),
            interval,
            max_alerts,
        }
    }

    fn state(&self) -> EngineResult<MutexGuard<'_, InsightState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::LockPoisoned("insight engine"))
    }

    /// True when a read at `now` would recompute
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> EngineResult<bool> {
        let state = self.state()?;
        Ok(self.needs_refresh(&state, now))
    }

    fn needs_refresh(&self, state: &InsightState, now: DateTime<Utc>) -> bool {
        match state.view.last_updated {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Current insights, recomputed first if stale
    pub fn insights(&self, source: &dyn AnalysisSource) -> EngineResult<InsightView> {
        self.insights_at(Utc::now(), source)
    }

    pub fn insights_at(
        &self,
        now: DateTime<Utc>,
        source: &dyn AnalysisSource,
    ) -> EngineResult<InsightView> {
        let mut state = self.state()?;
        if self.needs_refresh(&state, now) {
            let input = source.analysis_input(now)?;
            let analysis = analyze(&input, now);
            self.apply(&mut state, analysis, now);
        }
        Ok(state.view.clone())
    }

    /// Forces a recompute regardless of the watermark
    ///
    /// Input is gathered under the lock so concurrent refreshes apply in order.
    pub fn refresh_at(
        &self,
        now: DateTime<Utc>,
        source: &dyn AnalysisSource,
    ) -> EngineResult<InsightView> {
        let mut state = self.state()?;
        let input = source.analysis_input(now)?;
        self.apply(&mut state, analyze(&input, now), now);
        Ok(state.view.clone())
    }

    fn apply(&self, state: &mut InsightState, analysis: Analysis, now: DateTime<Utc>) {
        for alert in &analysis.alerts {
            tracing::warn!(kind = ?alert.kind, severity = ?alert.severity, "{}", alert.description);
        }

        let view = &mut state.view;
        view.automated = analysis.automated;
        view.recommendations = analysis.recommendations;
        view.alerts.extend(analysis.alerts);
        view.predictions = analysis.predictions;
        view.last_updated = Some(now);

        if let Some(max) = self.max_alerts {
            let excess = view.alerts.len().saturating_sub(max);
            if excess > 0 {
                view.alerts.drain(..excess);
                tracing::info!(dropped = excess, retained = max, "Trimmed alert history");
            }
        }

        tracing::info!(
            insights = view.automated.len(),
            recommendations = view.recommendations.len(),
            alerts = view.alerts.len(),
            "Insights recomputed"
        );
    }

    /// Cached insights without any recompute
    pub fn current(&self) -> EngineResult<InsightView> {
        Ok(self.state()?.view.clone())
    }

    /// Drops every accumulated alert
    ///
    /// # Returns
    /// Number of alerts removed
    pub fn clear_alerts(&self) -> EngineResult<usize> {
        let mut state = self.state()?;
        let cleared = state.view.alerts.len();
        state.view.alerts.clear();
        if cleared > 0 {
            tracing::info!(cleared, "Alerts cleared");
        }
        Ok(cleared)
    }
}

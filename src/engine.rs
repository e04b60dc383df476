//! Engine context
//!
//! [`AnalyticsEngine`] owns every component and is constructed once by the
//! host process, then shared (typically behind an `Arc`) with whatever
//! routes requests into it. There is no global state.
//!
//! Every tracked interaction flows through here so that the ledger, the
//! session registry and the metrics aggregator stay in step:
//!
//! 1. the ledger validates and applies the interaction
//! 2. the session's activity and interaction count are bumped
//! 3. the interaction type is counted by the metrics aggregator
//!
//! A rejected interaction stops at step 1 and touches nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{ContentCatalog, ContentRecord};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::insights::{AnalysisInput, AnalysisSource, InsightEngine, InsightView};
use crate::interactions::{
    Comment, EngagementSnapshot, EngagementStats, InteractionKind, InteractionLedger, NewComment,
    RankedItem, RatingSummary, ShareOutcome, ToggleOutcome, ViewOutcome,
};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::reports::{
    export, ExportData, ExportFormat, ExportScope, Report, ReportGenerator, ReportInputs,
    ReportType,
};
use crate::session::{Session, SessionMetadata, SessionRegistry, SessionUpdate};

/// Items handed to the insight engine as trending
const TRENDING_ITEMS: usize = 5;
/// Pages attached to the top-content insight
const INSIGHT_TOP_PAGES: usize = 5;

/// Featured catalog item with its current engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeaturedItem {
    pub record: ContentRecord,
    pub engagement: EngagementSnapshot,
}

/// Combined view for an admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Dashboard {
    pub metrics: MetricsSnapshot,
    pub engagement: EngagementStats,
    pub top_items: Vec<RankedItem>,
    /// Empty when no catalog is attached
    pub featured: Vec<FeaturedItem>,
    pub insights: InsightView,
}

/// Explicit context holding every engine component
pub struct AnalyticsEngine {
    config: EngineConfig,
    sessions: SessionRegistry,
    interactions: InteractionLedger,
    metrics: MetricsAggregator,
    insights: InsightEngine,
    reports: ReportGenerator,
    catalog: Option<Arc<dyn ContentCatalog>>,
}

/// Live analysis input read from the engine's own components
struct LiveSource<'a> {
    metrics: &'a MetricsAggregator,
    interactions: &'a InteractionLedger,
}

impl AnalysisSource for LiveSource<'_> {
    fn analysis_input(&self, now: DateTime<Utc>) -> EngineResult<AnalysisInput> {
        let metrics = self.metrics;
        let last_7_days = metrics
            .daily_series(7, now.date_naive())?
            .into_iter()
            .map(|d| d.count)
            .collect();
        let top_interaction = metrics
            .top_interaction_types(1)?
            .into_iter()
            .next()
            .map(|c| (c.kind, c.count));

        Ok(AnalysisInput {
            last_7_days,
            engagement_rate: metrics.engagement_rate()?,
            top_interaction,
            average_response_ms: metrics.average_response_time()?,
            error_rate: metrics.error_rate()?,
            top_pages: metrics.top_pages(INSIGHT_TOP_PAGES)?,
            underperforming_pages: metrics.underperforming_pages()?,
            trending_items: self.interactions.top_items(TRENDING_ITEMS)?,
        })
    }
}

impl AnalyticsEngine {
    /// Builds an engine from a validated configuration
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        tracing::info!(
            session_ttl_hours = config.session_ttl_hours,
            insight_interval_minutes = config.insight_interval_minutes,
            "Analytics engine initialized"
        );
        Ok(Self {
            metrics: MetricsAggregator::new(
                config.response_sample_capacity,
                config.bounce_threshold_ms,
            ),
            insights: InsightEngine::new(config.insight_interval(), config.max_alerts),
            sessions: SessionRegistry::new(),
            interactions: InteractionLedger::new(),
            reports: ReportGenerator::new(),
            catalog: None,
            config,
        })
    }

    /// Attaches the content catalog used to gate item lookups
    pub fn with_catalog(mut self, catalog: Arc<dyn ContentCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn interactions(&self) -> &InteractionLedger {
        &self.interactions
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    fn live_source(&self) -> LiveSource<'_> {
        LiveSource {
            metrics: &self.metrics,
            interactions: &self.interactions,
        }
    }

    // ===== Sessions =====

    pub fn create_session(&self, metadata: SessionMetadata) -> EngineResult<Session> {
        self.sessions.create_session(metadata)
    }

    pub fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> EngineResult<Option<Session>> {
        self.sessions.update_session(session_id, update)
    }

    /// Removes sessions older than the configured TTL
    pub fn sweep_expired_sessions(&self) -> EngineResult<usize> {
        self.sweep_expired_sessions_at(Utc::now())
    }

    pub fn sweep_expired_sessions_at(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        self.sessions.sweep_expired_at(now, self.config.session_ttl())
    }

    // ===== Traffic =====

    /// Counts a visit by a known session
    ///
    /// # Returns
    /// `false` if the session is unknown
    pub fn track_visitor(&self, session_id: &str) -> EngineResult<bool> {
        self.track_visitor_at(session_id, Utc::now())
    }

    pub fn track_visitor_at(&self, session_id: &str, now: DateTime<Utc>) -> EngineResult<bool> {
        match self.sessions.get(session_id)? {
            Some(session) => {
                self.metrics.track_visitor_at(&session, now)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Counts a page view, attributing it to a session when one is given
    pub fn track_page_view(
        &self,
        page: &str,
        session_id: Option<&str>,
        time_spent_ms: Option<u64>,
    ) -> EngineResult<()> {
        self.metrics.track_page_view(page, time_spent_ms)?;
        if let Some(session_id) = session_id {
            self.sessions.record_page(session_id, page)?;
            if let Some(ms) = time_spent_ms {
                self.sessions.add_time_on_site(session_id, ms)?;
            }
        }
        Ok(())
    }

    pub fn track_performance(
        &self,
        endpoint: &str,
        response_time_ms: f64,
        success: bool,
    ) -> EngineResult<()> {
        self.metrics
            .track_performance(endpoint, response_time_ms, success)
    }

    /// Counts a custom engagement event such as `contact`
    pub fn track_event(&self, kind: &str, session_id: Option<&str>) -> EngineResult<()> {
        if let Some(session_id) = session_id {
            self.sessions.touch(session_id)?;
        }
        self.metrics.track_engagement(kind)
    }

    // ===== Interactions =====

    fn record_interaction(&self, kind: InteractionKind, session_id: &str) -> EngineResult<()> {
        self.sessions.touch(session_id)?;
        self.metrics.track_engagement(kind.as_str())
    }

    pub fn toggle_like(&self, item_id: &str, session_id: &str) -> EngineResult<ToggleOutcome> {
        let outcome = self.interactions.toggle_like(item_id, session_id)?;
        self.record_interaction(InteractionKind::Like, session_id)?;
        Ok(outcome)
    }

    pub fn toggle_favorite(&self, item_id: &str, session_id: &str) -> EngineResult<ToggleOutcome> {
        let outcome = self.interactions.toggle_favorite(item_id, session_id)?;
        self.record_interaction(InteractionKind::Favorite, session_id)?;
        Ok(outcome)
    }

    pub fn track_view(
        &self,
        item_id: &str,
        session_id: &str,
        duration_ms: u64,
    ) -> EngineResult<ViewOutcome> {
        let outcome = self.interactions.track_view(item_id, session_id, duration_ms)?;
        self.record_interaction(InteractionKind::View, session_id)?;
        Ok(outcome)
    }

    pub fn add_comment(
        &self,
        item_id: &str,
        session_id: &str,
        comment: NewComment,
    ) -> EngineResult<Comment> {
        let comment = self.interactions.add_comment(item_id, session_id, comment)?;
        self.record_interaction(InteractionKind::Comment, session_id)?;
        Ok(comment)
    }

    pub fn add_rating(
        &self,
        item_id: &str,
        session_id: &str,
        value: u8,
        review: Option<String>,
    ) -> EngineResult<RatingSummary> {
        let summary = self
            .interactions
            .add_rating(item_id, session_id, value, review)?;
        self.record_interaction(InteractionKind::Rating, session_id)?;
        Ok(summary)
    }

    pub fn track_share(
        &self,
        item_id: &str,
        session_id: &str,
        platform: Option<&str>,
    ) -> EngineResult<ShareOutcome> {
        let outcome = self.interactions.track_share(item_id, session_id, platform)?;
        self.record_interaction(InteractionKind::Share, session_id)?;
        Ok(outcome)
    }

    /// Engagement snapshot of one item
    ///
    /// # Returns
    /// `None` when a catalog is attached and does not know the item
    pub fn item_engagement(&self, item_id: &str) -> EngineResult<Option<EngagementSnapshot>> {
        if let Some(catalog) = &self.catalog {
            if !catalog.contains(item_id) {
                return Ok(None);
            }
        }
        Ok(Some(self.interactions.get_engagement(item_id)?))
    }

    pub fn top_items(&self, limit: usize) -> EngineResult<Vec<RankedItem>> {
        self.interactions.top_items(limit)
    }

    /// Global engagement totals
    pub fn engagement_stats(&self) -> EngineResult<EngagementStats> {
        Ok(EngagementStats {
            total_interactions: self.interactions.total_interactions(),
            unique_visitors: self.sessions.unique_visitors(),
            active_sessions: self.sessions.len()?,
            average_time_on_site_ms: self.sessions.average_time_on_site()?,
            interaction_types: self.interactions.totals()?,
            most_popular: self.interactions.top_items(self.config.top_items_limit)?,
            last_updated: Utc::now(),
        })
    }

    // ===== Insights =====

    /// Current insights, recomputed first if the last analysis is stale
    pub fn insights(&self) -> EngineResult<InsightView> {
        self.insights_at(Utc::now())
    }

    pub fn insights_at(&self, now: DateTime<Utc>) -> EngineResult<InsightView> {
        self.insights.insights_at(now, &self.live_source())
    }

    /// Recomputes insights regardless of freshness
    pub fn refresh_insights(&self) -> EngineResult<InsightView> {
        self.insights.refresh_at(Utc::now(), &self.live_source())
    }

    pub fn clear_alerts(&self) -> EngineResult<usize> {
        self.insights.clear_alerts()
    }

    // ===== Reports =====

    pub fn generate_report(&self, report_type: ReportType) -> EngineResult<Arc<Report>> {
        self.generate_report_at(report_type, Utc::now())
    }

    pub fn generate_report_at(
        &self,
        report_type: ReportType,
        now: DateTime<Utc>,
    ) -> EngineResult<Arc<Report>> {
        let insights = self.insights.current()?;
        let inputs = ReportInputs {
            metrics: &self.metrics,
            insights: &insights,
        };
        self.reports.generate_at(report_type, &inputs, now)
    }

    pub fn get_report(&self, id: &str) -> EngineResult<Option<Arc<Report>>> {
        self.reports.get_report(id)
    }

    /// Stored reports, newest first
    pub fn reports(&self, report_type: Option<ReportType>) -> EngineResult<Vec<Arc<Report>>> {
        self.reports.get_reports(report_type)
    }

    // ===== Views =====

    pub fn metrics_snapshot(&self) -> EngineResult<MetricsSnapshot> {
        self.metrics.snapshot()
    }

    /// Serialised export of the requested scope
    pub fn export(&self, scope: ExportScope, format: ExportFormat) -> EngineResult<String> {
        let now = Utc::now();
        let snapshot = self.metrics.snapshot_at(now)?;
        let insights = self.insights.current()?;
        let stored = self.reports.get_reports(None)?;
        let reports: Vec<&Report> = stored.iter().map(|r| r.as_ref()).collect();

        export(
            scope,
            format,
            &ExportData {
                metrics: &snapshot,
                insights: &insights,
                reports: &reports,
            },
            now,
        )
    }

    /// Metrics, engagement, ranking, featured items and insights in one view
    pub fn dashboard(&self) -> EngineResult<Dashboard> {
        let featured = match &self.catalog {
            Some(catalog) => catalog
                .featured()
                .into_iter()
                .map(|record| -> EngineResult<FeaturedItem> {
                    let engagement = self.interactions.get_engagement(&record.id)?;
                    Ok(FeaturedItem { record, engagement })
                })
                .collect::<EngineResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Dashboard {
            metrics: self.metrics.snapshot()?,
            engagement: self.engagement_stats()?,
            top_items: self.top_items(self.config.top_items_limit)?,
            featured,
            insights: self.insights()?,
        })
    }
}

#[cfg(test)]
mod tests;

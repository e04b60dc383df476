//! Metrics aggregator
//!
//! Time-bucketed visitor counts, page-view tallies, a bounded response-time
//! buffer and demographic counters, all behind one mutex.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::config::{DEFAULT_BOUNCE_THRESHOLD_MS, DEFAULT_RESPONSE_SAMPLE_CAPACITY};
use crate::error::{EngineError, EngineResult};
use crate::session::{Session, DIRECT_REFERRER, UNKNOWN};

use super::types::{
    nearest_rank_percentile, ConversionFunnel, DailyCount, Demographics, EndpointLatency,
    EngagementSummary, InteractionCount, MetricsSnapshot, PageViewSummary, PageViews,
    PerformanceSample, PerformanceSummary, VisitorSummary, REPORTED_UPTIME,
    UNDERPERFORMING_RATIO,
};
use super::user_agent::{browser_family, DeviceClass};

/// ISO week bucket key, e.g. `2024-W07`
pub fn week_key(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Calendar month bucket key, e.g. `2024-02`
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

fn bump(map: &mut HashMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

/// False for empty values and the placeholders sessions fill in
fn supplied(value: &str, placeholder: &str) -> bool {
    !value.is_empty() && value != placeholder
}

fn bump_sorted(map: &mut BTreeMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

#[derive(Debug, Default)]
struct MetricsState {
    daily_visitors: BTreeMap<NaiveDate, u64>,
    weekly_visitors: BTreeMap<String, u64>,
    monthly_visitors: BTreeMap<String, u64>,
    /// Seen exactly once so far
    new_visitors: HashSet<String>,
    /// Seen more than once; never moves back to `new_visitors`
    returning_visitors: HashSet<String>,

    page_views_total: u64,
    page_views: HashMap<String, u64>,
    time_spent_ms: HashMap<String, u64>,
    bounces: HashMap<String, u64>,
    daily_page_views: BTreeMap<NaiveDate, u64>,

    total_interactions: u64,
    interaction_types: HashMap<String, u64>,
    daily_interactions: BTreeMap<NaiveDate, u64>,
    funnel: ConversionFunnel,

    samples: VecDeque<PerformanceSample>,
    api_calls: HashMap<String, u64>,
    errors: u64,

    demographics: Demographics,
}

impl MetricsState {
    fn total_api_calls(&self) -> u64 {
        self.api_calls.values().sum()
    }

    fn average_response_time(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self.samples.iter().map(|s| s.response_time_ms).sum();
        total / self.samples.len() as f64
    }

    fn percentile(&self, percentile: f64) -> f64 {
        let times: Vec<f64> = self.samples.iter().map(|s| s.response_time_ms).collect();
        nearest_rank_percentile(&times, percentile)
    }

    fn error_rate(&self) -> f64 {
        let calls = self.total_api_calls();
        if calls == 0 {
            0.0
        } else {
            self.errors as f64 / calls as f64
        }
    }

    fn visitor_count(&self) -> u64 {
        (self.new_visitors.len() + self.returning_visitors.len()) as u64
    }

    fn engagement_rate(&self) -> f64 {
        let visitors = self.visitor_count();
        if visitors == 0 {
            0.0
        } else {
            self.total_interactions as f64 / visitors as f64
        }
    }

    fn average_time_spent(&self) -> f64 {
        if self.page_views_total == 0 {
            return 0.0;
        }
        let total: u64 = self.time_spent_ms.values().sum();
        total as f64 / self.page_views_total as f64
    }

    fn top_pages(&self, limit: usize) -> Vec<PageViews> {
        let mut pages: Vec<PageViews> = self
            .page_views
            .iter()
            .map(|(page, views)| PageViews {
                page: page.clone(),
                views: *views,
            })
            .collect();
        pages.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.page.cmp(&b.page)));
        pages.truncate(limit);
        pages
    }

    fn underperforming_pages(&self) -> Vec<PageViews> {
        if self.page_views.is_empty() {
            return Vec::new();
        }
        let mean = self.page_views_total as f64 / self.page_views.len() as f64;
        let threshold = mean * UNDERPERFORMING_RATIO;
        let mut pages: Vec<PageViews> = self
            .page_views
            .iter()
            .filter(|(_, views)| (**views as f64) < threshold)
            .map(|(page, views)| PageViews {
                page: page.clone(),
                views: *views,
            })
            .collect();
        pages.sort_by(|a, b| a.views.cmp(&b.views).then_with(|| a.page.cmp(&b.page)));
        pages
    }

    fn slowest_endpoints(&self, limit: usize) -> Vec<EndpointLatency> {
        let mut per_endpoint: HashMap<&str, (f64, usize)> = HashMap::new();
        for sample in &self.samples {
            let entry = per_endpoint.entry(sample.endpoint.as_str()).or_insert((0.0, 0));
            entry.0 += sample.response_time_ms;
            entry.1 += 1;
        }

        let mut endpoints: Vec<EndpointLatency> = per_endpoint
            .into_iter()
            .map(|(endpoint, (total, count))| EndpointLatency {
                endpoint: endpoint.to_string(),
                avg_time_ms: total / count as f64,
                samples: count,
            })
            .collect();
        endpoints.sort_by(|a, b| {
            b.avg_time_ms
                .total_cmp(&a.avg_time_ms)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        endpoints.truncate(limit);
        endpoints
    }

    fn interaction_counts(&self) -> Vec<InteractionCount> {
        let mut counts: Vec<InteractionCount> = self
            .interaction_types
            .iter()
            .map(|(kind, count)| InteractionCount {
                kind: kind.clone(),
                count: *count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));
        counts
    }

    fn daily_series(&self, days: u32, today: NaiveDate) -> Vec<DailyCount> {
        (0..days)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(i64::from(offset));
                DailyCount {
                    date,
                    count: self.daily_visitors.get(&date).copied().unwrap_or(0),
                }
            })
            .collect()
    }

    fn snapshot(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        let to_sorted = |map: &HashMap<String, u64>| -> BTreeMap<String, u64> {
            map.iter().map(|(k, v)| (k.clone(), *v)).collect()
        };

        MetricsSnapshot {
            visitors: VisitorSummary {
                total: self.visitor_count(),
                new_visitors: self.new_visitors.len() as u64,
                returning_visitors: self.returning_visitors.len() as u64,
                daily: self
                    .daily_visitors
                    .iter()
                    .map(|(d, c)| (d.format("%Y-%m-%d").to_string(), *c))
                    .collect(),
                weekly: self.weekly_visitors.clone(),
                monthly: self.monthly_visitors.clone(),
            },
            page_views: PageViewSummary {
                total: self.page_views_total,
                pages: to_sorted(&self.page_views),
                bounces: to_sorted(&self.bounces),
                average_time_spent_ms: self.average_time_spent(),
            },
            engagement: EngagementSummary {
                total: self.total_interactions,
                rate: self.engagement_rate(),
                types: to_sorted(&self.interaction_types),
                funnel: self.funnel,
            },
            performance: PerformanceSummary {
                average_response_time_ms: self.average_response_time(),
                p95_response_time_ms: self.percentile(95.0),
                error_rate: self.error_rate(),
                errors: self.errors,
                api_calls: self.total_api_calls(),
                uptime: REPORTED_UPTIME,
            },
            demographics: self.demographics.clone(),
            generated_at: now,
        }
    }
}

/// Traffic, performance and demographic counters
#[derive(Debug)]
pub struct MetricsAggregator {
    state: Mutex<MetricsState>,
    /// Response-time samples kept
    capacity: usize,
    /// Explicit page time below this is a bounce
    bounce_threshold_ms: u64,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_SAMPLE_CAPACITY, DEFAULT_BOUNCE_THRESHOLD_MS)
    }
}

impl MetricsAggregator {
    pub fn new(capacity: usize, bounce_threshold_ms: u64) -> Self {
        Self {
            state: Mutex::new(MetricsState::default()),
            capacity: capacity.max(1),
            bounce_threshold_ms,
        }
    }

    fn state(&self) -> EngineResult<MutexGuard<'_, MetricsState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::LockPoisoned("metrics aggregator"))
    }

    // ===== Recording =====

    /// Counts a visit and classifies the session as new or returning
    pub fn track_visitor(&self, session: &Session) -> EngineResult<()> {
        self.track_visitor_at(session, Utc::now())
    }

    pub fn track_visitor_at(&self, session: &Session, now: DateTime<Utc>) -> EngineResult<()> {
        let today = now.date_naive();
        let mut state = self.state()?;

        *state.daily_visitors.entry(today).or_insert(0) += 1;
        bump_sorted(&mut state.weekly_visitors, &week_key(today));
        bump_sorted(&mut state.monthly_visitors, &month_key(today));

        if !state.returning_visitors.contains(&session.id) {
            if state.new_visitors.remove(&session.id) {
                state.returning_visitors.insert(session.id.clone());
            } else {
                state.new_visitors.insert(session.id.clone());
            }
        }

        let demographics = &mut state.demographics;
        if supplied(&session.country, UNKNOWN) {
            bump_sorted(&mut demographics.countries, &session.country);
        }
        if supplied(&session.referrer, DIRECT_REFERRER) {
            bump_sorted(&mut demographics.referrers, &session.referrer);
        }
        if supplied(&session.user_agent, UNKNOWN) {
            bump_sorted(
                &mut demographics.devices,
                DeviceClass::from_user_agent(&session.user_agent).as_str(),
            );
            bump_sorted(&mut demographics.browsers, browser_family(&session.user_agent));
        }
        Ok(())
    }

    /// Counts a page view
    ///
    /// `time_spent_ms` is `None` when the client never reported a duration;
    /// such views are not counted as bounces.
    pub fn track_page_view(&self, page: &str, time_spent_ms: Option<u64>) -> EngineResult<()> {
        self.track_page_view_at(page, time_spent_ms, Utc::now())
    }

    pub fn track_page_view_at(
        &self,
        page: &str,
        time_spent_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut state = self.state()?;
        state.page_views_total += 1;
        bump(&mut state.page_views, page);
        *state.daily_page_views.entry(now.date_naive()).or_insert(0) += 1;

        if let Some(ms) = time_spent_ms {
            if ms > 0 {
                *state.time_spent_ms.entry(page.to_string()).or_insert(0) += ms;
            }
            if ms < self.bounce_threshold_ms {
                bump(&mut state.bounces, page);
            }
        }
        Ok(())
    }

    /// Counts an interaction of any type (built-in or custom event)
    pub fn track_engagement(&self, kind: &str) -> EngineResult<()> {
        self.track_engagement_at(kind, Utc::now())
    }

    pub fn track_engagement_at(&self, kind: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let mut state = self.state()?;
        state.total_interactions += 1;
        bump(&mut state.interaction_types, kind);
        *state.daily_interactions.entry(now.date_naive()).or_insert(0) += 1;
        state.funnel.record(kind);
        Ok(())
    }

    /// Records a response-time sample, evicting the oldest beyond capacity
    pub fn track_performance(
        &self,
        endpoint: &str,
        response_time_ms: f64,
        success: bool,
    ) -> EngineResult<()> {
        self.track_performance_at(endpoint, response_time_ms, success, Utc::now())
    }

    pub fn track_performance_at(
        &self,
        endpoint: &str,
        response_time_ms: f64,
        success: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut state = self.state()?;
        state.samples.push_back(PerformanceSample {
            endpoint: endpoint.to_string(),
            response_time_ms,
            success,
            timestamp: now,
        });
        while state.samples.len() > self.capacity {
            state.samples.pop_front();
        }
        bump(&mut state.api_calls, endpoint);
        if !success {
            state.errors += 1;
        }
        Ok(())
    }

    // ===== Queries =====

    pub fn average_response_time(&self) -> EngineResult<f64> {
        Ok(self.state()?.average_response_time())
    }

    /// Nearest-rank percentile of retained response times
    pub fn percentile(&self, percentile: f64) -> EngineResult<f64> {
        Ok(self.state()?.percentile(percentile))
    }

    /// Endpoints with the highest mean latency
    pub fn slowest_endpoints(&self, limit: usize) -> EngineResult<Vec<EndpointLatency>> {
        Ok(self.state()?.slowest_endpoints(limit))
    }

    pub fn top_pages(&self, limit: usize) -> EngineResult<Vec<PageViews>> {
        Ok(self.state()?.top_pages(limit))
    }

    /// Pages with views below 30% of the mean views-per-page
    pub fn underperforming_pages(&self) -> EngineResult<Vec<PageViews>> {
        Ok(self.state()?.underperforming_pages())
    }

    /// Failed calls over total API calls
    pub fn error_rate(&self) -> EngineResult<f64> {
        Ok(self.state()?.error_rate())
    }

    /// Tracked interactions per distinct visitor
    pub fn engagement_rate(&self) -> EngineResult<f64> {
        Ok(self.state()?.engagement_rate())
    }

    /// Interaction types, most frequent first
    pub fn top_interaction_types(&self, limit: usize) -> EngineResult<Vec<InteractionCount>> {
        let mut counts = self.state()?.interaction_counts();
        counts.truncate(limit);
        Ok(counts)
    }

    pub fn total_interactions(&self) -> EngineResult<u64> {
        Ok(self.state()?.total_interactions)
    }

    pub fn funnel(&self) -> EngineResult<ConversionFunnel> {
        Ok(self.state()?.funnel)
    }

    /// Last `days` daily visitor buckets ending at `today`, oldest first
    pub fn daily_series(&self, days: u32, today: NaiveDate) -> EngineResult<Vec<DailyCount>> {
        Ok(self.state()?.daily_series(days, today))
    }

    pub fn visitors_on(&self, date: NaiveDate) -> EngineResult<u64> {
        Ok(self.state()?.daily_visitors.get(&date).copied().unwrap_or(0))
    }

    pub fn page_views_on(&self, date: NaiveDate) -> EngineResult<u64> {
        Ok(self.state()?.daily_page_views.get(&date).copied().unwrap_or(0))
    }

    pub fn interactions_on(&self, date: NaiveDate) -> EngineResult<u64> {
        Ok(self.state()?.daily_interactions.get(&date).copied().unwrap_or(0))
    }

    /// (new, returning) distinct visitor counts
    pub fn visitor_counts(&self) -> EngineResult<(u64, u64)> {
        let state = self.state()?;
        Ok((
            state.new_visitors.len() as u64,
            state.returning_visitors.len() as u64,
        ))
    }

    pub fn is_returning(&self, session_id: &str) -> EngineResult<bool> {
        Ok(self.state()?.returning_visitors.contains(session_id))
    }

    pub fn page_views(&self, page: &str) -> EngineResult<u64> {
        Ok(self.state()?.page_views.get(page).copied().unwrap_or(0))
    }

    pub fn bounces(&self, page: &str) -> EngineResult<u64> {
        Ok(self.state()?.bounces.get(page).copied().unwrap_or(0))
    }

    /// Bounces over views for a page
    pub fn bounce_rate(&self, page: &str) -> EngineResult<f64> {
        let state = self.state()?;
        let views = state.page_views.get(page).copied().unwrap_or(0);
        if views == 0 {
            return Ok(0.0);
        }
        let bounces = state.bounces.get(page).copied().unwrap_or(0);
        Ok(bounces as f64 / views as f64)
    }

    /// Cumulative page time over total page views (milliseconds)
    pub fn average_time_spent(&self) -> EngineResult<f64> {
        Ok(self.state()?.average_time_spent())
    }

    /// Retained samples, oldest first
    pub fn samples(&self) -> EngineResult<Vec<PerformanceSample>> {
        Ok(self.state()?.samples.iter().cloned().collect())
    }

    /// Calls per endpoint, sorted by endpoint
    pub fn api_calls(&self) -> EngineResult<BTreeMap<String, u64>> {
        Ok(self
            .state()?
            .api_calls
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }

    pub fn error_count(&self) -> EngineResult<u64> {
        Ok(self.state()?.errors)
    }

    pub fn demographics(&self) -> EngineResult<Demographics> {
        Ok(self.state()?.demographics.clone())
    }

    /// Full metrics view taken under a single lock
    pub fn snapshot(&self) -> EngineResult<MetricsSnapshot> {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> EngineResult<MetricsSnapshot> {
        Ok(self.state()?.snapshot(now))
    }
}

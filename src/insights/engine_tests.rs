//! Unit tests for the insight engine

use super::*;
use crate::interactions::RankedItem;
use crate::metrics::PageViews;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ===== Helper Functions =====

/// Source returning a swappable input and counting calls
struct FakeSource {
    input: Mutex<AnalysisInput>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn new(input: AnalysisInput) -> Self {
        Self {
            input: Mutex::new(input),
            calls: AtomicUsize::new(0),
        }
    }

    fn set(&self, input: AnalysisInput) {
        *self.input.lock().unwrap() = input;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnalysisSource for FakeSource {
    fn analysis_input(&self, _now: DateTime<Utc>) -> crate::error::EngineResult<AnalysisInput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.input.lock().unwrap().clone())
    }
}

/// Source numbering its calls and recording how many overlap
#[derive(Default)]
struct SequencedSource {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl AnalysisSource for SequencedSource {
    fn analysis_input(&self, _now: DateTime<Utc>) -> crate::error::EngineResult<AnalysisInput> {
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(active, Ordering::SeqCst);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        std::thread::sleep(std::time::Duration::from_millis(2));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(AnalysisInput {
            last_7_days: vec![call; 7],
            ..Default::default()
        })
    }
}

fn page(name: &str, views: u64) -> PageViews {
    PageViews {
        page: name.to_string(),
        views,
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn busy_input() -> AnalysisInput {
    AnalysisInput {
        last_7_days: vec![10, 10, 10, 20, 20, 20, 20],
        engagement_rate: 0.5,
        top_interaction: Some(("view".to_string(), 42)),
        average_response_ms: 1500.0,
        error_rate: 0.1,
        top_pages: vec![page("projects", 50), page("about", 20)],
        underperforming_pages: vec![page("skills", 1)],
        trending_items: vec![RankedItem {
            item_id: "p1".to_string(),
            views: 10,
            likes: 2,
            shares: 1,
            score: 21.0,
        }],
    }
}

// ===== Rules =====

#[test]
fn test_analyze_busy_site() {
    let analysis = analyze(&busy_input(), base_time());

    let kinds: Vec<InsightKind> = analysis.automated.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InsightKind::TrafficSurge,
            InsightKind::HighEngagement,
            InsightKind::PopularInteraction,
            InsightKind::TopContent,
        ]
    );
    assert_eq!(analysis.automated[0].impact, Impact::High);
    assert_eq!(analysis.automated[2].title, "view is the most popular interaction");

    let top = &analysis.automated[3];
    assert_eq!(top.pages.len(), 2);
    assert_eq!(top.description, "projects leads with 50 views");

    let alert_kinds: Vec<AlertKind> = analysis.alerts.iter().map(|a| a.kind).collect();
    assert_eq!(
        alert_kinds,
        vec![AlertKind::PerformanceWarning, AlertKind::ErrorRateHigh]
    );
    assert_eq!(analysis.alerts[1].severity, Severity::Critical);

    let rec_kinds: Vec<RecommendationKind> =
        analysis.recommendations.iter().map(|r| r.kind).collect();
    assert_eq!(
        rec_kinds,
        vec![
            RecommendationKind::OptimizePerformance,
            RecommendationKind::ImproveContent,
        ]
    );
    assert_eq!(analysis.recommendations[1].pages, vec![page("skills", 1)]);

    // mean(10,10,10,20,20,20,20) = 110/7, x7 = 110
    assert_eq!(analysis.predictions.next_week_visitors, 110);
    assert_eq!(analysis.predictions.trending_items.len(), 1);
}

#[test]
fn test_analyze_declining_site() {
    let input = AnalysisInput {
        last_7_days: vec![20, 20, 20, 10, 10, 10, 10],
        engagement_rate: 0.01,
        ..Default::default()
    };
    let analysis = analyze(&input, base_time());

    assert_eq!(analysis.automated.len(), 1);
    assert_eq!(analysis.automated[0].kind, InsightKind::TrafficDecline);
    assert_eq!(analysis.automated[0].impact, Impact::Medium);
    assert_eq!(
        analysis.automated[0].description,
        "Traffic fell 50.0% over the last 7 days"
    );

    let rec_kinds: Vec<RecommendationKind> =
        analysis.recommendations.iter().map(|r| r.kind).collect();
    assert_eq!(
        rec_kinds,
        vec![
            RecommendationKind::ContentStrategy,
            RecommendationKind::ImproveEngagement,
        ]
    );
    assert!(analysis.alerts.is_empty());
}

#[test]
fn test_analyze_quiet_thresholds() {
    // Exactly at the thresholds nothing fires
    let input = AnalysisInput {
        last_7_days: vec![10, 10, 10, 12, 12, 12, 12],
        engagement_rate: 0.1,
        average_response_ms: 1000.0,
        error_rate: 0.05,
        ..Default::default()
    };
    let analysis = analyze(&input, base_time());
    assert!(analysis.automated.is_empty());
    assert!(analysis.recommendations.is_empty());
    assert!(analysis.alerts.is_empty());
}

#[test]
fn test_predict_next_week() {
    assert_eq!(predict_next_week(&[]), 0);
    assert_eq!(predict_next_week(&[0; 7]), 0);
    assert_eq!(predict_next_week(&[1, 2, 3, 4, 5, 6, 7]), 28);
    // mean 1/7, x7 = 1
    assert_eq!(predict_next_week(&[0, 0, 0, 0, 0, 0, 1]), 1);
}

// ===== Staleness =====

#[test]
fn test_first_read_computes() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());
    assert!(engine.is_stale_at(base_time()).unwrap());

    let view = engine.insights_at(base_time(), &source).unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(view.last_updated, Some(base_time()));
    assert!(!view.automated.is_empty());
}

#[test]
fn test_staleness_follows_interval() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());
    engine.insights_at(base_time(), &source).unwrap();

    assert!(!engine.is_stale_at(base_time()).unwrap());
    assert!(!engine
        .is_stale_at(base_time() + Duration::minutes(59))
        .unwrap());
    assert!(engine.is_stale_at(base_time() + Duration::hours(1)).unwrap());
}

#[test]
fn test_fresh_reads_are_cached() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());

    let first = engine.insights_at(base_time(), &source).unwrap();
    source.set(AnalysisInput::default());
    let second = engine
        .insights_at(base_time() + Duration::minutes(59), &source)
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(first.automated, second.automated);
    assert_eq!(first.recommendations, second.recommendations);
}

#[test]
fn test_stale_read_recomputes() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());

    engine.insights_at(base_time(), &source).unwrap();
    source.set(AnalysisInput::default());
    let later = base_time() + Duration::hours(1);
    let view = engine.insights_at(later, &source).unwrap();

    assert_eq!(source.calls(), 2);
    assert_eq!(view.last_updated, Some(later));
    // Zero engagement only yields a recommendation
    assert!(view.automated.is_empty());
    assert_eq!(view.recommendations.len(), 1);
}

#[test]
fn test_alerts_accumulate_and_clear() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());

    engine.insights_at(base_time(), &source).unwrap();
    let view = engine
        .insights_at(base_time() + Duration::hours(2), &source)
        .unwrap();
    assert_eq!(view.alerts.len(), 4);

    assert_eq!(engine.clear_alerts().unwrap(), 4);
    assert!(engine.current().unwrap().alerts.is_empty());
    assert_eq!(engine.clear_alerts().unwrap(), 0);
}

#[test]
fn test_alert_retention_limit() {
    let engine = InsightEngine::new(Duration::minutes(60), Some(3));
    let source = FakeSource::new(busy_input());

    for hour in 0..3 {
        engine
            .insights_at(base_time() + Duration::hours(hour), &source)
            .unwrap();
    }

    let alerts = engine.current().unwrap().alerts;
    assert_eq!(alerts.len(), 3);
    // Oldest dropped first
    assert_eq!(alerts[2].generated_at, base_time() + Duration::hours(2));
    assert_eq!(alerts[0].generated_at, base_time() + Duration::hours(1));
}

#[test]
fn test_refresh_ignores_watermark() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());

    engine.insights_at(base_time(), &source).unwrap();
    engine.refresh_at(base_time(), &source).unwrap();
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_concurrent_stale_reads_compute_once() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| engine.insights_at(base_time(), &source).unwrap());
        }
    });

    assert_eq!(source.calls(), 1);
    assert_eq!(engine.current().unwrap().alerts.len(), 2);
}

#[test]
fn test_concurrent_refreshes_are_serialized() {
    let engine = InsightEngine::default();
    let source = SequencedSource::default();

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| engine.refresh_at(base_time(), &source).unwrap());
        }
    });

    assert_eq!(source.calls.load(Ordering::SeqCst), 8);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    // The last input gathered is the one left in the cache
    let view = engine.current().unwrap();
    assert_eq!(view.predictions.next_week_visitors, 8 * 7);
}

#[test]
fn test_insight_view_serialization() {
    let engine = InsightEngine::default();
    let source = FakeSource::new(busy_input());
    let view = engine.insights_at(base_time(), &source).unwrap();

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["automated"][0]["kind"], "traffic_surge");
    assert_eq!(json["alerts"][0]["severity"], "warning");
    assert_eq!(json["recommendations"][0]["priority"], "high");
    // Empty page lists are omitted
    assert!(json["automated"][0].get("pages").is_none());
}

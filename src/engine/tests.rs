use super::*;
use crate::catalog::StaticCatalog;
use crate::error::EngineError;
use crate::insights::{InsightKind, RecommendationKind};
use crate::interactions::CommentStatus;
use chrono::{Duration, TimeZone};

fn engine() -> AnalyticsEngine {
    AnalyticsEngine::new(EngineConfig::default()).unwrap()
}

fn visitor(engine: &AnalyticsEngine) -> String {
    engine
        .create_session(SessionMetadata {
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0".to_string()),
            country: Some("ES".to_string()),
            ..Default::default()
        })
        .unwrap()
        .id
}

// ===== Construction =====

#[test]
fn test_rejects_invalid_config() {
    let config = EngineConfig {
        response_sample_capacity: 0,
        ..Default::default()
    };
    assert!(matches!(
        AnalyticsEngine::new(config),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_rejects_oversized_interval() {
    let config = EngineConfig {
        insight_interval_minutes: i64::MAX / 2,
        ..Default::default()
    };
    assert!(matches!(
        AnalyticsEngine::new(config),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn test_config_flows_into_components() {
    let engine = AnalyticsEngine::new(EngineConfig {
        response_sample_capacity: 3,
        ..Default::default()
    })
    .unwrap();
    for ms in 0..5 {
        engine.track_performance("/api", f64::from(ms), true).unwrap();
    }
    assert_eq!(engine.metrics().samples().unwrap().len(), 3);
}

// ===== Interaction flow =====

#[test]
fn test_interactions_update_session_and_metrics() {
    let engine = engine();
    let session = visitor(&engine);

    engine.toggle_like("p1", &session).unwrap();
    engine.track_view("p1", &session, 5_000).unwrap();
    engine.track_view("p1", &session, 0).unwrap();
    engine.track_share("p1", &session, Some("Twitter")).unwrap();

    let record = engine.sessions().get(&session).unwrap().unwrap();
    assert_eq!(record.interactions, 4);

    let funnel = engine.metrics().funnel().unwrap();
    assert_eq!(funnel.view, 2);
    assert_eq!(funnel.like, 1);
    assert_eq!(engine.metrics().total_interactions().unwrap(), 4);
    assert_eq!(engine.interactions().total_interactions(), 4);
}

#[test]
fn test_rejected_interaction_has_no_side_effects() {
    let engine = engine();
    let session = visitor(&engine);

    let err = engine.add_rating("p1", &session, 6, None).unwrap_err();
    assert!(matches!(err, EngineError::InvalidRating(6)));
    let err = engine
        .add_comment("p1", &session, NewComment::new("   "))
        .unwrap_err();
    assert!(matches!(err, EngineError::EmptyComment));

    assert_eq!(engine.sessions().get(&session).unwrap().unwrap().interactions, 0);
    assert_eq!(engine.metrics().total_interactions().unwrap(), 0);
    assert_eq!(engine.interactions().rating_summary("p1").unwrap().total, 0);
}

#[test]
fn test_invalid_session_reference() {
    let engine = engine();
    let err = engine.toggle_like("p1", "").unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_unknown_session_still_counts_interaction() {
    let engine = engine();
    let outcome = engine.toggle_favorite("p1", "not-registered").unwrap();
    assert!(outcome.active);
    assert_eq!(engine.metrics().funnel().unwrap().favorite, 1);
}

#[test]
fn test_comment_moderation_flow() {
    let engine = engine();
    let session = visitor(&engine);
    let comment = engine
        .add_comment("p1", &session, NewComment::new("Great work"))
        .unwrap();
    assert_eq!(comment.status, CommentStatus::Pending);
    assert_eq!(engine.item_engagement("p1").unwrap().unwrap().comments, 0);

    engine
        .interactions()
        .set_comment_status("p1", &comment.id, CommentStatus::Approved)
        .unwrap()
        .unwrap();
    assert_eq!(engine.item_engagement("p1").unwrap().unwrap().comments, 1);
}

#[test]
fn test_custom_event_feeds_funnel() {
    let engine = engine();
    let session = visitor(&engine);
    engine.track_event("contact", Some(&session)).unwrap();
    engine.track_event("download_cv", None).unwrap();

    assert_eq!(engine.metrics().funnel().unwrap().contact, 1);
    assert_eq!(engine.metrics().total_interactions().unwrap(), 2);
    assert_eq!(engine.sessions().get(&session).unwrap().unwrap().interactions, 1);
}

// ===== Traffic =====

#[test]
fn test_track_visitor_requires_known_session() {
    let engine = engine();
    let session = visitor(&engine);
    assert!(engine.track_visitor(&session).unwrap());
    assert!(!engine.track_visitor("missing").unwrap());
    assert_eq!(engine.metrics().visitor_counts().unwrap(), (1, 0));
}

#[test]
fn test_page_view_attributed_to_session() {
    let engine = engine();
    let session = visitor(&engine);
    engine
        .track_page_view("projects", Some(&session), Some(40_000))
        .unwrap();
    engine.track_page_view("about", None, None).unwrap();

    let record = engine.sessions().get(&session).unwrap().unwrap();
    assert_eq!(record.pages_viewed, vec!["projects".to_string()]);
    assert_eq!(record.time_spent_ms, 40_000);
    assert_eq!(engine.metrics().page_views("projects").unwrap(), 1);
    assert_eq!(engine.metrics().bounces("projects").unwrap(), 0);
}

#[test]
fn test_engagement_rate_from_forwarded_interactions() {
    let engine = engine();
    let a = visitor(&engine);
    let b = visitor(&engine);
    engine.track_visitor(&a).unwrap();
    engine.track_visitor(&b).unwrap();
    engine.toggle_like("p1", &a).unwrap();

    assert_eq!(engine.metrics().engagement_rate().unwrap(), 0.5);
}

#[test]
fn test_sweep_uses_configured_ttl() {
    let engine = AnalyticsEngine::new(EngineConfig {
        session_ttl_hours: 2,
        ..Default::default()
    })
    .unwrap();
    let now = Utc::now();
    engine
        .sessions()
        .create_session_at(SessionMetadata::default(), now - Duration::hours(3))
        .unwrap();
    engine
        .sessions()
        .create_session_at(SessionMetadata::default(), now - Duration::hours(1))
        .unwrap();

    assert_eq!(engine.sweep_expired_sessions_at(now).unwrap(), 1);
    assert_eq!(engine.sessions().len().unwrap(), 1);
    // Sweeps never reduce the unique visitor count
    assert_eq!(engine.engagement_stats().unwrap().unique_visitors, 2);
}

// ===== Catalog =====

#[test]
fn test_catalog_gates_item_lookup() {
    let mut featured = ContentRecord::new("p1", "shop", "Shop");
    featured.featured = true;
    let catalog = StaticCatalog::new(vec![featured, ContentRecord::new("p2", "blog", "Blog")]);
    let engine = engine().with_catalog(Arc::new(catalog));
    let session = visitor(&engine);
    engine.track_view("p1", &session, 1_000).unwrap();

    assert_eq!(engine.item_engagement("p1").unwrap().unwrap().views, 1);
    assert_eq!(engine.item_engagement("p2").unwrap().unwrap().views, 0);
    assert!(engine.item_engagement("ghost").unwrap().is_none());

    let dashboard = engine.dashboard().unwrap();
    assert_eq!(dashboard.featured.len(), 1);
    assert_eq!(dashboard.featured[0].engagement.views, 1);
}

#[test]
fn test_without_catalog_any_item_resolves() {
    let engine = engine();
    let snapshot = engine.item_engagement("anything").unwrap().unwrap();
    assert_eq!(snapshot.popularity_score, 0.0);
    assert!(engine.dashboard().unwrap().featured.is_empty());
}

// ===== Insights and reports =====

#[test]
fn test_insights_from_live_state() {
    let engine = engine();
    let session = visitor(&engine);
    engine.track_visitor(&session).unwrap();
    engine.track_page_view("projects", Some(&session), None).unwrap();
    engine.track_view("p1", &session, 0).unwrap();
    engine.track_view("p1", &session, 0).unwrap();
    engine.track_performance("/api/slow", 2_500.0, true).unwrap();

    let view = engine.insights().unwrap();
    let kinds: Vec<InsightKind> = view.automated.iter().map(|i| i.kind).collect();
    assert!(kinds.contains(&InsightKind::HighEngagement));
    assert!(kinds.contains(&InsightKind::PopularInteraction));
    assert!(kinds.contains(&InsightKind::TopContent));
    assert!(view
        .recommendations
        .iter()
        .any(|r| r.kind == RecommendationKind::OptimizePerformance));
    assert_eq!(view.alerts.len(), 1);
    assert_eq!(view.predictions.trending_items[0].item_id, "p1");
    assert!(view.last_updated.is_some());
}

#[test]
fn test_insights_cached_within_interval() {
    let engine = engine();
    let t0 = Utc.with_ymd_and_hms(2024, 8, 1, 9, 0, 0).unwrap();
    let first = engine.insights_at(t0).unwrap();

    let session = visitor(&engine);
    engine.track_visitor_at(&session, t0).unwrap();
    engine.track_view("p1", &session, 0).unwrap();

    let cached = engine.insights_at(t0 + Duration::minutes(30)).unwrap();
    assert_eq!(first.automated, cached.automated);
    assert_eq!(first.recommendations, cached.recommendations);

    let fresh = engine.insights_at(t0 + Duration::minutes(60)).unwrap();
    assert_ne!(first.automated, fresh.automated);
}

#[test]
fn test_report_survives_later_activity() {
    let engine = engine();
    let session = visitor(&engine);
    engine.track_visitor(&session).unwrap();
    engine.track_page_view("home", None, Some(5_000)).unwrap();

    let report = engine.generate_report(ReportType::Monthly).unwrap();
    let before = serde_json::to_vec(&*engine.get_report(&report.id).unwrap().unwrap()).unwrap();

    engine.toggle_like("p1", &session).unwrap();
    engine.track_page_view("home", None, None).unwrap();
    engine.track_performance("/api", 10.0, false).unwrap();

    let after = serde_json::to_vec(&*engine.get_report(&report.id).unwrap().unwrap()).unwrap();
    assert_eq!(before, after);
    assert_eq!(engine.reports(Some(ReportType::Monthly)).unwrap().len(), 1);
}

#[test]
fn test_export_all_sections() {
    let engine = engine();
    engine.generate_report(ReportType::Performance).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&engine.export(ExportScope::All, ExportFormat::Json).unwrap())
            .unwrap();
    assert_eq!(json["scope"], "all");
    assert_eq!(json["data"]["reports"].as_array().unwrap().len(), 1);

    let csv = engine.export(ExportScope::Metrics, ExportFormat::Csv).unwrap();
    assert!(csv.starts_with("metric,value\n"));
}

// ===== Concurrency =====

#[test]
fn test_concurrent_toggles_and_reads() {
    let engine = engine();
    let sessions: Vec<String> = (0..8).map(|_| visitor(&engine)).collect();

    std::thread::scope(|s| {
        for session in &sessions {
            let engine = &engine;
            s.spawn(move || {
                // Odd number of toggles leaves each session liking the item
                for _ in 0..5 {
                    engine.toggle_like("shared", session).unwrap();
                    engine.track_view("shared", session, 10).unwrap();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..20 {
                engine.item_engagement("shared").unwrap();
                engine.insights().unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..20 {
                engine.sweep_expired_sessions().unwrap();
            }
        });
    });

    let snapshot = engine.item_engagement("shared").unwrap().unwrap();
    assert_eq!(snapshot.likes, 8);
    assert_eq!(snapshot.views, 40);
    for session in &sessions {
        let record = engine.sessions().get(session).unwrap().unwrap();
        assert_eq!(record.interactions, 10);
    }
    assert_eq!(engine.metrics().total_interactions().unwrap(), 80);
}

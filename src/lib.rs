// Folio Engagement Engine
// In-process engagement tracking, traffic metrics, insights and reports

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod insights;
pub mod interactions;
pub mod metrics;
pub mod reports;
pub mod session;

pub use catalog::{ContentCatalog, ContentRecord, StaticCatalog};
pub use config::EngineConfig;
pub use engine::{AnalyticsEngine, Dashboard, FeaturedItem};
pub use error::{EngineError, EngineResult, ErrorResponse};
pub use insights::{InsightEngine, InsightView};
pub use interactions::InteractionLedger;
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use reports::{ExportFormat, ExportScope, Report, ReportGenerator, ReportType};
pub use session::{Session, SessionMetadata, SessionRegistry, SessionUpdate};

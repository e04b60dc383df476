//! Interaction type definitions
//!
//! Records and summaries produced by the interaction ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Popularity weight of a single view
pub const VIEW_WEIGHT: f64 = 1.0;
/// Popularity weight of a like
pub const LIKE_WEIGHT: f64 = 3.0;
/// Popularity weight of a share
pub const SHARE_WEIGHT: f64 = 5.0;
/// Popularity weight applied to `average * count` of ratings
pub const RATING_WEIGHT: f64 = 2.0;

/// Lowest accepted rating
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating
pub const MAX_RATING: u8 = 5;

/// Author recorded when a comment has none
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Kinds of tracked interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Like,
    Favorite,
    Comment,
    Rating,
    Share,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Favorite => "favorite",
            Self::Comment => "comment",
            Self::Rating => "rating",
            Self::Share => "share",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Moderation status of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for CommentStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::UnknownCommentStatus(other.to_string())),
        }
    }
}

/// Comment left on an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Comment {
    /// Comment identifier (UUID v4)
    pub id: String,
    pub item_id: String,
    pub session_id: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub status: CommentStatus,
}

/// Comment submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub content: String,
}

impl NewComment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A session's active rating of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rating {
    pub session_id: String,
    pub value: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated ratings of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal place (0.0 when unrated)
    pub average: f64,
    /// Number of active ratings
    pub total: u32,
    /// Histogram keyed 1..=5; every bucket present
    pub distribution: BTreeMap<u8, u32>,
    /// Ratings carrying a written review
    pub reviews: u32,
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            average: 0.0,
            total: 0,
            distribution: (MIN_RATING..=MAX_RATING).map(|r| (r, 0)).collect(),
            reviews: 0,
        }
    }
}

impl RatingSummary {
    /// Builds a summary from a set of ratings
    pub fn from_ratings<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> Self {
        let mut summary = Self::default();
        let mut sum: u64 = 0;

        for rating in ratings {
            summary.total += 1;
            sum += u64::from(rating.value);
            *summary.distribution.entry(rating.value).or_insert(0) += 1;
            if rating.review.as_deref().is_some_and(|r| !r.trim().is_empty()) {
                summary.reviews += 1;
            }
        }

        if summary.total > 0 {
            let mean = sum as f64 / f64::from(summary.total);
            summary.average = (mean * 10.0).round() / 10.0;
        }
        summary
    }
}

/// Result of a like or favorite toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToggleOutcome {
    pub item_id: String,
    /// State after the toggle (liked / favorited)
    pub active: bool,
    /// Sessions currently in the active state for this item
    pub total: u64,
}

/// Result of a tracked view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ViewOutcome {
    pub item_id: String,
    pub total_views: u64,
    pub duration_ms: u64,
}

/// Result of a tracked share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ShareOutcome {
    pub item_id: String,
    pub total_shares: u64,
    pub platform: String,
}

/// Consolidated engagement of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngagementSnapshot {
    pub item_id: String,
    pub views: u64,
    pub likes: u64,
    pub favorites: u64,
    pub shares: u64,
    /// Approved comments only
    pub comments: u64,
    pub ratings: RatingSummary,
    pub popularity_score: f64,
}

/// Entry in the popularity ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RankedItem {
    pub item_id: String,
    pub views: u64,
    pub likes: u64,
    pub shares: u64,
    pub score: f64,
}

/// Ledger-wide totals per interaction kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InteractionTotals {
    pub views: u64,
    pub likes: u64,
    pub favorites: u64,
    pub comments: u64,
    pub ratings: u64,
    pub shares: u64,
}

/// Global engagement statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngagementStats {
    pub total_interactions: u64,
    pub unique_visitors: u64,
    pub active_sessions: usize,
    pub average_time_on_site_ms: f64,
    pub interaction_types: InteractionTotals,
    pub most_popular: Vec<RankedItem>,
    pub last_updated: DateTime<Utc>,
}

/// Weighted popularity score
///
/// `views*1 + likes*3 + shares*5 + rating_average*rating_count*2`
pub fn popularity_score(
    views: u64,
    likes: u64,
    shares: u64,
    rating_average: f64,
    rating_count: u32,
) -> f64 {
    views as f64 * VIEW_WEIGHT
        + likes as f64 * LIKE_WEIGHT
        + shares as f64 * SHARE_WEIGHT
        + rating_average * f64::from(rating_count) * RATING_WEIGHT
}

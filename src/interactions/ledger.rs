//! Interaction ledger implementation

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::session::validate_session_id;

use super::types::{
    popularity_score, Comment, CommentStatus, EngagementSnapshot, InteractionKind,
    InteractionTotals, NewComment, RankedItem, Rating, RatingSummary, ShareOutcome,
    ToggleOutcome, ViewOutcome, ANONYMOUS_AUTHOR, MAX_RATING, MIN_RATING,
};

/// Platform recorded when a share does not name one
const UNKNOWN_PLATFORM: &str = "unknown";

/// Engagement state of a single item, created on first interaction
#[derive(Debug, Default)]
struct ItemRecord {
    /// Sessions currently liking the item
    likes: HashSet<String>,
    views: u64,
    /// Sessions currently holding the item as a favorite
    favorited_by: HashSet<String>,
    /// Append-only, oldest first
    comments: Vec<Comment>,
    /// At most one active rating per session
    ratings: HashMap<String, Rating>,
    /// Share counts per platform
    shares: HashMap<String, u64>,
}

impl ItemRecord {
    fn total_shares(&self) -> u64 {
        self.shares.values().sum()
    }

    fn rating_summary(&self) -> RatingSummary {
        RatingSummary::from_ratings(self.ratings.values())
    }

    fn approved_comments(&self) -> u64 {
        self.comments
            .iter()
            .filter(|c| c.status == CommentStatus::Approved)
            .count() as u64
    }

    fn snapshot(&self, item_id: &str) -> EngagementSnapshot {
        let ratings = self.rating_summary();
        let likes = self.likes.len() as u64;
        let shares = self.total_shares();
        EngagementSnapshot {
            item_id: item_id.to_string(),
            views: self.views,
            likes,
            favorites: self.favorited_by.len() as u64,
            shares,
            comments: self.approved_comments(),
            popularity_score: popularity_score(
                self.views,
                likes,
                shares,
                ratings.average,
                ratings.total,
            ),
            ratings,
        }
    }
}

type SharedRecord = Arc<Mutex<ItemRecord>>;

/// Per-item interaction state plus the per-session favorites index
#[derive(Debug, Default)]
pub struct InteractionLedger {
    /// item_id -> record
    items: RwLock<HashMap<String, SharedRecord>>,
    /// session_id -> favorited item ids
    favorites: RwLock<HashMap<String, HashSet<String>>>,
    /// Every tracked interaction, of any kind
    total_interactions: AtomicU64,
}

fn lock_record(record: &SharedRecord) -> EngineResult<MutexGuard<'_, ItemRecord>> {
    record
        .lock()
        .map_err(|_| EngineError::LockPoisoned("item engagement"))
}

impl InteractionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, item_id: &str) -> EngineResult<Option<SharedRecord>> {
        let items = self
            .items
            .read()
            .map_err(|_| EngineError::LockPoisoned("interaction ledger"))?;
        Ok(items.get(item_id).cloned())
    }

    fn record(&self, item_id: &str) -> EngineResult<SharedRecord> {
        if let Some(record) = self.existing(item_id)? {
            return Ok(record);
        }
        let mut items = self
            .items
            .write()
            .map_err(|_| EngineError::LockPoisoned("interaction ledger"))?;
        Ok(Arc::clone(items.entry(item_id.to_string()).or_default()))
    }

    fn all_records(&self) -> EngineResult<Vec<(String, SharedRecord)>> {
        let items = self
            .items
            .read()
            .map_err(|_| EngineError::LockPoisoned("interaction ledger"))?;
        Ok(items
            .iter()
            .map(|(id, record)| (id.clone(), Arc::clone(record)))
            .collect())
    }

    fn note(&self, kind: InteractionKind, item_id: &str, session_id: &str) {
        self.total_interactions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = %kind, item_id, session_id, "Interaction tracked");
    }

    // ===== Likes =====

    /// Flips the session's like on an item
    pub fn toggle_like(&self, item_id: &str, session_id: &str) -> EngineResult<ToggleOutcome> {
        validate_session_id(session_id)?;
        let record = self.record(item_id)?;
        let outcome = {
            let mut record = lock_record(&record)?;
            let active = if record.likes.remove(session_id) {
                false
            } else {
                record.likes.insert(session_id.to_string());
                true
            };
            ToggleOutcome {
                item_id: item_id.to_string(),
                active,
                total: record.likes.len() as u64,
            }
        };
        self.note(InteractionKind::Like, item_id, session_id);
        Ok(outcome)
    }

    pub fn likes(&self, item_id: &str) -> EngineResult<u64> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?.likes.len() as u64),
            None => Ok(0),
        }
    }

    pub fn has_liked(&self, item_id: &str, session_id: &str) -> EngineResult<bool> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?.likes.contains(session_id)),
            None => Ok(false),
        }
    }

    // ===== Views =====

    /// Counts one impression; views are not de-duplicated per session
    pub fn track_view(
        &self,
        item_id: &str,
        session_id: &str,
        duration_ms: u64,
    ) -> EngineResult<ViewOutcome> {
        validate_session_id(session_id)?;
        let record = self.record(item_id)?;
        let total_views = {
            let mut record = lock_record(&record)?;
            record.views += 1;
            record.views
        };
        self.note(InteractionKind::View, item_id, session_id);
        Ok(ViewOutcome {
            item_id: item_id.to_string(),
            total_views,
            duration_ms,
        })
    }

    pub fn views(&self, item_id: &str) -> EngineResult<u64> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?.views),
            None => Ok(0),
        }
    }

    // ===== Favorites =====

    /// Flips the item in the session's favorites
    pub fn toggle_favorite(&self, item_id: &str, session_id: &str) -> EngineResult<ToggleOutcome> {
        validate_session_id(session_id)?;
        let record = self.record(item_id)?;
        let outcome = {
            let mut record = lock_record(&record)?;
            let mut favorites = self
                .favorites
                .write()
                .map_err(|_| EngineError::LockPoisoned("favorites index"))?;

            let active = if record.favorited_by.remove(session_id) {
                if let Some(items) = favorites.get_mut(session_id) {
                    items.remove(item_id);
                    if items.is_empty() {
                        favorites.remove(session_id);
                    }
                }
                false
            } else {
                record.favorited_by.insert(session_id.to_string());
                favorites
                    .entry(session_id.to_string())
                    .or_default()
                    .insert(item_id.to_string());
                true
            };
            ToggleOutcome {
                item_id: item_id.to_string(),
                active,
                total: record.favorited_by.len() as u64,
            }
        };
        self.note(InteractionKind::Favorite, item_id, session_id);
        Ok(outcome)
    }

    /// Items favorited by a session, sorted by id
    pub fn favorites_of(&self, session_id: &str) -> EngineResult<Vec<String>> {
        let favorites = self
            .favorites
            .read()
            .map_err(|_| EngineError::LockPoisoned("favorites index"))?;
        let mut items: Vec<String> = favorites
            .get(session_id)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default();
        items.sort();
        Ok(items)
    }

    pub fn is_favorited(&self, item_id: &str, session_id: &str) -> EngineResult<bool> {
        let favorites = self
            .favorites
            .read()
            .map_err(|_| EngineError::LockPoisoned("favorites index"))?;
        Ok(favorites
            .get(session_id)
            .is_some_and(|items| items.contains(item_id)))
    }

    // ===== Comments =====

    /// Appends a pending comment
    pub fn add_comment(
        &self,
        item_id: &str,
        session_id: &str,
        comment: NewComment,
    ) -> EngineResult<Comment> {
        validate_session_id(session_id)?;
        if comment.content.trim().is_empty() {
            tracing::warn!(item_id, session_id, "Rejected empty comment");
            return Err(EngineError::EmptyComment);
        }

        let record = self.record(item_id)?;
        let created = Comment {
            id: Uuid::new_v4().to_string(),
            item_id: item_id.to_string(),
            session_id: session_id.to_string(),
            author: comment
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            email: comment.email.filter(|e| !e.trim().is_empty()),
            content: comment.content,
            created_at: Utc::now(),
            status: CommentStatus::Pending,
        };
        lock_record(&record)?.comments.push(created.clone());
        self.note(InteractionKind::Comment, item_id, session_id);
        Ok(created)
    }

    /// Comments with the given status, newest first
    pub fn comments(&self, item_id: &str, status: CommentStatus) -> EngineResult<Vec<Comment>> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?
                .comments
                .iter()
                .rev()
                .filter(|c| c.status == status)
                .cloned()
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Re-tags a comment; comments are never removed
    ///
    /// # Returns
    /// The updated comment, or `None` if the item or comment is unknown
    pub fn set_comment_status(
        &self,
        item_id: &str,
        comment_id: &str,
        status: CommentStatus,
    ) -> EngineResult<Option<Comment>> {
        let Some(record) = self.existing(item_id)? else {
            return Ok(None);
        };
        let mut record = lock_record(&record)?;
        Ok(record
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .map(|comment| {
                comment.status = status;
                tracing::info!(item_id, comment_id, status = status.as_str(), "Comment moderated");
                comment.clone()
            }))
    }

    // ===== Ratings =====

    /// Records the session's rating, replacing any earlier one
    ///
    /// # Returns
    /// The recomputed rating summary
    pub fn add_rating(
        &self,
        item_id: &str,
        session_id: &str,
        value: u8,
        review: Option<String>,
    ) -> EngineResult<RatingSummary> {
        validate_session_id(session_id)?;
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            tracing::warn!(item_id, session_id, value, "Rejected out-of-range rating");
            return Err(EngineError::InvalidRating(value));
        }

        let record = self.record(item_id)?;
        let summary = {
            let mut record = lock_record(&record)?;
            record.ratings.insert(
                session_id.to_string(),
                Rating {
                    session_id: session_id.to_string(),
                    value,
                    review,
                    created_at: Utc::now(),
                },
            );
            record.rating_summary()
        };
        self.note(InteractionKind::Rating, item_id, session_id);
        Ok(summary)
    }

    pub fn rating_summary(&self, item_id: &str) -> EngineResult<RatingSummary> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?.rating_summary()),
            None => Ok(RatingSummary::default()),
        }
    }

    // ===== Shares =====

    pub fn track_share(
        &self,
        item_id: &str,
        session_id: &str,
        platform: Option<&str>,
    ) -> EngineResult<ShareOutcome> {
        validate_session_id(session_id)?;
        let platform = platform
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PLATFORM)
            .to_lowercase();

        let record = self.record(item_id)?;
        let total_shares = {
            let mut record = lock_record(&record)?;
            *record.shares.entry(platform.clone()).or_insert(0) += 1;
            record.total_shares()
        };
        self.note(InteractionKind::Share, item_id, session_id);
        Ok(ShareOutcome {
            item_id: item_id.to_string(),
            total_shares,
            platform,
        })
    }

    pub fn shares(&self, item_id: &str) -> EngineResult<u64> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?.total_shares()),
            None => Ok(0),
        }
    }

    /// Share counts per platform, sorted by platform
    pub fn shares_by_platform(&self, item_id: &str) -> EngineResult<Vec<(String, u64)>> {
        let Some(record) = self.existing(item_id)? else {
            return Ok(Vec::new());
        };
        let mut breakdown: Vec<(String, u64)> = lock_record(&record)?
            .shares
            .iter()
            .map(|(p, c)| (p.clone(), *c))
            .collect();
        breakdown.sort();
        Ok(breakdown)
    }

    // ===== Aggregates =====

    /// Consolidated snapshot; untouched items report zeros
    pub fn get_engagement(&self, item_id: &str) -> EngineResult<EngagementSnapshot> {
        match self.existing(item_id)? {
            Some(record) => Ok(lock_record(&record)?.snapshot(item_id)),
            None => Ok(ItemRecord::default().snapshot(item_id)),
        }
    }

    /// Items ranked by popularity score
    ///
    /// Ties go to the item with more views, then to the lower item id.
    pub fn top_items(&self, limit: usize) -> EngineResult<Vec<RankedItem>> {
        let mut ranked = Vec::new();
        for (item_id, record) in self.all_records()? {
            let snapshot = lock_record(&record)?.snapshot(&item_id);
            ranked.push(RankedItem {
                item_id,
                views: snapshot.views,
                likes: snapshot.likes,
                shares: snapshot.shares,
                score: snapshot.popularity_score,
            });
        }

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.views.cmp(&a.views))
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Ledger-wide totals per interaction kind
    pub fn totals(&self) -> EngineResult<InteractionTotals> {
        let mut totals = InteractionTotals::default();
        for (_, record) in self.all_records()? {
            let record = lock_record(&record)?;
            totals.views += record.views;
            totals.likes += record.likes.len() as u64;
            totals.favorites += record.favorited_by.len() as u64;
            totals.comments += record.comments.len() as u64;
            totals.ratings += record.ratings.len() as u64;
            totals.shares += record.total_shares();
        }
        Ok(totals)
    }

    /// Every interaction tracked since start, including undone toggles
    pub fn total_interactions(&self) -> u64 {
        self.total_interactions.load(Ordering::Relaxed)
    }

    /// Number of items with a ledger record
    pub fn item_count(&self) -> EngineResult<usize> {
        Ok(self
            .items
            .read()
            .map_err(|_| EngineError::LockPoisoned("interaction ledger"))?
            .len())
    }
}

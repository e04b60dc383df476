//! Visitor session registry
//!
//! Anonymous, ephemeral visitor sessions. A session is created on first
//! contact, bumped on every tracked activity and removed by an explicit
//! sweep once it is older than the configured TTL.
//!
//! Other components only hold session identifiers; the records themselves
//! are owned here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Placeholder for metadata the client did not send
pub const UNKNOWN: &str = "unknown";

/// Referrer recorded when none was sent
pub const DIRECT_REFERRER: &str = "direct";

/// Visitor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Session identifier (UUID v4)
    pub id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last tracked activity
    pub last_activity: DateTime<Utc>,
    pub user_agent: String,
    pub ip: String,
    pub country: String,
    pub referrer: String,
    /// Tracked interactions performed in this session
    pub interactions: u64,
    /// Cumulative time on site (milliseconds)
    pub time_spent_ms: u64,
    /// Pages viewed, in order
    pub pages_viewed: Vec<String>,
}

/// Client metadata supplied when a session is opened
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

/// Partial update merged into an existing session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub time_spent_ms: Option<u64>,
    #[serde(default)]
    pub pages_viewed: Option<Vec<String>>,
}

impl Session {
    /// Creates a session opened at `now`
    pub fn new(metadata: SessionMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_activity: now,
            user_agent: metadata.user_agent.unwrap_or_else(|| UNKNOWN.to_string()),
            ip: metadata.ip.unwrap_or_else(|| UNKNOWN.to_string()),
            country: metadata.country.unwrap_or_else(|| UNKNOWN.to_string()),
            referrer: metadata.referrer.unwrap_or_else(|| DIRECT_REFERRER.to_string()),
            interactions: 0,
            time_spent_ms: 0,
            pages_viewed: Vec::new(),
        }
    }

    /// Records activity at `now` and counts one interaction
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        self.interactions += 1;
    }

    /// Merges the populated fields of `update`
    pub fn apply(&mut self, update: SessionUpdate, now: DateTime<Utc>) {
        if let Some(user_agent) = update.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(ip) = update.ip {
            self.ip = ip;
        }
        if let Some(country) = update.country {
            self.country = country;
        }
        if let Some(referrer) = update.referrer {
            self.referrer = referrer;
        }
        if let Some(time_spent_ms) = update.time_spent_ms {
            self.time_spent_ms = time_spent_ms;
        }
        if let Some(pages) = update.pages_viewed {
            self.pages_viewed = pages;
        }
        self.last_activity = now;
    }

    /// Age is measured from creation, not from last activity
    pub fn is_expired_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.created_at > max_age
    }
}

/// Rejects empty or oversized session references before they reach a map
pub fn validate_session_id(session_id: &str) -> EngineResult<()> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() || trimmed.len() != session_id.len() || session_id.len() > 128 {
        return Err(EngineError::InvalidSessionId(session_id.to_string()));
    }
    Ok(())
}

/// Session store
///
/// One lock guards the whole map; every operation holds it only for the
/// duration of a single lookup or mutation.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Session map (session_id -> Session)
    sessions: RwLock<HashMap<String, Session>>,
    /// Sessions ever created; never decremented by sweeps
    unique_visitors: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .read()
            .map_err(|_| EngineError::LockPoisoned("session registry"))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .write()
            .map_err(|_| EngineError::LockPoisoned("session registry"))
    }

    /// Opens a new session
    pub fn create_session(&self, metadata: SessionMetadata) -> EngineResult<Session> {
        self.create_session_at(metadata, Utc::now())
    }

    /// Opens a new session with an explicit creation time
    pub fn create_session_at(
        &self,
        metadata: SessionMetadata,
        now: DateTime<Utc>,
    ) -> EngineResult<Session> {
        let session = Session::new(metadata, now);
        self.write()?.insert(session.id.clone(), session.clone());
        self.unique_visitors.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Merges `update` into a session
    ///
    /// # Returns
    /// The updated session, or `None` if the id is unknown
    pub fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> EngineResult<Option<Session>> {
        let mut sessions = self.write()?;
        Ok(sessions.get_mut(session_id).map(|session| {
            session.apply(update, Utc::now());
            session.clone()
        }))
    }

    /// Bumps last activity and the interaction count
    ///
    /// # Returns
    /// `false` if the session is unknown
    pub(crate) fn touch(&self, session_id: &str) -> EngineResult<bool> {
        let mut sessions = self.write()?;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.touch(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Appends a page to the session's browsing trail
    pub fn record_page(&self, session_id: &str, page: &str) -> EngineResult<bool> {
        let mut sessions = self.write()?;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.pages_viewed.push(page.to_string());
                session.last_activity = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Adds reported time on site
    pub fn add_time_on_site(&self, session_id: &str, time_spent_ms: u64) -> EngineResult<bool> {
        let mut sessions = self.write()?;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.time_spent_ms = session.time_spent_ms.saturating_add(time_spent_ms);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get(&self, session_id: &str) -> EngineResult<Option<Session>> {
        Ok(self.read()?.get(session_id).cloned())
    }

    /// Sessions currently held
    pub fn len(&self) -> EngineResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Total sessions ever created
    pub fn unique_visitors(&self) -> u64 {
        self.unique_visitors.load(Ordering::Relaxed)
    }

    /// Mean cumulative time on site over held sessions (milliseconds)
    pub fn average_time_on_site(&self) -> EngineResult<f64> {
        let sessions = self.read()?;
        if sessions.is_empty() {
            return Ok(0.0);
        }
        let total: u64 = sessions.values().map(|s| s.time_spent_ms).sum();
        Ok(total as f64 / sessions.len() as f64)
    }

    /// Removes sessions older than `max_age`
    pub fn sweep_expired(&self, max_age: Duration) -> EngineResult<usize> {
        self.sweep_expired_at(Utc::now(), max_age)
    }

    /// Removes sessions older than `max_age` as of `now`
    ///
    /// # Returns
    /// Number of sessions removed
    pub fn sweep_expired_at(&self, now: DateTime<Utc>, max_age: Duration) -> EngineResult<usize> {
        let mut sessions = self.write()?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now, max_age));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
        Ok(removed)
    }
}

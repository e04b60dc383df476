//! Interaction ledger
//!
//! Per-item engagement state: likes and favorites with toggle semantics,
//! cumulative views and shares, append-only comments with a moderation
//! tag, and one active rating per session.
//!
//! ## Concurrency
//!
//! Each item's record sits behind its own mutex, so toggles on one item
//! never contend with reads of another. The per-session favorites index is
//! only ever locked while the owning item's lock is held, which keeps the
//! two directions consistent without a global lock.

mod ledger;
mod types;



pub use ledger::InteractionLedger;
pub use types::*;

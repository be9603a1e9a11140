use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::cache::QueryCache;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One conflicting pair from the most recent explicit conflict check.
/// Only the ids and kind are kept for highlighting; the full snapshots go
/// out in the check response itself.
#[derive(Debug, Clone)]
pub struct ConflictPair {
    pub slot1_id: String,
    pub slot2_id: String,
    pub kind: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    pub cache: QueryCache,
    /// Highlight set from the last `schedule.conflicts.check`. Deliberately
    /// not recomputed on slot mutations; stale until the next explicit check.
    pub conflicts: Vec<ConflictPair>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            session: None,
            cache: QueryCache::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn slot_has_conflict(&self, slot_id: &str) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.slot1_id == slot_id || c.slot2_id == slot_id)
    }
}

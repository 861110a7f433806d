//! Session history stores.
//!
//! A [`HistoryStore`] holds one [`PromptHistory`] per optimization session,
//! keyed by session id. Saving an existing id replaces the stored history.

#[cfg(feature = "db")]
mod sqlite;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::types::PromptHistory;

#[cfg(feature = "db")]
pub use sqlite::SqliteHistoryStore;

/// Keyed store of session histories.
pub trait HistoryStore: Send + Sync {
    /// Insert or replace the history for `history.id`.
    fn save(&self, history: &PromptHistory) -> Result<()>;

    /// Look up a history by session id.
    fn get(&self, id: &str) -> Result<Option<PromptHistory>>;

    /// All session ids, oldest first.
    fn list_ids(&self) -> Result<Vec<String>>;

    /// Number of stored sessions.
    fn len(&self) -> Result<usize> {
        Ok(self.list_ids()?.len())
    }
}

/// Shared handle to a history store.
pub type SharedHistoryStore = Arc<dyn HistoryStore>;

/// In-process history store.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    histories: RwLock<HashMap<String, PromptHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(&self, history: &PromptHistory) -> Result<()> {
        self.histories
            .write()
            .map_err(|_| Error::LockPoisoned)?
            .insert(history.id.clone(), history.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PromptHistory>> {
        let histories = self.histories.read().map_err(|_| Error::LockPoisoned)?;
        Ok(histories.get(id).cloned())
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        let histories = self.histories.read().map_err(|_| Error::LockPoisoned)?;
        let mut entries: Vec<_> = histories.values().map(|h| (h.created_at, h.id.clone())).collect();
        entries.sort();
        Ok(entries.into_iter().map(|(_, id)| id).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.histories.read().map_err(|_| Error::LockPoisoned)?.len())
    }
}

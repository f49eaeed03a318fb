//! History tracking
//!
//! Newest-first visit log, capped at [`HISTORY_LIMIT`]. The log is stored
//! as one JSON record; a record that no longer decodes is discarded and
//! the log starts over empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use tandem_storage::Database;
use tandem_tabs::is_homepage_or_blank;

use crate::Result;

pub const HISTORY_LIMIT: usize = 100;

const RECORD_KEY: &str = "history";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(url: &str, title: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            url: url.to_string(),
            timestamp: Utc::now(),
        }
    }
}

pub struct HistoryTracker {
    /// Newest first
    entries: VecDeque<HistoryRecord>,
    limit: usize,
    /// Configured home target, never recorded
    homepage: String,
    db: Database,
}

impl HistoryTracker {
    pub fn new(db: Database, homepage: impl Into<String>) -> Self {
        Self::with_limit(db, homepage, HISTORY_LIMIT)
    }

    pub fn with_limit(db: Database, homepage: impl Into<String>, limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
            homepage: homepage.into(),
            db,
        }
    }

    /// Load the persisted log, replacing whatever is in memory.
    pub fn load(&mut self) -> Result<()> {
        let entries = match self.db.load_record(RECORD_KEY)? {
            Some(json) => match Self::decode(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable history");
                    self.db.delete_record(RECORD_KEY)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        self.entries = entries.into_iter().take(self.limit).collect();
        tracing::info!(entries = self.entries.len(), "Loaded history");

        Ok(())
    }

    /// Serialize a newest-first log.
    pub fn encode(entries: &[HistoryRecord]) -> Result<String> {
        Ok(serde_json::to_string(entries)?)
    }

    /// Deserialize a log, restoring newest-first order.
    pub fn decode(json: &str) -> Result<Vec<HistoryRecord>> {
        let mut entries: Vec<HistoryRecord> = serde_json::from_str(json)?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    fn is_excluded(&self, url: &str) -> bool {
        is_homepage_or_blank(url) || url.trim() == self.homepage
    }

    /// Record a visit to a URL. Returns the new record, or `None` when
    /// the address is the home target or empty.
    pub fn record_visit(&mut self, url: &str, title: &str) -> Result<Option<HistoryRecord>> {
        if self.is_excluded(url) {
            return Ok(None);
        }

        let record = HistoryRecord::new(url.trim(), title);
        self.entries.push_front(record.clone());
        self.entries.truncate(self.limit);

        self.save()?;

        tracing::debug!(url = %record.url, entries = self.entries.len(), "Recorded visit");

        Ok(Some(record))
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get recent history entries
    pub fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Search history by url or title, newest first
    pub fn search(&self, query: &str, limit: usize) -> Vec<HistoryRecord> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                query.is_empty()
                    || e.url.to_lowercase().contains(&query)
                    || e.title.to_lowercase().contains(&query)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Delete a history entry
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Clear all history
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        let entries: Vec<HistoryRecord> = self.entries.iter().cloned().collect();
        let json = Self::encode(&entries)?;
        self.db.store_record(RECORD_KEY, &json)?;
        Ok(())
    }
}

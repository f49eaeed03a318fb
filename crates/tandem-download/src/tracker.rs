//! Download tracker

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tandem_storage::Database;

use crate::download::{DownloadRecord, DownloadState};
use crate::error::DownloadError;
use crate::Result;

const RECORD_KEY: &str = "downloads";

pub struct DownloadTracker {
    /// Oldest first
    downloads: Arc<RwLock<Vec<DownloadRecord>>>,
    /// Database for persistence
    db: Database,
    /// Default download directory
    download_dir: PathBuf,
}

impl DownloadTracker {
    pub fn new(db: Database, download_dir: PathBuf) -> Self {
        Self {
            downloads: Arc::new(RwLock::new(Vec::new())),
            db,
            download_dir,
        }
    }

    /// Load the persisted log, replacing whatever is in memory. A log that
    /// no longer decodes is discarded.
    pub fn load(&self) -> Result<()> {
        let downloads = match self.db.load_record(RECORD_KEY)? {
            Some(json) => match Self::decode(&json) {
                Ok(downloads) => downloads,
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable download log");
                    self.db.delete_record(RECORD_KEY)?;
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        tracing::info!(downloads = downloads.len(), "Loaded downloads");
        *self.downloads.write() = downloads;

        Ok(())
    }

    pub fn encode(downloads: &[DownloadRecord]) -> Result<String> {
        Ok(serde_json::to_string(downloads)?)
    }

    pub fn decode(json: &str) -> Result<Vec<DownloadRecord>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Start tracking a transfer
    pub fn begin(&self, url: &str, file_name: &str, total: Option<u64>) -> Result<DownloadRecord> {
        let safe_file_name = sanitize_file_name(file_name);
        let local_path = self.download_dir.join(&safe_file_name);
        let mut download = DownloadRecord::new(
            url.to_string(),
            safe_file_name,
            Some(local_path.to_string_lossy().to_string()),
        );
        download.size = total;

        self.downloads.write().push(download.clone());
        self.save()?;

        tracing::info!(
            download_id = %download.id,
            url = %download.url,
            "Started download"
        );

        Ok(download)
    }

    /// Update download progress
    pub fn update_progress(&self, id: &str, received: u64, total: Option<u64>) -> Result<DownloadRecord> {
        let download = self.modify(id, |download| {
            if download.state != DownloadState::InProgress {
                return Err(DownloadError::NotInProgress(download.id.clone()));
            }
            download.set_received(received, total);
            Ok(())
        })?;

        tracing::debug!(download_id = %id, progress = download.progress, "Download progress");
        Ok(download)
    }

    /// Complete a download. `local_path` overrides the planned location when
    /// the engine saved the file elsewhere.
    pub fn complete(&self, id: &str, local_path: Option<String>) -> Result<DownloadRecord> {
        let download = self.modify(id, |download| {
            if download.state != DownloadState::InProgress {
                return Err(DownloadError::NotInProgress(download.id.clone()));
            }
            download.state = DownloadState::Completed;
            download.progress = 1.0;
            if download.size.is_none() {
                download.size = Some(download.received_bytes);
            }
            if local_path.is_some() {
                download.local_path = local_path;
            }
            Ok(())
        })?;

        tracing::info!(download_id = %id, path = ?download.local_path, "Completed download");
        Ok(download)
    }

    /// Mark download as failed
    pub fn fail(&self, id: &str, reason: &str) -> Result<DownloadRecord> {
        let download = self.modify(id, |download| {
            if download.state != DownloadState::InProgress {
                return Err(DownloadError::NotInProgress(download.id.clone()));
            }
            download.state = DownloadState::Failed;
            download.failure = Some(reason.to_string());
            Ok(())
        })?;

        tracing::warn!(download_id = %id, reason = %reason, "Download failed");
        Ok(download)
    }

    /// Get a download by ID
    pub fn get(&self, id: &str) -> Result<DownloadRecord> {
        self.downloads
            .read()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound(id.to_string()))
    }

    /// Get all downloads, oldest first
    pub fn list(&self) -> Vec<DownloadRecord> {
        self.downloads.read().clone()
    }

    pub fn active(&self) -> Vec<DownloadRecord> {
        self.downloads
            .read()
            .iter()
            .filter(|d| d.state == DownloadState::InProgress)
            .cloned()
            .collect()
    }

    /// Drop completed and failed entries. Returns how many were removed.
    pub fn prune_finished(&self) -> Result<usize> {
        let removed = {
            let mut downloads = self.downloads.write();
            let before = downloads.len();
            downloads.retain(|d| !d.state.is_finished());
            before - downloads.len()
        };

        if removed > 0 {
            self.save()?;
            tracing::info!(removed, "Pruned finished downloads");
        }

        Ok(removed)
    }

    fn modify<F>(&self, id: &str, f: F) -> Result<DownloadRecord>
    where
        F: FnOnce(&mut DownloadRecord) -> Result<()>,
    {
        let download = {
            let mut downloads = self.downloads.write();
            let download = downloads
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| DownloadError::NotFound(id.to_string()))?;
            f(download)?;
            download.clone()
        };

        self.save()?;
        Ok(download)
    }

    fn save(&self) -> Result<()> {
        let json = Self::encode(&self.downloads.read())?;
        self.db.store_record(RECORD_KEY, &json)?;
        Ok(())
    }
}

impl Clone for DownloadTracker {
    fn clone(&self) -> Self {
        Self {
            downloads: Arc::clone(&self.downloads),
            db: self.db.clone(),
            download_dir: self.download_dir.clone(),
        }
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download")
        .trim();

    if name.is_empty() {
        "download".to_string()
    } else {
        name.to_string()
    }
}

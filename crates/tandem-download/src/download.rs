//! Download data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DownloadState {
    /// Transfer running
    InProgress,
    /// Download completed successfully
    Completed,
    /// Download failed
    Failed,
}

impl DownloadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::InProgress => "inProgress",
            DownloadState::Completed => "completed",
            DownloadState::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, DownloadState::InProgress)
    }
}

impl std::fmt::Display for DownloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DownloadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inprogress" => Ok(DownloadState::InProgress),
            "completed" => Ok(DownloadState::Completed),
            "failed" => Ok(DownloadState::Failed),
            _ => Err(format!("Unknown download state: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// Total size in bytes, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// 0.0 ..= 1.0
    #[serde(default)]
    pub progress: f64,
    pub state: DownloadState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default)]
    pub received_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl DownloadRecord {
    pub fn new(url: String, filename: String, local_path: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename,
            url,
            timestamp: Utc::now(),
            size: None,
            progress: 0.0,
            state: DownloadState::InProgress,
            local_path,
            received_bytes: 0,
            failure: None,
        }
    }

    /// Record bytes received so far. Progress stays at zero until the total
    /// size is known.
    pub fn set_received(&mut self, received: u64, total: Option<u64>) {
        self.received_bytes = received;
        if total.is_some() {
            self.size = total;
        }
        self.progress = match self.size {
            Some(total) if total > 0 => (received as f64 / total as f64).min(1.0),
            _ => 0.0,
        };
    }
}

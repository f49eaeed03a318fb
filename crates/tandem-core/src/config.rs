//! Browser configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tandem_navigation::HISTORY_LIMIT;
use tandem_preview::PreviewConfig;
use tandem_tabs::HOMEPAGE_SENTINEL;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Default download directory
    pub download_dir: PathBuf,
    /// Where host documents for local files are written
    pub staging_dir: PathBuf,
    /// Search engine URL template
    pub search_engine: String,
    /// Home target for new tabs (the sentinel shows the home screen)
    pub homepage: String,
    pub preview: PreviewConfig,
    pub history_limit: usize,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        let download_dir = dirs::download_dir().unwrap_or_else(|| data_dir.join("Downloads"));

        Self {
            database_path: data_dir.join("tandem.db"),
            download_dir,
            staging_dir: data_dir.join("staging"),
            search_engine: "https://duckduckgo.com/?q=%s".to_string(),
            homepage: HOMEPAGE_SENTINEL.to_string(),
            preview: PreviewConfig::default(),
            history_limit: HISTORY_LIMIT,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Tandem"))
            .unwrap_or_else(|| PathBuf::from(".tandem"))
    }

    /// Overlay a JSON document on the defaults. Missing fields keep their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.search_engine.contains("%s") {
            return Err(crate::CoreError::Config(format!(
                "search engine template has no %s placeholder: {}",
                self.search_engine
            )));
        }
        if self.history_limit == 0 {
            return Err(crate::CoreError::Config(
                "history limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Platform data and download directories from environment variables
mod dirs {
    use std::path::PathBuf;

    fn home_dir() -> Option<PathBuf> {
        let var = if cfg!(target_os = "windows") {
            "USERPROFILE"
        } else {
            "HOME"
        };
        std::env::var(var).ok().map(PathBuf::from)
    }

    pub fn data_local_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            return std::env::var("LOCALAPPDATA").ok().map(PathBuf::from);
        }
        if cfg!(target_os = "macos") {
            return home_dir().map(|h| h.join("Library/Application Support"));
        }
        std::env::var("XDG_DATA_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join(".local/share")))
    }

    pub fn download_dir() -> Option<PathBuf> {
        if cfg!(target_os = "linux") {
            if let Ok(dir) = std::env::var("XDG_DOWNLOAD_DIR") {
                return Some(PathBuf::from(dir));
            }
        }
        home_dir().map(|h| h.join("Downloads"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/data"));
        assert_eq!(config.database_path, PathBuf::from("/data/tandem.db"));
        assert_eq!(config.staging_dir, PathBuf::from("/data/staging"));
        assert_eq!(config.homepage, HOMEPAGE_SENTINEL);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.preview.debounce_ms, 500);
    }

    #[test]
    fn test_from_json_overlays_defaults() {
        let config = Config::from_json(
            r#"{
                "homepage": "https://start.example",
                "preview": { "debounceMs": 250 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.homepage, "https://start.example");
        assert_eq!(config.preview.debounce_ms, 250);
        assert_eq!(config.preview.viewport_width, 1280.0);
        assert_eq!(config.search_engine, Config::default().search_engine);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            Config::from_json(r#"{ "searchEngine": "https://search.example/" }"#),
            Err(crate::CoreError::Config(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "historyLimit": 0 }"#),
            Err(crate::CoreError::Config(_))
        ));
        assert!(matches!(
            Config::from_json("not json"),
            Err(crate::CoreError::Serialization(_))
        ));
    }
}

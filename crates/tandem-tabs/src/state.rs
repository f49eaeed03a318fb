//! Tab activation state
//!
//! ```text
//! Active ⇄ Background
//! ```
//!
//! The active tab is `Active` unless the session is showing the home
//! screen, in which case every tab sits in `Background`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    /// Tab is the one whose active pane is mirrored to the UI
    Active,
    /// Tab is loaded but not visible
    Background,
}

impl TabState {
    pub fn is_active(&self) -> bool {
        matches!(self, TabState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabState::Active => "active",
            TabState::Background => "background",
        }
    }
}

impl std::fmt::Display for TabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TabState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(TabState::Active),
            "background" => Ok(TabState::Background),
            _ => Err(format!("Unknown tab state: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("Active".parse::<TabState>(), Ok(TabState::Active));
        assert_eq!("background".parse::<TabState>(), Ok(TabState::Background));
        assert!("frozen".parse::<TabState>().is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TabState::Active).unwrap(), "\"active\"");
        assert_eq!(TabState::Background.to_string(), "background");
    }
}

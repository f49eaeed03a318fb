//! Published session state

use serde::Serialize;

use tandem_tabs::{is_homepage_or_blank, PaneSide, Tab};

/// Mirror of the active tab's active pane, as the UI sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub active_tab_id: Option<String>,
    pub url: String,
    pub title: String,
    pub is_loading: bool,
    pub progress: f64,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub showing_homepage: bool,
    pub error: Option<String>,
    pub is_split: bool,
    pub active_side: PaneSide,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_tab_id: None,
            url: String::new(),
            title: String::new(),
            is_loading: false,
            progress: 0.0,
            can_go_back: false,
            can_go_forward: false,
            showing_homepage: true,
            error: None,
            is_split: false,
            active_side: PaneSide::Primary,
        }
    }
}

/// Derive the published state from the active tab alone.
///
/// Nothing else feeds the mirror, so whatever the tab says about its
/// active pane is exactly what the UI shows.
pub fn derive_global_state(tab: Option<&Tab>) -> SessionState {
    let Some(tab) = tab else {
        return SessionState::default();
    };

    let pane = &tab.active_pane().state;
    let showing_homepage = is_homepage_or_blank(&pane.url);

    SessionState {
        active_tab_id: Some(tab.id.clone()),
        url: if showing_homepage {
            String::new()
        } else {
            pane.url.clone()
        },
        title: if showing_homepage {
            String::new()
        } else {
            pane.title.clone()
        },
        is_loading: pane.is_loading,
        progress: pane.progress,
        can_go_back: pane.can_go_back,
        can_go_forward: pane.can_go_forward,
        showing_homepage,
        error: pane.error.clone(),
        is_split: tab.is_split(),
        active_side: tab.active_side(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_tabs::{LoadSeq, PaneId, HOMEPAGE_SENTINEL};

    #[test]
    fn test_no_tab_shows_homepage() {
        let state = derive_global_state(None);
        assert!(state.showing_homepage);
        assert!(state.active_tab_id.is_none());
    }

    #[test]
    fn test_sentinel_never_leaks_into_address() {
        let mut tab = Tab::new(PaneId(1));
        tab.pane_mut(PaneSide::Primary)
            .unwrap()
            .state
            .begin_load(LoadSeq(1), Some(HOMEPAGE_SENTINEL));

        let state = derive_global_state(Some(&tab));
        assert!(state.showing_homepage);
        assert!(state.url.is_empty());
        assert!(state.is_loading);
    }

    #[test]
    fn test_mirrors_active_side_only() {
        let mut tab = Tab::new(PaneId(1));
        {
            let primary = &mut tab.pane_mut(PaneSide::Primary).unwrap().state;
            primary.url = "https://a.com".to_string();
            primary.title = "A".to_string();
            primary.can_go_back = true;
        }
        tab.attach_secondary(PaneId(2)).unwrap();
        {
            let secondary = &mut tab.pane_mut(PaneSide::Secondary).unwrap().state;
            secondary.url = "https://b.com".to_string();
            secondary.error = Some("offline".to_string());
        }

        let state = derive_global_state(Some(&tab));
        assert_eq!(state.url, "https://b.com");
        assert_eq!(state.error.as_deref(), Some("offline"));
        assert!(!state.can_go_back);
        assert!(state.is_split);
        assert_eq!(state.active_side, PaneSide::Secondary);

        tab.set_active_side(PaneSide::Primary).unwrap();
        let state = derive_global_state(Some(&tab));
        assert_eq!(state.url, "https://a.com");
        assert_eq!(state.title, "A");
        assert!(state.error.is_none());
        assert!(state.can_go_back);
    }
}

//! Durable UI state and its write-through persistence to the host
//!
//! The panel owns the session; the host only stores what it is told via
//! `setSavedState`. Two field groups travel separately:
//! - theme, tab, file name and dirty flag as one snapshot, pushed whenever
//!   any of them changes
//! - the script text as a narrow `{script}` patch, pushed on every edit

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::bridge::{Bridge, HostCall};
use crate::config::PanelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Theme> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Script,
    Output,
    Settings,
}

impl Tab {
    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Script => "script",
            Tab::Output => "output",
            Tab::Settings => "settings",
        }
    }

    pub fn parse(value: &str) -> Option<Tab> {
        match value {
            "script" => Some(Tab::Script),
            "output" => Some(Tab::Output),
            "settings" => Some(Tab::Settings),
            _ => None,
        }
    }
}

/// Saved state as the host hands it back at startup. Every field is
/// optional; older hosts only know some of them.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    pub theme: Option<String>,
    pub selected_tab: Option<String>,
    pub file_name: Option<String>,
    pub script: Option<String>,
    pub has_file_changed: Option<bool>,
}

impl SavedState {
    /// Decode the bootstrap value. The host wraps the object in a
    /// single-element array; a bare object is accepted too.
    pub fn decode(value: &Value) -> Result<SavedState, String> {
        let value = match value {
            Value::Array(items) => items
                .first()
                .ok_or_else(|| "Saved state array is empty".to_string())?,
            other => other,
        };
        serde_json::from_value(value.clone()).map_err(|e| format!("Invalid saved state: {}", e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiSession {
    pub theme: Theme,
    pub active_tab: Tab,
    pub file_name: String,
    pub file_dirty: bool,
    pub script_text: String,
}

impl UiSession {
    pub fn defaults(config: &PanelConfig) -> Self {
        Self {
            theme: Theme::default(),
            active_tab: Tab::default(),
            file_name: config.default_file_name.clone(),
            file_dirty: false,
            script_text: config.default_script.clone(),
        }
    }

    /// Build the session from whatever the host saved last time. Anything
    /// missing or unreadable falls back to the defaults.
    pub fn bootstrap(saved: Option<&Value>, config: &PanelConfig) -> Self {
        let mut session = Self::defaults(config);

        let saved = match saved.map(SavedState::decode) {
            Some(Ok(saved)) => saved,
            Some(Err(e)) => {
                log::warn!("Ignoring saved state from host: {}", e);
                return session;
            }
            None => return session,
        };

        if let Some(theme) = saved.theme.as_deref().and_then(Theme::parse) {
            session.theme = theme;
        }
        if let Some(tab) = saved.selected_tab.as_deref().and_then(Tab::parse) {
            session.active_tab = tab;
        }
        if let Some(name) = saved.file_name.filter(|name| !name.is_empty()) {
            session.file_name = name;
        }
        if let Some(script) = saved.script {
            session.script_text = script;
        }
        if let Some(dirty) = saved.has_file_changed {
            session.file_dirty = dirty;
        }

        session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            theme: self.theme,
            selected_tab: self.active_tab,
            file_name: self.file_name.clone(),
            has_file_changed: self.file_dirty,
        }
    }
}

/// The session field group pushed as one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub theme: Theme,
    pub selected_tab: Tab,
    pub file_name: String,
    pub has_file_changed: bool,
}

/// Payload of a `setSavedState` call. The host merges it into what it has.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SavedStatePatch {
    Session(SessionSnapshot),
    Script { script: String },
}

impl SavedStatePatch {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Owns the [`UiSession`] and reports it to the host.
///
/// Setters only mutate. [`SessionStore::commit`] pushes the snapshot if it
/// differs from the last one pushed, so several changes made while handling
/// one action or event coalesce into a single call. Script edits bypass
/// this and push immediately.
pub struct SessionStore {
    session: UiSession,
    bridge: Arc<dyn Bridge>,
    last_pushed: Option<SessionSnapshot>,
}

impl SessionStore {
    pub fn new(session: UiSession, bridge: Arc<dyn Bridge>) -> Self {
        Self {
            session,
            bridge,
            last_pushed: None,
        }
    }

    pub fn session(&self) -> &UiSession {
        &self.session
    }

    pub fn into_session(self) -> UiSession {
        self.session
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.session.theme = theme;
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.session.active_tab = tab;
    }

    pub fn set_file_name(&mut self, name: &str) {
        self.session.file_name = name.to_string();
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.session.file_dirty = dirty;
    }

    /// The user changed the script
    pub fn script_edited(&mut self, text: &str) {
        self.session.file_dirty = true;
        self.push_script(text);
    }

    /// The host loaded a file from disk; its contents are now the truth
    pub fn file_loaded(&mut self, name: &str, contents: &str) {
        self.session.file_name = name.to_string();
        self.session.file_dirty = false;
        self.push_script(contents);
    }

    /// Push the session snapshot if it changed since the last push.
    /// Returns whether a call was made.
    pub fn commit(&mut self) -> bool {
        let snapshot = self.session.snapshot();
        if self.last_pushed.as_ref() == Some(&snapshot) {
            return false;
        }

        log::debug!(
            "Saving state: theme={} tab={} file={} dirty={}",
            snapshot.theme.as_str(),
            snapshot.selected_tab.as_str(),
            snapshot.file_name,
            snapshot.has_file_changed
        );
        self.bridge
            .invoke(HostCall::SetSavedState(SavedStatePatch::Session(snapshot.clone())));
        self.last_pushed = Some(snapshot);
        true
    }

    fn push_script(&mut self, text: &str) {
        self.session.script_text = text.to_string();
        self.bridge.invoke(HostCall::SetSavedState(SavedStatePatch::Script {
            script: text.to_string(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::RecordingBridge;
    use serde_json::json;

    fn snapshot_pushes(bridge: &RecordingBridge) -> usize {
        bridge.count(|call| {
            matches!(call, HostCall::SetSavedState(SavedStatePatch::Session(_)))
        })
    }

    #[test]
    fn test_bootstrap_defaults() {
        let config = PanelConfig::default();
        let session = UiSession::bootstrap(None, &config);
        assert_eq!(session.theme, Theme::Light);
        assert_eq!(session.active_tab, Tab::Script);
        assert_eq!(session.file_name, "untitled");
        assert!(!session.file_dirty);
        assert_eq!(session.script_text, "print('Hello World!')");
    }

    #[test]
    fn test_bootstrap_from_wrapped_saved_state() {
        let saved = json!([{
            "theme": "dark",
            "selectedTab": "output",
            "fileName": "lfo.lua",
            "script": "return 0",
            "hasFileChanged": true
        }]);
        let session = UiSession::bootstrap(Some(&saved), &PanelConfig::default());
        assert_eq!(session.theme, Theme::Dark);
        assert_eq!(session.active_tab, Tab::Output);
        assert_eq!(session.file_name, "lfo.lua");
        assert_eq!(session.script_text, "return 0");
        assert!(session.file_dirty);
    }

    #[test]
    fn test_bootstrap_ignores_unknown_values() {
        // Older hosts seed "tab": "editor" and nothing else useful
        let saved = json!({"theme": "sepia", "tab": "editor", "selectedTab": "mixer"});
        let session = UiSession::bootstrap(Some(&saved), &PanelConfig::default());
        assert_eq!(session.theme, Theme::Light);
        assert_eq!(session.active_tab, Tab::Script);

        let session = UiSession::bootstrap(Some(&json!([])), &PanelConfig::default());
        assert_eq!(session, UiSession::defaults(&PanelConfig::default()));
    }

    #[test]
    fn test_commit_coalesces_and_skips_unchanged() {
        let bridge = RecordingBridge::new();
        let session = UiSession::defaults(&PanelConfig::default());
        let mut store = SessionStore::new(session, bridge.clone());

        assert!(store.commit());
        assert!(!store.commit());

        store.set_theme(Theme::Dark);
        store.select_tab(Tab::Settings);
        assert!(store.commit());
        assert_eq!(snapshot_pushes(&bridge), 2);

        // Setting the same value again is not a change
        store.set_theme(Theme::Dark);
        assert!(!store.commit());
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let session = UiSession::defaults(&PanelConfig::default());
        let patch = SavedStatePatch::Session(session.snapshot());
        assert_eq!(
            patch.to_value(),
            json!({
                "theme": "light",
                "selectedTab": "script",
                "fileName": "untitled",
                "hasFileChanged": false
            })
        );
        let patch = SavedStatePatch::Script {
            script: "x".to_string(),
        };
        assert_eq!(patch.to_value(), json!({"script": "x"}));
    }

    #[test]
    fn test_script_edit_pushes_narrow_patch() {
        let bridge = RecordingBridge::new();
        let mut store = SessionStore::new(UiSession::defaults(&PanelConfig::default()), bridge.clone());
        store.commit();
        bridge.clear_calls();

        store.script_edited("return 1");
        assert!(store.session().file_dirty);
        assert_eq!(
            bridge.calls(),
            vec![HostCall::SetSavedState(SavedStatePatch::Script {
                script: "return 1".to_string()
            })]
        );

        // The dirty flag belongs to the snapshot group
        assert!(store.commit());
    }

    #[test]
    fn test_file_loaded_clears_dirty() {
        let bridge = RecordingBridge::new();
        let mut store = SessionStore::new(UiSession::defaults(&PanelConfig::default()), bridge.clone());
        store.script_edited("unsaved");
        store.file_loaded("saw.lua", "return 1");

        let session = store.session();
        assert_eq!(session.file_name, "saw.lua");
        assert_eq!(session.script_text, "return 1");
        assert!(!session.file_dirty);
    }
}

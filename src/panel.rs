//! The editor panel: owns local state and wires it to the host
//!
//! Everything on the panel runs on one thread. Host events are queued by the
//! bridge handlers and applied by [`Panel::pump`] or [`Panel::run`]; user
//! actions call straight into the panel. Pollers and subscriptions live
//! exactly as long as the mount.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::bridge::{Bridge, HostCall, Subscription};
use crate::config::PanelConfig;
use crate::editor::{Preset, ScriptEditor};
use crate::ingest::{self, HostEvent, Inbound};
use crate::log_view::{LogLine, LogView};
use crate::monitor::{DisplayList, Monitor, TelemetrySample};
use crate::poll::PollHandle;
use crate::session::{SessionStore, Tab, Theme, UiSession};

/// Things the user can do on the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserAction {
    /// The editor contents changed
    EditScript { text: String },
    SetTheme { theme: Theme },
    SelectTab { tab: Tab },
    OpenFile,
    /// Save to the last opened file
    Save,
    /// Save to a new path chosen on the host
    SaveAs,
    Compile,
    ClearLog,
    SetLogPolling { enabled: bool },
    LoadPreset { preset: Preset },
}

/// Input for [`Panel::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    Action(UserAction),
    Close,
}

/// Everything needed to paint the panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub theme: Theme,
    pub active_tab: Tab,
    pub file_label: String,
    pub script_tab_label: String,
    pub log_polling: bool,
    pub log_summary: [String; 2],
    pub log_lines: Vec<LogLine>,
    pub log_scroll_top: usize,
    pub monitor: DisplayList,
}

pub struct Panel<E: ScriptEditor> {
    bridge: Arc<dyn Bridge>,
    config: PanelConfig,
    session: SessionStore,
    editor: E,
    log: LogView,
    monitor: Monitor,
    surface: DisplayList,
    telemetry: Arc<TelemetrySample>,
    log_poll: PollHandle,
    telemetry_poll: PollHandle,
    subscriptions: Vec<Subscription>,
    inbound: UnboundedReceiver<Inbound>,
}

impl<E: ScriptEditor> Panel<E> {
    /// Subscribe to the host, start both pollers and report the session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(bridge: Arc<dyn Bridge>, config: &PanelConfig, session: UiSession, mut editor: E) -> Self {
        editor.replace(&session.script_text);

        // Subscribe before polling so the first replies have somewhere to go
        let (tx, inbound) = mpsc::unbounded_channel();
        let subscriptions = ingest::subscribe_all(bridge.as_ref(), tx);

        let log_poll = PollHandle::start(
            "log",
            config.log_poll_interval(),
            bridge.clone(),
            HostCall::RequestLog,
            true,
        );
        // Telemetry is pulled regardless of which tab is showing
        let telemetry_poll = PollHandle::start(
            "telemetry",
            config.telemetry_poll_interval(),
            bridge.clone(),
            HostCall::RequestTelemetry,
            true,
        );

        let mut session = SessionStore::new(session, bridge.clone());
        session.commit();

        let telemetry = Arc::new(TelemetrySample::default());
        let mut surface = DisplayList::new(config.monitor_width, config.monitor_height);
        let mut monitor = Monitor::new();
        monitor.sync(&telemetry, &mut surface);

        log::info!(
            "Panel mounted, host {}, {} subscriptions",
            if bridge.is_connected() { "attached" } else { "detached" },
            subscriptions.len()
        );

        Self {
            bridge,
            config: config.clone(),
            session,
            editor,
            log: LogView::new(config.log_viewport_rows),
            monitor,
            surface,
            telemetry,
            log_poll,
            telemetry_poll,
            subscriptions,
            inbound,
        }
    }

    /// Stop both pollers, drop every subscription and hand the session back
    /// so a later mount can pick it up.
    pub async fn unmount(self) -> UiSession {
        let Panel {
            session,
            log_poll,
            telemetry_poll,
            subscriptions,
            ..
        } = self;

        drop(subscriptions);
        log_poll.stop().await;
        telemetry_poll.stop().await;
        log::info!("Panel unmounted");

        session.into_session()
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    /// Apply every queued host event. Returns how many were taken off the queue.
    pub fn pump(&mut self) -> usize {
        let mut taken = 0;
        while let Ok(inbound) = self.inbound.try_recv() {
            self.apply_inbound(inbound);
            taken += 1;
        }
        taken
    }

    /// Decode and apply one raw event. Malformed payloads are dropped and
    /// the previous state stays in place.
    pub fn apply_inbound(&mut self, inbound: Inbound) -> bool {
        match HostEvent::decode(inbound.channel, &inbound.payload) {
            Ok(event) => {
                self.apply_event(event);
                true
            }
            Err(e) => {
                log::warn!("Dropping malformed {} payload: {}", inbound.channel.name(), e);
                false
            }
        }
    }

    pub fn apply_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::FileSelect {
                file_name,
                contents,
            } => {
                // Disk contents win over any unsaved local edits
                log::info!("Loaded {} from host", file_name);
                self.editor.replace(&contents);
                self.session.file_loaded(&file_name, &contents);
                self.session.commit();
            }
            HostEvent::LogUpdate(buffer) => self.log.replace(buffer),
            HostEvent::TelemetryUpdate(sample) => {
                self.telemetry = Arc::new(sample);
                self.monitor.sync(&self.telemetry, &mut self.surface);
            }
        }
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    pub fn apply(&mut self, action: UserAction) {
        match action {
            UserAction::EditScript { text } => self.edit_script(&text),
            UserAction::SetTheme { theme } => self.set_theme(theme),
            UserAction::SelectTab { tab } => self.select_tab(tab),
            UserAction::OpenFile => self.open_file(),
            UserAction::Save => {
                self.save(true);
            }
            UserAction::SaveAs => {
                self.save(false);
            }
            UserAction::Compile => self.compile(),
            UserAction::ClearLog => self.clear_log(),
            UserAction::SetLogPolling { enabled } => self.set_log_polling(enabled),
            UserAction::LoadPreset { preset } => self.load_preset(preset),
        }
    }

    /// Replace the editor text as if the user had typed it
    pub fn edit_script(&mut self, text: &str) {
        self.editor.replace(text);
        self.script_changed();
    }

    /// Call after the embedded editor changed its own contents
    pub fn script_changed(&mut self) {
        let text = self.editor.text();
        self.session.script_edited(&text);
        self.session.commit();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.session.set_theme(theme);
        self.session.commit();
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.session.select_tab(tab);
        self.session.commit();
    }

    pub fn open_file(&self) {
        self.bridge.invoke(HostCall::OpenFile);
    }

    /// Ask the host to write the script. Only acts while the script tab is
    /// showing; returns whether the request was sent.
    pub fn save(&self, use_last_opened_file: bool) -> bool {
        if self.session.session().active_tab != Tab::Script {
            log::debug!("Save ignored outside the script tab");
            return false;
        }
        self.bridge.invoke(HostCall::SaveFile {
            use_last_opened_file,
            contents: self.editor.text(),
        });
        true
    }

    pub fn compile(&self) {
        self.bridge.invoke(HostCall::Compile {
            contents: self.editor.text(),
        });
    }

    /// Clear the host log and show the empty log right away; the next
    /// snapshot from the host replaces it either way.
    pub fn clear_log(&mut self) {
        self.bridge.invoke(HostCall::ClearLog);
        self.log.clear();
    }

    pub fn set_log_polling(&self, enabled: bool) {
        self.log_poll.set_enabled(enabled);
    }

    /// Start over from a preset. The script no longer belongs to any file,
    /// so the host forgets its last path.
    pub fn load_preset(&mut self, preset: Preset) {
        log::info!("Loading preset {}", preset.name());
        self.bridge.invoke(HostCall::ResetLastOpenedFile);
        self.editor.replace(preset.script());
        self.session.set_file_name(&self.config.default_file_name);
        self.session.script_edited(preset.script());
        self.session.commit();
    }

    // ------------------------------------------------------------------
    // Render
    // ------------------------------------------------------------------

    pub fn session(&self) -> &UiSession {
        self.session.session()
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn log(&self) -> &LogView {
        &self.log
    }

    pub fn telemetry(&self) -> &TelemetrySample {
        &self.telemetry
    }

    pub fn monitor_frame(&self) -> &DisplayList {
        &self.surface
    }

    pub fn monitor_redraws(&self) -> u64 {
        self.monitor.redraw_count()
    }

    pub fn log_polling(&self) -> bool {
        self.log_poll.enabled()
    }

    pub fn pollers_running(&self) -> bool {
        self.log_poll.is_running() && self.telemetry_poll.is_running()
    }

    /// File button caption, starred while there are unsaved edits
    pub fn file_label(&self) -> String {
        let session = self.session.session();
        format!("{}{}", session.file_name, dirty_marker(session.file_dirty))
    }

    pub fn script_tab_label(&self) -> String {
        format!("Script{}", dirty_marker(self.session.session().file_dirty))
    }

    pub fn render(&self) -> RenderSnapshot {
        let session = self.session.session();
        let (compile, process) = self.log.summary_text();
        RenderSnapshot {
            theme: session.theme,
            active_tab: session.active_tab,
            file_label: self.file_label(),
            script_tab_label: self.script_tab_label(),
            log_polling: self.log_polling(),
            log_summary: [compile, process],
            log_lines: self.log.lines().to_vec(),
            log_scroll_top: self.log.scroll_top(),
            monitor: self.surface.clone(),
        }
    }

    /// Drive the panel until `Close` arrives or the command source goes
    /// away. `on_render` sees every snapshot that differs from the last.
    pub async fn run<F>(&mut self, mut commands: UnboundedReceiver<PanelCommand>, mut on_render: F)
    where
        F: FnMut(&RenderSnapshot),
    {
        let mut last: Option<RenderSnapshot> = None;
        loop {
            tokio::select! {
                Some(inbound) = self.inbound.recv() => {
                    self.apply_inbound(inbound);
                    // Catch up on anything else that queued meanwhile
                    self.pump();
                }
                command = commands.recv() => match command {
                    Some(PanelCommand::Action(action)) => self.apply(action),
                    Some(PanelCommand::Close) | None => break,
                },
            }

            let snapshot = self.render();
            if last.as_ref() != Some(&snapshot) {
                on_render(&snapshot);
                last = Some(snapshot);
            }
        }
    }
}

fn dirty_marker(dirty: bool) -> &'static str {
    if dirty {
        "*"
    } else {
        ""
    }
}

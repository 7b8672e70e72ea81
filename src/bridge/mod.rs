//! Typed bridge to the plugin host
//!
//! The host exposes fire-and-forget native functions (`invoke`) and pushes
//! named events back at its own pace (`subscribe`). Nothing here waits on a
//! reply: if the host answers at all, the answer arrives later as an event.
//!
//! Implementations:
//! - [`detached::DetachedBridge`] - no host present, every call is a no-op
//! - [`stdio::StdioBridge`] - panel running as a child process of the host

pub mod detached;
pub mod stdio;

#[cfg(test)]
pub(crate) mod testing;

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::session::SavedStatePatch;

/// Native functions the panel can call on the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// Poll trigger for the log channel
    RequestLog,
    /// Poll trigger for the telemetry channel
    RequestTelemetry,
    /// Persist durable UI fields (full snapshot or the narrow script patch)
    SetSavedState(SavedStatePatch),
    /// Show the host's file-open dialog
    OpenFile,
    /// Write the script to disk, optionally reusing the last opened path
    SaveFile {
        use_last_opened_file: bool,
        contents: String,
    },
    /// Hand the script to the host for compilation
    Compile { contents: String },
    /// Clear the host-side log
    ClearLog,
    /// Forget the last opened path so the next save prompts for one
    ResetLastOpenedFile,
}

impl HostCall {
    /// Wire name of the native function
    pub fn name(&self) -> &'static str {
        match self {
            HostCall::RequestLog => "requestLog",
            HostCall::RequestTelemetry => "requestTelemetry",
            HostCall::SetSavedState(_) => "setSavedState",
            HostCall::OpenFile => "openFile",
            HostCall::SaveFile { .. } => "saveFile",
            HostCall::Compile { .. } => "compile",
            HostCall::ClearLog => "clearLog",
            HostCall::ResetLastOpenedFile => "resetLastOpenedFile",
        }
    }

    /// Positional arguments as passed across the bridge
    pub fn args(&self) -> Vec<Value> {
        match self {
            HostCall::SetSavedState(patch) => vec![patch.to_value()],
            HostCall::SaveFile {
                use_last_opened_file,
                contents,
            } => vec![json!(use_last_opened_file), json!(contents)],
            HostCall::Compile { contents } => vec![json!(contents)],
            HostCall::RequestLog
            | HostCall::RequestTelemetry
            | HostCall::OpenFile
            | HostCall::ClearLog
            | HostCall::ResetLastOpenedFile => Vec::new(),
        }
    }
}

/// Events the host pushes to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    FileSelect,
    LogUpdate,
    TelemetryUpdate,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::FileSelect, Channel::LogUpdate, Channel::TelemetryUpdate];

    pub fn name(self) -> &'static str {
        match self {
            Channel::FileSelect => "fileSelect",
            Channel::LogUpdate => "logUpdate",
            Channel::TelemetryUpdate => "telemetryUpdate",
        }
    }

    /// Resolve an event name, including the names older hosts emit
    pub fn from_name(name: &str) -> Option<Channel> {
        match name {
            "fileSelect" => Some(Channel::FileSelect),
            "logUpdate" | "outputLogUpdate" => Some(Channel::LogUpdate),
            "telemetryUpdate" | "outputMonitorUpdate" => Some(Channel::TelemetryUpdate),
            _ => None,
        }
    }
}

/// Event handler. Called once per delivery, never concurrently for the
/// same channel.
pub type Handler = Box<dyn Fn(Value) + Send + Sync>;

/// Host bridge as seen by the panel
pub trait Bridge: Send + Sync {
    /// Fire-and-forget call into the host
    fn invoke(&self, call: HostCall);

    /// Register the single handler for `channel`, replacing any previous one.
    /// Returns `None` when there is no host to deliver events.
    fn subscribe(&self, channel: Channel, handler: Handler) -> Option<Subscription>;

    /// Whether a host is actually on the other end
    fn is_connected(&self) -> bool {
        true
    }
}

struct Slot {
    id: u64,
    handler: Arc<dyn Fn(Value) + Send + Sync>,
}

struct BusInner {
    slots: Mutex<HashMap<Channel, Slot>>,
    next_id: AtomicU64,
}

/// Single-handler-per-channel event registry shared by bridge implementations
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                slots: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Install `handler` as the only handler of `channel`
    pub fn subscribe(&self, channel: Channel, handler: Handler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let previous = self.inner.slots.lock().insert(
            channel,
            Slot {
                id,
                handler: Arc::from(handler),
            },
        );
        if previous.is_some() {
            log::debug!("Replaced handler for {}", channel.name());
        }

        Subscription {
            bus: Arc::downgrade(&self.inner),
            channel,
            id,
        }
    }

    /// Deliver a payload to the channel's handler.
    /// Returns false if nobody is listening.
    pub fn dispatch(&self, channel: Channel, payload: Value) -> bool {
        // Clone the handler out so it runs without the lock held
        let handler = self
            .inner
            .slots
            .lock()
            .get(&channel)
            .map(|slot| slot.handler.clone());

        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                log::trace!("No handler for {}, event dropped", channel.name());
                false
            }
        }
    }

    pub fn is_subscribed(&self, channel: Channel) -> bool {
        self.inner.slots.lock().contains_key(&channel)
    }

    pub fn handler_count(&self) -> usize {
        self.inner.slots.lock().len()
    }
}

/// Keeps a handler registered. Dropping it unregisters the handler, unless
/// a newer subscription has already replaced it.
pub struct Subscription {
    bus: Weak<BusInner>,
    channel: Channel,
    id: u64,
}

impl Subscription {
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let mut slots = inner.slots.lock();
        if slots.get(&self.channel).map(|slot| slot.id) == Some(self.id) {
            slots.remove(&self.channel);
        }
    }
}

//! In-process bridge double for tests

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use super::{Bridge, Channel, EventBus, Handler, HostCall, Subscription};

/// Records every call and lets tests push host events through a real bus
#[derive(Default)]
pub(crate) struct RecordingBridge {
    calls: Mutex<Vec<HostCall>>,
    bus: EventBus,
}

impl RecordingBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emit(&self, channel: Channel, payload: Value) -> bool {
        self.bus.dispatch(channel, payload)
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(call)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl Bridge for RecordingBridge {
    fn invoke(&self, call: HostCall) {
        self.calls.lock().push(call);
    }

    fn subscribe(&self, channel: Channel, handler: Handler) -> Option<Subscription> {
        Some(self.bus.subscribe(channel, handler))
    }
}

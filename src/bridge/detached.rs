//! Bridge used when no host is attached (standalone preview)

use super::{Bridge, Channel, Handler, HostCall, Subscription};

/// Accepts every call and drops it. Subscriptions are never registered, so
/// handlers simply never fire.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedBridge;

impl Bridge for DetachedBridge {
    fn invoke(&self, call: HostCall) {
        log::trace!("No host attached, dropping {}", call.name());
    }

    fn subscribe(&self, channel: Channel, _handler: Handler) -> Option<Subscription> {
        log::debug!("No host attached, {} stays unsubscribed", channel.name());
        None
    }

    fn is_connected(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_is_inert() {
        let bridge = DetachedBridge;
        bridge.invoke(HostCall::OpenFile);
        bridge.invoke(HostCall::Compile {
            contents: "return 0".to_string(),
        });
        assert!(bridge.subscribe(Channel::LogUpdate, Box::new(|_| {})).is_none());
        assert!(!bridge.is_connected());
    }
}

//! Fixed-cadence pulls from the host
//!
//! Each poller is one tokio interval task that fires a single host call.
//! Pausing flips a flag checked inside the tick; the timer itself keeps
//! running, so resuming takes effect on the very next tick.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::bridge::{Bridge, HostCall};

struct PollState {
    name: &'static str,
    interval: Duration,
    call: HostCall,
    enabled: AtomicBool,
    fired: AtomicU64,
    last_fired: Mutex<Option<DateTime<Local>>>,
}

impl PollState {
    /// One timer tick. Returns whether the call was made.
    fn tick(&self, bridge: &dyn Bridge) -> bool {
        if !self.enabled.load(Ordering::SeqCst) {
            return false;
        }
        bridge.invoke(self.call.clone());
        self.fired.fetch_add(1, Ordering::Relaxed);
        *self.last_fired.lock() = Some(Local::now());
        true
    }
}

/// A running poll loop. Stopped by [`PollHandle::stop`] or on drop.
pub struct PollHandle {
    state: Arc<PollState>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn the loop on the current tokio runtime. The first tick fires
    /// immediately, then every `interval`.
    pub fn start(
        name: &'static str,
        interval: Duration,
        bridge: Arc<dyn Bridge>,
        call: HostCall,
        enabled: bool,
    ) -> Self {
        let state = Arc::new(PollState {
            name,
            interval,
            call,
            enabled: AtomicBool::new(enabled),
            fired: AtomicU64::new(0),
            last_fired: Mutex::new(None),
        });

        let task_state = state.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(task_state.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            log::debug!(
                "{} poller started ({}ms)",
                task_state.name,
                task_state.interval.as_millis()
            );
            loop {
                ticker.tick().await;
                task_state.tick(bridge.as_ref());
            }
        });

        Self {
            state,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.state.name
    }

    pub fn interval(&self) -> Duration {
        self.state.interval
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::SeqCst);
        log::debug!("{} polling {}", self.state.name, if enabled { "enabled" } else { "paused" });
    }

    /// Number of ticks that actually called the host
    pub fn fired_count(&self) -> u64 {
        self.state.fired.load(Ordering::Relaxed)
    }

    pub fn last_fired(&self) -> Option<DateTime<Local>> {
        *self.state.last_fired.lock()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Cancel the loop and wait until it is gone
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        log::debug!("{} poller stopped", self.state.name);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::detached::DetachedBridge;
    use crate::bridge::testing::RecordingBridge;

    fn log_requests(bridge: &RecordingBridge) -> usize {
        bridge.count(|call| *call == HostCall::RequestLog)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_interval() {
        let bridge = RecordingBridge::new();
        let poller = PollHandle::start(
            "log",
            Duration::from_millis(20),
            bridge.clone(),
            HostCall::RequestLog,
            true,
        );

        // Ticks at 0, 20 and 40ms
        tokio::time::sleep(Duration::from_millis(45)).await;
        assert_eq!(log_requests(&bridge), 3);
        assert_eq!(poller.fired_count(), 3);
        assert!(poller.last_fired().is_some());
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_without_restart() {
        let bridge = RecordingBridge::new();
        let poller = PollHandle::start(
            "log",
            Duration::from_millis(20),
            bridge.clone(),
            HostCall::RequestLog,
            true,
        );
        tokio::time::sleep(Duration::from_millis(45)).await;
        assert_eq!(log_requests(&bridge), 3);

        poller.set_enabled(false);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(log_requests(&bridge), 3);
        assert!(poller.is_running());

        // Resumes on the next tick (100ms), no warm-up
        poller.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(log_requests(&bridge), 4);
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_loop() {
        let bridge = RecordingBridge::new();
        let poller = PollHandle::start(
            "telemetry",
            Duration::from_millis(50),
            bridge.clone(),
            HostCall::RequestTelemetry,
            true,
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        poller.stop().await;

        let fired = bridge.calls().len();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(bridge.calls().len(), fired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts() {
        let bridge = RecordingBridge::new();
        let poller = PollHandle::start(
            "log",
            Duration::from_millis(20),
            bridge.clone(),
            HostCall::RequestLog,
            true,
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(poller);

        let fired = log_requests(&bridge);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(log_requests(&bridge), fired);
    }

    #[tokio::test]
    async fn test_tick_against_detached_bridge() {
        let poller = PollHandle::start(
            "log",
            Duration::from_millis(20),
            Arc::new(DetachedBridge),
            HostCall::RequestLog,
            false,
        );
        assert!(!poller.state.tick(&DetachedBridge));
        poller.set_enabled(true);
        assert!(poller.state.tick(&DetachedBridge));
        assert_eq!(poller.interval(), Duration::from_millis(20));
        poller.stop().await;
    }
}

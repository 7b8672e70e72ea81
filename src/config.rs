//! Panel configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the panel. Every field has a default so the host only
/// needs to send the ones it wants to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Cadence of `requestLog` pulls
    pub log_poll_interval_ms: u64,
    /// Cadence of `requestTelemetry` pulls
    pub telemetry_poll_interval_ms: u64,
    /// Monitor drawing surface width in pixels
    pub monitor_width: f32,
    /// Monitor drawing surface height in pixels
    pub monitor_height: f32,
    /// Number of log rows visible at once (drives auto-scroll)
    pub log_viewport_rows: usize,
    /// File name shown before anything has been opened
    pub default_file_name: String,
    /// Editor contents shown before anything has been opened
    pub default_script: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            log_poll_interval_ms: 20,
            telemetry_poll_interval_ms: 50,
            monitor_width: 400.0,
            monitor_height: 100.0,
            log_viewport_rows: 16,
            default_file_name: "untitled".to_string(),
            default_script: "print('Hello World!')".to_string(),
        }
    }
}

impl PanelConfig {
    pub fn log_poll_interval(&self) -> Duration {
        Duration::from_millis(self.log_poll_interval_ms.max(1))
    }

    pub fn telemetry_poll_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_poll_interval_ms.max(1))
    }

    /// Parse a config override from JSON, falling back to defaults for
    /// anything the caller left out
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid panel config: {}", e))
    }
}

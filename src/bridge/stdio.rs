//! Line protocol bridge for running the panel as a child of the host
//!
//! Panel -> host (stdout):
//! - "ready" - panel mounted
//! - "call:<json>" - native function call, `[name, ...args]`
//! - "render:<json>" - latest render snapshot
//! - "closed" - panel unmounted
//!
//! Host -> panel (stdin):
//! - "event:<json>" - pushed event, `[name, payload]`
//! - "input:<json>" - user input forwarded from the host window
//! - "close" - tear the panel down
//!
//! EOF on stdin means the host went away and is treated like "close".

use parking_lot::Mutex;
use serde_json::Value;
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedSender;

use super::{Bridge, Channel, EventBus, Handler, HostCall, Subscription};
use crate::panel::{PanelCommand, UserAction};

/// A decoded line from the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostLine {
    Event { channel: Channel, payload: Value },
    Input(UserAction),
    Close,
}

/// Encode a native call as a protocol line (without the trailing newline)
pub fn encode_call(call: &HostCall) -> String {
    let mut parts = vec![Value::String(call.name().to_string())];
    parts.extend(call.args());
    format!("call:{}", Value::Array(parts))
}

/// Decode one line received from the host
pub fn parse_host_line(line: &str) -> Result<HostLine, String> {
    let line = line.trim();

    if line == "close" {
        return Ok(HostLine::Close);
    }

    if let Some(body) = line.strip_prefix("event:") {
        let value: Value =
            serde_json::from_str(body).map_err(|e| format!("Invalid event JSON: {}", e))?;
        let (name, payload) = match value {
            Value::Array(mut parts) if parts.len() == 2 => {
                let payload = parts.pop().unwrap_or(Value::Null);
                let name = parts.pop().unwrap_or(Value::Null);
                (name, payload)
            }
            _ => return Err("Event must be a [name, payload] pair".to_string()),
        };
        let name = name
            .as_str()
            .ok_or_else(|| "Event name must be a string".to_string())?;
        let channel =
            Channel::from_name(name).ok_or_else(|| format!("Unknown event: {}", name))?;
        return Ok(HostLine::Event { channel, payload });
    }

    if let Some(body) = line.strip_prefix("input:") {
        let action: UserAction =
            serde_json::from_str(body).map_err(|e| format!("Invalid input: {}", e))?;
        return Ok(HostLine::Input(action));
    }

    Err(format!("Unrecognised line: {}", line))
}

/// Bridge that speaks the line protocol over a writer (normally stdout)
pub struct StdioBridge {
    writer: Mutex<Box<dyn Write + Send>>,
    bus: EventBus,
}

impl StdioBridge {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            bus: EventBus::new(),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Write one protocol line and flush it so the host sees it immediately
    pub fn write_line(&self, line: &str) {
        let mut writer = self.writer.lock();
        let result = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        if let Err(e) = result {
            log::warn!("Failed to write to host: {}", e);
        }
    }

    /// Read host lines on a dedicated thread. Events go to the bus, user
    /// input and the close signal go to `commands`.
    pub fn spawn_reader<R>(&self, reader: R, commands: UnboundedSender<PanelCommand>) -> JoinHandle<()>
    where
        R: BufRead + Send + 'static,
    {
        let bus = self.bus.clone();
        thread::spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("Error reading from host (host may have exited): {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_host_line(&line) {
                    Ok(HostLine::Event { channel, payload }) => {
                        bus.dispatch(channel, payload);
                    }
                    Ok(HostLine::Input(action)) => {
                        if commands.send(PanelCommand::Action(action)).is_err() {
                            break;
                        }
                    }
                    Ok(HostLine::Close) => {
                        log::info!("Close requested by host");
                        break;
                    }
                    Err(e) => log::warn!("Ignoring host line: {}", e),
                }
            }
            log::debug!("Host reader finished");
            let _ = commands.send(PanelCommand::Close);
        })
    }
}

impl Bridge for StdioBridge {
    fn invoke(&self, call: HostCall) {
        self.write_line(&encode_call(&call));
    }

    fn subscribe(&self, channel: Channel, handler: Handler) -> Option<Subscription> {
        Some(self.bus.subscribe(channel, handler))
    }
}

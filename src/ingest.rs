//! Host event ingestion
//!
//! Bridge handlers may run on whatever thread the bridge delivers on, so
//! they only forward the raw payload into the panel's queue. Decoding and
//! applying happen on the panel's own thread, in delivery order per channel.

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::bridge::{Bridge, Channel, Subscription};
use crate::log_view::LogBuffer;
use crate::monitor::TelemetrySample;

/// A raw event waiting to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub channel: Channel,
    pub payload: Value,
}

/// A decoded host event
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The host finished loading a file from disk
    FileSelect { file_name: String, contents: String },
    LogUpdate(LogBuffer),
    TelemetryUpdate(TelemetrySample),
}

impl HostEvent {
    pub fn decode(channel: Channel, payload: &Value) -> Result<HostEvent, String> {
        match channel {
            Channel::FileSelect => {
                let (file_name, contents) = decode_file_select(payload)?;
                Ok(HostEvent::FileSelect {
                    file_name,
                    contents,
                })
            }
            Channel::LogUpdate => LogBuffer::decode(payload).map(HostEvent::LogUpdate),
            Channel::TelemetryUpdate => {
                TelemetrySample::decode(payload).map(HostEvent::TelemetryUpdate)
            }
        }
    }
}

fn decode_file_select(payload: &Value) -> Result<(String, String), String> {
    match payload.as_array().map(Vec::as_slice) {
        Some([Value::String(name), Value::String(contents)]) => Ok((name.clone(), contents.clone())),
        _ => Err("File select must be a [fileName, contents] pair of strings".to_string()),
    }
}

/// Register one forwarding handler per channel. With no host attached the
/// result is empty and nothing will ever arrive.
pub fn subscribe_all(bridge: &dyn Bridge, sender: UnboundedSender<Inbound>) -> Vec<Subscription> {
    Channel::ALL
        .iter()
        .filter_map(|&channel| {
            let sender = sender.clone();
            bridge.subscribe(
                channel,
                Box::new(move |payload| {
                    if sender.send(Inbound { channel, payload }).is_err() {
                        log::trace!("Panel gone, dropping {}", channel.name());
                    }
                }),
            )
        })
        .collect()
}

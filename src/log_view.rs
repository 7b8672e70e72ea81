//! Script output log mirrored from the host

use serde::Serialize;
use serde_json::Value;

const EMPTY_PLACEHOLDER: &str = "Output Log is empty...";

/// Timing figures the host reports in the first two log slots
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LogSummary {
    pub compile_elapsed_seconds: f64,
    pub process_block_elapsed_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub message: String,
    pub is_error: bool,
}

/// One host log snapshot.
///
/// On the wire the two summary values occupy the first two slots, so the
/// wire length is always `entries.len() + 2` and an empty log has length 2.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogBuffer {
    pub summary: LogSummary,
    pub entries: Vec<LogEntry>,
}

impl LogBuffer {
    /// The canonical empty log
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wire length, summary slots included
    pub fn len(&self) -> usize {
        self.entries.len() + 2
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode `[compileSeconds, processBlockSeconds, [message, type], ...]`
    pub fn decode(value: &Value) -> Result<LogBuffer, String> {
        let items = value
            .as_array()
            .ok_or_else(|| "Log update must be an array".to_string())?;
        if items.len() < 2 {
            return Err(format!("Log update has {} slots, expected at least 2", items.len()));
        }

        let summary = LogSummary {
            compile_elapsed_seconds: parse_seconds(&items[0])?,
            process_block_elapsed_seconds: parse_seconds(&items[1])?,
        };

        let entries = items[2..]
            .iter()
            .enumerate()
            .map(|(i, item)| parse_entry(item).map_err(|e| format!("Log entry {}: {}", i, e)))
            .collect::<Result<Vec<_>, String>>()?;

        Ok(LogBuffer { summary, entries })
    }
}

fn parse_seconds(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("Bad number: {}", n)),
        Value::String(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed.strip_suffix('s').unwrap_or(trimmed).trim();
            trimmed
                .parse::<f64>()
                .map_err(|_| format!("Bad elapsed time: {:?}", s))
        }
        // Single-element form, e.g. ["0 s"]
        Value::Array(items) if items.len() == 1 => parse_seconds(&items[0]),
        other => Err(format!("Bad elapsed time: {}", other)),
    }
}

fn parse_entry(value: &Value) -> Result<LogEntry, String> {
    let parts = value
        .as_array()
        .ok_or_else(|| "entry must be a [message, type] array".to_string())?;
    let message = match parts.first() {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Err("entry has no message".to_string()),
    };
    let is_error = match parts.get(1) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s.trim() == "1",
        Some(other) => return Err(format!("bad message type {}", other)),
    };
    Ok(LogEntry { message, is_error })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Message,
    Error,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogLine {
    pub text: String,
    pub kind: LineKind,
}

/// Renders the log and keeps the newest line in view
pub struct LogView {
    buffer: LogBuffer,
    lines: Vec<LogLine>,
    viewport_rows: usize,
    scroll_top: usize,
}

impl LogView {
    pub fn new(viewport_rows: usize) -> Self {
        let mut view = Self {
            buffer: LogBuffer::empty(),
            lines: Vec::new(),
            viewport_rows: viewport_rows.max(1),
            scroll_top: 0,
        };
        view.rerender();
        view
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Take a new snapshot from the host wholesale and scroll to the bottom
    pub fn replace(&mut self, buffer: LogBuffer) {
        self.buffer = buffer;
        self.rerender();
    }

    /// Local reset to the empty log, ahead of the host confirming it
    pub fn clear(&mut self) {
        self.replace(LogBuffer::empty());
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Rows currently inside the viewport
    pub fn visible(&self) -> &[LogLine] {
        let end = (self.scroll_top + self.viewport_rows).min(self.lines.len());
        &self.lines[self.scroll_top..end]
    }

    /// Index of the first visible row
    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn set_viewport_rows(&mut self, rows: usize) {
        self.viewport_rows = rows.max(1);
        self.scroll_to_bottom();
    }

    /// Header lines for the compile and processBlock timings
    pub fn summary_text(&self) -> (String, String) {
        let summary = &self.buffer.summary;
        (
            format!("Elapsed Compile Time: {} s", summary.compile_elapsed_seconds),
            format!("Elapsed processBlock Time: {} s", summary.process_block_elapsed_seconds),
        )
    }

    fn rerender(&mut self) {
        self.lines = if self.buffer.is_empty() {
            vec![LogLine {
                text: EMPTY_PLACEHOLDER.to_string(),
                kind: LineKind::Placeholder,
            }]
        } else {
            self.buffer
                .entries
                .iter()
                .map(|entry| LogLine {
                    text: entry.message.clone(),
                    kind: if entry.is_error {
                        LineKind::Error
                    } else {
                        LineKind::Message
                    },
                })
                .collect()
        };
        self.scroll_to_bottom();
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_top = self.lines.len().saturating_sub(self.viewport_rows);
    }
}

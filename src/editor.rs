//! Script editor seam and built-in presets

use serde::{Deserialize, Serialize};

/// The text-editing surface. The panel only ever reads the whole text or
/// replaces it; cursor handling, highlighting and the rest stay inside the
/// editor implementation.
pub trait ScriptEditor {
    fn text(&self) -> String;
    fn replace(&mut self, text: &str);
}

/// Plain in-memory editor used when no richer editor is embedded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ScriptEditor for TextBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn replace(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(text);
    }
}

/// Starting points offered in the preset menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Empty,
    BasicLfo,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Empty, Preset::BasicLfo];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Empty => "Empty",
            Preset::BasicLfo => "Basic LFO",
        }
    }

    /// Script body. The host runs the chunk once per sample and uses the
    /// returned number, clamped to [-1, 1], as the output value.
    pub fn script(self) -> &'static str {
        match self {
            Preset::Empty => "return 0\n",
            Preset::BasicLfo => concat!(
                "-- One sine cycle per second at 48 kHz\n",
                "rate = 1 / 48000\n",
                "phase = (phase or 0) + rate\n",
                "if phase >= 1 then phase = phase - 1 end\n",
                "return math.sin(2 * math.pi * phase)\n",
            ),
        }
    }
}

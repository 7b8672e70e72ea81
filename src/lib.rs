//! Formulizer editor panel
//!
//! The UI half of a scriptable audio effect: edits the Lua script, shows the
//! host's output log and a live trace of the processed signal. All audio
//! work happens on the host; the panel talks to it through a [`bridge::Bridge`].

pub mod bridge;
pub mod config;
pub mod editor;
pub mod ingest;
pub mod log_view;
pub mod logging;
pub mod monitor;
pub mod panel;
pub mod poll;
pub mod session;

pub use bridge::Bridge;
pub use config::PanelConfig;
pub use panel::{Panel, PanelCommand, UserAction};
pub use session::UiSession;

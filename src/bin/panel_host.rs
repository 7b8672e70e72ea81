//! Formulizer Panel Host
//!
//! Runs the editor panel as a child process of the plugin host.
//!
//! Communication with the parent process:
//! - Optionally receives the saved state JSON as the first argument
//! - Optionally receives a panel config JSON as the second argument
//! - Writes to stdout:
//!   - "ready" - panel is mounted
//!   - "call:<json>" - native function call for the host
//!   - "render:<json>" - panel contents changed
//!   - "closed" - panel was torn down
//!   - "error:message" - an error occurred
//! - Reads from stdin: "event:<json>", "input:<json>", "close"
//! - Exits on "close" or when stdin reaches EOF

use std::env;
use std::io::BufReader;
use std::sync::Arc;

use formulizer_lib::bridge::stdio::StdioBridge;
use formulizer_lib::editor::TextBuffer;
use formulizer_lib::logging::init_logging;
use formulizer_lib::{Panel, PanelConfig, UiSession};

fn main() {
    init_logging();
    log::info!("formulizer-panel starting");

    let args: Vec<String> = env::args().collect();

    let saved_state = match args.get(1).map(|arg| serde_json::from_str::<serde_json::Value>(arg)) {
        Some(Ok(value)) => Some(value),
        Some(Err(e)) => {
            log::warn!("Invalid saved state argument, using defaults: {}", e);
            None
        }
        None => None,
    };

    let config = match args.get(2).map(|arg| PanelConfig::from_json(arg)) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            log::warn!("{}, using defaults", e);
            PanelConfig::default()
        }
        None => PanelConfig::default(),
    };

    match run_panel(saved_state, config) {
        Ok(()) => log::info!("Panel closed normally"),
        Err(e) => {
            log::error!("Panel error: {}", e);
            println!("error:{}", e);
            std::process::exit(1);
        }
    }
}

fn run_panel(saved_state: Option<serde_json::Value>, config: PanelConfig) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    let bridge = Arc::new(StdioBridge::stdout());
    let (commands_tx, commands_rx) = tokio::sync::mpsc::unbounded_channel();

    // Reader stays detached; it ends on its own at EOF
    let _reader = bridge.spawn_reader(BufReader::new(std::io::stdin()), commands_tx);

    runtime.block_on(async {
        let session = UiSession::bootstrap(saved_state.as_ref(), &config);
        let mut panel = Panel::mount(bridge.clone(), &config, session, TextBuffer::default());
        bridge.write_line("ready");
        log::info!("Panel ready, entering event loop");

        let render_bridge = bridge.clone();
        panel
            .run(commands_rx, |snapshot| match serde_json::to_string(snapshot) {
                Ok(json) => render_bridge.write_line(&format!("render:{}", json)),
                Err(e) => log::warn!("Failed to encode render snapshot: {}", e),
            })
            .await;

        panel.unmount().await;
    });

    bridge.write_line("closed");
    Ok(())
}

//! Diagnostic logging
//!
//! Log records go to stderr. When the panel runs as a child of the host,
//! stdout carries the bridge protocol and must stay clean.

use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_READY: AtomicBool = AtomicBool::new(false);

/// Initialize logging once per process. Later calls are ignored.
pub fn init_logging() {
    if LOGGING_READY
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }

    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Stderr)
        .try_init();

    match result {
        Ok(()) => log::info!("formulizer panel logging started"),
        // Another logger was installed by the embedding process
        Err(e) => log::debug!("Logger already installed: {}", e),
    }
}

//! Free-form debug tracing to stderr, in `guest-init`'s style: a fixed tag,
//! no structured fields, gated behind a single runtime flag rather than a
//! logging framework.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_enabled(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Emit a line to stderr prefixed with `[warden]`, only if debug mode is on.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::debug::enabled() {
            eprintln!("[warden] {}", format!($($arg)*));
        }
    };
}

/// Emit a line to stderr unconditionally, prefixed with `[warden]`.
#[macro_export]
macro_rules! warden_eprintln {
    ($($arg:tt)*) => {
        eprintln!("[warden] {}", format!($($arg)*));
    };
}

//! The signal pump: a single-threaded loop that synchronously dequeues
//! pending signals with a one-second heartbeat and dispatches each to the
//! handler.

use crate::debug;
use crate::error::SupervisorError;
use crate::handler::{self, HandlerOutcome};
use crate::launcher::full_signal_set;

/// Run the pump until the handler decides to exit, at which point this
/// function calls `std::process::exit` and never returns.
pub fn run(config: &crate::config::Config, mut state: handler::SupervisorState) -> ! {
    let all = full_signal_set();
    let timeout = libc::timespec {
        tv_sec: 1,
        tv_nsec: 0,
    };

    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        // SAFETY: `all` and `timeout` are valid, fully initialized values
        // owned by this stack frame; `info` is written to on success.
        let signum = unsafe { libc::sigtimedwait(&all, &mut info, &timeout) };

        let dispatched = if signum > 0 {
            signum
        } else {
            match wait_error_kind() {
                WaitError::Timeout => {
                    debug!("Heartbeat...");
                    libc::SIGCHLD
                }
                WaitError::Bug(msg) => {
                    fatal(SupervisorError::SignalWaitBug(msg));
                }
            }
        };

        debug!("Received signal {dispatched}.");
        match handler::handle_signal(dispatched, config, &mut state) {
            HandlerOutcome::Continue => {}
            HandlerOutcome::Exit(code) => std::process::exit(code),
        }
    }
}

enum WaitError {
    Timeout,
    Bug(String),
}

fn wait_error_kind() -> WaitError {
    // SAFETY: reading errno right after a failed libc call is always valid.
    let errno = unsafe { *libc::__errno_location() };
    match errno {
        libc::EAGAIN => WaitError::Timeout,
        libc::EINTR => {
            WaitError::Bug("sigtimedwait interrupted by a signal; this should never happen".into())
        }
        libc::EINVAL => WaitError::Bug("sigtimedwait given an invalid timeout".into()),
        other => WaitError::Bug(format!("sigtimedwait failed with errno {other}")),
    }
}

fn fatal(err: SupervisorError) -> ! {
    crate::warden_eprintln!("{err}");
    std::process::exit(1);
}

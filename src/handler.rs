//! Interprets one dequeued signal: reaps on child-exit notifications,
//! self-suspends on TTY stop signals after forwarding them, and otherwise
//! forwards or rewrites the signal per the configuration table.

use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::action;
use crate::bereavement;
use crate::config::Config;
use crate::debug;
use crate::signals::{exit_code_for_status, RewriteSlot};

/// Mutable state owned by the pump: everything that changes across the
/// supervisor's lifetime, as opposed to [`Config`] which is fixed at startup.
pub struct SupervisorState {
    pub child_pid: libc::pid_t,
    pub bereaved: bool,
}

impl SupervisorState {
    pub fn new(child_pid: libc::pid_t) -> Self {
        SupervisorState {
            child_pid,
            bereaved: false,
        }
    }
}

pub enum HandlerOutcome {
    Continue,
    Exit(i32),
}

pub fn handle_signal(signum: i32, config: &Config, state: &mut SupervisorState) -> HandlerOutcome {
    if signum == libc::SIGCHLD {
        return handle_sigchld(config, state);
    }

    forward_signal(signum, config, state);

    if signum == libc::SIGTSTP || signum == libc::SIGTTOU || signum == libc::SIGTTIN {
        debug!("Suspending self due to TTY signal.");
        // SAFETY: raise() with a valid signal number is always safe.
        unsafe {
            libc::raise(libc::SIGSTOP);
        }
    }

    HandlerOutcome::Continue
}

fn handle_sigchld(config: &Config, state: &mut SupervisorState) -> HandlerOutcome {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                if let Some(outcome) = reap_one(pid.as_raw(), Some(code), None, config, state) {
                    return outcome;
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _core_dumped)) => {
                if let Some(outcome) =
                    reap_one(pid.as_raw(), None, Some(sig as i32), config, state)
                {
                    return outcome;
                }
            }
            Ok(WaitStatus::StillAlive) => break,
            Ok(_other) => continue,
            Err(_) => break,
        }
    }

    if state.bereaved && config.survive_bereaving {
        let count = bereavement::process_count();
        debug!("Process count: {count}");
        if count <= 1 {
            debug!("No process left, exiting.");
            return HandlerOutcome::Exit(0);
        }
    }

    HandlerOutcome::Continue
}

/// Handle one reaped descendant. Returns `Some(outcome)` if the pump should
/// stop draining and act on it immediately (only happens for the direct
/// child in non-survive mode); `None` to keep draining.
fn reap_one(
    pid: libc::pid_t,
    exited: Option<i32>,
    signaled: Option<i32>,
    config: &Config,
    state: &mut SupervisorState,
) -> Option<HandlerOutcome> {
    let exit_code = exit_code_for_status(exited, signaled);
    if pid == state.child_pid {
        debug!("A child with PID {pid} exited with exit status {exit_code}.");
        state.bereaved = true;
        if !config.survive_bereaving {
            forward_signal(libc::SIGTERM, config, state);
            debug!("Child exited with status {exit_code}. Goodbye.");
            return Some(HandlerOutcome::Exit(exit_code));
        }
        debug!("Child exited with status {exit_code}. Stay alive for your grandchildren.");
    } else {
        debug!("A child with PID {pid} exited with exit status {exit_code}.");
    }
    None
}

/// Translate `signum` through the rewrite table and forward (or act, or
/// drop) accordingly.
fn forward_signal(signum: i32, config: &Config, state: &SupervisorState) {
    match config.rewrite.get(signum) {
        RewriteSlot::Unset => deliver(signum, config, state),
        RewriteSlot::Ignore => {
            debug!("Not forwarding signal {signum} to children (ignored).");
        }
        RewriteSlot::Action => {
            if let Some(cmd) = config.actions.get(signum) {
                debug!("Action for signal {signum}: running {cmd}");
                action::spawn(cmd);
            }
        }
        RewriteSlot::Rewrite(replacement) => {
            debug!("Translating signal {signum} to {replacement}.");
            deliver(replacement, config, state)
        }
    }
}

fn deliver(signum: i32, config: &Config, state: &SupervisorState) {
    let target = if config.use_setsid {
        -state.child_pid
    } else {
        state.child_pid
    };
    // SAFETY: `target` is a valid PID (or its group negation) and `signum`
    // is a signal number we accept through the rewrite table.
    unsafe {
        libc::kill(target, signum);
    }
    debug!("Forwarded signal {signum} to children.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{ActionTable, RewriteTable};

    fn config(use_setsid: bool, survive_bereaving: bool) -> Config {
        Config {
            rewrite: RewriteTable::new(),
            actions: ActionTable::new(),
            use_setsid,
            survive_bereaving,
            debug: false,
            command: vec!["true".to_string()],
        }
    }

    #[test]
    fn reaping_direct_child_sets_bereaved_and_exits_when_not_surviving() {
        let mut state = SupervisorState::new(42);
        let cfg = config(true, false);
        let outcome = reap_one(42, Some(7), None, &cfg, &mut state);
        assert!(state.bereaved);
        match outcome {
            Some(HandlerOutcome::Exit(code)) => assert_eq!(code, 7),
            _ => panic!("expected Exit(7)"),
        }
    }

    #[test]
    fn reaping_direct_child_continues_when_surviving() {
        let mut state = SupervisorState::new(42);
        let cfg = config(true, true);
        let outcome = reap_one(42, Some(0), None, &cfg, &mut state);
        assert!(state.bereaved);
        assert!(outcome.is_none());
    }

    #[test]
    fn reaping_an_orphan_does_not_set_bereaved() {
        let mut state = SupervisorState::new(42);
        let cfg = config(true, false);
        let outcome = reap_one(99, Some(0), None, &cfg, &mut state);
        assert!(!state.bereaved);
        assert!(outcome.is_none());
    }

    #[test]
    fn signalled_child_maps_to_128_plus_signal() {
        let mut state = SupervisorState::new(42);
        let cfg = config(true, false);
        let outcome = reap_one(42, None, Some(libc::SIGTERM), &cfg, &mut state);
        match outcome {
            Some(HandlerOutcome::Exit(code)) => assert_eq!(code, 128 + libc::SIGTERM),
            _ => panic!("expected Exit(128+SIGTERM)"),
        }
    }
}

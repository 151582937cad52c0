//! Signal numbering and the rewrite/action table types.
//!
//! Signals are tracked as raw `libc::c_int` values rather than through
//! `nix::sys::signal::Signal`, because that enum only represents the
//! standard 1..=31 range: real-time signals up to [`MAXSIG`] must still be
//! rewritten, forwarded, and waited on.

/// Highest signal number this supervisor will track.
///
/// Covers the standard signals (1-31) plus all Linux real-time signals.
/// `SIGRTMAX` is not a compile-time constant, so this is a fixed upper bound
/// rather than a computed one.
pub const MAXSIG: i32 = 64;

/// What happens to a signal on its way to the supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteSlot {
    /// No rewrite configured: forward the signal unchanged.
    Unset,
    /// Drop the signal silently.
    Ignore,
    /// Run the configured action command instead of forwarding.
    Action,
    /// Forward this signal instead of the one received.
    Rewrite(i32),
}

impl RewriteSlot {
    fn from_replacement(replacement: i32) -> Self {
        if replacement == 0 {
            RewriteSlot::Ignore
        } else {
            RewriteSlot::Rewrite(replacement)
        }
    }
}

/// Indexed 0..=MAXSIG; index 0 is unused except as the bulk-rewrite key.
#[derive(Debug, Clone)]
pub struct RewriteTable {
    slots: Vec<RewriteSlot>,
}

impl RewriteTable {
    pub fn new() -> Self {
        RewriteTable {
            slots: vec![RewriteSlot::Unset; (MAXSIG + 1) as usize],
        }
    }

    /// `signum == 0` means "every slot"; mirrors the CLI's bulk-rewrite option.
    pub fn set(&mut self, signum: i32, replacement: i32) {
        let slot = RewriteSlot::from_replacement(replacement);
        if signum == 0 {
            for s in self.slots.iter_mut() {
                *s = slot;
            }
        } else if let Some(s) = self.slots.get_mut(signum as usize) {
            *s = slot;
        }
    }

    pub fn set_action(&mut self, signum: i32) {
        if let Some(s) = self.slots.get_mut(signum as usize) {
            *s = RewriteSlot::Action;
        }
    }

    pub fn get(&self, signum: i32) -> RewriteSlot {
        if !(1..=MAXSIG).contains(&signum) {
            return RewriteSlot::Rewrite(signum);
        }
        self.slots
            .get(signum as usize)
            .copied()
            .unwrap_or(RewriteSlot::Unset)
    }

    /// Set `signum` to SIGSTOP only if it has not already been configured.
    pub fn default_to_sigstop_if_unset(&mut self, signum: i32) {
        if matches!(self.get(signum), RewriteSlot::Unset) {
            self.set(signum, libc::SIGSTOP);
        }
    }
}

impl Default for RewriteTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Indexed 1..=MAXSIG; holds the shell command to run for `ACTION` slots.
#[derive(Debug, Clone)]
pub struct ActionTable {
    commands: Vec<Option<String>>,
}

impl ActionTable {
    pub fn new() -> Self {
        ActionTable {
            commands: vec![None; (MAXSIG + 1) as usize],
        }
    }

    pub fn set(&mut self, signum: i32, command: String) {
        if let Some(slot) = self.commands.get_mut(signum as usize) {
            *slot = Some(command);
        }
    }

    pub fn get(&self, signum: i32) -> Option<&str> {
        self.commands
            .get(signum as usize)
            .and_then(|c| c.as_deref())
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a wait(2) status into the process's would-be exit code:
/// low 8 bits on normal exit, `128 + signal` when killed by a signal.
pub fn exit_code_for_status(exited: Option<i32>, signaled: Option<i32>) -> i32 {
    if let Some(code) = exited {
        code & 0xff
    } else if let Some(sig) = signaled {
        128 + sig
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_slot_forwards_unchanged() {
        let t = RewriteTable::new();
        assert_eq!(t.get(15), RewriteSlot::Unset);
    }

    #[test]
    fn rewrite_zero_sets_replacement_means_ignore() {
        let mut t = RewriteTable::new();
        t.set(15, 0);
        assert_eq!(t.get(15), RewriteSlot::Ignore);
    }

    #[test]
    fn bulk_rewrite_then_single_override() {
        let mut t = RewriteTable::new();
        t.set(0, 9);
        for s in 1..=MAXSIG {
            assert_eq!(t.get(s), RewriteSlot::Rewrite(9));
        }
        t.set(15, 2);
        assert_eq!(t.get(15), RewriteSlot::Rewrite(2));
        assert_eq!(t.get(2), RewriteSlot::Rewrite(9));
    }

    #[test]
    fn action_slot_round_trips_command() {
        let mut rewrite = RewriteTable::new();
        let mut actions = ActionTable::new();
        rewrite.set_action(10);
        actions.set(10, "echo hi".to_string());
        assert_eq!(rewrite.get(10), RewriteSlot::Action);
        assert_eq!(actions.get(10), Some("echo hi"));
    }

    #[test]
    fn default_to_sigstop_only_applies_when_unset() {
        let mut t = RewriteTable::new();
        t.set(libc::SIGTTIN, libc::SIGUSR1);
        t.default_to_sigstop_if_unset(libc::SIGTSTP);
        t.default_to_sigstop_if_unset(libc::SIGTTIN);
        assert_eq!(t.get(libc::SIGTSTP), RewriteSlot::Rewrite(libc::SIGSTOP));
        assert_eq!(t.get(libc::SIGTTIN), RewriteSlot::Rewrite(libc::SIGUSR1));
    }

    #[test]
    fn exit_code_translation() {
        assert_eq!(exit_code_for_status(Some(0), None), 0);
        assert_eq!(exit_code_for_status(Some(130), None), 130);
        assert_eq!(exit_code_for_status(None, Some(15)), 143);
        assert_eq!(exit_code_for_status(None, None), 1);
    }
}

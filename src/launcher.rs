//! Pre-fork signal masking, the fork itself, and the child's exec.
//!
//! Mirrors `guest-init`'s `sigaction`-based approach (not `signal()`, which
//! has non-portable reset-after-first-delivery semantics), generalized from
//! a handful of named signals to the full 1..=MAXSIG range the rewrite table
//! can address.

use std::ffi::CString;
use std::mem::MaybeUninit;

use crate::debug;
use crate::error::{Result, SupervisorError};
use crate::signals::MAXSIG;
use crate::warden_eprintln;

/// A no-op handler installed on every signal before the fork.
///
/// On some kernels a signal disposition of `SIG_IGN` cannot be synchronously
/// waited for with `sigtimedwait`; a real (if empty) handler keeps the
/// signal pending-and-deliverable while the process mask keeps it blocked.
extern "C" fn dummy_handler(_signum: libc::c_int) {}

/// Build a `sigset_t` containing every signal 1..=MAXSIG.
pub(crate) fn full_signal_set() -> libc::sigset_t {
    // SAFETY: `sigset` is a plain-old-data struct; zeroing then filling it
    // via libc calls below is the standard initialization pattern.
    let mut set: libc::sigset_t = unsafe { MaybeUninit::zeroed().assume_init() };
    // SAFETY: `set` is a valid, owned sigset_t.
    unsafe {
        libc::sigemptyset(&mut set);
        for sig in 1..=MAXSIG {
            libc::sigaddset(&mut set, sig);
        }
    }
    set
}

/// Block every signal 1..=MAXSIG in the calling thread, and install a dummy
/// handler on each so the kernel queues rather than discards them.
pub fn mask_and_arm_signals() {
    let all = full_signal_set();
    // SAFETY: `all` is a valid, fully-initialized sigset_t.
    unsafe {
        libc::sigprocmask(libc::SIG_BLOCK, &all, std::ptr::null_mut());
    }

    for sig in 1..=MAXSIG {
        let mut sa: libc::sigaction = unsafe { MaybeUninit::zeroed().assume_init() };
        sa.sa_sigaction = dummy_handler as *const () as libc::sighandler_t;
        sa.sa_flags = libc::SA_RESTART;
        // SAFETY: `sa` is fully initialized; `sig` is in 1..=MAXSIG.
        unsafe {
            libc::sigaction(sig, &sa, std::ptr::null_mut());
        }
    }
}

/// Unblock every signal 1..=MAXSIG. Called in the forked child right before
/// it execs, so the supervised program starts with the normal default mask.
pub fn unmask_signals() {
    let all = full_signal_set();
    // SAFETY: `all` is a valid, fully-initialized sigset_t.
    unsafe {
        libc::sigprocmask(libc::SIG_UNBLOCK, &all, std::ptr::null_mut());
    }
}

/// Best-effort detach from the controlling terminal. Failure is not fatal:
/// it just means job-control signals may still reach us via the old TTY.
pub fn detach_controlling_tty() {
    // SAFETY: STDIN_FILENO is always a valid fd number to pass to ioctl,
    // even if stdin itself is closed (ioctl then fails, which we ignore).
    let rc = unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCNOTTY) };
    if rc == -1 {
        debug!(
            "Unable to detach from controlling tty (errno={}).",
            std::io::Error::last_os_error()
        );
    }
}

/// Best-effort acquisition of the new session's controlling TTY. Called in
/// the child after `setsid()`.
fn attach_controlling_tty() {
    // SAFETY: STDIN_FILENO is a valid fd number; the third ioctl argument
    // is unused for TIOCSCTTY and conventionally passed as 0.
    let rc = unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY, 0) };
    if rc == -1 {
        debug!(
            "Unable to attach to controlling tty (errno={}).",
            std::io::Error::last_os_error()
        );
    }
}

/// Outcome of [`fork_and_exec`] in the parent: the child's PID.
pub struct Launched {
    pub child_pid: libc::pid_t,
}

/// Fork once. The child unmasks signals, optionally creates a new session,
/// and execs `command`; on exec failure it exits with code 2 (never
/// returns). The parent returns with the child's PID.
pub fn fork_and_exec(command: &[String], use_setsid: bool) -> Result<Launched> {
    // SAFETY: fork() is called with no other threads running (the
    // supervisor is single-threaded throughout its lifetime) and before any
    // async-signal-unsafe state has been set up in a way that would matter
    // across the fork.
    let child_pid = unsafe { libc::fork() };
    if child_pid < 0 {
        return Err(SupervisorError::Launch("fork() failed".to_string()));
    }

    if child_pid == 0 {
        unmask_signals();

        if use_setsid {
            // SAFETY: setsid() takes no arguments and is always safe to call.
            if unsafe { libc::setsid() } == -1 {
                warden_eprintln!(
                    "Unable to setsid (errno={}). Exiting.",
                    std::io::Error::last_os_error()
                );
                std::process::exit(1);
            }
            attach_controlling_tty();
            debug!("setsid complete.");
        }

        exec_command(command);
        // exec_command never returns on success.
        std::process::exit(2);
    }

    debug!("Child spawned with PID {child_pid}.");
    Ok(Launched { child_pid })
}

/// Replace the current process image with `command`. Returns only on
/// failure (the caller is expected to exit(2) afterwards).
fn exec_command(command: &[String]) {
    let Some(program) = command.first() else {
        warden_eprintln!("no command given");
        return;
    };
    let c_strings: Option<Vec<CString>> = command
        .iter()
        .map(|s| CString::new(s.as_bytes()).ok())
        .collect();
    let Some(c_strings) = c_strings else {
        warden_eprintln!("command or one of its arguments contains a NUL byte");
        return;
    };
    let mut c_ptrs: Vec<*const libc::c_char> = c_strings.iter().map(|s| s.as_ptr()).collect();
    let argv0 = *c_ptrs.first().unwrap_or(&std::ptr::null());
    c_ptrs.push(std::ptr::null());

    // SAFETY: every element of `c_ptrs` points at a `CString` kept alive in
    // `c_strings` for the duration of this call, and `c_ptrs` is itself NUL
    // terminated; `argv0` is the program name `execvp` looks up.
    unsafe {
        libc::execvp(argv0, c_ptrs.as_ptr());
    }
    // Only reached if execvp failed.
    warden_eprintln!("{}: {}", program, std::io::Error::last_os_error());
}

//! Spawns the subprocess for an `ACTION` signal slot.
//!
//! The action runs through `/bin/sh -c`, unmasking all signals first since
//! it is an ordinary subprocess, not the PID 1 supervisor. The supervisor
//! never waits on it synchronously; its exit is reaped like any other
//! descendant through the normal SIGCHLD path.

use std::ffi::CString;

use crate::launcher::unmask_signals;
use crate::warden_eprintln;

pub fn spawn(command: &str) {
    // SAFETY: fork() is safe here for the same reason as in the launcher:
    // the process is single-threaded.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        warden_eprintln!("Unable to fork for action. Skipping.");
        return;
    }
    if pid != 0 {
        // Parent: nothing more to do, the pump will reap this PID later.
        return;
    }

    unmask_signals();

    let Ok(shell) = CString::new("/bin/sh") else {
        std::process::exit(1);
    };
    let Ok(flag) = CString::new("-c") else {
        std::process::exit(1);
    };
    let Ok(cmd) = CString::new(command) else {
        warden_eprintln!("action command contains a NUL byte");
        std::process::exit(1);
    };
    let argv: [*const libc::c_char; 4] = [shell.as_ptr(), flag.as_ptr(), cmd.as_ptr(), std::ptr::null()];

    // SAFETY: every pointer in `argv` refers to a live CString on this
    // stack frame, and the array is NUL terminated as execvp requires.
    unsafe {
        libc::execvp(shell.as_ptr(), argv.as_ptr());
    }
    warden_eprintln!(
        "Could not exec {command}: {}",
        std::io::Error::last_os_error()
    );
    std::process::exit(1);
}

//! Command-line parsing and the immutable [`Config`] it produces.
//!
//! `-r`/`-a` options are order-sensitive relative to *each other* (a later
//! `-a 10:cmd` must win over an earlier `-r 10:2` for the same signal, and
//! vice versa), which clap's derive API can't express across two separate
//! `Vec` fields. The builder API's `indices_of` gives back each option's
//! position in argv, so the fold below replays the options in the order the
//! user actually gave them.

use clap::{Arg, ArgAction, Command};

use crate::error::{Result, SupervisorError};
use crate::signals::{ActionTable, RewriteTable, MAXSIG};

/// Immutable, built once before the fork, read by the pump and handler
/// without any further synchronization.
pub struct Config {
    pub rewrite: RewriteTable,
    pub actions: ActionTable,
    pub use_setsid: bool,
    pub survive_bereaving: bool,
    pub debug: bool,
    pub command: Vec<String>,
}

fn parse_pair(arg: &str, max_first: i32) -> Option<(i32, String)> {
    let (first, rest) = arg.split_once(':')?;
    let signum: i32 = first.parse().ok()?;
    if !(0..=max_first).contains(&signum) {
        return None;
    }
    Some((signum, rest.to_string()))
}

fn cli() -> Command {
    Command::new("warden")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Minimal PID 1 process supervisor: forwards signals, reaps zombies")
        .arg(
            Arg::new("single-child")
                .short('c')
                .long("single-child")
                .action(ArgAction::SetTrue)
                .help("Run in single-child mode: signal only the direct child, not its group"),
        )
        .arg(
            Arg::new("survive-bereaving")
                .short('b')
                .long("survive-bereaving")
                .action(ArgAction::SetTrue)
                .help("Do not quit when the direct child dies"),
        )
        .arg(
            Arg::new("rewrite")
                .short('r')
                .long("rewrite")
                .value_name("S:R")
                .action(ArgAction::Append)
                .help("Rewrite received signal S to R (R=0 drops it; S=0 rewrites all)"),
        )
        .arg(
            Arg::new("action")
                .short('a')
                .long("action")
                .value_name("S:cmd")
                .action(ArgAction::Append)
                .help("Run cmd instead of forwarding when signal S arrives"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print debug traces to stderr"),
        )
        .arg(
            Arg::new("command")
                .required(true)
                .num_args(1..)
                .trailing_var_arg(true)
                .help("Program to run as the direct child, and its arguments"),
        )
}

/// Parse `args` (normally `std::env::args()`) plus the environment into a
/// [`Config`]. `args[0]` is the program name, matching `std::env::args()`.
pub fn parse<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = match cli().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            // `-h`/`--help` and `-V`/`--version` print their text and exit 0,
            // matching the distilled spec's CLI contract exactly.
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => return Err(SupervisorError::Config(e.to_string())),
    };

    let mut rewrite = RewriteTable::new();
    let mut actions = ActionTable::new();

    let mut ops: Vec<(usize, bool, String)> = Vec::new();
    if let Some(indices) = matches.indices_of("rewrite") {
        if let Some(values) = matches.get_many::<String>("rewrite") {
            ops.extend(indices.zip(values).map(|(i, v)| (i, false, v.clone())));
        }
    }
    if let Some(indices) = matches.indices_of("action") {
        if let Some(values) = matches.get_many::<String>("action") {
            ops.extend(indices.zip(values).map(|(i, v)| (i, true, v.clone())));
        }
    }
    ops.sort_by_key(|(idx, _, _)| *idx);

    for (_, is_action, raw) in ops {
        if is_action {
            let (signum, cmd) = parse_pair(&raw, MAXSIG).ok_or_else(|| {
                SupervisorError::Config(format!(
                    "-a takes <signum>:<command>, signum between 1 and {MAXSIG}: {raw:?}"
                ))
            })?;
            if signum == 0 {
                return Err(SupervisorError::Config(
                    "-a requires signum between 1 and MAXSIG, got 0".to_string(),
                ));
            }
            rewrite.set_action(signum);
            actions.set(signum, cmd);
        } else {
            let (signum, replacement_str) = parse_pair(&raw, MAXSIG).ok_or_else(|| {
                SupervisorError::Config(format!(
                    "-r takes <signum>:<signum>, both between 0 and {MAXSIG}: {raw:?}"
                ))
            })?;
            let replacement: i32 = replacement_str.parse().map_err(|_| {
                SupervisorError::Config(format!(
                    "-r takes <signum>:<signum>, both between 0 and {MAXSIG}: {raw:?}"
                ))
            })?;
            if !(0..=MAXSIG).contains(&replacement) {
                return Err(SupervisorError::Config(format!(
                    "-r replacement signum out of range 0..={MAXSIG}: {replacement}"
                )));
            }
            rewrite.set(signum, replacement);
        }
    }

    let mut use_setsid = !matches.get_flag("single-child");
    let survive_bereaving = matches.get_flag("survive-bereaving");
    let mut debug = matches.get_flag("verbose");

    if std::env::var("DEBUG").as_deref() == Ok("1") {
        debug = true;
    }
    if std::env::var("SETSID").as_deref() == Ok("0") {
        use_setsid = false;
    }

    if use_setsid {
        rewrite.default_to_sigstop_if_unset(libc::SIGTSTP);
        rewrite.default_to_sigstop_if_unset(libc::SIGTTOU);
        rewrite.default_to_sigstop_if_unset(libc::SIGTTIN);
    }

    let command: Vec<String> = matches
        .get_many::<String>("command")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();
    if command.is_empty() {
        return Err(SupervisorError::Config("no command given to run".to_string()));
    }

    Ok(Config {
        rewrite,
        actions,
        use_setsid,
        survive_bereaving,
        debug,
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::RewriteSlot;

    fn parse_vec(args: &[&str]) -> Result<Config> {
        let mut full = vec!["warden"];
        full.extend_from_slice(args);
        parse(full)
    }

    #[test]
    fn single_child_disables_setsid() {
        let cfg = parse_vec(&["-c", "sleep", "60"]).unwrap();
        assert!(!cfg.use_setsid);
        assert_eq!(cfg.command, vec!["sleep", "60"]);
    }

    #[test]
    fn setsid_mode_defaults_tty_signals_to_sigstop() {
        let cfg = parse_vec(&["sleep", "60"]).unwrap();
        assert_eq!(
            cfg.rewrite.get(libc::SIGTSTP),
            RewriteSlot::Rewrite(libc::SIGSTOP)
        );
        assert_eq!(
            cfg.rewrite.get(libc::SIGTTOU),
            RewriteSlot::Rewrite(libc::SIGSTOP)
        );
        assert_eq!(
            cfg.rewrite.get(libc::SIGTTIN),
            RewriteSlot::Rewrite(libc::SIGSTOP)
        );
    }

    #[test]
    fn explicit_rewrite_of_tty_signal_is_not_overridden() {
        let cfg = parse_vec(&["-r", "20:10", "sleep", "60"]).unwrap();
        assert_eq!(cfg.rewrite.get(libc::SIGTSTP), RewriteSlot::Rewrite(10));
    }

    #[test]
    fn rewrite_and_action_interleave_in_argv_order() {
        let cfg = parse_vec(&["-a", "10:echo hi", "-r", "10:2", "sleep", "60"]).unwrap();
        assert_eq!(cfg.rewrite.get(10), RewriteSlot::Rewrite(2));

        let cfg2 = parse_vec(&["-r", "10:2", "-a", "10:echo hi", "sleep", "60"]).unwrap();
        assert_eq!(cfg2.rewrite.get(10), RewriteSlot::Action);
        assert_eq!(cfg2.actions.get(10), Some("echo hi"));
    }

    #[test]
    fn bulk_rewrite_zero_applies_to_all_then_override() {
        let cfg = parse_vec(&["-r", "0:9", "-r", "15:2", "sleep", "60"]).unwrap();
        assert_eq!(cfg.rewrite.get(15), RewriteSlot::Rewrite(2));
        assert_eq!(cfg.rewrite.get(3), RewriteSlot::Rewrite(9));
    }

    #[test]
    fn malformed_rewrite_is_rejected() {
        assert!(parse_vec(&["-r", "bogus", "sleep", "60"]).is_err());
        assert!(parse_vec(&["-r", "999:1", "sleep", "60"]).is_err());
    }

    #[test]
    fn missing_command_is_rejected() {
        assert!(parse_vec(&["-v"]).is_err());
    }

    #[test]
    fn survive_bereaving_flag() {
        let cfg = parse_vec(&["-b", "sleep", "60"]).unwrap();
        assert!(cfg.survive_bereaving);
    }
}

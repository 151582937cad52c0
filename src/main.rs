use warden::error::SupervisorError;
use warden::handler::SupervisorState;
use warden::warden_eprintln;
use warden::{config, debug, launcher, pump};

fn main() {
    let cfg = match config::parse(std::env::args()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warden_eprintln!("{e}");
            std::process::exit(1);
        }
    };

    debug::set_enabled(cfg.debug);
    if cfg.debug {
        debug!("Running in debug mode.");
    }

    launcher::mask_and_arm_signals();

    if cfg.use_setsid {
        launcher::detach_controlling_tty();
    }

    let launched = match launcher::fork_and_exec(&cfg.command, cfg.use_setsid) {
        Ok(launched) => launched,
        Err(SupervisorError::Launch(msg)) => {
            warden_eprintln!("{msg}");
            std::process::exit(1);
        }
        Err(e) => {
            warden_eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let state = SupervisorState::new(launched.child_pid);
    pump::run(&cfg, state);
}

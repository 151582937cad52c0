//! Error types for the supervisor.

/// Covers every failure mode that can terminate the supervisor before or
/// during normal operation. Exit-code mapping lives in `main.rs`, not here,
/// so this type stays a plain description of what went wrong.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("launch error: {0}")]
    Launch(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("signal wait returned an unexpected error (this is a bug): {0}")]
    SignalWaitBug(String),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

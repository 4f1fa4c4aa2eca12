//! Spacebot error type.

/// Errors surfaced by Spacebot crates.
#[derive(Debug, thiserror::Error)]
pub enum SpacebotError {
    /// Configuration load/parse/save failure.
    #[error("Config error: {0}")]
    Config(String),

    /// Storage (SQLite) failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Chat platform API failure (send, member enumeration).
    #[error("Chat API error: {0}")]
    Chat(String),

    /// Scheduler failure (bad schedule, arming problem).
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpacebotError>;

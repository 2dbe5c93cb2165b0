//! Unified infrastructure error type.
//!
//! Business-rule failures (insufficient funds, already resolved games, ...) are
//! not represented here: each core module returns its own typed error inside an
//! [`Outcome`]. This enum only carries faults with no well-defined business
//! response, such as storage being unavailable or retries being exhausted.

use thiserror::Error;

/// Infrastructure-level failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Storage error that was not retried (or not retryable)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Serializable transaction kept conflicting until the attempt cap was hit
    #[error("Transaction retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last storage error seen
        source: sea_orm::DbErr,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Message rendering failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type for infrastructure failures.
pub type Result<T> = std::result::Result<T, Error>;

/// Business-level result: `Ok` on success, `Err` with a typed, recoverable reason.
pub type Outcome<T, E> = std::result::Result<T, E>;

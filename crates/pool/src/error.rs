use thiserror::Error;

/// Errors surfaced by the pool configurator.
///
/// Nothing is logged or swallowed here; every failure goes back to the caller.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection initialization error: {message}")]
    ConnectionInitialization {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("Connection acquisition error: {0}")]
    ConnectionAcquisition(#[source] sqlx::Error),

    /// Failure on an already leased connection (transaction control, ping, close).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;

//! Unified error handling for the worker.
//!
//! Only startup failures surface as [`WorkerError`]; per-message failures are
//! logged inside the consumer loops and never reach this type.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::config::ConfigError;
use crate::db::RepositoryError;

/// Fatal worker error. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Broker unreachable or topology rejected.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Store unreachable.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed during startup.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A consumer loop stopped before shutdown was requested.
    #[error("consumer loop for {0} exited unexpectedly")]
    ConsumerExited(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_error_display() {
        let err = WorkerError::from(ConfigError::MissingEnvVar("RABBITMQ_URL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: RABBITMQ_URL"
        );

        let err = WorkerError::ConsumerExited("shipment.created".to_string());
        assert_eq!(
            err.to_string(),
            "consumer loop for shipment.created exited unexpectedly"
        );
    }
}

//! Event re-publishing command.
//!
//! Recovery path for messages the worker dropped: the payload is checked
//! with the worker's own decoder, then published to the event's queue.
//!
//! # Environment Variables
//!
//! - `RABBITMQ_URL` - AMQP broker URL

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use shipline_core::EventKind;
use shipline_worker::broker::{self, BrokerError};
use shipline_worker::config::RetryPolicy;
use shipline_worker::decode::{self, DecodeError};
use tokio::io::AsyncReadExt;

const CONNECTION_NAME: &str = "shipline-cli";
const AMQP_REPLY_SUCCESS: u16 = 200;

/// Errors from the publish command.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Failed to read payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload rejected by the {kind} decoder: {source}")]
    Invalid {
        kind: EventKind,
        #[source]
        source: DecodeError,
    },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
}

/// Read a payload, validate it and publish it to `kind`'s queue.
///
/// # Errors
///
/// Returns `PublishError` if the payload cannot be read or decoded, or the
/// broker rejects the message.
pub async fn run(kind: EventKind, file: Option<&Path>, validate: bool) -> Result<(), PublishError> {
    dotenvy::dotenv().ok();

    let broker_url = std::env::var("RABBITMQ_URL")
        .map(SecretString::from)
        .map_err(|_| PublishError::MissingEnvVar("RABBITMQ_URL"))?;

    let body = read_payload(file).await?;
    if validate {
        decode::decode(kind, &body).map_err(|source| PublishError::Invalid { kind, source })?;
        tracing::info!(queue = %kind, "Payload decodes cleanly");
    }

    let policy = RetryPolicy {
        attempts: 3,
        delay: Duration::from_secs(1),
    };
    let connection = broker::connect_with_retry(&broker_url, policy, CONNECTION_NAME).await?;
    let channel = connection
        .create_channel()
        .await
        .map_err(BrokerError::Channel)?;

    broker::declare_queue(&channel, kind).await?;
    broker::publish_event(&channel, kind, &body).await?;

    // Best effort; the message is already with the broker.
    let _ = channel.close(AMQP_REPLY_SUCCESS, "done").await;
    let _ = connection.close(AMQP_REPLY_SUCCESS, "done").await;
    Ok(())
}

async fn read_payload(file: Option<&Path>) -> Result<Vec<u8>, std::io::Error> {
    match file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Reading payload from file");
            tokio::fs::read(path).await
        }
        None => {
            let mut body = Vec::new();
            tokio::io::stdin().read_to_end(&mut body).await?;
            Ok(body)
        }
    }
}

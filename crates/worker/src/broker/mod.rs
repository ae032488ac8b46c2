//! AMQP broker plumbing: connection management, queue topology and
//! re-publishing.
//!
//! The worker holds a single [`lapin::Connection`] and opens one channel per
//! consumer loop, so a slow queue never head-of-line blocks another.

pub mod connection;
pub mod publish;
pub mod topology;

use thiserror::Error;

pub use connection::{connect_with_retry, retry_fixed};
pub use publish::{event_properties, publish_event};
pub use topology::{QueueSubscription, consume_options, declare_queue, queue_options, subscribe};

/// Errors raised by broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Every connection attempt failed.
    #[error("could not connect to broker after {attempts} attempts: {source}")]
    Connect {
        /// Attempts made before giving up.
        attempts: u32,
        #[source]
        source: lapin::Error,
    },

    /// Opening or configuring a channel failed.
    #[error("channel error: {0}")]
    Channel(#[source] lapin::Error),

    /// Queue declaration was rejected, e.g. incompatible properties.
    #[error("failed to declare queue {queue}: {source}")]
    Declare {
        /// Queue name.
        queue: &'static str,
        #[source]
        source: lapin::Error,
    },

    /// Registering the consumer failed.
    #[error("failed to consume from {queue}: {source}")]
    Consume {
        /// Queue name.
        queue: &'static str,
        #[source]
        source: lapin::Error,
    },

    /// The delivery stream reported an error.
    #[error("delivery stream error: {0}")]
    Stream(#[source] lapin::Error),

    /// Publishing a message failed.
    #[error("failed to publish to {queue}: {source}")]
    Publish {
        /// Queue name used as routing key.
        queue: String,
        #[source]
        source: lapin::Error,
    },
}

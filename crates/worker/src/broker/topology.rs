//! Queue topology: one durable queue per event kind.
//!
//! Every queue is declared with the same properties the producers use:
//! durable, not auto-deleted, not exclusive. Redeclaring an existing queue
//! with these properties is a no-op on the broker; a queue that already
//! exists with different properties makes the broker close the channel with
//! `PRECONDITION_FAILED`, which surfaces here as a fatal startup error.

use lapin::options::{BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, Consumer, Queue};
use shipline_core::EventKind;
use tracing::{debug, info};
use uuid::Uuid;

use super::BrokerError;
use crate::config::AckMode;

/// Unacked deliveries a channel may hold in `AfterPersist` mode.
const MANUAL_ACK_PREFETCH: u16 = 32;

/// Declaration options shared by every event queue.
#[must_use]
pub fn queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        passive: false,
        durable: true,
        exclusive: false,
        auto_delete: false,
        nowait: false,
    }
}

/// Consume options for the configured acknowledgement mode.
#[must_use]
pub fn consume_options(ack_mode: AckMode) -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_local: false,
        no_ack: matches!(ack_mode, AckMode::OnReceipt),
        exclusive: false,
        nowait: false,
    }
}

/// Declare the queue backing `kind` on `channel`.
///
/// # Errors
///
/// Returns `BrokerError::Declare` if the broker rejects the declaration.
pub async fn declare_queue(channel: &Channel, kind: EventKind) -> Result<Queue, BrokerError> {
    let queue = channel
        .queue_declare(kind.queue_name(), queue_options(), FieldTable::default())
        .await
        .map_err(|source| BrokerError::Declare {
            queue: kind.queue_name(),
            source,
        })?;

    info!(
        queue = %kind,
        messages = queue.message_count(),
        consumers = queue.consumer_count(),
        "Queue declared"
    );
    Ok(queue)
}

/// A declared queue with its dedicated channel, not yet consuming.
pub struct QueueSubscription {
    /// Event kind served by this queue.
    pub kind: EventKind,
    /// Channel owned by this queue's consumer loop.
    pub channel: Channel,
}

impl QueueSubscription {
    /// Start consuming. Call only after every queue has been declared.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::Consume` if the broker refuses the consumer.
    pub async fn consume(&self, ack_mode: AckMode) -> Result<Consumer, BrokerError> {
        let tag = format!("shipline-worker-{}-{}", self.kind.queue_name(), Uuid::new_v4());
        let consumer = self
            .channel
            .basic_consume(
                self.kind.queue_name(),
                &tag,
                consume_options(ack_mode),
                FieldTable::default(),
            )
            .await
            .map_err(|source| BrokerError::Consume {
                queue: self.kind.queue_name(),
                source,
            })?;

        debug!(queue = %self.kind, consumer_tag = %tag, ?ack_mode, "Consumer registered");
        Ok(consumer)
    }
}

/// Open a dedicated channel for `kind` and declare its queue.
///
/// # Errors
///
/// Returns `BrokerError::Channel` if the channel cannot be opened or
/// configured, `BrokerError::Declare` if the declaration is rejected.
pub async fn subscribe(
    connection: &Connection,
    kind: EventKind,
    ack_mode: AckMode,
) -> Result<QueueSubscription, BrokerError> {
    let channel = connection
        .create_channel()
        .await
        .map_err(BrokerError::Channel)?;

    if ack_mode == AckMode::AfterPersist {
        channel
            .basic_qos(MANUAL_ACK_PREFETCH, BasicQosOptions::default())
            .await
            .map_err(BrokerError::Channel)?;
    }

    declare_queue(&channel, kind).await?;
    Ok(QueueSubscription { kind, channel })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_options_are_durable_and_shared() {
        let options = queue_options();
        assert!(options.durable);
        assert!(!options.auto_delete);
        assert!(!options.exclusive);
        assert!(!options.passive);
    }

    #[test]
    fn test_consume_options_follow_ack_mode() {
        assert!(consume_options(AckMode::OnReceipt).no_ack);
        assert!(!consume_options(AckMode::AfterPersist).no_ack);
        assert!(!consume_options(AckMode::OnReceipt).exclusive);
    }
}

//! Re-publishing event payloads onto their queues.
//!
//! Used for manual recovery of messages the worker dropped. Messages go to
//! the default exchange with the queue name as routing key, exactly as the
//! upstream producers send them.

use lapin::options::BasicPublishOptions;
use lapin::publisher_confirm::Confirmation;
use lapin::{BasicProperties, Channel};
use shipline_core::EventKind;
use tracing::info;

use super::BrokerError;

/// AMQP delivery mode for messages that survive a broker restart.
pub const PERSISTENT_DELIVERY_MODE: u8 = 2;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Properties attached to every published event.
#[must_use]
pub fn event_properties() -> BasicProperties {
    BasicProperties::default()
        .with_content_type(JSON_CONTENT_TYPE.into())
        .with_delivery_mode(PERSISTENT_DELIVERY_MODE)
}

/// Publish `body` to the queue backing `kind`.
///
/// # Errors
///
/// Returns `BrokerError::Publish` if the broker rejects the message.
pub async fn publish_event(
    channel: &Channel,
    kind: EventKind,
    body: &[u8],
) -> Result<Confirmation, BrokerError> {
    let publish_error = |source: lapin::Error| BrokerError::Publish {
        queue: kind.queue_name().to_string(),
        source,
    };

    let confirmation = channel
        .basic_publish(
            "",
            kind.queue_name(),
            BasicPublishOptions::default(),
            body,
            event_properties(),
        )
        .await
        .map_err(publish_error)?
        .await
        .map_err(publish_error)?;

    info!(queue = %kind, bytes = body.len(), "Published event");
    Ok(confirmation)
}

//! Consumer loops: one supervised task per queue.
//!
//! Each queue moves through `Starting → Declared → Consuming` at startup and
//! then stays in `Consuming`. Inside that state every message goes
//! `received → decoded → persisted`, or is discarded at decode or persist.
//! No per-message failure ends a loop.

pub mod pipeline;
pub mod runner;
pub mod supervisor;

use std::fmt;

use futures::StreamExt;
use futures::stream::BoxStream;
use lapin::acker::Acker;
use lapin::message::Delivery;
use lapin::options::BasicAckOptions;
use shipline_core::EventKind;
use tracing::warn;

use crate::broker::BrokerError;
use crate::config::AckMode;

pub use pipeline::{Outcome, handle_message};
pub use runner::{LoopExit, LoopReport, LoopStats, run_consumer_loop};
pub use supervisor::{Supervisor, SupervisorSummary};

/// Startup state of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Starting,
    Declared,
    Consuming,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Starting => "starting",
            Self::Declared => "declared",
            Self::Consuming => "consuming",
        })
    }
}

/// A message handed to a consumer loop.
pub struct Inbound {
    body: Vec<u8>,
    acker: Option<Acker>,
}

impl Inbound {
    /// A message that needs no acknowledgement.
    #[must_use]
    pub const fn new(body: Vec<u8>) -> Self {
        Self { body, acker: None }
    }

    /// Wrap a broker delivery. In `OnReceipt` mode the broker has already
    /// settled it, so the acker is dropped.
    #[must_use]
    pub fn from_delivery(delivery: Delivery, ack_mode: AckMode) -> Self {
        let acker = match ack_mode {
            AckMode::OnReceipt => None,
            AckMode::AfterPersist => Some(delivery.acker),
        };
        Self {
            body: delivery.data,
            acker,
        }
    }

    /// Raw message body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Acknowledge the message if the broker is waiting for it.
    pub(crate) async fn settle(self, kind: EventKind) {
        if let Some(acker) = self.acker
            && let Err(e) = acker.ack(BasicAckOptions::default()).await
        {
            warn!(queue = %kind, error = %e, "Failed to acknowledge message");
        }
    }
}

impl fmt::Debug for Inbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbound")
            .field("bytes", &self.body.len())
            .field("needs_ack", &self.acker.is_some())
            .finish()
    }
}

/// Adapt a lapin consumer into the stream a consumer loop reads.
pub fn deliveries(
    consumer: lapin::Consumer,
    ack_mode: AckMode,
) -> BoxStream<'static, Result<Inbound, BrokerError>> {
    consumer
        .map(move |delivery| {
            delivery
                .map(|d| Inbound::from_delivery(d, ack_mode))
                .map_err(BrokerError::Stream)
        })
        .boxed()
}

//! The consumption loop for a single queue.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use shipline_core::EventKind;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::{Inbound, Outcome, QueueState, handle_message};
use crate::broker::BrokerError;
use crate::db::EventStore;

/// Why a loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown was requested; the in-flight message was finished first.
    Shutdown,
    /// The broker stream ended on its own (channel or connection closed).
    StreamClosed,
}

/// Per-loop message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub received: u64,
    pub persisted: u64,
    pub not_found: u64,
    pub decode_failed: u64,
    pub store_failed: u64,
    pub stream_errors: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: Outcome) {
        self.received += 1;
        match outcome {
            Outcome::Persisted => self.persisted += 1,
            Outcome::NotFound => self.not_found += 1,
            Outcome::DecodeFailed => self.decode_failed += 1,
            Outcome::StoreFailed => self.store_failed += 1,
        }
    }

    /// Messages dropped without writing anything.
    #[must_use]
    pub const fn discarded(&self) -> u64 {
        self.not_found + self.decode_failed + self.store_failed
    }
}

/// Final state of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub kind: EventKind,
    pub exit: LoopExit,
    pub stats: LoopStats,
}

/// Consume `deliveries` until shutdown or until the stream ends.
///
/// Messages are handled one at a time in delivery order. The loop waits only
/// on its own stream and its own store calls. Cancellation is checked between
/// messages, never in the middle of one, so a message that was received is
/// always carried through to its outcome.
#[instrument(skip_all, fields(queue = %kind))]
pub async fn run_consumer_loop<S, M>(
    kind: EventKind,
    mut deliveries: M,
    store: Arc<S>,
    shutdown: CancellationToken,
) -> LoopReport
where
    S: EventStore,
    M: Stream<Item = Result<Inbound, BrokerError>> + Unpin + Send,
{
    let mut stats = LoopStats::default();
    info!(state = %QueueState::Consuming, "Consumer loop started");

    let exit = loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => break LoopExit::Shutdown,
            next = deliveries.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                stats.stream_errors += 1;
                error!(error = %e, "Delivery stream error");
                continue;
            }
            None => break LoopExit::StreamClosed,
        };

        let outcome = handle_message(kind, message.body(), store.as_ref()).await;
        stats.record(outcome);
        message.settle(kind).await;
    };

    match exit {
        LoopExit::Shutdown => info!(
            received = stats.received,
            persisted = stats.persisted,
            discarded = stats.discarded(),
            "Consumer loop stopped"
        ),
        LoopExit::StreamClosed => warn!(
            received = stats.received,
            persisted = stats.persisted,
            discarded = stats.discarded(),
            "Delivery stream closed by broker"
        ),
    }

    LoopReport { kind, exit, stats }
}

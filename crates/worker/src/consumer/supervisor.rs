//! Supervision of the per-queue consumer tasks.
//!
//! All loops observe one [`CancellationToken`]. The supervisor waits until
//! either shutdown is requested or some loop stops on its own; in the second
//! case it cancels the others, because a worker missing a queue should be
//! restarted rather than limp along. Either way it then waits up to a grace
//! period for the loops to drain and aborts whatever is left.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use shipline_core::EventKind;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{Inbound, LoopExit, LoopReport, run_consumer_loop};
use crate::broker::BrokerError;
use crate::db::EventStore;

/// What the supervised loops did before the supervisor returned.
#[derive(Debug, Default)]
pub struct SupervisorSummary {
    /// Reports of loops that returned normally.
    pub reports: Vec<LoopReport>,
    /// First loop that stopped before shutdown was requested, if any.
    pub unexpected_exit: Option<EventKind>,
    /// Loops that panicked or had to be aborted.
    pub lost_tasks: usize,
}

impl SupervisorSummary {
    /// Whether every loop stopped because shutdown was requested.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.unexpected_exit.is_none() && self.lost_tasks == 0
    }
}

/// Owns one task per consumed queue.
pub struct Supervisor {
    tasks: JoinSet<LoopReport>,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Create a supervisor whose loops stop when `shutdown` is cancelled.
    #[must_use]
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            shutdown,
        }
    }

    /// Number of loops currently supervised.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no loop has been spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn the consumer loop for `kind`.
    pub fn spawn<S, M>(&mut self, kind: EventKind, deliveries: M, store: Arc<S>)
    where
        S: EventStore,
        M: Stream<Item = Result<Inbound, BrokerError>> + Unpin + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.tasks
            .spawn(run_consumer_loop(kind, deliveries, store, shutdown));
    }

    /// Wait for shutdown (or an unexpected loop exit), then drain.
    pub async fn run_until_shutdown(mut self, grace: Duration) -> SupervisorSummary {
        let mut summary = SupervisorSummary::default();

        tokio::select! {
            () = self.shutdown.cancelled() => {
                info!(loops = self.tasks.len(), "Shutdown requested, draining consumer loops");
            }
            Some(joined) = self.tasks.join_next() => {
                if let Some(kind) = record(&mut summary, joined) {
                    error!(queue = %kind, "Consumer loop exited before shutdown, stopping worker");
                }
                self.shutdown.cancel();
            }
        }

        let deadline = Instant::now() + grace;
        loop {
            match tokio::time::timeout_at(deadline, self.tasks.join_next()).await {
                Ok(Some(joined)) => {
                    record(&mut summary, joined);
                }
                Ok(None) => break,
                Err(_) => {
                    let remaining = self.tasks.len();
                    warn!(remaining, ?grace, "Consumer loops did not drain in time, aborting");
                    summary.lost_tasks += remaining;
                    self.tasks.abort_all();
                    while self.tasks.join_next().await.is_some() {}
                    break;
                }
            }
        }

        summary
    }
}

/// Record a joined task. Returns the loop's kind if it ended on its own.
fn record(
    summary: &mut SupervisorSummary,
    joined: Result<LoopReport, JoinError>,
) -> Option<EventKind> {
    match joined {
        Ok(report) => {
            let unexpected = (report.exit == LoopExit::StreamClosed).then_some(report.kind);
            if let Some(kind) = unexpected {
                summary.unexpected_exit.get_or_insert(kind);
            }
            summary.reports.push(report);
            unexpected
        }
        Err(e) => {
            error!(error = %e, "Consumer loop task failed");
            summary.lost_tasks += 1;
            None
        }
    }
}

//! Worker context: the connections every consumer loop shares.
//!
//! Built once at startup and passed down explicitly. It owns the store pool
//! and the broker connection, plus the per-queue channels once consumers
//! have started, and closes all of them on shutdown.

use std::sync::Arc;

use lapin::{Channel, Connection};
use shipline_core::EventKind;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker;
use crate::config::WorkerConfig;
use crate::consumer::{self, QueueState, Supervisor};
use crate::db::{self, EventStore};
use crate::error::WorkerError;

const CONNECTION_NAME: &str = "shipline-worker";
const AMQP_REPLY_SUCCESS: u16 = 200;

/// Connections and configuration shared by all consumer loops.
pub struct WorkerContext {
    config: WorkerConfig,
    pool: PgPool,
    connection: Connection,
    channels: Vec<Channel>,
}

impl WorkerContext {
    /// Connect to the store (applying migrations if enabled), then to the
    /// broker with the configured retry policy.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError` if the store is unreachable, a migration fails,
    /// or the broker stays unreachable after every retry.
    pub async fn connect(config: WorkerConfig) -> Result<Self, WorkerError> {
        let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
        info!(max_connections = config.database_max_connections, "Database pool created");

        if config.run_migrations {
            db::run_migrations(&pool).await?;
        } else {
            info!("Skipping migrations (WORKER_RUN_MIGRATIONS=false)");
        }

        let connection =
            broker::connect_with_retry(&config.broker_url, config.broker_retry, CONNECTION_NAME)
                .await?;

        Ok(Self {
            config,
            pool,
            connection,
            channels: Vec::new(),
        })
    }

    /// Store pool shared by all loops.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Declare every queue, then start one supervised loop per queue.
    ///
    /// No queue is consumed until all of them are declared.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::Broker` if a channel cannot be opened, a queue
    /// declaration is rejected, or a consumer cannot be registered.
    pub async fn start_consumers<S: EventStore>(
        &mut self,
        store: Arc<S>,
        shutdown: CancellationToken,
    ) -> Result<Supervisor, WorkerError> {
        let ack_mode = self.config.ack_mode;

        let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());
        for kind in EventKind::ALL {
            debug!(queue = %kind, state = %QueueState::Starting, "Opening channel");
            let subscription = broker::subscribe(&self.connection, kind, ack_mode).await?;
            debug!(queue = %kind, state = %QueueState::Declared, "Queue ready");
            subscriptions.push(subscription);
        }

        let mut supervisor = Supervisor::new(shutdown);
        for subscription in subscriptions {
            let consumer = subscription.consume(ack_mode).await?;
            supervisor.spawn(
                subscription.kind,
                consumer::deliveries(consumer, ack_mode),
                Arc::clone(&store),
            );
            self.channels.push(subscription.channel);
        }

        info!(queues = supervisor.len(), ?ack_mode, "Worker consuming");
        Ok(supervisor)
    }

    /// Close channels, the broker connection and the pool, in that order.
    pub async fn close(self) {
        for channel in &self.channels {
            if let Err(e) = channel.close(AMQP_REPLY_SUCCESS, "worker shutdown").await {
                debug!(error = %e, "Channel already closed");
            }
        }
        if let Err(e) = self
            .connection
            .close(AMQP_REPLY_SUCCESS, "worker shutdown")
            .await
        {
            warn!(error = %e, "Failed to close broker connection cleanly");
        }
        self.pool.close().await;
        info!("Connections closed");
    }
}

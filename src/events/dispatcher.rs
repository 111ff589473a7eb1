//! Bounded background publishing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::schema::EventsConfig;
use crate::events::{BridgeEvent, EventPublisher, PublishError};
use crate::resilience::{BackoffPolicy, CallContext, RetryError, RetryExecutor};

/// Runs each publish as a tracked task with its own retry policy.
pub struct EventDispatcher {
    publisher: Arc<dyn EventPublisher>,
    limiter: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    retry: RetryExecutor,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn EventPublisher>, config: &EventsConfig) -> Self {
        let delay = Duration::from_millis(config.retry_delay_ms);
        let retry = RetryExecutor::new(
            config.max_attempts.saturating_sub(1),
            BackoffPolicy {
                initial: delay,
                multiplier: 1.0,
                max: delay,
                jitter_ratio: 0.0,
            },
        );
        Self::with_retry(publisher, config.max_in_flight, retry)
    }

    pub fn with_retry(publisher: Arc<dyn EventPublisher>, max_in_flight: usize, retry: RetryExecutor) -> Self {
        Self {
            publisher,
            limiter: Arc::new(Semaphore::new(max_in_flight)),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            retry,
        }
    }

    /// Publishes currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start publishing `event` in the background.
    ///
    /// Fails fast with [`PublishError::Saturated`] when the in-flight limit
    /// is reached, or [`PublishError::ShuttingDown`] after [`shutdown`](Self::shutdown).
    pub fn dispatch(&self, event: BridgeEvent) -> Result<PublishHandle, PublishError> {
        if self.tracker.is_closed() || self.shutdown.is_cancelled() {
            return Err(PublishError::ShuttingDown);
        }
        let permit = Arc::clone(&self.limiter).try_acquire_owned().map_err(|_| {
            tracing::warn!(
                event_id = %event.event_id,
                event_type = event.event_type,
                correlation_id = %event.correlation_id,
                "Event dropped: publisher saturated"
            );
            PublishError::Saturated
        })?;

        let token = self.shutdown.child_token();
        let ctx = CallContext::with_correlation_id(event.correlation_id.clone()).with_token(token.clone());
        let publisher = Arc::clone(&self.publisher);
        let retry = self.retry.clone();
        let event_id = event.event_id;

        let join = self.tracker.spawn(async move {
            let _permit = permit;
            let (ctx, publisher, event) = (&ctx, &publisher, &event);
            let attempt = move |_| async move {
                ctx.run(publisher.publish(event))
                    .await
                    .unwrap_or_else(|reason| Err(PublishError::Cancelled(reason)))
            };
            match retry.execute(ctx, attempt).await {
                Ok(()) => {
                    tracing::debug!(event_id = %event.event_id, event_type = event.event_type, "Event delivered");
                    Ok(())
                }
                Err(err) => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        event_type = event.event_type,
                        correlation_id = %event.correlation_id,
                        error = %err,
                        "Event publish failed"
                    );
                    Err(match err {
                        RetryError::Cancelled(reason) => PublishError::Cancelled(reason),
                        RetryError::Permanent(e) | RetryError::Exhausted { last: e, .. } => e,
                    })
                }
            }
        });

        Ok(PublishHandle { event_id, token, join })
    }

    /// Refuse new events and wait up to `grace` for running ones.
    ///
    /// Returns `false` if publishes had to be cancelled.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            tracing::info!(drained = pending, "Event dispatcher drained");
            return true;
        }

        tracing::warn!(remaining = self.tracker.len(), "Cancelling undelivered events");
        self.shutdown.cancel();
        self.tracker.wait().await;
        false
    }
}

/// Completion signal of one background publish.
#[derive(Debug)]
pub struct PublishHandle {
    event_id: Uuid,
    token: CancellationToken,
    join: JoinHandle<Result<(), PublishError>>,
}

impl PublishHandle {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Abort the publish, including any pending retry sleep.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the publish to finish.
    pub async fn wait(self) -> Result<(), PublishError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(PublishError::Unavailable(format!("publish task failed: {}", e))),
        }
    }
}

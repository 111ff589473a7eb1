//! Operation events announced after successful mutating calls.
//!
//! # Data Flow
//! ```text
//! Bridge (successful CreateEntry, CancelClaim, ...)
//!     → EventDispatcher::dispatch (bounded by a semaphore, tracked task)
//!     → RetryExecutor (own policy, independent of the counterparty's)
//!     → EventPublisher::publish
//! ```
//!
//! # Design Decisions
//! - The request path never awaits a publish; it gets a [`PublishHandle`]
//! - When the in-flight limit is reached the event is refused, not queued
//! - Shutdown stops new publishes and drains the running ones

pub mod dispatcher;

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::bacen::Operation;
use crate::resilience::{Cancellation, Classify};

pub use dispatcher::{EventDispatcher, PublishHandle};

/// Announcement of a completed DICT operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeEvent {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub operation: Operation,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub occurred_at_ms: u64,
    pub payload: serde_json::Value,
}

impl BridgeEvent {
    /// Build the event for `operation`, or `None` for read-only operations.
    pub fn for_operation(
        operation: Operation,
        correlation_id: impl Into<String>,
        subject_id: Option<String>,
        payload: serde_json::Value,
    ) -> Option<Self> {
        let event_type = operation.event_type()?;
        let occurred_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Some(Self {
            event_id: Uuid::new_v4(),
            event_type,
            operation,
            correlation_id: correlation_id.into(),
            subject_id,
            occurred_at_ms,
            payload,
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("event sink unavailable: {0}")]
    Unavailable(String),

    #[error("event rejected: {0}")]
    Rejected(String),

    #[error("too many events in flight")]
    Saturated,

    #[error("dispatcher is shutting down")]
    ShuttingDown,

    #[error("publish {0}")]
    Cancelled(Cancellation),
}

impl Classify for PublishError {
    fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Unavailable(_))
    }

    fn cancellation(&self) -> Option<Cancellation> {
        match self {
            PublishError::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Downstream sink for bridge events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &BridgeEvent) -> Result<(), PublishError>;
}

/// Writes events to the log as JSON. Used when no bus is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &BridgeEvent) -> Result<(), PublishError> {
        let body = serde_json::to_string(event).map_err(|e| PublishError::Rejected(e.to_string()))?;
        tracing::info!(
            target: "dict_bridge::events",
            event_id = %event.event_id,
            event_type = event.event_type,
            correlation_id = %event.correlation_id,
            event = %body,
            "Event published"
        );
        Ok(())
    }
}

//! # Notification Sinks
//!
//! Delivery capability consumed by the scheduler. The engine only knows how
//! to hand a fired reminder to a [`NotificationSink`]; what delivery means
//! (notification center, log line, webhook) is entirely the sink's concern,
//! and so is any retry policy.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Added ChannelSink for consumers that process deliveries elsewhere
//! - 1.0.0: Initial release with LogSink

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::reminder::ReminderId;

/// Receives fire events from the scheduler and performs the user-visible
/// delivery. Any permission gating ("may I notify the user") belongs to the
/// caller before wiring a sink, not to the scheduler.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(
        &self,
        id: ReminderId,
        message: &str,
        fired_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Sink that delivers reminders as log lines. Cannot fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, id: ReminderId, message: &str, fired_at: DateTime<Utc>) -> Result<()> {
        info!("🔔 {message} (reminder {id}, fired at {fired_at})");
        Ok(())
    }
}

/// A fired reminder as seen by consumers of a [`ChannelSink`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Reminder that fired
    pub id: ReminderId,

    /// Message after default substitution
    pub message: String,

    /// Actual fire time
    pub fired_at: DateTime<Utc>,
}

/// Sink that forwards fired reminders over an mpsc channel, for callers that
/// consume deliveries somewhere else (the daemon's JSON mode, tests, UIs).
/// Delivery fails once the receiving end is gone.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, id: ReminderId, message: &str, fired_at: DateTime<Utc>) -> Result<()> {
        let event = NotificationEvent {
            id,
            message: message.to_string(),
            fired_at,
        };
        self.tx
            .send(event)
            .map_err(|_| anyhow::anyhow!("notification channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::new();
        let id = ReminderId::new();
        let fired_at = Utc::now();

        sink.deliver(id, "Stand up", fired_at).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, id);
        assert_eq!(event.message, "Stand up");
        assert_eq!(event.fired_at, fired_at);
    }

    #[tokio::test]
    async fn test_channel_sink_fails_once_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);

        let result = sink.deliver(ReminderId::new(), "Stand up", Utc::now()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        let sink = LogSink;
        assert!(sink
            .deliver(ReminderId::new(), "Stand up", Utc::now())
            .await
            .is_ok());
    }

    #[test]
    fn test_event_serializes() {
        let event = NotificationEvent {
            id: ReminderId::new(),
            message: "Stand up".to_string(),
            fired_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Stand up"));
        assert!(json.contains("fired_at"));
    }
}

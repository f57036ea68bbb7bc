//! Typed error surface of the scheduling engine. Every variant is local and
//! recoverable; none is fatal to the scheduler.

use chrono::Duration;
use thiserror::Error;

use crate::reminder::ReminderId;

/// Errors surfaced by [`crate::scheduler::ReminderScheduler`] operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The interval passed to create/update was zero or negative. The
    /// operation had no effect.
    #[error("interval must be positive, got {0}")]
    InvalidInterval(Duration),

    /// The operation referenced a reminder that is not in the active set.
    #[error("unknown reminder {0}")]
    UnknownReminder(ReminderId),

    /// A mutating operation raced an in-flight fire. Retry once delivery
    /// completes.
    #[error("reminder {0} is currently firing")]
    ReminderBusy(ReminderId),

    /// The sink reported failure, or delivery exceeded the configured
    /// budget. Repeating reminders rearm regardless.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::InvalidInterval(Duration::seconds(0));
        assert!(err.to_string().contains("interval must be positive"));

        let id = ReminderId::new();
        assert!(SchedulerError::UnknownReminder(id)
            .to_string()
            .contains(&id.to_string()));
        assert!(SchedulerError::ReminderBusy(id)
            .to_string()
            .contains("currently firing"));
        assert_eq!(
            SchedulerError::DeliveryFailed("sink closed".to_string()).to_string(),
            "delivery failed: sink closed"
        );
    }
}

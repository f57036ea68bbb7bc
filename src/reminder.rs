//! # Reminder Model
//!
//! Data types for scheduled reminders. Identity is always by id, never by
//! content: two reminders may share a message and interval and remain
//! distinct.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::SchedulerError;

/// Opaque unique identifier of a reminder, assigned at creation and stable
/// for the reminder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderId(Uuid);

impl ReminderId {
    pub(crate) fn new() -> Self {
        ReminderId(Uuid::new_v4())
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderState {
    /// Armed and waiting for its due time
    Scheduled,
    /// Mid-delivery; mutating operations are rejected until the rearm
    /// decision has been made
    Firing,
    /// Cancelled by the caller
    Cancelled,
    /// A non-repeating reminder that fired; terminal
    Completed,
}

impl ReminderState {
    /// Terminal states never return to the active set
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReminderState::Cancelled | ReminderState::Completed)
    }
}

impl fmt::Display for ReminderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderState::Scheduled => write!(f, "scheduled"),
            ReminderState::Firing => write!(f, "firing"),
            ReminderState::Cancelled => write!(f, "cancelled"),
            ReminderState::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ReminderState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(ReminderState::Scheduled),
            "firing" => Ok(ReminderState::Firing),
            "cancelled" => Ok(ReminderState::Cancelled),
            "completed" => Ok(ReminderState::Completed),
            _ => Err(anyhow::anyhow!("Invalid reminder state: {}", s)),
        }
    }
}

/// A scheduled notification
#[derive(Debug, Clone)]
pub struct Reminder {
    /// Unique reminder identifier
    pub id: ReminderId,

    /// Custom message; the engine default is substituted at delivery time
    /// when this is unset
    pub message: Option<String>,

    /// Gap between firings; always positive
    pub interval: Duration,

    /// Whether the reminder re-arms after each fire
    pub repeating: bool,

    /// When the current arm is due. Owned by the scheduler: recomputed from
    /// the actual fire time on every rearm, never set by callers.
    pub next_due_at: DateTime<Utc>,

    /// Current lifecycle state
    pub state: ReminderState,
}

impl Reminder {
    /// The message to deliver, falling back to `default` when no usable
    /// message is set.
    pub fn effective_message<'a>(&'a self, default: &'a str) -> &'a str {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m,
            _ => default,
        }
    }
}

/// Partial update applied by [`crate::scheduler::ReminderScheduler::update`].
/// `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ReminderUpdate {
    /// Replacement message; empty or whitespace clears back to the engine
    /// default
    pub message: Option<String>,

    /// Replacement interval; must be positive
    pub interval: Option<Duration>,

    /// Replacement repeat flag
    pub repeating: Option<bool>,
}

/// Blank and whitespace-only messages behave as unset
pub(crate) fn normalize_message(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

pub(crate) fn validate_interval(interval: Duration) -> Result<(), SchedulerError> {
    if interval > Duration::zero() {
        Ok(())
    } else {
        Err(SchedulerError::InvalidInterval(interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ReminderState::Scheduled.to_string(), "scheduled");
        assert_eq!(ReminderState::Firing.to_string(), "firing");
        assert_eq!(ReminderState::Cancelled.to_string(), "cancelled");
        assert_eq!(ReminderState::Completed.to_string(), "completed");
    }

    #[test]
    fn test_state_parse() {
        assert_eq!(
            "scheduled".parse::<ReminderState>().unwrap(),
            ReminderState::Scheduled
        );
        assert_eq!(
            "FIRING".parse::<ReminderState>().unwrap(),
            ReminderState::Firing
        );
        assert_eq!(
            "Cancelled".parse::<ReminderState>().unwrap(),
            ReminderState::Cancelled
        );
        assert!("paused".parse::<ReminderState>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ReminderState::Scheduled.is_terminal());
        assert!(!ReminderState::Firing.is_terminal());
        assert!(ReminderState::Cancelled.is_terminal());
        assert!(ReminderState::Completed.is_terminal());
    }

    #[test]
    fn test_effective_message() {
        let mut reminder = Reminder {
            id: ReminderId::new(),
            message: Some("Stretch".to_string()),
            interval: Duration::seconds(600),
            repeating: true,
            next_due_at: Utc::now(),
            state: ReminderState::Scheduled,
        };
        assert_eq!(reminder.effective_message("fallback"), "Stretch");

        reminder.message = None;
        assert_eq!(reminder.effective_message("fallback"), "fallback");

        reminder.message = Some("   ".to_string());
        assert_eq!(reminder.effective_message("fallback"), "fallback");
    }

    #[test]
    fn test_normalize_message() {
        assert_eq!(normalize_message(None), None);
        assert_eq!(normalize_message(Some(String::new())), None);
        assert_eq!(normalize_message(Some("  ".to_string())), None);
        assert_eq!(
            normalize_message(Some("Water break".to_string())),
            Some("Water break".to_string())
        );
    }

    #[test]
    fn test_validate_interval() {
        assert!(validate_interval(Duration::seconds(1)).is_ok());
        assert!(matches!(
            validate_interval(Duration::zero()),
            Err(SchedulerError::InvalidInterval(_))
        ));
        assert!(matches!(
            validate_interval(Duration::seconds(-5)),
            Err(SchedulerError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ReminderId::new(), ReminderId::new());
    }
}

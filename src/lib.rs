// Core layer - configuration and error handling
pub mod core;

// Time layer - wall-clock and delay abstraction
pub mod clock;

// Domain layer - reminder data model
pub mod reminder;

// Engine layer - the scheduler itself
pub mod scheduler;

// Delivery layer - notification sinks
pub mod sink;

// Re-export core config for convenience
pub use crate::core::Config;

// Re-export the public surface
pub use crate::core::{SchedulerError, SinkKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use reminder::{Reminder, ReminderId, ReminderState, ReminderUpdate};
pub use scheduler::{ReminderScheduler, SchedulerOptions};
pub use sink::{ChannelSink, LogSink, NotificationEvent, NotificationSink};

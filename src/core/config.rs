//! # Configuration
//!
//! Environment-driven configuration for the `nudged` daemon. Every knob has
//! a default so a bare `nudged` invocation behaves like the classic
//! half-hour break reminder.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Added sink selection and optional delivery budget
//! - 1.0.0: Initial release with message/interval/repeat settings

use std::env;
use std::str::FromStr;

use anyhow::Result;
use chrono::Duration;

/// Message substituted at delivery time for reminders without one of their own
pub const DEFAULT_MESSAGE: &str = "This is your reminder!";

/// Default gap between firings: 30 minutes
pub const DEFAULT_INTERVAL_SECS: i64 = 30 * 60;

/// Which delivery sink the daemon wires the scheduler to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Deliveries become log lines
    Log,
    /// Deliveries become JSON lines on stdout
    Json,
}

impl FromStr for SinkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(SinkKind::Log),
            "json" => Ok(SinkKind::Json),
            _ => Err(anyhow::anyhow!("Invalid sink kind: {} (use log or json)", s)),
        }
    }
}

/// Daemon configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Custom reminder message; `None` falls back to [`DEFAULT_MESSAGE`]
    pub message: Option<String>,

    /// Gap between firings
    pub interval: Duration,

    /// Whether the reminder re-arms after each fire
    pub repeating: bool,

    /// Delivery sink for fired reminders
    pub sink: SinkKind,

    /// Cap on a single delivery attempt; `None` waits indefinitely
    pub delivery_budget: Option<std::time::Duration>,

    /// Fire an immediate test notification before the first interval
    pub startup_fire: bool,

    /// Log level filter passed to env_logger
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            message: None,
            interval: Duration::seconds(DEFAULT_INTERVAL_SECS),
            repeating: true,
            sink: SinkKind::Log,
            delivery_budget: None,
            startup_fire: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build a config from `NUDGED_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        config.message = env::var("NUDGED_MESSAGE")
            .ok()
            .filter(|m| !m.trim().is_empty());

        if let Ok(raw) = env::var("NUDGED_INTERVAL") {
            config.interval = parse_interval(&raw).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid NUDGED_INTERVAL {raw:?}: use formats like 30s, 30m, 2h, or 1h30m"
                )
            })?;
        }

        config.repeating = parse_bool(env::var("NUDGED_REPEATING").ok().as_deref(), true);

        if let Ok(raw) = env::var("NUDGED_SINK") {
            config.sink = raw.parse()?;
        }

        if let Ok(raw) = env::var("NUDGED_DELIVERY_BUDGET") {
            let budget = parse_interval(&raw)
                .and_then(|d| d.to_std().ok())
                .ok_or_else(|| anyhow::anyhow!("Invalid NUDGED_DELIVERY_BUDGET {raw:?}"))?;
            config.delivery_budget = Some(budget);
        }

        config.startup_fire = parse_bool(env::var("NUDGED_STARTUP_FIRE").ok().as_deref(), true);

        if let Ok(level) = env::var("NUDGED_LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }
}

/// Interpret common truthy spellings; anything else is false
fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Parse a time interval string like "30m", "2h", "1d", "1h30m" into a duration.
/// Returns `None` for anything that does not add up to a positive interval.
pub fn parse_interval(raw: &str) -> Option<Duration> {
    let raw = raw.trim().to_lowercase();
    let mut total_seconds: i64 = 0;
    let mut current_number = String::new();

    for c in raw.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if !current_number.is_empty() {
            let value: i64 = current_number.parse().ok()?;
            current_number.clear();

            let seconds = match c {
                's' => value,
                'm' => value * 60,
                'h' => value * 60 * 60,
                'd' => value * 60 * 60 * 24,
                'w' => value * 60 * 60 * 24 * 7,
                _ => return None,
            };
            total_seconds += seconds;
        }
    }

    if total_seconds > 0 {
        Some(Duration::seconds(total_seconds))
    } else {
        None
    }
}

/// Format a duration in seconds into a human-readable string
pub fn format_interval(seconds: i64) -> String {
    if seconds < 60 {
        format!("{} second{}", seconds, if seconds == 1 { "" } else { "s" })
    } else if seconds < 3600 {
        let mins = seconds / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!(
                "{} hour{} {} minute{}",
                hours,
                if hours == 1 { "" } else { "s" },
                mins,
                if mins == 1 { "" } else { "s" }
            )
        } else {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!(
                "{} day{} {} hour{}",
                days,
                if days == 1 { "" } else { "s" },
                hours,
                if hours == 1 { "" } else { "s" }
            )
        } else {
            format!("{} day{}", days, if days == 1 { "" } else { "s" })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("30s"), Some(Duration::seconds(30)));
        assert_eq!(parse_interval("30m"), Some(Duration::seconds(1800)));
        assert_eq!(parse_interval("2h"), Some(Duration::seconds(7200)));
        assert_eq!(parse_interval("1d"), Some(Duration::seconds(86400)));
        assert_eq!(parse_interval("1w"), Some(Duration::seconds(604800)));
        assert_eq!(parse_interval("1h30m"), Some(Duration::seconds(5400)));
        assert_eq!(parse_interval("invalid"), None);
        assert_eq!(parse_interval(""), None);
        assert_eq!(parse_interval("0s"), None);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(30), "30 seconds");
        assert_eq!(format_interval(1), "1 second");
        assert_eq!(format_interval(60), "1 minute");
        assert_eq!(format_interval(120), "2 minutes");
        assert_eq!(format_interval(3600), "1 hour");
        assert_eq!(format_interval(3660), "1 hour 1 minute");
        assert_eq!(format_interval(86400), "1 day");
        assert_eq!(format_interval(90000), "1 day 1 hour");
    }

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("log".parse::<SinkKind>().unwrap(), SinkKind::Log);
        assert_eq!("JSON".parse::<SinkKind>().unwrap(), SinkKind::Json);
        assert!("webhook".parse::<SinkKind>().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("1"), false));
        assert!(parse_bool(Some("TRUE"), false));
        assert!(parse_bool(Some("yes"), false));
        assert!(!parse_bool(Some("0"), true));
        assert!(!parse_bool(Some("off"), true));
        assert!(parse_bool(None, true));
        assert!(!parse_bool(None, false));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interval, Duration::seconds(DEFAULT_INTERVAL_SECS));
        assert!(config.repeating);
        assert!(config.startup_fire);
        assert_eq!(config.sink, SinkKind::Log);
        assert!(config.delivery_budget.is_none());
        assert!(config.message.is_none());
    }
}

// Severity levels derived from log labels, and their histogram colours.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Labels;

/// Label keys checked, in order, for a level value.
pub const LEVEL_LABEL_KEYS: [&str; 3] = ["level", "lvl", "loglevel"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
    Unknown,
}

impl LogLevel {
    /// Map a level label value (case-insensitive, common aliases included).
    pub fn from_key(key: &str) -> Self {
        match key.to_lowercase().as_str() {
            "emerg" | "fatal" | "alert" | "crit" | "critical" => LogLevel::Critical,
            "err" | "eror" | "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warning,
            "info" | "information" | "informational" | "notice" => LogLevel::Info,
            "dbug" | "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Critical => "critical",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
            LogLevel::Unknown => "unknown",
        }
    }

    /// Fixed bar colour for this level (classic palette).
    pub fn color(&self) -> &'static str {
        match self {
            LogLevel::Critical => "#705DA0",
            LogLevel::Error => "#E24D42",
            LogLevel::Warning => "#EAB839",
            LogLevel::Info => "#7EB26D",
            LogLevel::Debug => "#1F78C1",
            LogLevel::Trace => "#6ED0E0",
            LogLevel::Unknown => "#8E8E8E",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a label set. Total: no level label (or an unrecognized value) is `Unknown`.
pub fn level_from_labels(labels: &Labels) -> LogLevel {
    LEVEL_LABEL_KEYS
        .iter()
        .find_map(|key| labels.get(*key))
        .map_or(LogLevel::Unknown, |value| LogLevel::from_key(value))
}

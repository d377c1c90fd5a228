//! Error types for questhub.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("quest {0} not found")]
    NotFound(u64),

    #[error("{user} is not allowed to {action} quest {id}")]
    Forbidden {
        user: String,
        action: &'static str,
        id: u64,
    },

    #[error("cannot move quest {id} from {from} to {to}")]
    InvalidTransition {
        id: u64,
        from: crate::models::Status,
        to: crate::models::Status,
    },

    #[error("invalid recurrence pattern: {}", .0.join("; "))]
    InvalidPattern(Vec<String>),

    #[error("invalid date '{0}', use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid {field} '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("unsupported recurrence type '{0}' (expected daily, weekly or monthly)")]
    UnknownRecurrence(String),

    #[error("quest {0} must have a due date to sync to the calendar")]
    MissingDueDate(u64),

    #[error("no calendar connected, run `questhub calendar connect` first")]
    CalendarNotConnected,

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed data file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("could not write config: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

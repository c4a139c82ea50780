//! Log records: the persistent trail written by the supervisor.
//!
//! Sensors and switches append state snapshots (their id + a JSON dump);
//! the controller itself appends INFO/WARNING/ERROR messages. A log record
//! is never updated after insertion.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Record kind, with the integer codes used in `tb_log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Sensor,
    Switch,
    Info,
    Warning,
    Error,
}

impl LogKind {
    /// Encode to the database integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Sensor => 1,
            Self::Switch => 2,
            Self::Info => 10,
            Self::Warning => 11,
            Self::Error => 12,
        }
    }

    /// Decode the database integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Sensor),
            2 => Some(Self::Switch),
            10 => Some(Self::Info),
            11 => Some(Self::Warning),
            12 => Some(Self::Error),
            _ => None,
        }
    }
}

/// One row of `tb_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    /// Sensor/switch id for snapshots, application error code for messages.
    pub object_id: i64,
    /// Qualified entity name, or empty when not relevant.
    pub system_name: String,
    /// Current value for snapshots, threshold-like value for messages.
    pub float_value: f64,
    /// JSON snapshot for entities, message text for messages.
    pub text_value: String,
    pub created_on: Timestamp,
}

impl LogEntry {
    /// Build a message-style entry (INFO / WARNING / ERROR).
    #[must_use]
    pub fn message(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            object_id: 0,
            system_name: String::new(),
            float_value: -1.0,
            text_value: text.into(),
            created_on: crate::time::now(),
        }
    }

    /// Build an entity snapshot entry.
    #[must_use]
    pub fn snapshot(
        kind: LogKind,
        object_id: i64,
        system_name: impl Into<String>,
        float_value: f64,
        text_value: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            object_id,
            system_name: system_name.into(),
            float_value,
            text_value: text_value.into(),
            created_on: crate::time::now(),
        }
    }
}

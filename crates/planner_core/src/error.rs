use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::model::Weekday;

/// Failure reading or writing one of the on-disk documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Mutations the planner refuses to apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlannerError {
    #[error("a reminder named `{name}` already exists on {date}")]
    DuplicateReminder { name: String, date: NaiveDate },
    #[error("period {period} is already taken on {day}")]
    PeriodTaken { day: Weekday, period: u32 },
    #[error("period {period} is outside 1..={max}")]
    PeriodOutOfRange { period: u32, max: u32 },
    #[error("name must not be blank")]
    EmptyName,
    #[error("no class session {0}")]
    SessionNotFound(Uuid),
    #[error("no checklist item {0}")]
    ItemNotFound(Uuid),
    #[error("no reminder {0}")]
    ReminderNotFound(Uuid),
}

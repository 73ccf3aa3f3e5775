use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::model::AlertTime;
use crate::store::{read_json, write_json};

pub const PREFERENCES_FILE: &str = "preferences.json";
const ALERT_TIME_KEY: &str = "alertTime";

/// Scalar user preferences kept apart from the planner documents.
pub trait PreferenceStore: Send + Sync {
    fn alert_time(&self) -> Result<Option<AlertTime>, StoreError>;
    fn set_alert_time(&self, time: AlertTime) -> Result<(), StoreError>;
}

/// Flat key-value JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonPreferences {
    path: PathBuf,
}

impl JsonPreferences {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> Result<Map<String, Value>, StoreError> {
        match read_json(&self.path) {
            Ok(entries) => Ok(entries),
            Err(err) if err.is_not_found() => Ok(Map::new()),
            Err(err) => Err(err),
        }
    }
}

impl PreferenceStore for JsonPreferences {
    fn alert_time(&self) -> Result<Option<AlertTime>, StoreError> {
        let entries = self.entries()?;
        let Some(value) = entries.get(ALERT_TIME_KEY) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| StoreError::json(&self.path, err))
    }

    fn set_alert_time(&self, time: AlertTime) -> Result<(), StoreError> {
        // Unreadable files are replaced rather than blocking the write.
        let mut entries = self.entries().unwrap_or_default();
        entries.insert(ALERT_TIME_KEY.to_string(), Value::String(time.to_string()));
        write_json(&self.path, &entries)
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::model::{ReminderItem, WeeklyTimetable};

pub const TIMETABLE_FILE: &str = "timetable.json";
pub const REMINDERS_FILE: &str = "reminders.json";

/// Whole-document persistence for the two planner aggregates.
pub trait PlannerStore: Send + Sync {
    fn load_timetable(&self) -> Result<WeeklyTimetable, StoreError>;
    fn load_reminders(&self) -> Result<Vec<ReminderItem>, StoreError>;
    fn save_timetable(&self, timetable: &WeeklyTimetable) -> Result<(), StoreError>;
    fn save_reminders(&self, reminders: &[ReminderItem]) -> Result<(), StoreError>;
}

/// Stores each aggregate as a pretty-printed JSON file inside one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timetable_path(&self) -> PathBuf {
        self.root.join(TIMETABLE_FILE)
    }

    pub fn reminders_path(&self) -> PathBuf {
        self.root.join(REMINDERS_FILE)
    }
}

impl PlannerStore for JsonFileStore {
    fn load_timetable(&self) -> Result<WeeklyTimetable, StoreError> {
        read_json(&self.timetable_path())
    }

    fn load_reminders(&self) -> Result<Vec<ReminderItem>, StoreError> {
        let path = self.reminders_path();
        let entries: Vec<serde_json::Value> = read_json(&path)?;
        let mut reminders = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<ReminderItem>(entry) {
                Ok(reminder) => reminders.push(reminder),
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping unreadable reminder")
                }
            }
        }
        Ok(reminders)
    }

    fn save_timetable(&self, timetable: &WeeklyTimetable) -> Result<(), StoreError> {
        write_json(&self.timetable_path(), timetable)
    }

    fn save_reminders(&self, reminders: &[ReminderItem]) -> Result<(), StoreError> {
        write_json(&self.reminders_path(), reminders)
    }
}

/// Keeps documents in memory only; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    timetable: Mutex<Option<WeeklyTimetable>>,
    reminders: Mutex<Option<Vec<ReminderItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlannerStore for MemoryStore {
    fn load_timetable(&self) -> Result<WeeklyTimetable, StoreError> {
        Ok(self.timetable.lock().clone().unwrap_or_default())
    }

    fn load_reminders(&self) -> Result<Vec<ReminderItem>, StoreError> {
        Ok(self.reminders.lock().clone().unwrap_or_default())
    }

    fn save_timetable(&self, timetable: &WeeklyTimetable) -> Result<(), StoreError> {
        *self.timetable.lock() = Some(timetable.clone());
        Ok(())
    }

    fn save_reminders(&self, reminders: &[ReminderItem]) -> Result<(), StoreError> {
        *self.reminders.lock() = Some(reminders.to_vec());
        Ok(())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = fs::read_to_string(path).map_err(|err| StoreError::io(path, err))?;
    serde_json::from_str(&raw).map_err(|err| StoreError::json(path, err))
}

/// Writes to a sibling temp file and renames it over the target.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
    }
    let payload = serde_json::to_vec_pretty(value).map_err(|err| StoreError::json(path, err))?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, payload).map_err(|err| StoreError::io(&staging, err))?;
    fs::rename(&staging, path).map_err(|err| StoreError::io(path, err))?;
    tracing::debug!(path = %path.display(), "document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChecklistItem, ClassSession, Weekday};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn timetable_round_trips_through_disk() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::new(temp.path().join("planner"));

        let mut timetable = WeeklyTimetable::default();
        let mut math = ClassSession::new("Math", 1);
        let mut protractor = ChecklistItem::new("Protractor");
        protractor.is_completed = true;
        math.items.push(protractor);
        timetable.set_sessions(Weekday::Mon, vec![math, ClassSession::new("English", 2)]);

        store.save_timetable(&timetable).expect("save");
        assert!(!store.root().join("timetable.json.tmp").exists());
        let loaded = store.load_timetable().expect("load");
        assert_eq!(loaded, timetable);
    }

    #[test]
    fn reminders_round_trip_and_skip_broken_entries() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::new(temp.path());
        let mut muted = ReminderItem::new("Dentist", NaiveDate::from_ymd_opt(2026, 11, 2).unwrap());
        muted.notification_enabled = false;
        let reminders = vec![
            ReminderItem::new("Math Final", NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()),
            muted,
        ];
        store.save_reminders(&reminders).expect("save");
        assert_eq!(store.load_reminders().expect("load"), reminders);

        fs::write(
            store.reminders_path(),
            r#"[{"name": "No date"}, {"name": "Trip", "date": "2026-11-20"}]"#,
        )
        .unwrap();
        let loaded = store.load_reminders().expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Trip");
        assert!(loaded[0].notification_enabled);
    }

    #[test]
    fn missing_and_malformed_files_are_reported() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFileStore::new(temp.path());
        let err = store.load_timetable().unwrap_err();
        assert!(err.is_not_found());

        fs::write(store.timetable_path(), "{ not json").unwrap();
        let err = store.load_timetable().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(!err.is_not_found());
    }
}

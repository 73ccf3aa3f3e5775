use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use planner_core::{
    model::{ClassSession, Weekday},
    notifications::LogSink,
    service::DEFAULT_MAX_PERIODS,
    PlannerService,
};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) storage_root: PathBuf,
    pub(crate) max_periods: u32,
}

impl AppConfig {
    pub fn with_storage_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    pub fn storage_root(&self) -> &PathBuf {
        &self.storage_root
    }

    pub fn max_periods(&self) -> u32 {
        self.max_periods
    }

    /// Mobile hosts hand over their private data directory at launch.
    pub fn bootstrap_mobile_defaults(&mut self, storage_root: Option<PathBuf>) {
        if let Some(mut root) = storage_root {
            root.push("planner");
            if let Err(err) = std::fs::create_dir_all(&root) {
                tracing::warn!(path = %root.display(), %err, "unable to prepare mobile planner storage");
            }
            self.storage_root = root;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_root = dirs::data_local_dir()
            .map(|dir| dir.join("planner"))
            .unwrap_or_else(|| PathBuf::from("planner-data"));
        Self {
            storage_root,
            max_periods: DEFAULT_MAX_PERIODS,
        }
    }
}

/// What the home screen shows for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub today: NaiveDate,
    pub weekday: Option<Weekday>,
    pub sessions: Vec<ClassSession>,
    pub reminders: Vec<ReminderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderLine {
    pub name: String,
    pub date: NaiveDate,
    pub label: String,
    pub notification_enabled: bool,
}

impl DaySummary {
    pub fn collect(service: &PlannerService, today: NaiveDate) -> Self {
        let weekday = Weekday::from_chrono(today.weekday());
        let sessions = weekday
            .map(|day| service.sessions(day))
            .unwrap_or_default();
        let reminders = service
            .reminders()
            .into_iter()
            .map(|reminder| ReminderLine {
                label: reminder.dday(today).to_string(),
                name: reminder.name,
                date: reminder.date,
                notification_enabled: reminder.notification_enabled,
            })
            .collect();
        Self {
            today,
            weekday,
            sessions,
            reminders,
        }
    }
}

pub fn open_service(config: &AppConfig) -> Result<PlannerService> {
    std::fs::create_dir_all(&config.storage_root).with_context(|| {
        format!(
            "failed to prepare planner storage at {}",
            config.storage_root.display()
        )
    })?;
    info!(path = %config.storage_root.display(), "opening planner storage");
    Ok(PlannerService::builder()
        .with_storage_root(&config.storage_root)
        .max_periods(config.max_periods)
        .with_notification_sink(Box::new(LogSink))
        .build())
}

pub fn run(config: AppConfig) -> Result<()> {
    let service = open_service(&config)?;
    let summary = DaySummary::collect(&service, Local::now().date_naive());

    match summary.weekday {
        Some(day) => info!(%day, classes = summary.sessions.len(), "today's timetable"),
        None => info!("no classes on weekends"),
    }
    for session in &summary.sessions {
        let open_items = session.items.iter().filter(|item| !item.is_completed).count();
        debug!(period = session.period, name = %session.name, open_items, "class");
    }
    for line in &summary.reminders {
        info!(label = %line.label, name = %line.name, date = %line.date, "reminder");
    }

    let scheduled = service.reschedule_notifications();
    info!(scheduled, alert_time = %service.alert_time(), "notifications up to date");

    service.flush();
    Ok(())
}

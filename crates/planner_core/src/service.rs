use std::path::Path;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    error::{PlannerError, StoreError},
    model::{
        AlertTime, ChecklistItem, ClassSession, ReminderItem, ReminderList, Weekday,
        WeeklyTimetable,
    },
    notifications::{self, NotificationSink},
    prefs::{JsonPreferences, PreferenceStore},
    store::{JsonFileStore, MemoryStore, PlannerStore},
};

pub const DEFAULT_MAX_PERIODS: u32 = 10;

pub type PersistErrorHook = Box<dyn Fn(&StoreError) + Send + Sync>;

#[derive(Debug, Default)]
struct PlannerState {
    timetable: WeeklyTimetable,
    reminders: ReminderList,
    alert_time: AlertTime,
}

/// Owns the timetable and reminder aggregates. Every mutation is persisted
/// before it returns; reminder and alert-time mutations also rebuild the
/// pending notifications.
pub struct PlannerService {
    state: RwLock<PlannerState>,
    store: Box<dyn PlannerStore>,
    preferences: Option<Box<dyn PreferenceStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    clock: Box<dyn Clock>,
    max_periods: u32,
    on_persist_error: Option<PersistErrorHook>,
}

pub struct PlannerServiceBuilder {
    store: Option<Box<dyn PlannerStore>>,
    preferences: Option<Box<dyn PreferenceStore>>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    clock: Box<dyn Clock>,
    max_periods: u32,
    on_persist_error: Option<PersistErrorHook>,
}

impl Default for PlannerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            preferences: None,
            notification_sink: None,
            clock: Box::new(SystemClock),
            max_periods: DEFAULT_MAX_PERIODS,
            on_persist_error: None,
        }
    }

    /// JSON documents and preferences under one directory.
    pub fn with_storage_root(self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.with_store(Box::new(JsonFileStore::new(root)))
            .with_preferences(Box::new(JsonPreferences::in_dir(root)))
    }

    pub fn with_store(mut self, store: Box<dyn PlannerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_preferences(mut self, preferences: Box<dyn PreferenceStore>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_periods(mut self, max_periods: u32) -> Self {
        self.max_periods = max_periods.max(1);
        self
    }

    /// Called with every save failure after it has been logged.
    pub fn on_persist_error(mut self, hook: impl Fn(&StoreError) + Send + Sync + 'static) -> Self {
        self.on_persist_error = Some(Box::new(hook));
        self
    }

    /// Loads persisted state, falling back to empty state on any read failure,
    /// and schedules notifications once.
    pub fn build(self) -> PlannerService {
        let service = PlannerService {
            state: RwLock::new(PlannerState::default()),
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            preferences: self.preferences,
            notification_sink: self.notification_sink,
            clock: self.clock,
            max_periods: self.max_periods,
            on_persist_error: self.on_persist_error,
        };
        service.load();
        service.reschedule_notifications();
        service
    }
}

impl PlannerService {
    pub fn builder() -> PlannerServiceBuilder {
        PlannerServiceBuilder::new()
    }

    pub fn max_periods(&self) -> u32 {
        self.max_periods
    }

    pub fn timetable(&self) -> WeeklyTimetable {
        self.state.read().timetable.clone()
    }

    /// Sessions for `day` ordered by period.
    pub fn sessions(&self, day: Weekday) -> Vec<ClassSession> {
        self.state.read().timetable.sorted_by_period(day)
    }

    /// Replaces the whole bucket as given; periods are not validated.
    pub fn set_sessions(&self, day: Weekday, sessions: Vec<ClassSession>) {
        let mut state = self.state.write();
        state.timetable.set_sessions(day, sessions);
        self.persist_timetable(&state.timetable);
    }

    /// Next free period after the current highest, or `None` once the day is full.
    pub fn next_period(&self, day: Weekday) -> Option<u32> {
        let next = self
            .state
            .read()
            .timetable
            .max_period(day)
            .unwrap_or(0)
            .checked_add(1)?;
        (next <= self.max_periods).then_some(next)
    }

    pub fn add_session(&self, day: Weekday, name: &str, period: u32) -> Result<Uuid, PlannerError> {
        let name = clean_name(name)?;
        let max = self.max_periods;
        self.mutate_timetable(|timetable| {
            check_period(timetable, day, period, max, None)?;
            let session = ClassSession::new(name, period);
            let id = session.id;
            timetable.sessions_mut(day).push(session);
            Ok(id)
        })
    }

    /// Adds a session in the next free period.
    pub fn append_session(&self, day: Weekday, name: &str) -> Result<Uuid, PlannerError> {
        let period = self
            .next_period(day)
            .ok_or(PlannerError::PeriodOutOfRange {
                period: self.max_periods.saturating_add(1),
                max: self.max_periods,
            })?;
        self.add_session(day, name, period)
    }

    pub fn remove_session(&self, day: Weekday, id: Uuid) -> Result<ClassSession, PlannerError> {
        self.mutate_timetable(|timetable| {
            timetable
                .remove_session(day, id)
                .ok_or(PlannerError::SessionNotFound(id))
        })
    }

    /// Renames and/or moves a session. A period held by another session is rejected.
    pub fn update_session(
        &self,
        day: Weekday,
        id: Uuid,
        name: &str,
        period: u32,
    ) -> Result<(), PlannerError> {
        let name = clean_name(name)?;
        let max = self.max_periods;
        self.mutate_timetable(|timetable| {
            check_period(timetable, day, period, max, Some(id))?;
            let session = timetable
                .session_mut(day, id)
                .ok_or(PlannerError::SessionNotFound(id))?;
            session.name = name;
            session.period = period;
            Ok(())
        })
    }

    pub fn add_checklist_item(
        &self,
        day: Weekday,
        session_id: Uuid,
        name: &str,
    ) -> Result<Uuid, PlannerError> {
        let name = clean_name(name)?;
        self.mutate_timetable(|timetable| {
            let session = timetable
                .session_mut(day, session_id)
                .ok_or(PlannerError::SessionNotFound(session_id))?;
            let item = ChecklistItem::new(name);
            let id = item.id;
            session.items.push(item);
            Ok(id)
        })
    }

    /// Flips completion and returns the new state.
    pub fn toggle_checklist_item(
        &self,
        day: Weekday,
        session_id: Uuid,
        item_id: Uuid,
    ) -> Result<bool, PlannerError> {
        self.mutate_timetable(|timetable| {
            let item = checklist_item(timetable, day, session_id, item_id)?;
            item.is_completed = !item.is_completed;
            Ok(item.is_completed)
        })
    }

    pub fn rename_checklist_item(
        &self,
        day: Weekday,
        session_id: Uuid,
        item_id: Uuid,
        name: &str,
    ) -> Result<(), PlannerError> {
        let name = clean_name(name)?;
        self.mutate_timetable(|timetable| {
            checklist_item(timetable, day, session_id, item_id)?.name = name;
            Ok(())
        })
    }

    pub fn remove_checklist_item(
        &self,
        day: Weekday,
        session_id: Uuid,
        item_id: Uuid,
    ) -> Result<ChecklistItem, PlannerError> {
        self.mutate_timetable(|timetable| {
            let session = timetable
                .session_mut(day, session_id)
                .ok_or(PlannerError::SessionNotFound(session_id))?;
            let index = session
                .items
                .iter()
                .position(|item| item.id == item_id)
                .ok_or(PlannerError::ItemNotFound(item_id))?;
            Ok(session.items.remove(index))
        })
    }

    /// Reminders ordered by date.
    pub fn reminders(&self) -> Vec<ReminderItem> {
        self.state.read().reminders.sorted_by_date()
    }

    pub fn add_reminder(&self, name: &str, date: NaiveDate) -> Result<Uuid, PlannerError> {
        let name = clean_name(name)?;
        self.mutate_reminders(|reminders| {
            if reminders.has_duplicate(&name, date, None) {
                return Err(PlannerError::DuplicateReminder { name, date });
            }
            let reminder = ReminderItem::new(name, date);
            let id = reminder.id;
            reminders.push(reminder);
            Ok(id)
        })
    }

    pub fn update_reminder(&self, id: Uuid, name: &str, date: NaiveDate) -> Result<(), PlannerError> {
        let name = clean_name(name)?;
        self.mutate_reminders(|reminders| {
            if reminders.has_duplicate(&name, date, Some(id)) {
                return Err(PlannerError::DuplicateReminder { name, date });
            }
            let reminder = reminders
                .get_mut(id)
                .ok_or(PlannerError::ReminderNotFound(id))?;
            reminder.name = name;
            reminder.date = date;
            Ok(())
        })
    }

    pub fn remove_reminder(&self, id: Uuid) -> Result<ReminderItem, PlannerError> {
        self.mutate_reminders(|reminders| {
            reminders
                .remove(id)
                .ok_or(PlannerError::ReminderNotFound(id))
        })
    }

    /// Flips the reminder's alert flag and returns the new value.
    pub fn toggle_reminder_notification(&self, id: Uuid) -> Result<bool, PlannerError> {
        self.mutate_reminders(|reminders| {
            let reminder = reminders
                .get_mut(id)
                .ok_or(PlannerError::ReminderNotFound(id))?;
            reminder.notification_enabled = !reminder.notification_enabled;
            Ok(reminder.notification_enabled)
        })
    }

    pub fn alert_time(&self) -> AlertTime {
        self.state.read().alert_time
    }

    pub fn set_alert_time(&self, time: AlertTime) {
        let mut state = self.state.write();
        state.alert_time = time;
        if let Some(preferences) = &self.preferences {
            if let Err(err) = preferences.set_alert_time(time) {
                self.report(err);
            }
        }
        self.reschedule_locked(&state);
    }

    /// Rebuilds every pending alert; hosts call this when the day rolls over.
    pub fn reschedule_notifications(&self) -> usize {
        let state = self.state.read();
        self.reschedule_locked(&state)
    }

    /// Writes both documents and the alert time again. Call before shutdown.
    pub fn flush(&self) {
        let state = self.state.read();
        self.persist_timetable(&state.timetable);
        self.persist_reminders(&state.reminders);
        if let Some(preferences) = &self.preferences {
            if let Err(err) = preferences.set_alert_time(state.alert_time) {
                self.report(err);
            }
        }
        tracing::debug!("planner state flushed");
    }
}

impl PlannerService {
    #[instrument(skip_all)]
    fn load(&self) {
        let mut state = self.state.write();
        state.timetable = absorb("timetable", self.store.load_timetable()).unwrap_or_default();
        state.reminders = ReminderList::from_items(
            absorb("reminders", self.store.load_reminders()).unwrap_or_default(),
        );
        if let Some(preferences) = &self.preferences {
            state.alert_time = absorb("preferences", preferences.alert_time())
                .flatten()
                .unwrap_or_default();
        }
        tracing::debug!(
            reminders = state.reminders.len(),
            alert_time = %state.alert_time,
            "planner state loaded"
        );
    }

    fn mutate_timetable<R>(
        &self,
        apply: impl FnOnce(&mut WeeklyTimetable) -> Result<R, PlannerError>,
    ) -> Result<R, PlannerError> {
        let mut state = self.state.write();
        let outcome = apply(&mut state.timetable)?;
        self.persist_timetable(&state.timetable);
        Ok(outcome)
    }

    fn mutate_reminders<R>(
        &self,
        apply: impl FnOnce(&mut ReminderList) -> Result<R, PlannerError>,
    ) -> Result<R, PlannerError> {
        let mut state = self.state.write();
        let outcome = apply(&mut state.reminders)?;
        self.persist_reminders(&state.reminders);
        self.reschedule_locked(&state);
        Ok(outcome)
    }

    fn persist_timetable(&self, timetable: &WeeklyTimetable) {
        if let Err(err) = self.store.save_timetable(timetable) {
            self.report(err);
        }
    }

    fn persist_reminders(&self, reminders: &ReminderList) {
        if let Err(err) = self.store.save_reminders(reminders.as_slice()) {
            self.report(err);
        }
    }

    fn reschedule_locked(&self, state: &PlannerState) -> usize {
        let Some(sink) = &self.notification_sink else {
            return 0;
        };
        notifications::reschedule(
            sink.as_ref(),
            state.reminders.as_slice(),
            state.alert_time,
            self.clock.now(),
        )
    }

    fn report(&self, err: StoreError) {
        tracing::warn!(%err, "failed to persist planner state");
        if let Some(hook) = &self.on_persist_error {
            hook(&err);
        }
    }
}

fn absorb<T>(what: &str, result: Result<T, StoreError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_not_found() => {
            tracing::debug!(what, "nothing persisted yet");
            None
        }
        Err(err) => {
            tracing::warn!(what, %err, "discarding unreadable planner data");
            None
        }
    }
}

fn clean_name(name: &str) -> Result<String, PlannerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PlannerError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn check_period(
    timetable: &WeeklyTimetable,
    day: Weekday,
    period: u32,
    max: u32,
    except: Option<Uuid>,
) -> Result<(), PlannerError> {
    if period == 0 || period > max {
        return Err(PlannerError::PeriodOutOfRange { period, max });
    }
    if timetable.period_taken(day, period, except) {
        return Err(PlannerError::PeriodTaken { day, period });
    }
    Ok(())
}

fn checklist_item(
    timetable: &mut WeeklyTimetable,
    day: Weekday,
    session_id: Uuid,
    item_id: Uuid,
) -> Result<&mut ChecklistItem, PlannerError> {
    timetable
        .session_mut(day, session_id)
        .ok_or(PlannerError::SessionNotFound(session_id))?
        .item_mut(item_id)
        .ok_or(PlannerError::ItemNotFound(item_id))
}

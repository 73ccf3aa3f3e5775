use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// School days that own a timetable bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
        }
    }

    /// Weekends have no bucket.
    pub fn from_chrono(day: chrono::Weekday) -> Option<Self> {
        match day {
            chrono::Weekday::Mon => Some(Weekday::Mon),
            chrono::Weekday::Tue => Some(Weekday::Tue),
            chrono::Weekday::Wed => Some(Weekday::Wed),
            chrono::Weekday::Thu => Some(Weekday::Thu),
            chrono::Weekday::Fri => Some(Weekday::Fri),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWeekday(pub String);

impl fmt::Display for UnknownWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown weekday `{}`", self.0)
    }
}

impl std::error::Error for UnknownWeekday {}

impl FromStr for Weekday {
    type Err = UnknownWeekday;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|day| day.as_str() == s)
            .ok_or_else(|| UnknownWeekday(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "isCompleted", default)]
    pub is_completed: bool,
}

impl ChecklistItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_completed: false,
        }
    }
}

fn first_period() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSession {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default = "first_period")]
    pub period: u32,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

impl ClassSession {
    pub fn new(name: impl Into<String>, period: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            period,
            items: Vec::new(),
        }
    }

    pub fn item_mut(&mut self, id: Uuid) -> Option<&mut ChecklistItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

/// Class sessions for each school day. Every weekday is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeeklyTimetable {
    days: BTreeMap<Weekday, Vec<ClassSession>>,
}

impl Default for WeeklyTimetable {
    fn default() -> Self {
        Self {
            days: Weekday::ALL.into_iter().map(|day| (day, Vec::new())).collect(),
        }
    }
}

impl WeeklyTimetable {
    pub fn sessions(&self, day: Weekday) -> &[ClassSession] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sessions_mut(&mut self, day: Weekday) -> &mut Vec<ClassSession> {
        self.days.entry(day).or_default()
    }

    pub fn set_sessions(&mut self, day: Weekday, sessions: Vec<ClassSession>) {
        self.days.insert(day, sessions);
    }

    pub fn sorted_by_period(&self, day: Weekday) -> Vec<ClassSession> {
        let mut sessions = self.sessions(day).to_vec();
        sessions.sort_by_key(|session| session.period);
        sessions
    }

    pub fn session_mut(&mut self, day: Weekday, id: Uuid) -> Option<&mut ClassSession> {
        self.sessions_mut(day)
            .iter_mut()
            .find(|session| session.id == id)
    }

    pub fn max_period(&self, day: Weekday) -> Option<u32> {
        self.sessions(day).iter().map(|session| session.period).max()
    }

    pub fn period_taken(&self, day: Weekday, period: u32, except: Option<Uuid>) -> bool {
        self.sessions(day)
            .iter()
            .any(|session| session.period == period && Some(session.id) != except)
    }

    /// Removes a session and renumbers the rest 1..N in period order.
    pub fn remove_session(&mut self, day: Weekday, id: Uuid) -> Option<ClassSession> {
        let sessions = self.sessions_mut(day);
        let index = sessions.iter().position(|session| session.id == id)?;
        let removed = sessions.remove(index);
        let mut order: Vec<usize> = (0..sessions.len()).collect();
        order.sort_by_key(|&idx| sessions[idx].period);
        for (rank, idx) in order.into_iter().enumerate() {
            sessions[idx].period = rank as u32 + 1;
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[ClassSession])> {
        self.days.iter().map(|(day, sessions)| (*day, sessions.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(Vec::is_empty)
    }
}

impl<'de> Deserialize<'de> for WeeklyTimetable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut timetable = WeeklyTimetable::default();
        for (key, value) in raw {
            let Ok(day) = key.parse::<Weekday>() else {
                tracing::warn!(key = %key, "ignoring timetable bucket for unknown weekday");
                continue;
            };
            let serde_json::Value::Array(entries) = value else {
                tracing::warn!(%day, "ignoring timetable bucket that is not a list");
                continue;
            };
            let mut sessions = Vec::with_capacity(entries.len());
            for entry in entries {
                match serde_json::from_value::<ClassSession>(entry) {
                    Ok(session) => sessions.push(session),
                    Err(err) => tracing::warn!(%day, %err, "skipping unreadable class session"),
                }
            }
            timetable.set_sessions(day, sessions);
        }
        Ok(timetable)
    }
}

fn notifications_on() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderItem {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "notificationEnabled", default = "notifications_on")]
    pub notification_enabled: bool,
}

impl ReminderItem {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date,
            notification_enabled: true,
        }
    }
}

/// Reminders in insertion order. Date order is always derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderList {
    items: Vec<ReminderItem>,
}

impl ReminderList {
    pub fn from_items(items: Vec<ReminderItem>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[ReminderItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: ReminderItem) {
        self.items.push(item);
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut ReminderItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<ReminderItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Whether another reminder already uses this name on this calendar day.
    pub fn has_duplicate(&self, name: &str, date: NaiveDate, except: Option<Uuid>) -> bool {
        self.items
            .iter()
            .any(|item| item.name == name && item.date == date && Some(item.id) != except)
    }

    pub fn sorted_by_date(&self) -> Vec<ReminderItem> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        items
    }
}

/// Time of day at which D-1 alerts fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlertTime {
    hour: u32,
    minute: u32,
}

impl AlertTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }
}

impl Default for AlertTime {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

impl fmt::Display for AlertTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for AlertTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got `{s}`"))?;
        let hour = hour.parse::<u32>().map_err(|err| err.to_string())?;
        let minute = minute.parse::<u32>().map_err(|err| err.to_string())?;
        AlertTime::new(hour, minute).ok_or_else(|| format!("`{s}` is not a time of day"))
    }
}

impl Serialize for AlertTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AlertTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn timetable_with(day: Weekday, names: &[&str]) -> WeeklyTimetable {
        let mut timetable = WeeklyTimetable::default();
        let sessions = names
            .iter()
            .enumerate()
            .map(|(idx, name)| ClassSession::new(*name, idx as u32 + 1))
            .collect();
        timetable.set_sessions(day, sessions);
        timetable
    }

    #[test]
    fn removing_a_session_closes_the_period_gap() {
        let mut timetable = timetable_with(Weekday::Tue, &["Math", "Physics", "Art", "Music"]);
        let physics = timetable.sessions(Weekday::Tue)[1].id;

        let removed = timetable.remove_session(Weekday::Tue, physics).expect("removed");
        assert_eq!(removed.name, "Physics");

        let remaining = timetable.sorted_by_period(Weekday::Tue);
        let periods: Vec<u32> = remaining.iter().map(|s| s.period).collect();
        let names: Vec<&str> = remaining.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(periods, vec![1, 2, 3]);
        assert_eq!(names, vec!["Math", "Art", "Music"]);
    }

    #[test]
    fn removing_every_position_keeps_periods_contiguous() {
        for target in 0..4 {
            let mut timetable = timetable_with(Weekday::Fri, &["A", "B", "C", "D"]);
            let id = timetable.sessions(Weekday::Fri)[target].id;
            timetable.remove_session(Weekday::Fri, id);
            let periods: Vec<u32> = timetable
                .sorted_by_period(Weekday::Fri)
                .iter()
                .map(|s| s.period)
                .collect();
            assert_eq!(periods, vec![1, 2, 3], "removing index {target}");
        }
    }

    #[test]
    fn removing_after_a_gap_renumbers_from_one() {
        let mut timetable = timetable_with(Weekday::Mon, &["A", "B", "C"]);
        let ids: Vec<Uuid> = timetable.sessions(Weekday::Mon).iter().map(|s| s.id).collect();
        timetable.session_mut(Weekday::Mon, ids[1]).unwrap().period = 7;

        timetable.remove_session(Weekday::Mon, ids[0]);

        let remaining = timetable.sorted_by_period(Weekday::Mon);
        let summary: Vec<(u32, &str)> = remaining.iter().map(|s| (s.period, s.name.as_str())).collect();
        assert_eq!(summary, vec![(1, "C"), (2, "B")]);
    }

    #[test]
    fn removing_unknown_session_is_a_noop() {
        let mut timetable = timetable_with(Weekday::Mon, &["Math"]);
        assert!(timetable.remove_session(Weekday::Mon, Uuid::new_v4()).is_none());
        assert_eq!(timetable.sessions(Weekday::Mon).len(), 1);
    }

    #[test]
    fn timetable_json_is_keyed_by_weekday_abbreviation() {
        let mut timetable = timetable_with(Weekday::Wed, &["Chemistry"]);
        let id = timetable.sessions(Weekday::Wed)[0].id;
        timetable
            .session_mut(Weekday::Wed, id)
            .unwrap()
            .items
            .push(ChecklistItem::new("Lab coat"));

        let json = serde_json::to_value(&timetable).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 5);
        assert_eq!(object["Mon"], serde_json::json!([]));
        let session = &object["Wed"][0];
        assert_eq!(session["name"], "Chemistry");
        assert_eq!(session["period"], 1);
        assert_eq!(session["items"][0]["isCompleted"], false);

        let decoded: WeeklyTimetable = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, timetable);
    }

    #[test]
    fn timetable_decode_defaults_missing_fields_and_drops_weekends() {
        let raw = r#"{
            "Mon": [{"id": "6f1c1a9e-3d7b-4c55-9a0e-1d2b3c4d5e6f", "name": "Math", "period": 2,
                     "items": [{"id": "0b7e2a3c-9f1d-4e8a-8c6b-5a4d3e2f1a0b", "name": "Ruler"}]}],
            "Sat": [{"name": "Club", "period": 1}]
        }"#;
        let timetable: WeeklyTimetable = serde_json::from_str(raw).unwrap();
        let monday = timetable.sessions(Weekday::Mon);
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].period, 2);
        assert!(!monday[0].items[0].is_completed);
        assert!(timetable.sessions(Weekday::Tue).is_empty());
        assert_eq!(timetable.iter().count(), 5);
    }

    #[test]
    fn bad_sessions_are_skipped_without_losing_the_bucket() {
        let raw = r#"{
            "Tue": [{"name": "Math", "period": 1, "items": [{"name": "Ruler", "isCompleted": "yes"}]},
                    {"name": "Art", "period": 2}],
            "Wed": 5,
            "Thu": [{"name": "Music", "period": 1}]
        }"#;
        let timetable: WeeklyTimetable = serde_json::from_str(raw).unwrap();
        let tuesday = timetable.sessions(Weekday::Tue);
        assert_eq!(tuesday.len(), 1);
        assert_eq!(tuesday[0].name, "Art");
        assert!(timetable.sessions(Weekday::Wed).is_empty());
        assert_eq!(timetable.sessions(Weekday::Thu)[0].name, "Music");
    }

    #[test]
    fn reminder_decode_defaults_notification_flag() {
        let raw = r#"{"id": "6f1c1a9e-3d7b-4c55-9a0e-1d2b3c4d5e6f", "name": "Math Final", "date": "2026-12-01"}"#;
        let reminder: ReminderItem = serde_json::from_str(raw).unwrap();
        assert!(reminder.notification_enabled);
        assert_eq!(reminder.date, date(2026, 12, 1));
    }

    #[test]
    fn reminders_sort_by_date_without_reordering_storage() {
        let mut list = ReminderList::default();
        list.push(ReminderItem::new("Essay", date(2026, 11, 3)));
        list.push(ReminderItem::new("Exam", date(2026, 10, 20)));
        list.push(ReminderItem::new("Trip", date(2026, 11, 1)));

        let sorted: Vec<String> = list.sorted_by_date().into_iter().map(|r| r.name).collect();
        assert_eq!(sorted, vec!["Exam", "Trip", "Essay"]);
        assert_eq!(list.as_slice()[0].name, "Essay");
    }

    #[test]
    fn duplicate_check_ignores_the_reminder_being_edited() {
        let mut list = ReminderList::default();
        let item = ReminderItem::new("Math Final", date(2026, 12, 1));
        let id = item.id;
        list.push(item);

        assert!(list.has_duplicate("Math Final", date(2026, 12, 1), None));
        assert!(!list.has_duplicate("Math Final", date(2026, 12, 1), Some(id)));
        assert!(!list.has_duplicate("Math Final", date(2026, 12, 2), None));
    }

    #[test]
    fn alert_time_parses_and_formats() {
        let time: AlertTime = "07:05".parse().unwrap();
        assert_eq!((time.hour(), time.minute()), (7, 5));
        assert_eq!(time.to_string(), "07:05");
        assert_eq!(AlertTime::default().to_string(), "09:00");
        assert!("24:00".parse::<AlertTime>().is_err());
        assert!("nine".parse::<AlertTime>().is_err());
        assert!(AlertTime::new(23, 60).is_none());
    }

    #[test]
    fn weekday_mapping_excludes_weekends() {
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Thu), Some(Weekday::Thu));
        assert_eq!(Weekday::from_chrono(chrono::Weekday::Sun), None);
        assert_eq!("Fri".parse::<Weekday>(), Ok(Weekday::Fri));
        assert!("Sat".parse::<Weekday>().is_err());
    }
}

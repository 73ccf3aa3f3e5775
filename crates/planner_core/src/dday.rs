use std::fmt;

use chrono::NaiveDate;

use crate::model::ReminderItem;

/// Whole calendar days from `today` to `target`; negative once the date has passed.
pub fn days_until(target: NaiveDate, today: NaiveDate) -> i64 {
    target.signed_duration_since(today).num_days()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DDay {
    Upcoming(i64),
    Today,
    Passed(i64),
}

impl DDay {
    pub fn between(target: NaiveDate, today: NaiveDate) -> Self {
        match days_until(target, today) {
            0 => DDay::Today,
            n if n > 0 => DDay::Upcoming(n),
            n => DDay::Passed(-n),
        }
    }

    pub fn is_past(&self) -> bool {
        matches!(self, DDay::Passed(_))
    }
}

impl fmt::Display for DDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DDay::Today => f.write_str("D-Day"),
            DDay::Upcoming(days) => write!(f, "D-{days}"),
            DDay::Passed(days) => write!(f, "D+{days}"),
        }
    }
}

impl ReminderItem {
    pub fn dday(&self, today: NaiveDate) -> DDay {
        DDay::between(self.date, today)
    }
}

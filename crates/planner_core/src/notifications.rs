use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::{AlertTime, ReminderItem};

pub const D_MINUS_ONE_TITLE: &str = "D-1";

/// A calendar-triggered alert in local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: String,
    pub title: String,
    pub body: String,
    pub fire_at: NaiveDateTime,
}

/// Platform-specific notification adapters will implement this trait.
pub trait NotificationSink: Send + Sync {
    fn schedule(&self, notification: NotificationRequest);
    fn cancel_all(&self);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn schedule(&self, notification: NotificationRequest) {
        (**self).schedule(notification)
    }

    fn cancel_all(&self) {
        (**self).cancel_all()
    }
}

/// The instant a reminder's D-1 alert fires, before the past-date filter.
pub fn fire_time(reminder: &ReminderItem, alert: AlertTime) -> Option<NaiveDateTime> {
    let eve = reminder.date.pred_opt()?;
    Some(eve.and_time(alert.to_naive_time()?))
}

/// One request per enabled reminder whose D-1 instant is still ahead of `now`.
pub fn plan_notifications(
    reminders: &[ReminderItem],
    alert: AlertTime,
    now: NaiveDateTime,
) -> Vec<NotificationRequest> {
    reminders
        .iter()
        .filter(|reminder| reminder.notification_enabled)
        .filter_map(|reminder| {
            let fire_at = fire_time(reminder, alert)?;
            (fire_at > now).then(|| NotificationRequest {
                id: reminder.id.to_string(),
                title: D_MINUS_ONE_TITLE.to_string(),
                body: format!("{} is tomorrow.", reminder.name),
                fire_at,
            })
        })
        .collect()
}

/// Drops every pending alert and registers the freshly planned set.
pub fn reschedule(
    sink: &dyn NotificationSink,
    reminders: &[ReminderItem],
    alert: AlertTime,
    now: NaiveDateTime,
) -> usize {
    sink.cancel_all();
    let planned = plan_notifications(reminders, alert, now);
    let count = planned.len();
    for request in planned {
        sink.schedule(request);
    }
    tracing::debug!(count, %alert, "notifications rescheduled");
    count
}

/// Keeps pending requests in memory, keyed by request id.
#[derive(Debug, Default)]
pub struct PendingNotifications {
    pending: Mutex<BTreeMap<String, NotificationRequest>>,
}

impl PendingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending requests ordered by fire time.
    pub fn pending(&self) -> Vec<NotificationRequest> {
        let mut requests: Vec<NotificationRequest> = self.pending.lock().values().cloned().collect();
        requests.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        requests
    }

    pub fn get(&self, id: &str) -> Option<NotificationRequest> {
        self.pending.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl NotificationSink for PendingNotifications {
    fn schedule(&self, notification: NotificationRequest) {
        self.pending
            .lock()
            .insert(notification.id.clone(), notification);
    }

    fn cancel_all(&self) {
        self.pending.lock().clear();
    }
}

/// Sink for hosts without a notification centre; it only traces.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn schedule(&self, notification: NotificationRequest) {
        tracing::info!(
            id = %notification.id,
            fire_at = %notification.fire_at,
            body = %notification.body,
            "notification scheduled"
        );
    }

    fn cancel_all(&self) {
        tracing::debug!("pending notifications cleared");
    }
}

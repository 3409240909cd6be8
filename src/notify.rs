//! Ephemeral user-facing messages, displayed oldest first.
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::watch;

use crate::model::JobId;
use crate::timer::ScheduledTask;

/// How long a notification stays up unless dismissed earlier.
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    #[default]
    Info,
}

/// What an action does when invoked. Commands are data, resolved by the
/// engine, so no notification holds a closure over engine state.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ActionCommand {
    UndoDelete(JobId),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NotificationAction {
    pub label: String,
    pub command: ActionCommand,
}

impl NotificationAction {
    pub fn undo_delete(id: JobId) -> Self {
        Self {
            label: "Undo".to_string(),
            command: ActionCommand::UndoDelete(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub action: Option<NotificationAction>,
}

#[derive(Debug)]
struct Entry {
    notification: Notification,
    expiry: Option<ScheduledTask>,
}

#[derive(Debug)]
pub struct NotificationQueue {
    entries: VecDeque<Entry>,
    next_id: NotificationId,
    tx: watch::Sender<Vec<Notification>>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.tx.subscribe()
    }

    /// Append a notification at the tail. Identical messages are not merged.
    pub fn push(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        action: Option<NotificationAction>,
    ) -> NotificationId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(Entry {
            notification: Notification {
                id,
                message: message.into(),
                kind,
                action,
            },
            expiry: None,
        });
        self.publish();
        id
    }

    /// Attach the auto-expiry timer of `id`. If the notification is already
    /// gone the timer is cancelled right away.
    pub fn arm(&mut self, id: NotificationId, expiry: ScheduledTask) {
        match self.entries.iter_mut().find(|e| e.notification.id == id) {
            Some(entry) => entry.expiry = Some(expiry),
            None => expiry.cancel(),
        }
    }

    /// Remove `id` now. Idempotent: returns None if it is already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> Option<Notification> {
        let index = self.entries.iter().position(|e| e.notification.id == id)?;
        let entry = self.entries.remove(index)?;
        if let Some(expiry) = &entry.expiry {
            expiry.cancel();
        }
        self.publish();
        Some(entry.notification)
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.iter().find(|n| n.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().map(|e| &e.notification)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn publish(&mut self) {
        let visible = self.iter().cloned().collect();
        self.tx.send_replace(visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_in_fifo_order_with_increasing_ids() {
        let mut queue = NotificationQueue::new();
        let a = queue.push("Job added successfully", NotificationKind::Success, None);
        let b = queue.push("Job added successfully", NotificationKind::Success, None);
        let c = queue.push("Failed to load jobs", NotificationKind::Error, None);

        assert!(a < b && b < c);
        let messages: Vec<_> = queue.iter().map(|n| n.id).collect();
        assert_eq!(messages, vec![a, b, c]);
    }

    #[test]
    fn dismiss_is_idempotent() {
        let mut queue = NotificationQueue::new();
        let id = queue.push("hello", NotificationKind::default(), None);
        assert_eq!(queue.get(id).unwrap().kind, NotificationKind::Info);

        assert!(queue.dismiss(id).is_some());
        assert!(queue.dismiss(id).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn subscribers_track_visible_notifications() {
        let mut queue = NotificationQueue::new();
        let rx = queue.subscribe();
        let id = queue.push("hello", NotificationKind::Info, None);
        assert_eq!(rx.borrow().len(), 1);
        queue.dismiss(id);
        assert!(rx.borrow().is_empty());
    }
}

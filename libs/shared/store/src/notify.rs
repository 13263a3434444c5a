// libs/shared/store/src/notify.rs
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use shared_models::{NotificationKind, SchedulingError};

/// Fire-and-forget delivery seam. Implementations send email/push/in-app
/// messages; the scheduling cells never let a delivery failure roll back a
/// committed state change.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        related_entity: Option<&str>,
        related_id: Option<Uuid>,
    ) -> Result<(), SchedulingError>;
}

/// Dispatch helper used by the cells: failures are logged and swallowed.
pub async fn notify_best_effort(
    sink: &dyn NotificationSink,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    body: &str,
    related_entity: Option<&str>,
    related_id: Option<Uuid>,
) {
    if let Err(e) = sink
        .notify(user_id, kind, title, body, related_entity, related_id)
        .await
    {
        warn!("Notification dispatch failed for user {}: {}", user_id, e);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub related_entity: Option<String>,
    pub related_id: Option<Uuid>,
}

/// Captures notifications for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<RecordedNotification>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<RecordedNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_id: Uuid) -> Vec<RecordedNotification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        related_entity: Option<&str>,
        related_id: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        self.sent.lock().unwrap().push(RecordedNotification {
            user_id,
            kind,
            title: title.to_string(),
            body: body.to_string(),
            related_entity: related_entity.map(str::to_string),
            related_id,
        });
        Ok(())
    }
}

/// Always fails; used to prove delivery failures never poison a commit.
#[derive(Debug, Default)]
pub struct FailingNotificationSink;

#[async_trait]
impl NotificationSink for FailingNotificationSink {
    async fn notify(
        &self,
        _user_id: Uuid,
        _kind: NotificationKind,
        _title: &str,
        _body: &str,
        _related_entity: Option<&str>,
        _related_id: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        Err(SchedulingError::Repository("notification channel down".into()))
    }
}

//! Notification DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::NotificationId;
use domain_billing::{Notification, Severity};

/// Which notifications to mark read. `markAllAsRead` wins over `id`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub id: Option<NotificationId>,
    #[serde(default)]
    pub mark_all_as_read: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub read: bool,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            title: notification.title,
            message: notification.message,
            severity: notification.severity,
            read: notification.read,
            link: notification.link,
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_read_body_is_camel_case() {
        let all: MarkReadRequest = serde_json::from_value(serde_json::json!({ "markAllAsRead": true })).unwrap();
        assert!(all.mark_all_as_read);
        assert!(all.id.is_none());

        let empty: MarkReadRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!empty.mark_all_as_read);
        assert!(empty.id.is_none());
    }
}

//! User-visible notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visual severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One entry in the client-local inbox. Created from a qualifying
/// realtime event; only its read flag ever changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub level: NotificationLevel,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, level: NotificationLevel) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            message: message.into(),
            level,
            timestamp: Utc::now(),
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_level_as_type() {
        let n = Notification::new("Title", "Message", NotificationLevel::Warning);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["read"], false);
    }
}

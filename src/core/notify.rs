//! User-facing outcome notifications
//!
//! Privileged actions report their terminal outcome as a notification with a
//! severity, never as a log line. Rendering is up to the `Notifier`
//! implementation; the core only produces the values.

use serde::{Deserialize, Serialize};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Danger,
}

/// A user-facing notification produced by a privileged action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    /// Build a success notification
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    /// Build a failure notification
    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Danger,
        }
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }
}

/// Sink for user-facing notifications
///
/// Fire-and-forget: implementations must not block the calling flow.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_notification() {
        let notification = Notification::success("Role updated");

        assert!(notification.is_success());
        assert_eq!(notification.message, "Role updated");
    }

    #[test]
    fn test_danger_notification() {
        let notification = Notification::danger("Error updating role");

        assert!(!notification.is_success());
        assert_eq!(notification.severity, Severity::Danger);
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&Severity::Danger).unwrap();
        assert_eq!(json, r#""danger""#);

        let deserialized: Severity = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, Severity::Danger);
    }
}

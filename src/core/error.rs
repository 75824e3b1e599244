//! Error handling for privileged member administration
//!
//! This module provides the error taxonomy for gated actions, outcome
//! normalization, and the session handoff protocol, using the thiserror
//! crate for ergonomic error handling.

use thiserror::Error;

/// Main error type for privileged administration operations
#[derive(Error, Debug)]
pub enum AdminError {
    // Operator interaction
    #[error("operation cancelled by the operator")]
    OperatorCancelled,

    #[error("another interactive prompt is already open")]
    PromptBusy,

    // Pre-credential policy checks
    #[error("{reason}")]
    PolicyPrecondition { reason: String },

    // Downstream outcome normalization
    #[error("{message}")]
    Application { message: String },

    #[error("[{action}] request failed without a server message")]
    Transport { action: &'static str },

    // Key material handling
    #[error("key operation failed: {message}")]
    KeyOperation { message: String },

    // Session handoff
    #[error("session handoff timed out before the new context signalled ready")]
    HandoffTimeout,

    #[error("session handoff aborted before delivery")]
    HandoffAborted,

    #[error("the peer execution context is gone")]
    ChannelClosed,

    #[error("invalid execution context address: {href}")]
    InvalidOrigin { href: String },

    // Configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl AdminError {
    /// Check if this error produces no user-visible notification
    ///
    /// A cancelled prompt is a deliberate operator decision, never an error
    /// to report.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::OperatorCancelled | Self::PromptBusy)
    }

    /// Check if the operator may retry the action manually
    ///
    /// All errors are terminal for the single attempt; this only signals
    /// whether re-invoking the action can possibly succeed without an
    /// administrator fixing policy or configuration first.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PolicyPrecondition { .. } | Self::Config(_) | Self::InvalidOrigin { .. }
        )
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::OperatorCancelled => "OPERATOR_CANCELLED",
            Self::PromptBusy => "PROMPT_BUSY",
            Self::PolicyPrecondition { .. } => "POLICY_PRECONDITION",
            Self::Application { .. } => "APPLICATION_ERROR",
            Self::Transport { .. } => "TRANSPORT_FAILURE",
            Self::KeyOperation { .. } => "KEY_OPERATION_FAILED",
            Self::HandoffTimeout => "HANDOFF_TIMEOUT",
            Self::HandoffAborted => "HANDOFF_ABORTED",
            Self::ChannelClosed => "CHANNEL_CLOSED",
            Self::InvalidOrigin { .. } => "INVALID_ORIGIN",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_cancelled_is_silent() {
        let error = AdminError::OperatorCancelled;

        assert!(error.is_silent());
        assert!(error.is_retryable());
        assert_eq!(error.code(), "OPERATOR_CANCELLED");
    }

    #[test]
    fn test_application_error_displays_verbatim_message() {
        let error = AdminError::Application {
            message: "Role change is not permitted for this member".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Role change is not permitted for this member"
        );
        assert!(!error.is_silent());
        assert_eq!(error.code(), "APPLICATION_ERROR");
    }

    #[test]
    fn test_transport_error_names_the_action() {
        let error = AdminError::Transport {
            action: "change_role",
        };

        assert!(error.to_string().contains("change_role"));
        assert_eq!(error.code(), "TRANSPORT_FAILURE");
        assert!(error.is_retryable());
    }

    #[test]
    fn test_policy_precondition_is_not_retryable() {
        let error = AdminError::PolicyPrecondition {
            reason: "Administrator privileges must be activated".to_string(),
        };

        assert!(!error.is_retryable());
        assert!(!error.is_silent());
        assert_eq!(error.code(), "POLICY_PRECONDITION");
    }

    #[test]
    fn test_handoff_errors() {
        assert_eq!(AdminError::HandoffTimeout.code(), "HANDOFF_TIMEOUT");
        assert_eq!(AdminError::HandoffAborted.code(), "HANDOFF_ABORTED");
        assert_eq!(AdminError::ChannelClosed.code(), "CHANNEL_CLOSED");
        assert!(AdminError::HandoffTimeout.is_retryable());
    }

    #[test]
    fn test_invalid_origin_includes_href() {
        let error = AdminError::InvalidOrigin {
            href: "not-a-url".to_string(),
        };

        assert!(error.to_string().contains("not-a-url"));
        assert!(!error.is_retryable());
    }
}

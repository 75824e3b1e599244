//! Fresh operator credentials for re-authentication
//!
//! A [`Credential`] is collected immediately before a sensitive action and
//! lives only for the duration of that one gated call. It is consumed by
//! value, never persisted, and its password is backed by
//! `secrecy::SecretString` so it is zeroized on drop and redacted in debug
//! output.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// A fresh password plus optional second-factor code
pub struct Credential {
    password: SecretString,
    second_factor: Option<String>,
}

impl Credential {
    pub fn new(password: impl Into<String>, second_factor: Option<String>) -> Self {
        Self {
            password: SecretString::from(password.into()),
            second_factor,
        }
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    pub fn second_factor(&self) -> Option<&str> {
        self.second_factor.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("password", &"[REDACTED]")
            .field(
                "second_factor",
                &self.second_factor.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Operator's answer to a credential prompt
pub enum PromptReply {
    Submitted(Credential),
    Cancelled,
}

/// Blocking credential prompt presented to the operator
///
/// Implementations resolve once both required fields are supplied, or with
/// `Cancelled` when the operator dismisses the prompt.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn request(&self, requires_second_factor: bool) -> PromptReply;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_accessors() {
        let credential = Credential::new("hunter2", Some("123456".to_string()));

        assert_eq!(credential.password(), "hunter2");
        assert_eq!(credential.second_factor(), Some("123456"));
    }

    #[test]
    fn test_credential_without_second_factor() {
        let credential = Credential::new("hunter2", None);

        assert!(credential.second_factor().is_none());
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let credential = Credential::new("hunter2", Some("123456".to_string()));

        let debug = format!("{:?}", credential);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("123456"));
        assert!(debug.contains("REDACTED"));
    }
}

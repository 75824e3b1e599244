//! Core types and collaborator contracts for member administration
//!
//! This module defines the domain data model and the narrow async interfaces
//! behind which the member directory, the organization service, the key
//! crypto engine and the auxiliary hooks live. The core owns no storage and
//! no wire protocol; it only consumes these contracts and mutates the
//! in-memory view.

use crate::core::error::AdminError;
use crate::security::Credential;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Application-level success code embedded in response bodies
///
/// Distinct from transport success: a call can complete at the transport
/// level and still report a business failure.
pub const APPLICATION_SUCCESS: u32 = 1000;

// ============================================================================
// Domain data model
// ============================================================================

/// Identifier of an organization member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a member within the organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// Kind of a member address
///
/// `Primary` is the address created with the member (wire address type 0);
/// usage counters only account for the non-primary ones on deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Primary,
    Alias,
}

/// A member address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    pub kind: AddressKind,
}

impl Address {
    pub fn new(email: impl Into<String>, kind: AddressKind) -> Self {
        Self {
            email: email.into(),
            kind,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.kind == AddressKind::Primary
    }
}

/// An organization member as held in the local view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub role: Role,
    pub private: bool,
    pub addresses: Vec<Address>,
}

/// Organization header data with usage counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "displayName")]
    pub display_name: String,

    #[serde(rename = "usedMembers")]
    pub used_members: u32,

    #[serde(rename = "usedAddresses")]
    pub used_addresses: u32,

    /// Non-zero when the organization key still awaits activation
    #[serde(rename = "keyStatus")]
    pub key_status: u32,
}

// ============================================================================
// Secrets and key material
// ============================================================================

/// Opaque, single-use, server-issued session token for an impersonated login
///
/// Owned by the executor until handed off; the initiating context has no
/// further use for it after delivery.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token for delivery to the receiving context
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Salt for the key-recovery password derivation, freshly generated per
/// rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySalt(pub String);

/// Key-encryption key derived from a recovery password and a salt
#[derive(Clone)]
pub struct DerivedKey(SecretString);

impl DerivedKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// The organization's armored private key material
#[derive(Clone)]
pub struct OrgPrivateKey(SecretString);

impl OrgPrivateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for OrgPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrgPrivateKey([REDACTED])")
    }
}

/// The organization private key re-encrypted under a derived key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyBlob(pub String);

// ============================================================================
// Response envelope
// ============================================================================

/// Structured response body from a collaborator call
///
/// Success is signalled by `code == 1000`; failures carry an optional
/// server-provided message. A missing message on a non-success code is
/// treated like a transport failure by the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = ()> {
    pub code: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Build an application-success response carrying `payload`
    pub fn success(payload: T) -> Self {
        Self {
            code: APPLICATION_SUCCESS,
            error: None,
            payload: Some(payload),
        }
    }

    /// Build an application error carrying a server message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: 2000,
            error: Some(message.into()),
            payload: None,
        }
    }

    /// Build a non-success response without any message
    pub fn empty_failure() -> Self {
        Self {
            code: 2000,
            error: None,
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == APPLICATION_SUCCESS
    }
}

/// Transport-level failure: the call never produced a response body
///
/// `description` carries the transport layer's own diagnostic when one
/// exists (the authenticate path surfaces it verbatim).
#[derive(Debug, Clone, Error)]
#[error("{}", .description.as_deref().unwrap_or("transport failure"))]
pub struct TransportError {
    pub description: Option<String>,
}

impl TransportError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }

    /// A transport failure with no diagnostic at all
    pub fn silent() -> Self {
        Self { description: None }
    }
}

/// Result of a collaborator call: transport outcome wrapping the
/// application-level envelope
pub type ApiResult<T> = Result<ApiResponse<T>, TransportError>;

// ============================================================================
// Collaborator contracts
// ============================================================================

/// The member directory service (external; storage not owned here)
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Ask the directory to change a member's role
    async fn change_role(&self, id: MemberId, role: Role) -> ApiResult<()>;

    /// Authenticate as `id` with the operator's fresh credential, minting a
    /// single-use session token for the impersonated session
    async fn authenticate_as(&self, id: MemberId, credential: &Credential)
    -> ApiResult<SessionToken>;

    /// Switch a member to private
    async fn privatize(&self, id: MemberId) -> ApiResult<()>;

    /// Remove a member from the directory
    async fn delete(&self, id: MemberId) -> ApiResult<()>;
}

/// The organization service (external)
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Update the organization display name
    async fn update_display_name(&self, name: &str) -> ApiResult<()>;

    /// Submit re-encrypted backup key material together with the operator's
    /// fresh credential
    async fn update_backup_key(
        &self,
        key: &EncryptedKeyBlob,
        salt: &KeySalt,
        credential: &Credential,
    ) -> ApiResult<()>;
}

/// Key derivation and re-encryption engine (external)
#[async_trait]
pub trait KeyCrypto: Send + Sync {
    /// Generate a fresh random salt
    fn generate_salt(&self) -> KeySalt;

    /// Derive a key-encryption key from a recovery password and a salt
    async fn derive_key(
        &self,
        password: &SecretString,
        salt: &KeySalt,
    ) -> Result<DerivedKey, AdminError>;

    /// Re-encrypt the organization private key under a derived key
    async fn reencrypt_private_key(
        &self,
        private_key: &OrgPrivateKey,
        key: &DerivedKey,
    ) -> Result<EncryptedKeyBlob, AdminError>;
}

/// Out-of-band event-log refresh hook, notified after membership changes
pub trait EventLog: Send + Sync {
    fn refresh(&self);
}

/// Navigation hook used when a policy precondition redirects the operator
pub trait Navigator: Send + Sync {
    fn go(&self, view: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(());

        assert!(response.is_success());
        assert_eq!(response.code, APPLICATION_SUCCESS);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error_is_not_success() {
        let response: ApiResponse<()> = ApiResponse::error("Member not found");

        assert!(!response.is_success());
        assert_eq!(response.error.as_deref(), Some("Member not found"));
    }

    #[test]
    fn test_api_response_empty_failure_has_no_message() {
        let response: ApiResponse<()> = ApiResponse::empty_failure();

        assert!(!response.is_success());
        assert!(response.error.is_none());
        assert!(response.payload.is_none());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::new("connection reset").to_string(),
            "connection reset"
        );
        assert_eq!(TransportError::silent().to_string(), "transport failure");
    }

    #[test]
    fn test_session_token_debug_is_redacted() {
        let token = SessionToken::new("st-very-secret-value");

        let debug = format!("{:?}", token);
        assert!(!debug.contains("st-very-secret-value"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(token.expose(), "st-very-secret-value");
    }

    #[test]
    fn test_address_primacy() {
        let primary = Address::new("alice@example.com", AddressKind::Primary);
        let alias = Address::new("alice.alias@example.com", AddressKind::Alias);

        assert!(primary.is_primary());
        assert!(!alias.is_primary());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);

        let role: Role = serde_json::from_str(r#""member""#).unwrap();
        assert_eq!(role, Role::Member);
    }

    #[test]
    fn test_organization_serialization_uses_wire_names() {
        let organization = Organization {
            display_name: "Acme".to_string(),
            used_members: 4,
            used_addresses: 6,
            key_status: 0,
        };

        let json = serde_json::to_string(&organization).unwrap();
        assert!(json.contains("\"usedMembers\":4"));
        assert!(json.contains("\"usedAddresses\":6"));
    }
}

//! Origin-scoped message channel between execution contexts
//!
//! The initiating context and the newly spawned one share no memory; they
//! talk only through this channel. Every inbound envelope declares its
//! origin, and an endpoint honors a message only when that origin matches
//! the expected one exactly. Mismatches are dropped silently (debug-logged
//! only) so the handoff's existence is never leaked to untrusted origins.

use crate::core::error::AdminError;
use crate::core::traits::SessionToken;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Channel capacity per direction
const CHANNEL_CAPACITY: usize = 16;

/// The scheme + host[:port] of an execution context address
///
/// Compared with exact string equality; no normalization beyond what the
/// parse performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin(String);

impl Origin {
    /// Extract the origin from a full context address
    ///
    /// `https://org.example.com:8443/settings/members` becomes
    /// `https://org.example.com:8443`.
    pub fn parse(href: &str) -> Result<Self, AdminError> {
        let mut parts = href.splitn(4, '/');

        let scheme = parts.next().unwrap_or("");
        let gap = parts.next();
        let host = parts.next().unwrap_or("");

        if scheme.len() < 2 || !scheme.ends_with(':') || gap != Some("") || host.is_empty() {
            return Err(AdminError::InvalidOrigin {
                href: href.to_string(),
            });
        }

        Ok(Self(format!("{}//{}", scheme, host)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secret payload delivered exactly once after the `ready` handshake
#[derive(Debug)]
pub struct SessionPayload {
    /// The freshly minted single-use session token
    pub session_token: SessionToken,

    /// The operator's current unlock secret for the target account
    pub unlock_secret: SecretString,
}

/// A message between execution contexts
#[derive(Debug)]
pub enum Message {
    /// The spawned context is ready to receive the session payload
    Ready,

    /// The session payload itself
    Session(SessionPayload),
}

/// A message together with its declared origin
#[derive(Debug)]
pub struct Envelope {
    pub origin: Origin,
    pub message: Message,
}

/// One side of a bidirectional, origin-scoped channel
pub struct ChannelEndpoint {
    local_origin: Origin,
    expected_origin: Origin,
    tx: mpsc::Sender<Envelope>,
    rx: mpsc::Receiver<Envelope>,
}

impl ChannelEndpoint {
    /// Create a connected endpoint pair
    ///
    /// `initiator` is the origin of the context that spawns; `remote` the
    /// origin of the spawned context. For an in-application handoff the two
    /// are the same origin.
    pub fn pair(initiator: Origin, remote: Origin) -> (ChannelEndpoint, ChannelEndpoint) {
        let (to_remote, from_initiator) = mpsc::channel(CHANNEL_CAPACITY);
        let (to_initiator, from_remote) = mpsc::channel(CHANNEL_CAPACITY);

        let initiator_end = ChannelEndpoint {
            local_origin: initiator.clone(),
            expected_origin: remote.clone(),
            tx: to_remote,
            rx: from_remote,
        };
        let remote_end = ChannelEndpoint {
            local_origin: remote,
            expected_origin: initiator,
            tx: to_initiator,
            rx: from_initiator,
        };

        (initiator_end, remote_end)
    }

    pub fn local_origin(&self) -> &Origin {
        &self.local_origin
    }

    pub fn expected_origin(&self) -> &Origin {
        &self.expected_origin
    }

    /// Send a message stamped with this endpoint's own origin
    pub async fn send(&self, message: Message) -> Result<(), AdminError> {
        self.send_raw(Envelope {
            origin: self.local_origin.clone(),
            message,
        })
        .await
    }

    /// Send an envelope with an explicit declared origin
    ///
    /// Exists so callers (and tests) can model messages arriving from
    /// arbitrary origins; the peer's receive path decides whether to honor
    /// them.
    pub async fn send_raw(&self, envelope: Envelope) -> Result<(), AdminError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| AdminError::ChannelClosed)
    }

    /// Receive the next message whose declared origin matches the expected
    /// origin exactly
    ///
    /// Envelopes from any other origin are dropped without a reply or an
    /// error. `None` means the peer endpoint is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        while let Some(envelope) = self.rx.recv().await {
            if envelope.origin != self.expected_origin {
                tracing::debug!(
                    origin = %envelope.origin,
                    expected = %self.expected_origin,
                    "dropping message from unexpected origin"
                );
                continue;
            }
            return Some(envelope.message);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin::parse("https://org.example.com/settings/members").unwrap()
    }

    #[test]
    fn test_origin_parse_strips_the_path() {
        assert_eq!(origin().as_str(), "https://org.example.com");
    }

    #[test]
    fn test_origin_parse_keeps_the_port() {
        let origin = Origin::parse("https://org.example.com:8443/login").unwrap();
        assert_eq!(origin.as_str(), "https://org.example.com:8443");
    }

    #[test]
    fn test_origin_parse_without_path() {
        let origin = Origin::parse("https://org.example.com").unwrap();
        assert_eq!(origin.as_str(), "https://org.example.com");
    }

    #[test]
    fn test_origin_parse_rejects_garbage() {
        assert!(matches!(
            Origin::parse("not-a-url"),
            Err(AdminError::InvalidOrigin { .. })
        ));
        assert!(matches!(
            Origin::parse(""),
            Err(AdminError::InvalidOrigin { .. })
        ));
        assert!(matches!(
            Origin::parse("https:///path"),
            Err(AdminError::InvalidOrigin { .. })
        ));
    }

    #[test]
    fn test_origins_compare_exactly() {
        let a = Origin::parse("https://org.example.com/x").unwrap();
        let b = Origin::parse("https://org.example.com:443/x").unwrap();

        // no port normalization: these are different origins
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_pair_round_trip() {
        let (initiator, mut remote) = ChannelEndpoint::pair(origin(), origin());

        initiator.send(Message::Ready).await.unwrap();

        assert!(matches!(remote.recv().await, Some(Message::Ready)));
    }

    #[tokio::test]
    async fn test_wrong_origin_is_dropped_silently() {
        let (mut initiator, remote) = ChannelEndpoint::pair(origin(), origin());

        let forged = Origin::parse("https://evil.example.com/x").unwrap();
        remote
            .send_raw(Envelope {
                origin: forged,
                message: Message::Ready,
            })
            .await
            .unwrap();
        remote.send(Message::Ready).await.unwrap();

        // the forged envelope is skipped; only the honest one arrives
        assert!(matches!(initiator.recv().await, Some(Message::Ready)));

        drop(remote);
        assert!(initiator.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_send_after_peer_dropped_is_channel_closed() {
        let (initiator, remote) = ChannelEndpoint::pair(origin(), origin());
        drop(remote);

        let result = initiator.send(Message::Ready).await;
        assert!(matches!(result, Err(AdminError::ChannelClosed)));
    }
}

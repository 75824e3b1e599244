//! Session handoff state machine
//!
//! Transfers a freshly issued, single-use session token into a newly spawned
//! execution context. Delivery waits for the remote context's `ready`
//! signal, polling on a fixed interval up to a configured bound; the token
//! crosses the channel exactly once and never before `ready` was observed
//! from the verified origin.

use crate::core::config::HandoffConfig;
use crate::core::error::AdminError;
use crate::handoff::channel::{ChannelEndpoint, Message, SessionPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, timeout};

/// Handoff protocol state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandoffState {
    AwaitingReady,
    Delivered,
    Aborted,
    TimedOut,
}

impl HandoffState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AwaitingReady)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: HandoffState,
    pub to: HandoffState,
    pub timestamp: DateTime<Utc>,
}

/// One handoff attempt: handshake, single delivery, bounded retry
pub struct SessionHandoff {
    state: HandoffState,
    transitions: Vec<StateTransition>,
    retry_interval: Duration,
    max_wait: Duration,
}

impl SessionHandoff {
    pub fn new(config: &HandoffConfig) -> Self {
        Self {
            state: HandoffState::AwaitingReady,
            transitions: Vec::new(),
            retry_interval: config.retry_interval(),
            max_wait: config.max_wait(),
        }
    }

    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Timestamped transition history
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    fn transition(&mut self, to: HandoffState) {
        tracing::debug!(from = ?self.state, to = ?to, "handoff state transition");
        self.transitions.push(StateTransition {
            from: self.state,
            to,
            timestamp: Utc::now(),
        });
        self.state = to;
    }

    /// Run the handshake and deliver `payload` exactly once
    ///
    /// Waits for a `ready` message on `channel` (wrong-origin messages never
    /// reach this level, see [`ChannelEndpoint::recv`]), polling at the
    /// configured interval. The handshake is one-shot: after the first
    /// `ready` no further messages are consumed, the payload is sent once,
    /// and the state becomes `Delivered`. Exceeding the wait bound yields
    /// `TimedOut`; a vanished peer yields `Aborted`.
    pub async fn run(
        &mut self,
        channel: &mut ChannelEndpoint,
        payload: SessionPayload,
    ) -> Result<(), AdminError> {
        if self.state.is_terminal() {
            return Err(AdminError::HandoffAborted);
        }

        let deadline = Instant::now() + self.max_wait;

        loop {
            let now = Instant::now();
            if now >= deadline {
                self.transition(HandoffState::TimedOut);
                return Err(AdminError::HandoffTimeout);
            }

            let window = self.retry_interval.min(deadline - now);
            match timeout(window, channel.recv()).await {
                Ok(Some(Message::Ready)) => break,
                Ok(Some(message)) => {
                    tracing::debug!(?message, "ignoring message while awaiting ready");
                }
                Ok(None) => {
                    self.transition(HandoffState::Aborted);
                    return Err(AdminError::ChannelClosed);
                }
                Err(_elapsed) => {
                    tracing::trace!("ready not yet observed, retrying");
                }
            }
        }

        if let Err(err) = channel.send(Message::Session(payload)).await {
            self.transition(HandoffState::Aborted);
            return Err(err);
        }

        self.transition(HandoffState::Delivered);
        Ok(())
    }

    /// Abort a not-yet-delivered handoff
    ///
    /// No-op once a terminal state was reached; a delivered token is the
    /// remote context's to keep.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.transition(HandoffState::Aborted);
        }
    }
}

/// Remote-context half of the handshake
///
/// Announces readiness on `channel`, then waits for the session payload.
pub async fn receive_session(channel: &mut ChannelEndpoint) -> Result<SessionPayload, AdminError> {
    channel.send(Message::Ready).await?;

    loop {
        match channel.recv().await {
            Some(Message::Session(payload)) => return Ok(payload),
            Some(Message::Ready) => continue,
            None => return Err(AdminError::ChannelClosed),
        }
    }
}

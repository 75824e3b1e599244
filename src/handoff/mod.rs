//! Cross-context session handoff
//!
//! Establishes a secure channel to a newly spawned execution context and
//! transfers a single-use session token into it exactly once, behind a
//! ready/not-ready handshake with bounded polling retry.

pub mod channel;
pub mod context;
pub mod protocol;

pub use channel::{ChannelEndpoint, Envelope, Message, Origin, SessionPayload};
pub use context::{ContextLauncher, LaunchedContext};
pub use protocol::{HandoffState, SessionHandoff, StateTransition, receive_session};

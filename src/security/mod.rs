pub mod credential;
pub mod credential_gate;

pub use credential::{Credential, CredentialPrompt, PromptReply};
pub use credential_gate::CredentialGate;

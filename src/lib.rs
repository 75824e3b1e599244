pub mod console;
pub mod core;
pub mod handoff;
pub mod orchestration;
pub mod security;
pub mod testing;

pub use core::*;
pub use handoff::{
    ChannelEndpoint, ContextLauncher, HandoffState, LaunchedContext, Origin, SessionHandoff,
    SessionPayload,
};
pub use orchestration::{
    ConfirmationPrompt, ConfirmationRequest, ConfirmationWorkflow, Decision, OperatorContext,
    OrganizationView, PendingAction, PrivilegedActionExecutor, RecoveryForm, Services,
};
pub use security::{Credential, CredentialGate, CredentialPrompt, PromptReply};

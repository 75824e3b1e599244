//! Action orchestration
//!
//! Confirmation workflow, the local organization view, and the privileged
//! action executor that ties confirmation, the credential gate, the
//! collaborator calls and outcome settlement together.

pub mod confirmation;
pub mod executor;
pub mod view;

pub use confirmation::{
    ConfirmationPrompt, ConfirmationRequest, ConfirmationWorkflow, Decision, PendingAction,
};
pub use executor::{
    MEMBERS_VIEW, OperatorContext, PrivilegedActionExecutor, Services, WAITING_VIEW, messages,
};
pub use view::{OrganizationView, RecoveryForm};

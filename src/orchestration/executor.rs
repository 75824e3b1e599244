//! Privileged action executor
//!
//! Drives the administrative actions end to end: confirmation where the
//! action has consequences worth describing, the credential gate where
//! policy demands fresh credentials, the collaborator call, and a uniform
//! settlement of its three-way outcome (application success, application
//! error, transport failure). The local view only changes after an
//! acknowledged success.

use crate::core::config::{AdminConfig, KEY_PHASE_IMPERSONATION_CUTOFF};
use crate::core::error::AdminError;
use crate::core::interaction::{InteractionSlot, OperatorOutcome};
use crate::core::notify::{Notification, Notifier};
use crate::core::traits::{
    ApiResult, EventLog, KeyCrypto, MemberDirectory, MemberId, Navigator, OrganizationService,
    Role,
};
use crate::handoff::{ContextLauncher, HandoffState, Origin, SessionHandoff, SessionPayload};
use crate::orchestration::confirmation::{
    ConfirmationPrompt, ConfirmationRequest, ConfirmationWorkflow, Decision, PendingAction,
};
use crate::orchestration::view::OrganizationView;
use crate::security::{CredentialGate, CredentialPrompt};
use secrecy::SecretString;
use std::sync::Arc;

/// View the operator is sent back to when impersonation is blocked by policy
pub const MEMBERS_VIEW: &str = "secured.members";

/// Neutral waiting view a spawned context starts on; carries no secret
pub const WAITING_VIEW: &str = "login.sub";

/// Operator-facing strings
///
/// Success and failure wording is per action; cancellations are silent.
pub mod messages {
    pub const CHANGE_ROLE_TITLE: &str = "Change Role";
    pub const ELEVATE_WARNING: &str = "You must provide this member with the backup organization key password for full activation of administrator privileges.";
    pub const DEMOTE_WARNING: &str = "By demoting this member you agree to assume any outstanding organization-related obligations the member may have.";
    pub const ROLE_UPDATED: &str = "Role updated";
    pub const ROLE_UPDATE_FAILED: &str = "Error updating role";

    pub const PRIVATIZE_TITLE: &str = "Privatize Member";
    pub const PRIVATIZE_WARNING: &str = "Organization administrators will no longer be able to log in and control the member's account after privatization. This change is PERMANENT.";
    pub const STATUS_UPDATED: &str = "Status Updated";
    pub const STATUS_UPDATE_FAILED: &str = "Error updating status";

    pub const REMOVE_TITLE: &str = "Remove member";
    pub const REMOVE_WARNING: &str = "Are you sure you want to remove this member?";
    pub const MEMBER_REMOVED: &str = "Member removed";
    pub const REMOVE_FAILED: &str = "Error during deletion";

    pub const ORGANIZATION_UPDATED: &str = "Organization updated";
    pub const ORGANIZATION_UPDATE_FAILED: &str = "Error updating organization name";

    pub const RECOVERY_UPDATED: &str = "Organization key recovery password updated";
    pub const RECOVERY_UPDATE_FAILED: &str = "Error updating organization key recovery password";

    pub const ACTIVATION_REQUIRED: &str = "Administrator privileges must be activated";
    pub const LOGIN_FAILED: &str = "Error logging in to the member account";
    pub const HANDOFF_FAILED: &str = "Error reaching the new session window";
}

/// External collaborators the executor drives
pub struct Services {
    pub directory: Arc<dyn MemberDirectory>,
    pub organization: Arc<dyn OrganizationService>,
    pub key_crypto: Arc<dyn KeyCrypto>,
    pub event_log: Arc<dyn EventLog>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Ambient facts about the operator's own session
///
/// `unlock_secret` is the operator's current mailbox unlock secret; it rides
/// along in the session handoff so the impersonated session can unlock the
/// member's mailbox. It never appears in any navigation target.
#[derive(Clone)]
pub struct OperatorContext {
    /// Full address of the operator's current context
    pub href: String,

    /// Current unlock secret, forwarded inside the handoff payload only
    pub unlock_secret: SecretString,

    /// Whether the operator's account has a second factor enrolled
    pub has_second_factor: bool,
}

/// Executor for privileged administrative actions
pub struct PrivilegedActionExecutor {
    view: OrganizationView,
    config: AdminConfig,
    services: Services,
    gate: CredentialGate,
    confirmation: ConfirmationWorkflow,
}

impl PrivilegedActionExecutor {
    pub fn new(
        view: OrganizationView,
        config: AdminConfig,
        services: Services,
        credential_prompt: Arc<dyn CredentialPrompt>,
        confirmation_prompt: Arc<dyn ConfirmationPrompt>,
    ) -> Self {
        // one slot shared by both prompts: at most one interactive prompt
        // is outstanding per operator session
        let slot = Arc::new(InteractionSlot::new());

        Self {
            view,
            config,
            services,
            gate: CredentialGate::new(credential_prompt, Arc::clone(&slot)),
            confirmation: ConfirmationWorkflow::new(confirmation_prompt, slot),
        }
    }

    pub fn view(&self) -> &OrganizationView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut OrganizationView {
        &mut self.view
    }

    pub fn confirmation(&self) -> &ConfirmationWorkflow {
        &self.confirmation
    }

    /// Settle a collaborator call's three-way outcome
    ///
    /// Application success applies `on_success` to the view, notifies
    /// `success_message` and closes any open confirmation. An application
    /// error surfaces the server's message verbatim. A transport failure, or
    /// a non-success body without a message, surfaces `generic_failure`. The
    /// view is never touched on either failure.
    fn settle<T>(
        &mut self,
        action: &'static str,
        success_message: &str,
        generic_failure: &str,
        response: ApiResult<T>,
        on_success: impl FnOnce(&mut OrganizationView, Option<T>),
    ) -> Result<(), AdminError> {
        match response {
            Ok(body) if body.is_success() => {
                on_success(&mut self.view, body.payload);
                self.services
                    .notifier
                    .notify(Notification::success(success_message));
                self.confirmation.close();
                Ok(())
            }
            Ok(body) => match body.error {
                Some(message) => {
                    tracing::warn!(action, %message, "application error");
                    self.services
                        .notifier
                        .notify(Notification::danger(&message));
                    Err(AdminError::Application { message })
                }
                None => {
                    tracing::warn!(action, "non-success response without a message");
                    self.services
                        .notifier
                        .notify(Notification::danger(generic_failure));
                    Err(AdminError::Transport { action })
                }
            },
            Err(transport) => {
                tracing::warn!(action, error = %transport, "transport failure");
                self.services
                    .notifier
                    .notify(Notification::danger(generic_failure));
                Err(AdminError::Transport { action })
            }
        }
    }

    /// Change a member's role after explicit confirmation
    ///
    /// Elevation and demotion carry different consequence warnings. The
    /// local roster reflects the new role only once the directory
    /// acknowledges it.
    pub async fn change_role(
        &mut self,
        id: MemberId,
        role: Role,
    ) -> Result<OperatorOutcome<()>, AdminError> {
        let warning = match role {
            Role::Admin => messages::ELEVATE_WARNING,
            Role::Member => messages::DEMOTE_WARNING,
        };
        let pending = PendingAction::new(
            ConfirmationRequest::new(messages::CHANGE_ROLE_TITLE, warning),
            (id, role),
        );

        if self.confirmation.decide(&pending.request).await? == Decision::Cancelled {
            return Ok(OperatorOutcome::Cancelled);
        }
        let (id, role) = pending.into_action();

        let response = self.services.directory.change_role(id, role).await;
        self.settle(
            "change_role",
            messages::ROLE_UPDATED,
            messages::ROLE_UPDATE_FAILED,
            response,
            |view, _| {
                view.set_role(id, role);
            },
        )?;

        Ok(OperatorOutcome::Completed(()))
    }

    /// Switch a member to private after explicit confirmation
    ///
    /// Privatization is permanent, which the confirmation spells out.
    pub async fn privatize(&mut self, id: MemberId) -> Result<OperatorOutcome<()>, AdminError> {
        let pending = PendingAction::new(
            ConfirmationRequest::new(messages::PRIVATIZE_TITLE, messages::PRIVATIZE_WARNING),
            id,
        );

        if self.confirmation.decide(&pending.request).await? == Decision::Cancelled {
            return Ok(OperatorOutcome::Cancelled);
        }
        let id = pending.into_action();

        let response = self.services.directory.privatize(id).await;
        self.settle(
            "privatize",
            messages::STATUS_UPDATED,
            messages::STATUS_UPDATE_FAILED,
            response,
            |view, _| {
                view.set_private(id);
            },
        )?;

        Ok(OperatorOutcome::Completed(()))
    }

    /// Remove a member after explicit confirmation
    ///
    /// On acknowledged success the member leaves the roster, the seat and
    /// non-primary address quotas are released, and the event log is asked
    /// to refresh.
    pub async fn delete(&mut self, id: MemberId) -> Result<OperatorOutcome<()>, AdminError> {
        let pending = PendingAction::new(
            ConfirmationRequest::new(messages::REMOVE_TITLE, messages::REMOVE_WARNING),
            id,
        );

        if self.confirmation.decide(&pending.request).await? == Decision::Cancelled {
            return Ok(OperatorOutcome::Cancelled);
        }
        let id = pending.into_action();

        let response = self.services.directory.delete(id).await;
        self.settle(
            "delete",
            messages::MEMBER_REMOVED,
            messages::REMOVE_FAILED,
            response,
            |view, _| {
                view.remove_member(id);
            },
        )?;

        self.services.event_log.refresh();
        Ok(OperatorOutcome::Completed(()))
    }

    /// Update the organization display name
    pub async fn update_display_name(&mut self, name: &str) -> Result<(), AdminError> {
        let response = self.services.organization.update_display_name(name).await;

        let name = name.to_string();
        self.settle(
            "update_display_name",
            messages::ORGANIZATION_UPDATED,
            messages::ORGANIZATION_UPDATE_FAILED,
            response,
            move |view, _| view.set_display_name(&name),
        )
    }

    /// Rotate the organization key recovery password
    ///
    /// Gated behind fresh credentials. With the gate passed, a fresh salt is
    /// generated, the key-encryption key derived from the new password, the
    /// organization private key re-encrypted under it, and the blob, salt and
    /// credential submitted together in a single call. A failure anywhere in
    /// the derivation chain submits nothing. The entry form is cleared only
    /// on acknowledged success.
    pub async fn rotate_recovery_password(
        &mut self,
        operator: &OperatorContext,
    ) -> Result<OperatorOutcome<()>, AdminError> {
        if !self.view.recovery_form().entries_match() {
            return Err(AdminError::PolicyPrecondition {
                reason: "recovery password entries do not match".to_string(),
            });
        }

        let new_password = self.view.recovery_form().password();
        let private_key = self.view.org_private_key().clone();
        let crypto = Arc::clone(&self.services.key_crypto);
        let organization = Arc::clone(&self.services.organization);

        let gated = self
            .gate
            .gate(operator.has_second_factor, |credential| async move {
                let salt = crypto.generate_salt();
                let derived = crypto.derive_key(&new_password, &salt).await?;
                let blob = crypto.reencrypt_private_key(&private_key, &derived).await?;
                Ok(organization.update_backup_key(&blob, &salt, &credential).await)
                // credential, password and derived key dropped here
            })
            .await;

        let response = match gated {
            Ok(OperatorOutcome::Cancelled) => return Ok(OperatorOutcome::Cancelled),
            Ok(OperatorOutcome::Completed(response)) => response,
            Err(err) => {
                if let AdminError::KeyOperation { .. } = &err {
                    self.services
                        .notifier
                        .notify(Notification::danger(err.to_string()));
                }
                return Err(err);
            }
        };

        self.settle(
            "rotate_recovery_password",
            messages::RECOVERY_UPDATED,
            messages::RECOVERY_UPDATE_FAILED,
            response,
            |view, _| view.recovery_form_mut().reset(),
        )?;

        Ok(OperatorOutcome::Completed(()))
    }

    /// Log in to a member account in a fresh execution context
    ///
    /// Policy first: while the organization key awaits activation and the
    /// deployment's key phase requires activation, impersonation is refused
    /// before any prompt is shown. Otherwise the operator re-authenticates,
    /// a new context is spawned on a neutral waiting view, the directory
    /// mints a single-use session token, and the token plus the operator's
    /// unlock secret are handed off over the origin-verified channel. Any
    /// failure after the spawn closes the context; only a delivered handoff
    /// leaves it running.
    pub async fn login_as(
        &mut self,
        id: MemberId,
        operator: &OperatorContext,
        launcher: &dyn ContextLauncher,
    ) -> Result<OperatorOutcome<HandoffState>, AdminError> {
        if self.view.organization().key_status > 0
            && self.config.security.key_phase > KEY_PHASE_IMPERSONATION_CUTOFF
        {
            self.services
                .notifier
                .notify(Notification::danger(messages::ACTIVATION_REQUIRED));
            self.services.navigator.go(MEMBERS_VIEW);
            return Err(AdminError::PolicyPrecondition {
                reason: messages::ACTIVATION_REQUIRED.to_string(),
            });
        }

        let origin = Origin::parse(&operator.href)?;
        let directory = Arc::clone(&self.services.directory);

        // the waiting context opens inside the gated action so a dismissed
        // prompt spawns nothing
        let gated = self
            .gate
            .gate(operator.has_second_factor, |credential| async move {
                let context = launcher.launch(&origin, WAITING_VIEW).await?;
                let response = directory.authenticate_as(id, &credential).await;
                Ok((context, response))
            })
            .await?;

        let (mut context, response) = match gated {
            OperatorOutcome::Cancelled => return Ok(OperatorOutcome::Cancelled),
            OperatorOutcome::Completed(pair) => pair,
        };

        let body = match response {
            Ok(body) => body,
            Err(transport) => {
                context.close();
                let message = transport
                    .description
                    .unwrap_or_else(|| messages::LOGIN_FAILED.to_string());
                self.services.notifier.notify(Notification::danger(message));
                return Err(AdminError::Transport {
                    action: "authenticate_as",
                });
            }
        };

        if !body.is_success() {
            context.close();
            return match body.error {
                Some(message) => {
                    self.services
                        .notifier
                        .notify(Notification::danger(&message));
                    Err(AdminError::Application { message })
                }
                None => {
                    self.services
                        .notifier
                        .notify(Notification::danger(messages::LOGIN_FAILED));
                    Err(AdminError::Transport {
                        action: "authenticate_as",
                    })
                }
            };
        }

        let Some(session_token) = body.payload else {
            context.close();
            self.services
                .notifier
                .notify(Notification::danger(messages::LOGIN_FAILED));
            return Err(AdminError::Transport {
                action: "authenticate_as",
            });
        };

        let payload = SessionPayload {
            session_token,
            unlock_secret: operator.unlock_secret.clone(),
        };

        let mut handoff = SessionHandoff::new(&self.config.handoff);
        match handoff.run(&mut context.channel, payload).await {
            Ok(()) => {
                context.detach();
                Ok(OperatorOutcome::Completed(handoff.state()))
            }
            Err(err) => {
                context.close();
                self.services
                    .notifier
                    .notify(Notification::danger(messages::HANDOFF_FAILED));
                Err(err)
            }
        }
    }
}

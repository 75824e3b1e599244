//! Confirmation workflow for consequence-bearing actions
//!
//! A generic "describe consequences, require explicit confirmation, then
//! act" wrapper. Exactly one of the confirm/cancel paths runs, at most once,
//! triggered solely by the operator: there is no timeout and no
//! auto-dismiss. Composition with the credential gate nests the gate inside
//! the confirm path, so the effective order is always confirm, then
//! authenticate, then act.

use crate::core::error::AdminError;
use crate::core::interaction::{InteractionSlot, OperatorOutcome};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Title and consequence description shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub title: String,
    pub message: String,
}

impl ConfirmationRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Operator's decision on a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirmed,
    Cancelled,
}

/// A sensitive action queued behind its confirmation
///
/// Created when the action is requested; consumed when the operator confirms
/// (the action runs) or dropped when they cancel (no side effects).
#[derive(Debug)]
pub struct PendingAction<A> {
    pub request: ConfirmationRequest,
    action: A,
}

impl<A> PendingAction<A> {
    pub fn new(request: ConfirmationRequest, action: A) -> Self {
        Self { request, action }
    }

    pub fn into_action(self) -> A {
        self.action
    }
}

/// Two-button confirmation prompt presented to the operator
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm(&self, request: &ConfirmationRequest) -> Decision;
}

/// Confirmation workflow with an explicit open/closed lifetime
///
/// The prompt itself resolves with the operator's decision, but the
/// confirmation stays *open* while the confirmed action runs: it is closed
/// only on terminal success (or by the explicit cancel). An application
/// error leaves it open and dismissible, uniformly across actions.
///
/// Shares the caller-provided [`InteractionSlot`] with the credential gate,
/// so only one interactive prompt is outstanding at a time; a concurrent
/// request is rejected with [`AdminError::PromptBusy`].
pub struct ConfirmationWorkflow {
    prompt: Arc<dyn ConfirmationPrompt>,
    slot: Arc<InteractionSlot>,
    open: AtomicBool,
}

impl ConfirmationWorkflow {
    pub fn new(prompt: Arc<dyn ConfirmationPrompt>, slot: Arc<InteractionSlot>) -> Self {
        Self {
            prompt,
            slot,
            open: AtomicBool::new(false),
        }
    }

    /// Present `request` and return the operator's decision
    ///
    /// On `Confirmed` the confirmation stays open until [`Self::close`]; on
    /// `Cancelled` it closes immediately. The interaction slot is held only
    /// while the prompt is awaiting the decision.
    pub async fn decide(&self, request: &ConfirmationRequest) -> Result<Decision, AdminError> {
        let Some(_guard) = self.slot.acquire() else {
            tracing::warn!("confirmation requested while another prompt is open");
            return Err(AdminError::PromptBusy);
        };

        self.open.store(true, Ordering::Release);
        let decision = self.prompt.confirm(request).await;

        if decision == Decision::Cancelled {
            self.open.store(false, Ordering::Release);
        }

        Ok(decision)
    }

    /// Confirm `pending`, then run `on_confirm` with its payload
    ///
    /// Convenience wrapper over [`Self::decide`] for callers whose confirmed
    /// continuation is self-contained.
    pub async fn run<A, T, F, Fut>(
        &self,
        pending: PendingAction<A>,
        on_confirm: F,
    ) -> Result<OperatorOutcome<T>, AdminError>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T, AdminError>>,
    {
        match self.decide(&pending.request).await? {
            Decision::Cancelled => Ok(OperatorOutcome::Cancelled),
            Decision::Confirmed => on_confirm(pending.into_action())
                .await
                .map(OperatorOutcome::Completed),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the confirmation after a terminal success
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConfirmationPrompt;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn workflow(prompt: ScriptedConfirmationPrompt) -> ConfirmationWorkflow {
        ConfirmationWorkflow::new(Arc::new(prompt), Arc::new(InteractionSlot::new()))
    }

    fn request() -> ConfirmationRequest {
        ConfirmationRequest::new("Remove member", "Are you sure you want to remove this member?")
    }

    #[tokio::test]
    async fn test_confirm_runs_the_action_once() {
        let workflow = workflow(ScriptedConfirmationPrompt::confirming());
        let calls = AtomicU32::new(0);

        let outcome = workflow
            .run(PendingAction::new(request(), 7u64), |payload| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(payload * 2) }
            })
            .await
            .unwrap();

        assert_eq!(outcome.completed(), Some(14));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_discards_the_pending_action() {
        let workflow = workflow(ScriptedConfirmationPrompt::cancelling());
        let calls = AtomicU32::new(0);

        let outcome = workflow
            .run(PendingAction::new(request(), ()), |()| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!workflow.is_open());
    }

    #[tokio::test]
    async fn test_stays_open_until_closed_on_success() {
        let workflow = workflow(ScriptedConfirmationPrompt::confirming());

        let decision = workflow.decide(&request()).await.unwrap();
        assert_eq!(decision, Decision::Confirmed);

        // still open while (and after) the confirmed action runs; an
        // application error would leave it like this
        assert!(workflow.is_open());

        workflow.close();
        assert!(!workflow.is_open());
    }

    #[tokio::test]
    async fn test_prompt_sees_the_request() {
        let prompt = ScriptedConfirmationPrompt::confirming();
        let seen = prompt.seen_handle();
        let workflow = workflow(prompt);

        workflow.decide(&request()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "Remove member");
    }

    #[tokio::test]
    async fn test_concurrent_confirmation_is_rejected() {
        let prompt =
            ScriptedConfirmationPrompt::confirming().with_delay(Duration::from_millis(50));
        let workflow = Arc::new(workflow(prompt));

        let first = {
            let workflow = Arc::clone(&workflow);
            tokio::spawn(async move { workflow.decide(&request()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = workflow.decide(&request()).await;
        assert!(matches!(second, Err(AdminError::PromptBusy)));

        assert_eq!(first.await.unwrap().unwrap(), Decision::Confirmed);
    }
}

//! Re-authentication gate for privileged actions
//!
//! Wraps a sensitive action so it only runs after the operator re-supplies
//! fresh credentials. A dismissed prompt is a silent outcome: the action
//! never runs, no network call is made, and nothing is notified.

use crate::core::error::AdminError;
use crate::core::interaction::{InteractionSlot, OperatorOutcome};
use crate::security::credential::{Credential, CredentialPrompt, PromptReply};
use std::future::Future;
use std::sync::Arc;

/// Gate requiring fresh credentials before a sensitive action
///
/// The gate shares an [`InteractionSlot`] with the confirmation workflow: at
/// most one interactive prompt is outstanding per operator session, and a
/// concurrent request is rejected with [`AdminError::PromptBusy`] rather
/// than queued. The slot is held only while the prompt is awaiting the
/// operator, so a confirmation's confirm handler can open the gate next.
pub struct CredentialGate {
    prompt: Arc<dyn CredentialPrompt>,
    slot: Arc<InteractionSlot>,
}

impl CredentialGate {
    pub fn new(prompt: Arc<dyn CredentialPrompt>, slot: Arc<InteractionSlot>) -> Self {
        Self { prompt, slot }
    }

    /// Request fresh credentials, then run `action` with them
    ///
    /// The credential is moved into the action and dropped (zeroized) when
    /// the action completes, on success and failure alike. On cancel the
    /// action never runs and the outcome is `Cancelled`.
    pub async fn gate<T, F, Fut>(
        &self,
        requires_second_factor: bool,
        action: F,
    ) -> Result<OperatorOutcome<T>, AdminError>
    where
        F: FnOnce(Credential) -> Fut,
        Fut: Future<Output = Result<T, AdminError>>,
    {
        let reply = {
            let Some(_guard) = self.slot.acquire() else {
                tracing::warn!("credential prompt requested while another prompt is open");
                return Err(AdminError::PromptBusy);
            };

            self.prompt.request(requires_second_factor).await
            // slot released here, before the gated action runs
        };

        match reply {
            PromptReply::Cancelled => {
                tracing::debug!("credential prompt dismissed, gated action skipped");
                Ok(OperatorOutcome::Cancelled)
            }
            PromptReply::Submitted(credential) => {
                let result = action(credential).await;
                result.map(OperatorOutcome::Completed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCredentialPrompt;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn gate_with(prompt: ScriptedCredentialPrompt) -> CredentialGate {
        CredentialGate::new(Arc::new(prompt), Arc::new(InteractionSlot::new()))
    }

    #[tokio::test]
    async fn test_submitted_credential_reaches_the_action() {
        let gate = gate_with(ScriptedCredentialPrompt::submitting(
            "hunter2",
            Some("123456"),
        ));

        let outcome = gate
            .gate(true, |credential| async move {
                assert_eq!(credential.password(), "hunter2");
                assert_eq!(credential.second_factor(), Some("123456"));
                Ok(42u32)
            })
            .await
            .unwrap();

        assert_eq!(outcome.completed(), Some(42));
    }

    #[tokio::test]
    async fn test_cancel_skips_the_action() {
        let gate = gate_with(ScriptedCredentialPrompt::cancelling());
        let calls = AtomicU32::new(0);

        let outcome = gate
            .gate(false, |_credential| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_action_errors_propagate() {
        let gate = gate_with(ScriptedCredentialPrompt::submitting("hunter2", None));

        let result: Result<OperatorOutcome<()>, _> = gate
            .gate(false, |_credential| async {
                Err(AdminError::Application {
                    message: "denied".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(AdminError::Application { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_request_is_rejected() {
        let prompt =
            ScriptedCredentialPrompt::submitting("hunter2", None).with_delay(Duration::from_millis(50));
        let gate = Arc::new(gate_with(prompt));

        let first = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.gate(false, |_c| async { Ok(1u32) }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = gate.gate(false, |_c| async { Ok(2u32) }).await;
        assert!(matches!(second, Err(AdminError::PromptBusy)));

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.completed(), Some(1));
    }

    #[tokio::test]
    async fn test_slot_is_free_again_after_cancel() {
        let gate = gate_with(ScriptedCredentialPrompt::cancelling());

        let outcome = gate.gate(false, |_c| async { Ok(()) }).await.unwrap();
        assert!(outcome.is_cancelled());

        // a later gate on the same slot must not be rejected
        let gate = CredentialGate::new(
            Arc::new(ScriptedCredentialPrompt::submitting("hunter2", None)),
            Arc::clone(&gate.slot),
        );
        let outcome = gate.gate(false, |_c| async { Ok(7u32) }).await.unwrap();
        assert_eq!(outcome.completed(), Some(7));
    }
}

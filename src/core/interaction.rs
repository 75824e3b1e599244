//! Operator interaction primitives
//!
//! The source of truth for the "one interactive prompt at a time" invariant:
//! the credential gate and the confirmation workflow share a single
//! [`InteractionSlot`], so at most one of them can have a prompt outstanding
//! for the operator session. A second request while the slot is held is
//! rejected, not queued.

use crate::core::error::AdminError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mutual exclusion flag for interactive prompts
///
/// The slot is held only while a prompt is awaiting the operator's answer;
/// it is released before the gated/confirmed action runs so that nested
/// flows (confirm, then authenticate) can each take their turn.
#[derive(Debug, Default)]
pub struct InteractionSlot {
    busy: AtomicBool,
}

impl InteractionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the slot; `None` when another prompt is already open
    ///
    /// The returned guard releases the slot on drop, including on every
    /// cancellation and error path.
    pub fn acquire(&self) -> Option<SlotGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotGuard { slot: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// RAII guard for a held interaction slot
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slot: &'a InteractionSlot,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// Outcome of an operator-driven flow
///
/// `Cancelled` is a first-class, silent result: the wrapped action never ran
/// and nothing was notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorOutcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> OperatorOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Unwrap the completed value, `None` when the operator cancelled
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    /// Convert into a `Result` for callers that cannot represent a cancel
    ///
    /// Maps `Cancelled` to [`AdminError::OperatorCancelled`], which stays a
    /// silent error: the caller may drop it without reporting anything.
    pub fn ok_or_cancelled(self) -> Result<T, AdminError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Cancelled => Err(AdminError::OperatorCancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_starts_free() {
        let slot = InteractionSlot::new();
        assert!(!slot.is_busy());
    }

    #[test]
    fn test_second_acquire_is_rejected() {
        let slot = InteractionSlot::new();

        let guard = slot.acquire();
        assert!(guard.is_some());
        assert!(slot.is_busy());

        assert!(slot.acquire().is_none());
    }

    #[test]
    fn test_guard_drop_releases_slot() {
        let slot = InteractionSlot::new();

        {
            let _guard = slot.acquire().unwrap();
            assert!(slot.is_busy());
        }

        assert!(!slot.is_busy());
        assert!(slot.acquire().is_some());
    }

    #[test]
    fn test_operator_outcome_helpers() {
        let completed: OperatorOutcome<u32> = OperatorOutcome::Completed(7);
        let cancelled: OperatorOutcome<u32> = OperatorOutcome::Cancelled;

        assert!(!completed.is_cancelled());
        assert_eq!(completed.completed(), Some(7));
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.completed(), None);
    }

    #[test]
    fn test_cancel_converts_to_a_silent_error() {
        let completed: OperatorOutcome<u32> = OperatorOutcome::Completed(7);
        assert_eq!(completed.ok_or_cancelled().unwrap(), 7);

        let cancelled: OperatorOutcome<u32> = OperatorOutcome::Cancelled;
        let error = cancelled.ok_or_cancelled().unwrap_err();
        assert!(matches!(error, AdminError::OperatorCancelled));
        assert!(error.is_silent());
    }
}

//! Spawned execution contexts
//!
//! The impersonation flow opens a fresh execution context (a separate tab in
//! a browser deployment) navigated to a neutral waiting view. The navigation
//! target never carries a secret; the session payload only travels over the
//! origin-scoped channel afterwards.

use crate::core::error::AdminError;
use crate::handoff::channel::{ChannelEndpoint, Origin};
use async_trait::async_trait;

/// Opens new execution contexts
#[async_trait]
pub trait ContextLauncher: Send + Sync {
    /// Spawn a context at `target` (a non-secret view path within the same
    /// application) and return the initiator-side channel to it
    async fn launch(&self, origin: &Origin, target: &str) -> Result<LaunchedContext, AdminError>;
}

/// A spawned context as seen from the initiator
///
/// Closing is explicit on the abort paths; a context that is merely dropped
/// (an abandoned handoff) is closed as well so no orphan context outlives
/// its initiator. After a successful delivery the context owns the session
/// and must be released with [`LaunchedContext::detach`].
pub struct LaunchedContext {
    /// Initiator-side endpoint of the channel to the spawned context
    pub channel: ChannelEndpoint,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl LaunchedContext {
    pub fn new(channel: ChannelEndpoint, on_close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            channel,
            on_close: Some(Box::new(on_close)),
        }
    }

    /// Close the spawned context
    pub fn close(mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }

    /// Let the spawned context outlive the initiator side
    pub fn detach(mut self) {
        self.on_close = None;
    }
}

impl Drop for LaunchedContext {
    fn drop(&mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn endpoint() -> ChannelEndpoint {
        let origin = Origin::parse("https://org.example.com/x").unwrap();
        ChannelEndpoint::pair(origin.clone(), origin).0
    }

    #[test]
    fn test_close_runs_the_closer_once() {
        let closed = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&closed);

        let context = LaunchedContext::new(endpoint(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        context.close();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_an_abandoned_context() {
        let closed = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&closed);

        drop(LaunchedContext::new(endpoint(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detach_disarms_the_closer() {
        let closed = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&closed);

        let context = LaunchedContext::new(endpoint(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        context.detach();

        assert_eq!(closed.load(Ordering::SeqCst), 0);
    }
}

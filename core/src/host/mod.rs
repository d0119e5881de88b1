//! Host binding layer.
//!
//! The host hands the core three things: protected functions
//! ([`Capability`]), an opaque execution context implementing [`Context`],
//! and a timeout (see [`crate::api::Sandbox`]). Side effects produced during
//! an invocation go into a [`Ledger`] so they can be compensated together.

mod capability;
mod ledger;

pub use capability::{Capability, CapabilityError, CapabilityFuture};
pub use ledger::Ledger;

use std::future::Future;
use std::pin::Pin;

/// Keyword argument name reserved for the injected context. Scripts that pass
/// it to any call have it silently dropped.
pub const CONTEXT_PARAMETER: &str = "ctx";

/// Execution context passed through to every capability call.
///
/// Opaque to the evaluator. Implementations usually embed a [`Ledger`] of
/// the side effects their capabilities produced.
pub trait Context: Send + Sync + 'static {
    /// Retract side effects recorded during the invocation. Called when the
    /// invocation fails with a protection error, before the error is returned.
    fn compensate(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

impl Context for () {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Outbox {
        sent: Ledger<String>,
        retracted: AtomicBool,
    }

    impl Context for Outbox {
        fn compensate(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async move {
                self.sent.take();
                self.retracted.store(true, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn test_compensate_clears_ledger() {
        let outbox = Outbox {
            sent: Ledger::new(),
            retracted: AtomicBool::new(false),
        };
        outbox.sent.record("hello".to_string());
        outbox.compensate().await;
        assert!(outbox.sent.is_empty());
        assert!(outbox.retracted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unit_context_is_noop() {
        ().compensate().await;
    }
}

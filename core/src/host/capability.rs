use core::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::values::{Arguments, Value};

/// Deferred result of a capability call. This is the only thing the
/// evaluator ever awaits.
pub type CapabilityFuture =
    Pin<Box<dyn Future<Output = Result<Value, CapabilityError>> + Send + 'static>>;

type CapabilityFn<C> = dyn Fn(Arc<C>, Arguments) -> CapabilityFuture + Send + Sync;

/// Failure reported by a capability's underlying operation.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] crate::evaluator::RuntimeError),

    #[error("{0}")]
    Failed(String),

    /// Remote service answered with an error status.
    #[error("request failed with status {status}")]
    Status { status: u16 },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A protected host function.
///
/// Each call receives the invocation's execution context as its first
/// argument and is counted against a per-invocation budget: `limit` if set,
/// otherwise the pool's `max_calls`.
pub struct Capability<C> {
    name: Arc<str>,
    limit: Option<usize>,
    func: Arc<CapabilityFn<C>>,
}

impl<C: Send + Sync + 'static> Capability<C> {
    /// Wrap an async function as a capability.
    ///
    /// ```
    /// use quill_core::host::{Capability, CapabilityError};
    /// use quill_core::values::Value;
    ///
    /// let echo: Capability<()> = Capability::new("echo", |_ctx, args| async move {
    ///     let text = args.str_arg(0, "text")?.to_string();
    ///     Ok::<_, CapabilityError>(Value::Str(text))
    /// });
    /// assert_eq!(echo.name(), "echo");
    /// ```
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(Arc<C>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, CapabilityError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            limit: None,
            func: Arc::new(move |ctx, args| Box::pin(func(ctx, args))),
        }
    }

    /// Override the pool-wide call budget for this capability.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn call(&self, ctx: Arc<C>, args: Arguments) -> CapabilityFuture {
        (self.func)(ctx, args)
    }
}

impl<C> Clone for Capability<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            limit: self.limit,
            func: Arc::clone(&self.func),
        }
    }
}

impl<C> fmt::Debug for Capability<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

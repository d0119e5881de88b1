//! Bounded pool of reusable evaluators.
//!
//! A [`Pool`] builds all of its evaluators up front, sharing one immutable
//! base scope and capability table. [`Pool::acquire`] hands out an evaluator
//! wrapped in a [`PooledEvaluator`] guard, waiting in FIFO order when none is
//! free. The guard returns the evaluator when dropped, so release happens on
//! success, on error, and when the invocation future is cancelled (for
//! example by a timeout).

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, trace};

use crate::api::{Error, PoolOptions};
use crate::ast::Program;
use crate::evaluator::{Evaluator, bind_capabilities};
use crate::host::{Capability, Context};
use crate::scope::{Scope, ScopeBuilder};
use crate::stdlib;
use crate::values::Value;

pub struct Pool<C: Context> {
    idle: Mutex<Vec<Evaluator<C>>>,
    /// One permit per evaluator; tokio's semaphore queues waiters fairly.
    permits: Semaphore,
    options: PoolOptions,
}

impl<C: Context> Pool<C> {
    /// Build `options.size` evaluators over `base` plus the capability
    /// bindings. Synchronous; needs no running runtime.
    ///
    /// A size of zero is treated as one.
    pub fn new(base: Scope, capabilities: Vec<Capability<C>>, mut options: PoolOptions) -> Self {
        options.size = options.size.max(1);
        let capabilities: Arc<[Capability<C>]> = Arc::from(capabilities);
        let base = Arc::new(bind_capabilities(base, &capabilities));

        let idle = (0..options.size)
            .map(|_| {
                Evaluator::new(
                    Arc::clone(&base),
                    Arc::clone(&capabilities),
                    options.execution.clone(),
                )
            })
            .collect();

        debug!(
            size = options.size,
            capabilities = capabilities.len(),
            "created evaluator pool"
        );
        Self {
            idle: Mutex::new(idle),
            permits: Semaphore::new(options.size),
            options,
        }
    }

    /// A pool whose base scope is the standard library.
    pub fn with_stdlib(capabilities: Vec<Capability<C>>, options: PoolOptions) -> Self {
        let mut builder = ScopeBuilder::new();
        stdlib::register(&mut builder);
        Self::new(builder.build(), capabilities, options)
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Number of evaluators, i.e. the maximum number of concurrent invocations.
    pub fn size(&self) -> usize {
        self.options.size
    }

    /// Number of evaluators not bound to an invocation right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Refuse all pending and future acquisitions with [`Error::PoolClosed`].
    /// Invocations already running finish normally.
    pub fn close(&self) {
        debug!("closing evaluator pool");
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Take an evaluator, waiting until one is free.
    pub async fn acquire(&self) -> Result<PooledEvaluator<'_, C>, Error> {
        let permit = self.permits.acquire().await.map_err(|_| Error::PoolClosed)?;
        // Every permit is backed by an idle evaluator.
        let evaluator = self.idle.lock().pop().ok_or(Error::PoolClosed)?;
        trace!(available = self.permits.available_permits(), "acquired evaluator");
        Ok(PooledEvaluator {
            pool: self,
            evaluator: Some(evaluator),
            _permit: permit,
        })
    }

    /// Run `program` on a pooled evaluator with `ctx` as the execution
    /// context.
    pub async fn interpret(&self, ctx: Arc<C>, program: &Program) -> Result<Value, Error> {
        self.interpret_with(ctx, program, Vec::new()).await
    }

    /// Like [`Pool::interpret`], with extra bindings visible to this
    /// invocation only.
    pub async fn interpret_with(
        &self,
        ctx: Arc<C>,
        program: &Program,
        variables: Vec<(String, Value)>,
    ) -> Result<Value, Error> {
        let mut evaluator = self.acquire().await?;
        let value = evaluator.run_with(&ctx, program, variables).await?;
        Ok(value)
    }
}

/// An evaluator on loan from a [`Pool`]. Returned to the pool on drop.
pub struct PooledEvaluator<'p, C: Context> {
    pool: &'p Pool<C>,
    evaluator: Option<Evaluator<C>>,
    // Dropped after `Drop::drop` has put the evaluator back.
    _permit: SemaphorePermit<'p>,
}

impl<C: Context> Deref for PooledEvaluator<'_, C> {
    type Target = Evaluator<C>;

    fn deref(&self) -> &Self::Target {
        match &self.evaluator {
            Some(evaluator) => evaluator,
            None => unreachable!("evaluator is only taken on drop"),
        }
    }
}

impl<C: Context> DerefMut for PooledEvaluator<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.evaluator {
            Some(evaluator) => evaluator,
            None => unreachable!("evaluator is only taken on drop"),
        }
    }
}

impl<C: Context> Drop for PooledEvaluator<'_, C> {
    fn drop(&mut self) {
        if let Some(mut evaluator) = self.evaluator.take() {
            evaluator.release();
            let mut idle = self.pool.idle.lock();
            idle.push(evaluator);
            trace!(idle = idle.len(), "released evaluator");
        }
    }
}

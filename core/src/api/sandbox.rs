use std::sync::Arc;

use tracing::{debug, warn};

use super::{Error, SandboxOptions};
use crate::ast::Program;
use crate::host::{Capability, Context};
use crate::parser::parse_with_max_depth;
use crate::pool::Pool;
use crate::scope::Scope;
use crate::values::Value;

/// Runs untrusted scripts on a shared evaluator pool.
///
/// Each [`Sandbox::run`] is one invocation: strip code fences, parse, then
/// evaluate under the configured timeout. When evaluation stops on a
/// protection error, the context's [`Context::compensate`] runs before the
/// error is returned. Timeouts are reported without compensating.
pub struct Sandbox<C: Context> {
    pool: Pool<C>,
    options: SandboxOptions,
}

impl<C: Context> Sandbox<C> {
    pub fn new(base: Scope, capabilities: Vec<Capability<C>>, options: SandboxOptions) -> Self {
        Self {
            pool: Pool::new(base, capabilities, options.pool.clone()),
            options,
        }
    }

    /// A sandbox whose scripts see the standard library.
    pub fn with_stdlib(capabilities: Vec<Capability<C>>, options: SandboxOptions) -> Self {
        Self {
            pool: Pool::with_stdlib(capabilities, options.pool.clone()),
            options,
        }
    }

    pub fn pool(&self) -> &Pool<C> {
        &self.pool
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    /// Strip code fences and parse with the configured depth limit.
    pub fn parse(&self, source: &str) -> Result<Program, Error> {
        let program = parse_with_max_depth(
            strip_code_fence(source),
            self.options.pool.execution.max_depth,
        )?;
        Ok(program)
    }

    pub async fn run(&self, ctx: Arc<C>, source: &str) -> Result<Value, Error> {
        self.run_with(ctx, source, Vec::new()).await
    }

    /// Like [`Sandbox::run`], with extra bindings visible to this invocation
    /// only.
    pub async fn run_with(
        &self,
        ctx: Arc<C>,
        source: &str,
        variables: Vec<(String, Value)>,
    ) -> Result<Value, Error> {
        let program = self.parse(source)?;
        debug!(statements = program.stmts.len(), "running script");

        let timeout = self.options.timeout;
        let invocation = self.pool.interpret_with(Arc::clone(&ctx), &program, variables);
        match tokio::time::timeout(timeout, invocation).await {
            Err(_) => {
                warn!(?timeout, "script timed out");
                Err(Error::Timeout { after: timeout })
            }
            Ok(Err(err)) if err.is_protection() => {
                warn!(error = %err, "protection triggered, compensating");
                ctx.compensate().await;
                Err(err)
            }
            Ok(result) => result,
        }
    }
}

/// Remove the Markdown fencing chat users wrap code in.
///
/// A source that both starts and ends with a triple backtick loses its
/// first and last lines (the opening fence with its language tag, and the
/// closing fence). Anything else is trimmed of surrounding backticks,
/// spaces, and newlines, which handles inline `code`.
///
/// ```
/// use quill_core::api::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```py\nx = 1\nx\n```"), "x = 1\nx");
/// assert_eq!(strip_code_fence("`len([1])`"), "len([1])");
/// ```
pub fn strip_code_fence(source: &str) -> &str {
    if source.starts_with("```") && source.ends_with("```") {
        return match (source.find('\n'), source.rfind('\n')) {
            (Some(first), Some(last)) if first < last => &source[first + 1..last],
            _ => "",
        };
    }
    source.trim_matches(|c| c == '`' || c == ' ' || c == '\n')
}

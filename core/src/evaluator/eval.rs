use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::api::ExecutionOptions;
use crate::ast::{ByIndex, Compound, GetAttr, Literal, Node, Program, Var, VarName};
use crate::evaluator::operators;
use crate::evaluator::{ExecutionError, ProtectionError, RuntimeError};
use crate::host::{CONTEXT_PARAMETER, Capability, Context};
use crate::scope::Scope;
use crate::values::{Arguments, CapabilityRef, Value};

type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ExecutionError>> + Send + 'a>>;

/// A reusable tree-walking evaluator.
///
/// Owns the scope and protection counters of the invocation it is currently
/// running. An instance runs one invocation at a time; [`Evaluator::run`]
/// starts every invocation from a fresh clone of the base scope with all
/// counters at zero.
pub struct Evaluator<C> {
    base: Arc<Scope>,
    capabilities: Arc<[Capability<C>]>,
    options: ExecutionOptions,
    scope: Scope,
    /// `while` body executions so far, across every loop in the program.
    iterations: usize,
    /// Calls so far, indexed like `capabilities`.
    calls: Vec<usize>,
}

impl<C: Context> Evaluator<C> {
    /// `base` must already hold the capability bindings, see
    /// [`super::bind_capabilities`].
    pub fn new(
        base: Arc<Scope>,
        capabilities: Arc<[Capability<C>]>,
        options: ExecutionOptions,
    ) -> Self {
        let calls = vec![0; capabilities.len()];
        Self {
            base,
            capabilities,
            options,
            scope: Scope::new(),
            iterations: 0,
            calls,
        }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Scope of the last (or current) invocation.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Run a program, returning the value of its last statement.
    pub async fn run(&mut self, ctx: &Arc<C>, program: &Program) -> Result<Value, ExecutionError> {
        self.run_with(ctx, program, Vec::new()).await
    }

    /// Like [`Evaluator::run`], with extra bindings layered over the base
    /// scope for this invocation only.
    pub async fn run_with(
        &mut self,
        ctx: &Arc<C>,
        program: &Program,
        variables: Vec<(String, Value)>,
    ) -> Result<Value, ExecutionError> {
        self.begin(variables);
        debug!(statements = program.stmts.len(), "running program");
        self.block(ctx, &program.stmts).await
    }

    /// Drop the invocation's scope and counters.
    pub fn release(&mut self) {
        self.scope = Scope::new();
        self.reset_counters();
    }

    fn begin(&mut self, variables: Vec<(String, Value)>) {
        self.scope = Scope::clone(&self.base);
        self.scope.extend(variables);
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.iterations = 0;
        self.calls.iter_mut().for_each(|count| *count = 0);
    }

    fn eval<'a>(&'a mut self, ctx: &'a Arc<C>, node: &'a Node) -> EvalFuture<'a> {
        Box::pin(async move {
            match node {
                Node::Literal(literal) => Ok(literal_value(literal)),
                Node::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(ctx, item).await?);
                    }
                    Ok(Value::Array(values))
                }
                Node::Var(var) => self.var(ctx, var).await,
                Node::GetAttr(attr) => self.get_attr(attr),
                Node::ByIndex(by_index) => self.by_index(ctx, by_index).await,
                Node::Assign { variable, value } => {
                    let value = self.eval(ctx, value).await?;
                    self.assign(variable, value)?;
                    Ok(Value::None)
                }
                Node::SetAttr {
                    parent,
                    child,
                    value,
                } => {
                    let value = self.eval(ctx, value).await?;
                    self.set_attr(parent, child, value)?;
                    Ok(Value::None)
                }
                Node::Op { .. } => {
                    // Chains fold to the left, so walk the left spine in a loop
                    // and only recurse into right operands. Both operands are
                    // always evaluated; no short-circuiting.
                    let mut spine = Vec::new();
                    let mut leftmost = node;
                    while let Node::Op { left, op, right } = leftmost {
                        spine.push((*op, right.as_ref()));
                        leftmost = left.as_ref();
                    }
                    let mut value = self.eval(ctx, leftmost).await?;
                    for (op, right) in spine.into_iter().rev() {
                        let right = self.eval(ctx, right).await?;
                        value = operators::binary(op, &value, &right)?;
                    }
                    Ok(value)
                }
                Node::Compound(compound) => self.block(ctx, &compound.stmts).await,
                Node::Call {
                    function,
                    args,
                    kwargs,
                } => self.call(ctx, function, args, kwargs).await,
                Node::If {
                    cond,
                    compound,
                    else_,
                } => {
                    // `else if` links are followed in place rather than by
                    // recursing into each nested `If`.
                    let (mut cond, mut compound, mut else_) = (cond.as_ref(), compound, else_);
                    loop {
                        if self.eval(ctx, cond).await?.is_truthy() {
                            return self.block(ctx, &compound.stmts).await;
                        }
                        let Some(Compound { stmts }) = else_ else {
                            return Ok(Value::None);
                        };
                        match stmts.as_slice() {
                            [Node::If {
                                cond: next,
                                compound: then,
                                else_: rest,
                            }] => {
                                cond = next.as_ref();
                                compound = then;
                                else_ = rest;
                            }
                            _ => return self.block(ctx, stmts).await,
                        }
                    }
                }
                Node::While { cond, compound } => {
                    while self.eval(ctx, cond).await?.is_truthy() {
                        self.iterations += 1;
                        if self.iterations > self.options.max_iterations {
                            warn!(limit = self.options.max_iterations, "loop protection tripped");
                            return Err(ProtectionError::Loop {
                                limit: self.options.max_iterations,
                            }
                            .into());
                        }
                        self.block(ctx, &compound.stmts).await?;
                    }
                    Ok(Value::None)
                }
            }
        })
    }

    async fn block(&mut self, ctx: &Arc<C>, stmts: &[Node]) -> Result<Value, ExecutionError> {
        let mut last = Value::None;
        for stmt in stmts {
            last = self.eval(ctx, stmt).await?;
        }
        Ok(last)
    }

    fn lookup(&self, name: &str) -> Result<&Value, RuntimeError> {
        self.scope
            .get(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    async fn var(&mut self, ctx: &Arc<C>, var: &Var) -> Result<Value, ExecutionError> {
        match &var.name {
            VarName::Ident(name) => Ok(self.lookup(name)?.clone()),
            VarName::Attr(attr) => self.get_attr(attr),
            VarName::Index(by_index) => self.by_index(ctx, by_index).await,
        }
    }

    fn get_attr(&self, attr: &GetAttr) -> Result<Value, ExecutionError> {
        let Some((root, rest)) = attr.path.split_first() else {
            return Err(RuntimeError::UndefinedVariable {
                name: String::new(),
            }
            .into());
        };
        let mut item = self.lookup(root)?;
        for segment in rest {
            item = operators::attribute(item, segment)?;
        }
        Ok(item.clone())
    }

    async fn by_index(&mut self, ctx: &Arc<C>, by_index: &ByIndex) -> Result<Value, ExecutionError> {
        let mut item = self.lookup(&by_index.name)?.clone();
        for index in &by_index.indices {
            let index = self.eval(ctx, index).await?;
            item = operators::index(&item, &index)?;
        }
        Ok(item)
    }

    fn assign(&mut self, variable: &Var, value: Value) -> Result<(), RuntimeError> {
        match &variable.name {
            VarName::Ident(name) => {
                operators::check_size(value.size())?;
                self.scope.set(name.clone(), value);
                Ok(())
            }
            VarName::Attr(attr) => match attr.path.as_slice() {
                [parent, child] => self.set_attr(parent, child, value),
                path => Err(RuntimeError::InvalidAssignmentTarget {
                    target: path.join("."),
                }),
            },
            VarName::Index(by_index) => Err(RuntimeError::InvalidAssignmentTarget {
                target: format!("{}[...]", by_index.name),
            }),
        }
    }

    fn set_attr(&mut self, parent: &str, child: &str, value: Value) -> Result<(), RuntimeError> {
        let target = self
            .scope
            .get_mut(parent)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: parent.to_string(),
            })?;
        match target {
            Value::Record(record) => {
                record.set(child, value);
                operators::check_size(record.size())
            }
            other => Err(RuntimeError::AttributeAssignment {
                type_name: other.type_name(),
                attribute: child.to_string(),
            }),
        }
    }

    async fn call(
        &mut self,
        ctx: &Arc<C>,
        function: &Node,
        args: &[Node],
        kwargs: &[(String, Node)],
    ) -> Result<Value, ExecutionError> {
        // The callee is resolved once; a string result is not looked up again.
        let callee = self.eval(ctx, function).await?;
        match callee {
            Value::Function(func) => {
                let arguments = self.arguments(ctx, Arc::from(func.name()), args, kwargs).await?;
                trace!(function = func.name(), "calling function");
                Ok(func.call(&arguments)?)
            }
            Value::Capability(handle) => {
                let capability = self.charge(&handle)?;
                let arguments = self
                    .arguments(ctx, Arc::clone(&handle.name), args, kwargs)
                    .await?;
                trace!(capability = capability.name(), "awaiting capability");
                capability
                    .call(Arc::clone(ctx), arguments)
                    .await
                    .map_err(|source| ExecutionError::Capability {
                        capability: capability.name().to_string(),
                        source,
                    })
            }
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
            }
            .into()),
        }
    }

    /// Count a protected call before its arguments are evaluated, failing
    /// once the capability's budget is exceeded.
    fn charge(&mut self, handle: &CapabilityRef) -> Result<Capability<C>, ExecutionError> {
        let unknown = || RuntimeError::UnknownCapability {
            name: handle.name.to_string(),
        };
        let capability = self
            .capabilities
            .get(handle.index)
            .filter(|capability| capability.name() == &*handle.name)
            .cloned()
            .ok_or_else(unknown)?;
        let count = self.calls.get_mut(handle.index).ok_or_else(unknown)?;

        *count += 1;
        let limit = capability.limit().unwrap_or(self.options.max_calls);
        if *count > limit {
            warn!(capability = capability.name(), limit, "call protection tripped");
            return Err(ProtectionError::Call {
                function: capability.name().to_string(),
                limit,
            }
            .into());
        }
        Ok(capability)
    }

    /// Evaluate positional arguments left to right, then keyword arguments
    /// in source order. The reserved context keyword is dropped.
    async fn arguments(
        &mut self,
        ctx: &Arc<C>,
        function: Arc<str>,
        args: &[Node],
        kwargs: &[(String, Node)],
    ) -> Result<Arguments, ExecutionError> {
        let mut positional = Vec::with_capacity(args.len());
        for arg in args {
            positional.push(self.eval(ctx, arg).await?);
        }

        let mut keywords = Vec::with_capacity(kwargs.len());
        for (name, arg) in kwargs {
            let value = self.eval(ctx, arg).await?;
            if name != CONTEXT_PARAMETER {
                keywords.push((name.clone(), value));
            }
        }

        Ok(Arguments::new(function, positional, keywords))
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

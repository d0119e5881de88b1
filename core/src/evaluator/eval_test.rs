use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::{Evaluator, ExecutionError, ProtectionError, RuntimeError, bind_capabilities};
use crate::api::ExecutionOptions;
use crate::host::{Capability, CapabilityError, Context, Ledger};
use crate::parser::{DEFAULT_MAX_DEPTH, parse};
use crate::scope::ScopeBuilder;
use crate::stdlib;
use crate::test_utils::init_test_logging;
use crate::values::{Arguments, MAX_VALUE_SIZE, Value};

#[derive(Default)]
struct Outbox {
    sent: Ledger<String>,
    signature: String,
}

impl Context for Outbox {}

fn say() -> Capability<Outbox> {
    Capability::new("say", |ctx: Arc<Outbox>, args: Arguments| async move {
        let message = args.str_arg(0, "message")?;
        ctx.sent.record(format!("{}{}", message, ctx.signature));
        Ok::<_, CapabilityError>(Value::None)
    })
}

/// Reports the keyword names it received.
fn keywords() -> Capability<Outbox> {
    Capability::new("keywords", |_ctx: Arc<Outbox>, args: Arguments| async move {
        let names = args
            .keywords()
            .iter()
            .map(|(name, _)| Value::from(name.as_str()))
            .collect();
        Ok::<_, CapabilityError>(Value::Array(names))
    })
}

/// Yields to the runtime before answering, so the evaluator really suspends.
fn fetch() -> Capability<Outbox> {
    Capability::new("fetch", |_ctx: Arc<Outbox>, args: Arguments| async move {
        tokio::task::yield_now().await;
        let n = args.int_arg(0, "n")?;
        if n < 0 {
            return Err(CapabilityError::Status { status: 404 });
        }
        Ok(Value::Int(n * 10))
    })
}

struct Harness {
    evaluator: Evaluator<Outbox>,
    ctx: Arc<Outbox>,
}

impl Harness {
    fn new() -> Self {
        Self::with(vec![say(), keywords(), fetch()], ExecutionOptions::default())
    }

    fn with(capabilities: Vec<Capability<Outbox>>, options: ExecutionOptions) -> Self {
        let mut builder = ScopeBuilder::new();
        stdlib::register(&mut builder);
        let capabilities: Arc<[Capability<Outbox>]> = Arc::from(capabilities);
        let base = Arc::new(bind_capabilities(builder.build(), &capabilities));
        Self {
            evaluator: Evaluator::new(base, capabilities, options),
            ctx: Arc::new(Outbox::default()),
        }
    }

    async fn run(&mut self, source: &str) -> Result<Value, ExecutionError> {
        let program = parse(source).unwrap_or_else(|e| panic!("{}\n{}", source, e));
        self.evaluator.run(&self.ctx, &program).await
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.evaluator.scope().get(name).cloned()
    }

    fn sent(&self) -> Vec<String> {
        self.ctx.sent.snapshot()
    }
}

async fn eval(source: &str) -> Value {
    Harness::new()
        .run(source)
        .await
        .unwrap_or_else(|e| panic!("{}: {}", source, e))
}

async fn eval_err(source: &str) -> ExecutionError {
    match Harness::new().run(source).await {
        Ok(value) => panic!("expected {:?} to fail, got {}", source, value),
        Err(e) => e,
    }
}

fn runtime(err: ExecutionError) -> RuntimeError {
    match err {
        ExecutionError::Runtime(e) => e,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_precedence() {
    let mut h = Harness::new();
    h.run("x = 1 + 2 * 3").await.unwrap();
    assert_eq!(h.get("x"), Some(Value::Int(7)));

    assert_eq!(eval("(1 + 2) * 3").await, Value::Int(9));
    assert_eq!(eval("10 - 4 - 3").await, Value::Int(3));
    assert_eq!(eval("-2 * 3").await, Value::Int(-6));
}

#[tokio::test]
async fn test_branching() {
    let mut h = Harness::new();
    h.run(r#"if 1 < 2 { x = "a" } else { x = "b" }"#).await.unwrap();
    assert_eq!(h.get("x"), Some(Value::from("a")));

    h.run(r#"if 2 < 1 { x = "a" } else { x = "b" }"#).await.unwrap();
    assert_eq!(h.get("x"), Some(Value::from("b")));
}

#[tokio::test]
async fn test_else_if_chain() {
    let source = |n: i64| {
        format!(
            "n = {} if n < 0 {{ s = 'neg' }} else if n == 0 {{ s = 'zero' }} else {{ s = 'pos' }}",
            n
        )
    };
    for (n, expected) in [(-1, "neg"), (0, "zero"), (3, "pos")] {
        let mut h = Harness::new();
        h.run(&source(n)).await.unwrap();
        assert_eq!(h.get("s"), Some(Value::from(expected)));
    }
}

#[tokio::test]
async fn test_deepest_accepted_expressions_evaluate() {
    let chain = vec!["1"; DEFAULT_MAX_DEPTH].join(" + ");
    assert_eq!(
        eval(&format!("x = {} x", chain)).await,
        Value::Int(DEFAULT_MAX_DEPTH as i64)
    );

    // Each `-(` is two levels on top of the assignment.
    let levels = (DEFAULT_MAX_DEPTH - 1) / 2;
    let negated = format!("x = {}1{} x", "-(".repeat(levels), ")".repeat(levels));
    assert_eq!(eval(&negated).await, Value::Int(-1));

    let ladder = format!(
        "n = {} s = 0 if n == 0 {{ s = 0 }}{} s",
        DEFAULT_MAX_DEPTH - 3,
        (1..DEFAULT_MAX_DEPTH - 2)
            .map(|i| format!(" else if n == {} {{ s = {} }}", i, i))
            .collect::<String>()
    );
    assert_eq!(eval(&ladder).await, Value::Int(DEFAULT_MAX_DEPTH as i64 - 3));
}

#[tokio::test]
async fn test_if_without_else_is_none() {
    assert_eq!(eval("if 0 { 5 }").await, Value::None);
    assert_eq!(eval("if 1 { 5 }").await, Value::Int(5));
}

#[tokio::test]
async fn test_program_value_is_last_statement() {
    assert_eq!(eval("x = 2; x * 21").await, Value::Int(42));
    assert_eq!(eval("x = 2").await, Value::None);
    assert_eq!(eval("").await, Value::None);
}

#[tokio::test]
async fn test_loop_within_budget() {
    let mut h = Harness::new();
    h.run("i = 0 while i < 100 { i = i + 1 }").await.unwrap();
    assert_eq!(h.get("i"), Some(Value::Int(100)));
    assert_eq!(h.evaluator.iterations(), 100);
}

#[tokio::test]
async fn test_loop_protection() {
    init_test_logging();
    let mut h = Harness::new();
    let err = h.run("i = 0 while i < 1000 { i = i + 1 }").await.unwrap_err();
    assert_eq!(err.protection(), Some(&ProtectionError::Loop { limit: 100 }));
    // The body ran exactly 100 times before the 101st pass was refused.
    assert_eq!(h.get("i"), Some(Value::Int(100)));
}

#[tokio::test]
async fn test_loop_budget_is_shared_across_loops() {
    let mut h = Harness::new();
    let err = h
        .run("i = 0 while i < 60 { i = i + 1 } j = 0 while j < 60 { j = j + 1 } done = 1")
        .await
        .unwrap_err();
    assert!(err.is_protection());
    assert_eq!(h.get("i"), Some(Value::Int(60)));
    assert_eq!(h.get("j"), Some(Value::Int(40)));
    assert_eq!(h.get("done"), None);
}

#[tokio::test]
async fn test_loop_budget_is_configurable() {
    let options = ExecutionOptions {
        max_iterations: 5,
        ..ExecutionOptions::default()
    };
    let mut h = Harness::with(vec![], options);
    assert!(h.run("i = 0 while i < 5 { i = i + 1 }").await.is_ok());
    assert_eq!(
        h.run("i = 0 while i < 6 { i = i + 1 }").await.unwrap_err().protection(),
        Some(&ProtectionError::Loop { limit: 5 })
    );
}

#[tokio::test]
async fn test_call_protection() {
    init_test_logging();
    let mut h = Harness::new();
    h.run("say('a') say('b') say('c')").await.unwrap();
    assert_eq!(h.sent(), vec!["a", "b", "c"]);

    let mut h = Harness::new();
    let err = h.run("say('a') say('b') say('c') say('d')").await.unwrap_err();
    assert_eq!(
        err.protection(),
        Some(&ProtectionError::Call {
            function: "say".to_string(),
            limit: 3
        })
    );
    // The fourth call was refused before it ran.
    assert_eq!(h.sent(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_call_protection_inside_loop() {
    let mut h = Harness::new();
    let err = h
        .run("i = 0 while i < 10 { say(str(i)) i = i + 1 }")
        .await
        .unwrap_err();
    assert!(err.is_protection());
    assert_eq!(h.sent(), vec!["0", "1", "2"]);
}

#[tokio::test]
async fn test_call_budget_is_per_capability() {
    let mut h = Harness::new();
    h.run("say('a') say('b') say('c') fetch(1) fetch(2) fetch(3)")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_call_is_counted_before_arguments() {
    let mut h = Harness::new();
    // The fourth `say` trips protection before its argument is evaluated.
    let err = h
        .run("say('a') say('b') say('c') say(undefined_name)")
        .await
        .unwrap_err();
    assert!(err.is_protection(), "{:?}", err);
}

#[tokio::test]
async fn test_capability_limit_override() {
    let mut h = Harness::with(vec![say().with_limit(1)], ExecutionOptions::default());
    let err = h.run("say('a') say('b')").await.unwrap_err();
    assert_eq!(
        err.protection(),
        Some(&ProtectionError::Call {
            function: "say".to_string(),
            limit: 1
        })
    );
}

#[tokio::test]
async fn test_counters_reset_between_invocations() {
    let mut h = Harness::new();
    h.run("say('a') say('b') say('c')").await.unwrap();
    h.run("say('d') say('e') say('f')").await.unwrap();
    h.run("i = 0 while i < 100 { i = i + 1 }").await.unwrap();
    h.run("i = 0 while i < 100 { i = i + 1 }").await.unwrap();
    assert_eq!(h.sent().len(), 6);
}

#[tokio::test]
async fn test_context_keyword_is_dropped() {
    let mut h = Harness::new();
    let value = h.run("keywords(a=1, ctx='evil', b=2)").await.unwrap();
    assert_eq!(value, Value::Array(vec![Value::from("a"), Value::from("b")]));

    // The injected context still reaches the capability.
    let mut h = Harness::new();
    Arc::get_mut(&mut h.ctx).unwrap().signature = "!".to_string();
    h.run("say('hi', ctx='evil')").await.unwrap();
    assert_eq!(h.sent(), vec!["hi!"]);
}

#[tokio::test]
async fn test_context_keyword_is_dropped_for_library_functions() {
    let value = eval("d = dict(x=1, ctx=2) len(d)").await;
    assert_eq!(value, Value::Int(1));
}

#[tokio::test]
async fn test_capability_suspends_and_resumes() {
    let mut h = Harness::new();
    h.run("x = fetch(4) + 1").await.unwrap();
    assert_eq!(h.get("x"), Some(Value::Int(41)));
}

#[tokio::test]
async fn test_capability_failure() {
    match eval_err("fetch(-1)").await {
        ExecutionError::Capability { capability, source } => {
            assert_eq!(capability, "fetch");
            assert!(matches!(source, CapabilityError::Status { status: 404 }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_error_aborts_remaining_statements() {
    let mut h = Harness::new();
    let err = h.run("say('a') x = nope say('b')").await.unwrap_err();
    assert_eq!(
        runtime(err),
        RuntimeError::UndefinedVariable {
            name: "nope".to_string()
        }
    );
    assert_eq!(h.sent(), vec!["a"]);
    assert_eq!(h.get("x"), None);
}

#[tokio::test]
async fn test_scope_does_not_survive_invocations() {
    let mut h = Harness::new();
    h.run("x = 1").await.unwrap();
    let err = h.run("y = x").await.unwrap_err();
    assert!(matches!(
        runtime(err),
        RuntimeError::UndefinedVariable { .. }
    ));
}

#[tokio::test]
async fn test_run_with_variables() {
    let mut h = Harness::new();
    let program = parse("greeting + ', ' + name").unwrap();
    let value = h
        .evaluator
        .run_with(
            &h.ctx,
            &program,
            vec![
                ("greeting".to_string(), Value::from("hello")),
                ("name".to_string(), Value::from("quill")),
            ],
        )
        .await
        .unwrap();
    assert_eq!(value, Value::from("hello, quill"));
}

#[tokio::test]
async fn test_determinism() {
    let source = "xs = [3, 1, 2] total = sum(xs) m = max(xs) s = str(total) + '/' + str(m)";
    let mut h = Harness::new();
    let first = h.run(source).await.unwrap();
    let first_scope = h.evaluator.scope().clone();
    let second = h.run(source).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(&first_scope, h.evaluator.scope());
    assert_eq!(h.get("s"), Some(Value::from("6/3")));
}

#[tokio::test]
async fn test_attributes() {
    let mut h = Harness::new();
    h.run("p = dict(x=1, y=2) p.x = p.y + 3 z = p.x").await.unwrap();
    assert_eq!(h.get("z"), Some(Value::Int(5)));

    let err = eval_err("n = 1 n.x = 2").await;
    assert_eq!(
        runtime(err),
        RuntimeError::AttributeAssignment {
            type_name: "int",
            attribute: "x".to_string()
        }
    );

    let err = eval_err("p = dict(x=1) p.q").await;
    assert!(matches!(
        runtime(err),
        RuntimeError::AttributeNotFound { .. }
    ));
}

#[tokio::test]
async fn test_set_attr_does_not_touch_base_scope() {
    let mut h = Harness::new();
    h.run("random.seed = 1").await.unwrap();
    let err = h.run("random.seed").await.unwrap_err();
    assert!(matches!(
        runtime(err),
        RuntimeError::AttributeNotFound { .. }
    ));
}

#[tokio::test]
async fn test_indexing() {
    assert_eq!(eval("xs = [1, [2, 3]] xs[1][0]").await, Value::Int(2));
    assert_eq!(eval("xs = [1, 2, 3] xs[-1]").await, Value::Int(3));
    assert_eq!(eval("s = 'quill' s[0]").await, Value::from("q"));
    assert_eq!(eval("d = dict(k=7) d['k']").await, Value::Int(7));

    let err = eval_err("xs = [1] xs[5]").await;
    assert_eq!(
        runtime(err),
        RuntimeError::IndexOutOfBounds { index: 5, len: 1 }
    );
}

#[tokio::test]
async fn test_arrays_evaluate_items() {
    assert_eq!(
        eval("a = 2 [a, a * 2, 'x']").await,
        Value::Array(vec![Value::Int(2), Value::Int(4), Value::from("x")])
    );
}

#[tokio::test]
async fn test_doubling_loops_stop_at_size_limit() {
    for source in [
        "s = 'a' i = 0 while i < 60 { s = s + s i = i + 1 }",
        "a = [1] i = 0 while i < 60 { a = a + a i = i + 1 }",
        "a = [1] i = 0 while i < 60 { a = [a, a] i = i + 1 }",
        "p = dict(v=1) i = 0 while i < 60 { p.v = [p, p] i = i + 1 }",
    ] {
        let err = runtime(eval_err(source).await);
        assert!(
            matches!(err, RuntimeError::ValueTooLarge { limit: MAX_VALUE_SIZE, .. }),
            "{}: {:?}",
            source,
            err
        );
    }
}

#[tokio::test]
async fn test_large_values_within_limit() {
    let mut h = Harness::new();
    h.run("s = 'ab' i = 0 while i < 10 { s = s + s i = i + 1 } n = len(s)")
        .await
        .unwrap();
    assert_eq!(h.get("n"), Some(Value::Int(2048)));
}

#[tokio::test]
async fn test_not_callable() {
    let err = eval_err("x = 1 x()").await;
    assert_eq!(runtime(err), RuntimeError::NotCallable { type_name: "int" });

    // A string naming a function is not resolved a second time.
    let err = eval_err("f = 'len' f([1])").await;
    assert_eq!(runtime(err), RuntimeError::NotCallable { type_name: "str" });
}

#[tokio::test]
async fn test_functions_are_values() {
    assert_eq!(eval("f = len f([1, 2])").await, Value::Int(2));
    assert_eq!(eval("r = random.randint r(4, 4)").await, Value::Int(4));
}

#[tokio::test]
async fn test_division_by_zero_is_runtime_error() {
    let err = eval_err("x = 1 / 0").await;
    assert!(!err.is_protection());
    assert_eq!(runtime(err), RuntimeError::DivisionByZero);
}

#[tokio::test]
async fn test_comparison_operands_are_both_evaluated() {
    let mut h = Harness::new();
    h.run("x = say('left') == say('right')").await.unwrap();
    assert_eq!(h.sent(), vec!["left", "right"]);
    assert_eq!(h.get("x"), Some(Value::Bool(true)));
}

#[tokio::test]
async fn test_string_concatenation() {
    assert_eq!(
        eval("name = 'world' 'hello, ' + name").await,
        Value::from("hello, world")
    );
}

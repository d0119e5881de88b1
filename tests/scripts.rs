//! End-to-end scripts run through the sandbox with the standard library and
//! a `say` capability.

#[macro_use]
mod cases;

use indoc::indoc;
use quill::{Error, ExecutionError, ProtectionError, RuntimeError, Value};

script_case!(
    arithmetic_precedence,
    input: "1 + 2 * 3 - 4 / 2",
    value: Value::Float(5.0),
);

script_case!(
    fenced_block,
    input: "```py\nx = 20\nx + 1\n```",
    value: Value::Int(21),
);

script_case!(
    inline_code,
    input: "`len(\"hello\")`",
    value: Value::Int(5),
);

script_case!(
    greeting,
    input: indoc! {r#"
        name = "world"
        say("hello " + name)
    "#},
    value: Value::None,
    said: ["hello world"],
);

script_case!(
    countdown,
    input: indoc! {r#"
        n = 3
        while n > 0 {
            say(n)
            n = n - 1
        }
        n
    "#},
    value: Value::Int(0),
    said: ["3", "2", "1"],
);

script_case!(
    branching,
    input: indoc! {r#"
        score = 72
        if score >= 90 { grade = "A" }
        else if score >= 70 { grade = "B" }
        else { grade = "C" }
        grade
    "#},
    value: Value::from("B"),
);

script_case!(
    records_and_attributes,
    input: indoc! {r#"
        point = dict(x=1, y=2)
        point.x = point.x + 10
        [point.x, point["y"]]
    "#},
    value: Value::Array(vec![Value::Int(11), Value::Int(2)]),
);

script_case!(
    negative_indexing,
    input: "items = [10, 20, 30] items[-1] + items[0]",
    value: Value::Int(40),
);

script_case!(
    stdlib_helpers,
    input: "sum(range(5)) + max(3, 7) + abs(-2) + round(2.5)",
    value: Value::Int(21),
);

script_case!(
    random_choice_from_list,
    input: "pick = random.choice([\"a\"]) pick",
    value: Value::from("a"),
);

script_case!(
    ctx_keyword_is_dropped,
    input: "say(\"hi\", ctx=1)",
    value: Value::None,
    said: ["hi"],
);

script_case!(
    comments_are_ignored,
    input: indoc! {r#"
        # setup
        x = 1 # trailing
        x
    "#},
    value: Value::Int(1),
);

script_case!(
    syntax_error,
    input: "x = (1 + 2",
    error: Error::Parse(_),
);

script_case!(
    undefined_variable,
    input: "y + 1",
    error: Error::Execution(ExecutionError::Runtime(RuntimeError::UndefinedVariable { name }))
        if name == "y",
);

script_case!(
    division_by_zero,
    input: "10 / (5 - 5)",
    error: Error::Execution(ExecutionError::Runtime(RuntimeError::DivisionByZero)),
);

script_case!(
    runaway_loop,
    input: "while 1 { }",
    error: Error::Execution(ExecutionError::Protection(ProtectionError::Loop { limit: 100 })),
);

script_case!(
    spam,
    input: "i = 0 while i < 10 { say(i) i = i + 1 }",
    error: Error::Execution(ExecutionError::Protection(ProtectionError::Call { limit: 3, .. })),
);

#[tokio::test]
async fn test_spam_is_retracted() {
    let (result, channel) = cases::run("say(1) say(2) say(3) say(4)").await;
    assert!(result.unwrap_err().is_protection());
    assert!(channel.sent.is_empty());
    assert_eq!(
        channel.deleted.snapshot(),
        vec!["1".to_string(), "2".to_string(), "3".to_string()]
    );
}

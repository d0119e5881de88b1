//! Shared harness for end-to-end script tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use quill::{
    Capability, CapabilityError, Context, Error, Ledger, Sandbox, SandboxOptions, Value,
};

/// A chat channel that records what the script said.
#[derive(Default)]
pub struct Channel {
    pub sent: Ledger<String>,
    pub deleted: Ledger<String>,
}

impl Context for Channel {
    fn compensate(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            for message in self.sent.take() {
                self.deleted.record(message);
            }
        })
    }
}

pub fn sandbox() -> Sandbox<Channel> {
    let say = Capability::new("say", |ctx: Arc<Channel>, args: quill::Arguments| async move {
        let message = args.required(0, "message")?.to_string();
        ctx.sent.record(message);
        Ok::<_, CapabilityError>(Value::None)
    });
    Sandbox::with_stdlib(vec![say], SandboxOptions::default())
}

pub async fn run(source: &str) -> (Result<Value, Error>, Arc<Channel>) {
    let channel = Arc::new(Channel::default());
    let result = sandbox().run(Arc::clone(&channel), source).await;
    (result, channel)
}

/// Declare an end-to-end test.
///
/// `value:` asserts the script's result, `said:` the messages it sent, and
/// `error:` a pattern the returned [`Error`] must match.
macro_rules! script_case {
    ($name:ident, input: $input:expr, value: $value:expr $(, said: [$($said:expr),* $(,)?])? $(,)?) => {
        #[tokio::test]
        async fn $name() {
            let (result, channel) = cases::run($input).await;
            pretty_assertions::assert_eq!(result.unwrap(), $value);
            $(
                let said: Vec<String> = vec![$($said.to_string()),*];
                pretty_assertions::assert_eq!(channel.sent.snapshot(), said);
            )?
            let _ = channel;
        }
    };
    ($name:ident, input: $input:expr, error: $pattern:pat $(if $guard:expr)? $(,)?) => {
        #[tokio::test]
        async fn $name() {
            let (result, _channel) = cases::run($input).await;
            match result {
                Err($pattern) $(if $guard)? => {}
                other => panic!("unexpected result: {:?}", other),
            }
        }
    };
}

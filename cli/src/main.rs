use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use miette::Result;
use quill::{
    Arguments, Capability, CapabilityError, Context, ExecutionOptions, Ledger, PoolOptions,
    Sandbox, SandboxOptions, Value, parser, render_error, strip_code_fence,
};
use tracing::debug;

/// Quill - a tiny sandboxed scripting language for chat bots
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Run Quill scripts in a sandbox", long_about = None)]
struct Args {
    /// Script file to run (if neither this nor --eval is given, reads from stdin)
    script: Option<PathBuf>,

    /// Script source given on the command line
    #[arg(short, long, conflicts_with = "script")]
    eval: Option<String>,

    /// Print the parsed AST (for debugging)
    #[arg(long)]
    debug_parse: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of pooled evaluators
    #[arg(long, default_value_t = 10)]
    pool_size: usize,

    /// Wall-clock limit per script, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Loop iterations allowed per script
    #[arg(long, default_value_t = 100)]
    max_iterations: usize,

    /// Calls allowed to each capability per script
    #[arg(long, default_value_t = 3)]
    max_calls: usize,
}

impl Args {
    fn sandbox_options(&self) -> SandboxOptions {
        SandboxOptions {
            pool: PoolOptions {
                size: self.pool_size,
                execution: ExecutionOptions {
                    max_iterations: self.max_iterations,
                    max_calls: self.max_calls,
                    ..ExecutionOptions::default()
                },
            },
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
enum CliError {
    #[error("cannot read script {}", path.display())]
    #[diagnostic(code(quill::read))]
    ReadScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read script from stdin")]
    #[diagnostic(code(quill::stdin))]
    ReadStdin(#[source] std::io::Error),
}

/// Stands in for a chat channel: messages go to stdout and are retracted
/// (reported on stderr) when the script trips a protection budget.
#[derive(Default)]
struct Terminal {
    said: Ledger<String>,
}

impl Context for Terminal {
    fn compensate(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            for message in self.said.take() {
                eprintln!("retracted: {}", message);
            }
        })
    }
}

fn capabilities() -> Vec<Capability<Terminal>> {
    let say = Capability::new("say", |ctx: Arc<Terminal>, args: Arguments| async move {
        let message = args.required(0, "message")?.to_string();
        println!("{}", message);
        ctx.said.record(message);
        Ok::<_, CapabilityError>(Value::None)
    });

    let sleep = Capability::new("sleep", |_ctx: Arc<Terminal>, args: Arguments| async move {
        let millis = args.int_arg(0, "ms")?;
        let millis = u64::try_from(millis).map_err(|_| {
            CapabilityError::Failed(format!("cannot sleep for {} ms", millis))
        })?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok::<_, CapabilityError>(Value::None)
    });

    vec![say, sleep]
}

fn read_source(args: &Args) -> Result<String> {
    if let Some(source) = &args.eval {
        return Ok(source.clone());
    }
    if let Some(path) = &args.script {
        let source = std::fs::read_to_string(path).map_err(|source| CliError::ReadScript {
            path: path.clone(),
            source,
        })?;
        return Ok(source);
    }
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .map_err(CliError::ReadStdin)?;
    Ok(source)
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG wins over -v.
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let source = read_source(&args)?;

    if args.debug_parse {
        match parser::parse(strip_code_fence(&source)) {
            Ok(program) => {
                println!("=== Parsed AST ===");
                println!("{:#?}", program);
                println!();
            }
            Err(e) => {
                render_error(&e.into());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let options = args.sandbox_options();
    debug!(?options, "starting sandbox");
    let sandbox = Sandbox::with_stdlib(capabilities(), options);

    match sandbox.run(Arc::new(Terminal::default()), &source).await {
        Ok(Value::None) => Ok(ExitCode::SUCCESS),
        Ok(value) => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            render_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

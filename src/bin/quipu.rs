use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;

use quipu::repl::{Repl, ReplError};
use quipu::Interpreter;

/// Evaluation recurses natively, up to `MAX_EVAL_DEPTH` levels
const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Parser)]
#[command(author, version, about = "Quipu language interpreter")]
struct Args {
    /// Source files to load before anything else
    files: Vec<PathBuf>,

    /// Evaluate SOURCE, print the result and exit
    #[arg(short, long, value_name = "SOURCE")]
    eval: Option<String>,

    /// Exit after loading files instead of starting the REPL
    #[arg(long)]
    no_repl: bool,

    /// Do not print the REPL banner
    #[arg(short, long)]
    quiet: bool,
}

/// Install a stderr log subscriber, only when `RUST_LOG` is set
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run(args: Args) -> Result<ExitCode, ReplError> {
    let mut interpreter = Interpreter::new();

    for file in &args.files {
        let result = interpreter.load_file(&file.to_string_lossy());
        if result.is_error() {
            println!("{result}");
        }
    }

    if let Some(source) = args.eval {
        return match interpreter.eval_source("<eval>", &source) {
            Ok(value) => {
                println!("{value}");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("{e}");
                Ok(ExitCode::FAILURE)
            }
        };
    }

    if !args.no_repl {
        Repl::with_interpreter(interpreter).run(!args.quiet)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn report(result: Result<ExitCode, ReplError>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("quipu: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let worker = thread::Builder::new()
        .name("quipu".into())
        .stack_size(EVAL_STACK_SIZE)
        .spawn(move || report(run(args)));
    match worker.map(thread::JoinHandle::join) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("quipu: could not start interpreter thread: {e}");
            ExitCode::FAILURE
        }
    }
}

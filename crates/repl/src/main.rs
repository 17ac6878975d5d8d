//! Command-line entry point for the wisp Scheme interpreter: an interactive
//! REPL over `rustyline`, or a non-interactive script runner when a source
//! file is given on the command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use wisp_core::{Environment, SchemeError, Value};
use wisp_reader::{ContinuationState, Parser as SchemeParser};
use wisp_runtime::{eval, global_environment, print_to_string, signal, PrintMode};

#[derive(ClapParser)]
#[command(name = "wisp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "An R7RS-small Scheme interpreter", long_about = None)]
struct Args {
    /// Scheme source file to load and run instead of starting the REPL
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("wisp=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    signal::install();

    match args.script {
        Some(path) => run_script(&path),
        None => run_repl(),
    }
}

fn run_script(path: &std::path::Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("wisp: cannot read '{}': {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let env = global_environment();
    let forms = match SchemeParser::parse_all(&source) {
        Ok(forms) => forms,
        Err(err) => {
            eprintln!("wisp: {}", describe_error(&err));
            return ExitCode::FAILURE;
        }
    };
    for form in forms {
        if let Err(err) = eval(&form, &env) {
            eprintln!("wisp: {}", describe_error(&err));
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

const PS1: &str = "wisp> ";
const PS2: &str = "  ... ";

fn run_repl() -> ExitCode {
    let env = global_environment();
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(err) => {
            eprintln!("wisp: failed to start line editor: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut continuation = ContinuationState::new();

    loop {
        let prompt = if continuation.is_empty() { PS1 } else { PS2 };
        match editor.readline(prompt) {
            Ok(line) => {
                if continuation.is_empty() && line.trim() == "exit" {
                    return ExitCode::SUCCESS;
                }
                let _ = editor.add_history_entry(line.as_str());
                continuation.feed_line(&line);
                if continuation.is_complete() {
                    evaluate_and_print(&continuation.take(), &env);
                }
            }
            Err(ReadlineError::Eof) => return ExitCode::SUCCESS,
            Err(ReadlineError::Interrupted) => {
                continuation.take();
                continue;
            }
            Err(err) => {
                eprintln!("wisp: {err}");
                return ExitCode::FAILURE;
            }
        }
        // A SIGINT that arrived mid multi-line entry abandons the pending
        // form rather than killing the REPL; cancellation is only ever
        // observed at this read boundary, never mid-evaluation.
        if signal::take_sigint() {
            continuation.take();
        }
    }
}

fn evaluate_and_print(source: &str, env: &Rc<Environment>) {
    let forms = match SchemeParser::parse_all(source) {
        Ok(forms) => forms,
        Err(err) => {
            eprintln!("{}", describe_error(&err));
            return;
        }
    };
    for form in forms {
        match eval(&form, env) {
            Ok(Value::Unspecified) => {}
            Ok(value) => println!("{}", print_to_string(&value, PrintMode::Repl)),
            Err(err) => {
                eprintln!("{}", describe_error(&err));
                break;
            }
        }
    }
}

fn describe_error(err: &SchemeError) -> String {
    format!("error: {err}")
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::error;
use tracing_subscriber::EnvFilter;

use lisp_core::{eval_str, LispEnv, LispParser, LispValue};

#[derive(Parser)]
#[command(name = "lisp-repl", version, about = "Interactive evaluator for a small Lisp")]
struct Cli {
    /// File to load; starts an interactive session when absent
    file: Option<PathBuf>,

    /// Arguments made available to the program as `*ARGV*`
    args: Vec<String>,

    /// Evaluate one expression and print its result
    #[arg(short, long)]
    eval: Option<String>,
}

fn history_path() -> PathBuf {
    std::env::temp_dir().join(".lisp-repl-history")
}

fn run_file(path: &PathBuf, env: &LispEnv) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            error!(path = %path.display(), %err, "cannot read file");
            eprintln!("Err: {}: {}", path.display(), err);
            return ExitCode::FAILURE;
        }
    };
    match eval_str(&source, env) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(path = %path.display(), %err, "unrecovered error");
            eprintln!("Err: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn repl(env: &LispEnv) -> ExitCode {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Err: cannot start line editor: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let history = history_path();
    let _ = rl.load_history(&history);

    let mut parser = LispParser::new();
    let mut buffer = String::new();
    loop {
        let prompt = if parser.has_tokens() { "   ... " } else { "user> " };
        match rl.readline(prompt) {
            Ok(line) => {
                parser.add_tokenize(&line);
                parser.add_tokenize("\n");
                buffer.push_str(&line);
                if !parser.is_parse_complete() {
                    buffer.push('\n');
                    continue;
                }
                if !buffer.trim().is_empty() {
                    let _ = rl.add_history_entry(buffer.as_str());
                }
                buffer.clear();
                for val in &mut parser {
                    match val.and_then(|form| lisp_core::eval(form, env)) {
                        Ok(out) => println!("{}", out.inspect()),
                        Err(err) => println!("Err: {}", err),
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                parser.clear();
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Err: {}", err);
                break;
            }
        }
    }
    let _ = rl.save_history(&history);
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = LispEnv::default();
    env.set(
        "*ARGV*",
        LispValue::list_from(cli.args.iter().map(|arg| LispValue::from(arg.as_str()))),
    );

    if let Some(expr) = &cli.eval {
        return match eval_str(expr, &env) {
            Ok(val) => {
                println!("{}", val.inspect());
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Err: {}", err);
                ExitCode::FAILURE
            }
        };
    }

    match &cli.file {
        Some(path) => run_file(path, &env),
        None => repl(&env),
    }
}

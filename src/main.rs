// Entry point for the `mossy` CLI: run a script file, or drop into the REPL
// when no file is given.

use clap::Parser as ClapParser;
use mossy::{debug, interpret, vm::VM, ScriptError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(
    name = "mossy",
    about = "Mossy: a small bytecode-compiled scripting language",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    /// Script file to run. Omit to start the REPL.
    file: Option<PathBuf>,

    /// Disassemble the compiled chunk to stderr before running it.
    #[arg(long)]
    dump_bytecode: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.file {
        None => {
            if let Err(e) = mossy::repl::run() {
                eprintln!("repl error: {}", e);
                return ExitCode::from(70);
            }
            ExitCode::SUCCESS
        }
        Some(path) => run_file(&path, cli.dump_bytecode),
    }
}

fn run_file(path: &PathBuf, dump_bytecode: bool) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot read '{}': {}", path.display(), e);
            return ExitCode::from(74);
        }
    };

    let mut vm = VM::new();

    if dump_bytecode {
        let tokens = mossy::lexer::tokenize(&source);
        let (statements, parse_errors) = mossy::parser::parse(tokens);
        if parse_errors.is_empty() {
            if let Ok(function) = mossy::compiler::compile(&statements) {
                debug::disassemble(&function.chunk, path.to_string_lossy().as_ref());
            }
        }
    }

    match interpret(&source, &mut vm) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ScriptError::Compile(_)) => ExitCode::from(70),
        Err(ScriptError::Runtime(_)) => ExitCode::from(80),
    }
}

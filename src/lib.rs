// Library interface for the Mossy interpreter.
//
// Exposes each pipeline stage — lexer, parser, compiler, VM — as its own
// module, plus the supporting value/table/error/natives machinery, so the
// CLI, the REPL, and the integration tests all drive the same public API.

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod debug;
pub mod errors;
pub mod lexer;
pub mod natives;
pub mod parser;
pub mod repl;
pub mod table;
pub mod value;
pub mod vm;

use errors::CompileError;
use std::fmt;

/// Either half of an `interpret` run that didn't make it to a successful halt.
#[derive(Debug)]
pub enum ScriptError {
    Compile(CompileError),
    Runtime(errors::RuntimeError),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScriptError::Compile(e) => write!(f, "{}", e),
            ScriptError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

/// Lexes, parses, compiles, and runs `source` against `vm`.
///
/// This is the one entry point the CLI, the REPL, and the integration tests
/// all share; none of them re-implement the pipeline themselves.
pub fn interpret(source: &str, vm: &mut vm::VM) -> Result<(), ScriptError> {
    let tokens = lexer::tokenize(source);
    let (statements, parse_errors) = parser::parse(tokens);
    if !parse_errors.is_empty() {
        for message in &parse_errors {
            eprintln!("{}", message);
        }
        let line = statements.iter().rev().map(|s| s.token().line).next().unwrap_or(0);
        return Err(ScriptError::Compile(CompileError::new(
            format!("{} parse error(s); see above", parse_errors.len()),
            errors::SourceLocation::new(line),
        )));
    }

    let function = compiler::compile(&statements).map_err(|e| {
        eprintln!("{}", e);
        ScriptError::Compile(e)
    })?;

    vm.interpret(function).map_err(|e| {
        eprintln!("{}", e);
        ScriptError::Runtime(e)
    })
}

// Single-pass compiler: walks the statement list produced by the parser and
// emits bytecode directly into a `Chunk`, resolving each identifier to a
// local slot or a global as it goes. There is no intermediate IR.
//
// Nested function compilation is modeled as an explicit stack of
// `FunctionScope`s, pushed on entering a function literal and popped on
// leaving — not threaded through the VM the way the source's C lineage
// threads a `Compiler` linked list through global state.

use crate::ast::{Expr, InfixOp, PrefixOp, Stmt};
use crate::bytecode::{Chunk, OpCode};
use crate::errors::CompileError;
use crate::errors::SourceLocation;
use crate::lexer::Token;
use crate::value::{intern, Obj, ObjFunction, Value};
use std::rc::Rc;

const MAX_LOCALS: usize = 256;
const MAX_ARGS: usize = 255;

struct Local {
    name: String,
    depth: usize,
}

/// Per-function compiler state. Slot 0 of `locals` is the reserved slot
/// described in the data model; named locals start at index 1.
struct FunctionScope {
    chunk: Chunk,
    arity: usize,
    locals: Vec<Local>,
    scope_depth: usize,
}

impl FunctionScope {
    fn new() -> Self {
        Self {
            chunk: Chunk::new(),
            arity: 0,
            locals: vec![Local { name: String::new(), depth: 0 }],
            scope_depth: 0,
        }
    }
}

pub struct Compiler {
    scopes: Vec<FunctionScope>,
}

impl Compiler {
    fn new() -> Self {
        Self { scopes: vec![FunctionScope::new()] }
    }

    fn scope(&mut self) -> &mut FunctionScope {
        self.scopes.last_mut().unwrap()
    }

    fn emit_op(&mut self, op: OpCode, tok: &Token) {
        self.scope().chunk.write_op(op, tok.line);
    }

    fn emit_byte(&mut self, byte: u8, tok: &Token) {
        self.scope().chunk.write(byte, tok.line);
    }

    fn emit_constant(&mut self, value: Value, tok: &Token) -> Result<(), CompileError> {
        self.scope()
            .chunk
            .write_constant(value, tok.line)
            .ok_or_else(|| CompileError::too_many_constants(SourceLocation::new(tok.line)))
    }

    fn emit_jump(&mut self, op: OpCode, tok: &Token) -> usize {
        self.scope().chunk.emit_jump(op, tok.line)
    }

    fn patch_jump(&mut self, offset: usize, tok: &Token) -> Result<(), CompileError> {
        self.scope()
            .chunk
            .patch_jump(offset)
            .map_err(|_| CompileError::jump_too_large(SourceLocation::new(tok.line)))
    }

    fn emit_loop(&mut self, loop_start: usize, tok: &Token) -> Result<(), CompileError> {
        self.scope()
            .chunk
            .emit_loop(loop_start, tok.line)
            .map_err(|_| CompileError::jump_too_large(SourceLocation::new(tok.line)))
    }

    /// Scans the innermost scope's locals top-down, returning the first
    /// (innermost, possibly shadowing) match.
    fn resolve_local(&self, name: &str) -> Option<usize> {
        let locals = &self.scopes.last().unwrap().locals;
        locals.iter().enumerate().rev().find(|(_, l)| l.name == name).map(|(i, _)| i)
    }

    fn declare_binding(&mut self, tok: &Token, name: &str) -> Result<(), CompileError> {
        let at_file_scope = self.scope().scope_depth == 0;
        if at_file_scope {
            let name_value = Value::Obj(Obj::String(intern(name)));
            self.emit_constant(name_value, tok)?;
            self.emit_op(OpCode::DefineGlobal, tok);
        } else {
            {
                let scope = self.scope();
                if scope.locals.len() >= MAX_LOCALS {
                    return Err(CompileError::too_many_locals(SourceLocation::new(tok.line)));
                }
                let depth = scope.scope_depth;
                scope.locals.push(Local { name: name.to_string(), depth });
            }
            self.emit_op(OpCode::MarkLocal, tok);
        }
        Ok(())
    }

    fn identifier_get(&mut self, tok: &Token, name: &str) -> Result<(), CompileError> {
        match self.resolve_local(name) {
            Some(idx) => {
                self.emit_constant(Value::Number(idx as f64), tok)?;
                self.emit_op(OpCode::GetLocal, tok);
            }
            None => {
                let name_value = Value::Obj(Obj::String(intern(name)));
                self.emit_constant(name_value, tok)?;
                self.emit_op(OpCode::GetGlobal, tok);
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Number(tok, n) => self.emit_constant(Value::Number(*n), tok)?,
            Expr::Bool(tok, b) => self.emit_op(if *b { OpCode::True } else { OpCode::False }, tok),
            Expr::Null(tok) => self.emit_op(OpCode::Null, tok),
            Expr::String(tok, s) => {
                let value = Value::Obj(Obj::String(intern(s)));
                self.emit_constant(value, tok)?;
            }
            Expr::Identifier(tok, name) => self.identifier_get(tok, name)?,
            Expr::Prefix(tok, op, inner) => {
                self.expr(inner)?;
                match op {
                    PrefixOp::Negate => self.emit_op(OpCode::Negate, tok),
                    PrefixOp::Not => self.emit_op(OpCode::Not, tok),
                }
            }
            Expr::Infix(tok, op, left, right) => self.infix(tok, op, left, right)?,
            Expr::Group(_, inner) => self.expr(inner)?,
            Expr::Call(tok, name, args) => self.call(tok, name, args)?,
            Expr::Error(tok, msg) => {
                return Err(CompileError::new(msg.clone(), SourceLocation::new(tok.line)))
            }
        }
        Ok(())
    }

    fn infix(&mut self, tok: &Token, op: &InfixOp, left: &Expr, right: &Expr) -> Result<(), CompileError> {
        match op {
            InfixOp::And => {
                self.expr(left)?;
                let end = self.emit_jump(OpCode::JumpIfFalse, tok);
                self.emit_op(OpCode::Pop, tok);
                self.expr(right)?;
                self.patch_jump(end, tok)?;
            }
            InfixOp::Or => {
                self.expr(left)?;
                let end = self.emit_jump(OpCode::JumpIfTrue, tok);
                self.emit_op(OpCode::Pop, tok);
                self.expr(right)?;
                self.patch_jump(end, tok)?;
            }
            _ => {
                self.expr(left)?;
                self.expr(right)?;
                match op {
                    InfixOp::Add => self.emit_op(OpCode::Add, tok),
                    InfixOp::Sub => self.emit_op(OpCode::Sub, tok),
                    InfixOp::Mul => self.emit_op(OpCode::Mul, tok),
                    InfixOp::Div => self.emit_op(OpCode::Div, tok),
                    InfixOp::Less => self.emit_op(OpCode::Less, tok),
                    InfixOp::Greater => self.emit_op(OpCode::Greater, tok),
                    InfixOp::Equal => self.emit_op(OpCode::Equal, tok),
                    InfixOp::NotEqual => {
                        self.emit_op(OpCode::Equal, tok);
                        self.emit_op(OpCode::Not, tok);
                    }
                    InfixOp::LessEqual => {
                        self.emit_op(OpCode::Greater, tok);
                        self.emit_op(OpCode::Not, tok);
                    }
                    InfixOp::GreaterEqual => {
                        self.emit_op(OpCode::Less, tok);
                        self.emit_op(OpCode::Not, tok);
                    }
                    InfixOp::And | InfixOp::Or => unreachable!("handled above"),
                }
            }
        }
        Ok(())
    }

    fn call(&mut self, tok: &Token, name: &str, args: &[Expr]) -> Result<(), CompileError> {
        if args.len() > MAX_ARGS {
            return Err(CompileError::new("too many arguments in call", SourceLocation::new(tok.line)));
        }
        for arg in args {
            self.expr(arg)?;
            self.emit_op(OpCode::MarkLocal, tok);
        }
        self.identifier_get(tok, name)?;
        self.emit_op(OpCode::Call, tok);
        self.emit_byte(args.len() as u8, tok);
        Ok(())
    }

    fn begin_scope(&mut self) {
        self.scope().scope_depth += 1;
    }

    fn end_scope(&mut self, tok: &Token) {
        let scope = self.scope();
        scope.scope_depth -= 1;
        let depth = scope.scope_depth;
        while scope.locals.last().map(|l| l.depth > depth).unwrap_or(false) {
            scope.locals.pop();
            scope.chunk.write_op(OpCode::Pop, tok.line);
        }
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Null(_) => Ok(()),
            Stmt::Error(tok, msg) => Err(CompileError::new(msg.clone(), SourceLocation::new(tok.line))),
            Stmt::ExprStmt(tok, expr) => {
                self.expr(expr)?;
                self.emit_op(OpCode::Pop, tok);
                Ok(())
            }
            Stmt::Var(tok, name, value) => {
                match value {
                    Some(e) => self.expr(e)?,
                    None => self.emit_op(OpCode::Null, tok),
                }
                self.declare_binding(tok, name)
            }
            Stmt::Assign(tok, name, value) => {
                self.expr(value)?;
                match self.resolve_local(name) {
                    Some(idx) => {
                        self.emit_constant(Value::Number(idx as f64), tok)?;
                        self.emit_op(OpCode::SetLocal, tok);
                        // SET_LOCAL leaves the assigned value on the stack;
                        // this is a statement, so drop it.
                        self.emit_op(OpCode::Pop, tok);
                    }
                    None => {
                        let name_value = Value::Obj(Obj::String(intern(name)));
                        self.emit_constant(name_value, tok)?;
                        self.emit_op(OpCode::SetGlobal, tok);
                    }
                }
                Ok(())
            }
            Stmt::Block(tok, stmts) => {
                self.begin_scope();
                for s in stmts {
                    self.statement(s)?;
                }
                self.end_scope(tok);
                Ok(())
            }
            Stmt::If(tok, cond, then_branch, else_branch) => {
                self.expr(cond)?;
                let else_jump = self.emit_jump(OpCode::JumpIfFalse, tok);
                self.emit_op(OpCode::Pop, tok);
                self.statement(then_branch)?;
                let end_jump = self.emit_jump(OpCode::Jump, tok);
                self.patch_jump(else_jump, tok)?;
                self.emit_op(OpCode::Pop, tok);
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch)?;
                }
                self.patch_jump(end_jump, tok)?;
                Ok(())
            }
            Stmt::While(tok, cond, body) => {
                let loop_start = self.scope().chunk.code.len();
                self.expr(cond)?;
                let exit_jump = self.emit_jump(OpCode::JumpIfFalse, tok);
                self.emit_op(OpCode::Pop, tok);
                self.statement(body)?;
                self.emit_loop(loop_start, tok)?;
                self.patch_jump(exit_jump, tok)?;
                self.emit_op(OpCode::Pop, tok);
                Ok(())
            }
            Stmt::Function(tok, name, params, body) => self.function_stmt(tok, name, params, body),
            Stmt::Return(tok, value) => {
                match value {
                    Some(e) => self.expr(e)?,
                    None => self.emit_op(OpCode::Null, tok),
                }
                self.emit_op(OpCode::Return, tok);
                Ok(())
            }
        }
    }

    fn function_stmt(
        &mut self,
        tok: &Token,
        name: &str,
        params: &[String],
        body: &Stmt,
    ) -> Result<(), CompileError> {
        if params.len() > MAX_ARGS {
            return Err(CompileError::new("too many parameters", SourceLocation::new(tok.line)));
        }
        let interned_name = intern(name);

        self.scopes.push(FunctionScope::new());
        {
            let scope = self.scope();
            scope.arity = params.len();
            for param in params {
                scope.locals.push(Local { name: param.clone(), depth: 0 });
            }
        }
        self.statement(body)?;
        self.emit_op(OpCode::Null, tok);
        self.emit_op(OpCode::Return, tok);
        let finished = self.scopes.pop().unwrap();

        let function = ObjFunction { name: Some(interned_name), arity: finished.arity, chunk: finished.chunk };
        self.emit_constant(Value::Obj(Obj::Function(Rc::new(function))), tok)?;
        self.declare_binding(tok, name)
    }
}

/// Compiles a parsed program into the top-level script `Function` the VM runs.
///
/// Rejects any statement containing a parser `Error` node — the parser
/// already logged a diagnostic for it, so this returns a `CompileError`
/// summarizing the same failure rather than emitting bytecode for a
/// malformed tree.
pub fn compile(statements: &[Stmt]) -> Result<Rc<ObjFunction>, CompileError> {
    let mut compiler = Compiler::new();
    for stmt in statements {
        compiler.statement(stmt)?;
    }
    let script = compiler.scopes.pop().unwrap();
    let mut chunk = script.chunk;
    let last_line = chunk.lines.last().copied().unwrap_or(1);
    chunk.write_op(OpCode::Null, last_line);
    chunk.write_op(OpCode::Return, last_line);
    Ok(Rc::new(ObjFunction { name: None, arity: 0, chunk }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn compile_source(source: &str) -> Rc<ObjFunction> {
        let (stmts, errors) = parse(tokenize(source));
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        compile(&stmts).expect("expected successful compile")
    }

    #[test]
    fn var_declaration_emits_define_global() {
        let func = compile_source("var x = 10;");
        assert!(func.chunk.code.contains(&(OpCode::DefineGlobal as u8)));
    }

    #[test]
    fn function_declaration_records_arity() {
        let func = compile_source("function add(a, b) { return a + b; }");
        // The function value itself lives in the outer chunk's constant pool.
        let inner = func.chunk.constants.iter().find_map(|v| match v {
            Value::Obj(Obj::Function(f)) => Some(f.clone()),
            _ => None,
        });
        let inner = inner.expect("expected a compiled function constant");
        assert_eq!(inner.arity, 2);
    }

    #[test]
    fn too_many_locals_is_a_compile_error() {
        let mut source = String::from("function f() { ");
        for i in 0..300 {
            source.push_str(&format!("var v{} = {};", i, i));
        }
        source.push_str(" }");
        let (stmts, errors) = parse(tokenize(&source));
        assert!(errors.is_empty());
        assert!(compile(&stmts).is_err());
    }

    #[test]
    fn top_level_always_ends_in_null_return() {
        let func = compile_source("var x = 1;");
        assert_eq!(func.chunk.code.last().copied(), Some(OpCode::Return as u8));
    }
}

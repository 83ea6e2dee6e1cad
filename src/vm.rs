// Stack-based virtual machine: executes a compiled `Function`'s bytecode
// with call frames, a shared value stack, and a globals hash table.
//
// Local-variable slots are not addressed by plain arithmetic. Each value the
// compiler intends to keep alive as a named local (a parameter or a `var`
// declared inside a function) is tagged when pushed via `OP_MARK_LOCAL`, and
// `OP_GET_LOCAL`/`OP_SET_LOCAL` resolve their slot index by scanning forward
// from the frame's base, counting only tagged slots. This lets transient
// expression temporaries — never tagged — sit between locals on the stack
// without shifting anyone's index. See DESIGN.md for why this scheme (lifted
// from the source's interleaved-argument addressing) is kept rather than
// replaced with contiguous slots.

use crate::bytecode::OpCode;
use crate::errors::{RuntimeError, SourceLocation};
use crate::table::Table;
use crate::value::{intern, Obj, ObjFunction, ObjString, Value};
use std::rc::Rc;

const FRAMES_MAX: usize = 64;
const STACK_MAX: usize = 256 * FRAMES_MAX;

struct CallFrame {
    function: Rc<ObjFunction>,
    ip: usize,
    base: usize,
}

pub struct VM {
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
    marks: Vec<bool>,
    pub globals: Table,
}

impl VM {
    pub fn new() -> Self {
        let mut globals = Table::new();
        crate::natives::install(&mut globals);
        Self {
            frames: Vec::with_capacity(FRAMES_MAX),
            stack: Vec::with_capacity(256),
            marks: Vec::with_capacity(256),
            globals,
        }
    }

    /// Runs a freshly compiled top-level script to completion.
    ///
    /// Clears any frames or stack slots left behind by a previous call that
    /// ended in an error — the REPL reuses one `VM` across lines precisely so
    /// globals persist, but a mid-call runtime error does not unwind the call
    /// stack, so without this reset the next line would resume on top of a
    /// stale, half-torn-down frame stack instead of starting fresh.
    pub fn interpret(&mut self, function: Rc<ObjFunction>) -> Result<(), RuntimeError> {
        self.frames.clear();
        self.stack.clear();
        self.marks.clear();
        self.frames.push(CallFrame { function, ip: 0, base: 0 });
        self.run()
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::stack_overflow(SourceLocation::unknown()));
        }
        self.stack.push(value);
        self.marks.push(false);
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.marks.pop();
        self.stack.pop().expect("value stack underflow")
    }

    fn peek(&self, distance: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - distance]
    }

    fn current_line(&self, frame_index: usize) -> usize {
        let frame = &self.frames[frame_index];
        let ip = frame.ip.saturating_sub(1);
        frame.function.chunk.lines.get(ip).copied().unwrap_or(0)
    }

    fn read_byte(&mut self, frame_index: usize) -> u8 {
        let frame = &mut self.frames[frame_index];
        let byte = frame.function.chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self, frame_index: usize) -> u16 {
        let frame = &mut self.frames[frame_index];
        let value = frame.function.chunk.read_u16(frame.ip);
        frame.ip += 2;
        value
    }

    /// Finds the physical stack slot for the `ordinal`-th local counting
    /// forward from `base` (ordinal 0 is the first tagged slot at or after
    /// `base`), skipping over untagged expression temporaries.
    fn resolve_local_position(&self, base: usize, ordinal: usize) -> usize {
        let mut seen = 0usize;
        let mut pos = base;
        loop {
            if self.marks[pos] {
                if seen == ordinal {
                    return pos;
                }
                seen += 1;
            }
            pos += 1;
        }
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let frame_index = self.frames.len() - 1;
            let byte = self.read_byte(frame_index);
            let op = match OpCode::from_byte(byte) {
                Some(op) => op,
                None => {
                    return Err(RuntimeError::new(
                        "invalid opcode",
                        SourceLocation::new(self.current_line(frame_index)),
                    ))
                }
            };

            match op {
                OpCode::Constant => {
                    let idx = self.read_byte(frame_index) as usize;
                    let value = self.frames[frame_index].function.chunk.constants[idx].clone();
                    self.push(value)?;
                }
                OpCode::Negate => {
                    let v = self.pop();
                    match v.as_number() {
                        Some(n) => self.push(Value::Number(-n))?,
                        None => return Err(self.type_error("operand must be a number", frame_index)),
                    }
                }
                OpCode::Not => {
                    let v = self.pop();
                    self.push(Value::Bool(v.is_falsey()))?;
                }
                OpCode::Add => self.add(frame_index)?,
                OpCode::Sub => self.numeric_binop(frame_index, |a, b| a - b)?,
                OpCode::Mul => self.numeric_binop(frame_index, |a, b| a * b)?,
                OpCode::Div => self.numeric_binop(frame_index, |a, b| a / b)?,
                OpCode::Less => self.compare_binop(frame_index, |a, b| a < b)?,
                OpCode::Greater => self.compare_binop(frame_index, |a, b| a > b)?,
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(Value::values_equal(&a, &b)))?;
                }
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Null => self.push(Value::Null)?,
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::DefineGlobal => {
                    let value = self.pop();
                    let name = self.pop();
                    let key = name.as_string().expect("DEFINE_GLOBAL name must be a string").clone();
                    self.globals.set(key, value);
                }
                OpCode::GetGlobal => {
                    let name = self.pop();
                    let key = name.as_string().expect("GET_GLOBAL name must be a string").clone();
                    match self.globals.get(&key.bytes) {
                        Some(v) => {
                            let v = v.clone();
                            self.push(v)?;
                        }
                        None => return Err(self.undefined_global(&key.bytes, frame_index)),
                    }
                }
                OpCode::SetGlobal => {
                    let value = self.pop();
                    let name = self.pop();
                    let key = name.as_string().expect("SET_GLOBAL name must be a string").clone();
                    if !self.globals.contains(&key.bytes) {
                        return Err(self.undefined_global(&key.bytes, frame_index));
                    }
                    self.globals.set(key, value);
                }
                OpCode::GetLocal => {
                    let idx = self.pop().as_number().expect("local slot index must be a number") as usize;
                    let base = self.frames[frame_index].base;
                    let pos = self.resolve_local_position(base, idx - 1);
                    let value = self.stack[pos].clone();
                    self.push(value)?;
                }
                OpCode::SetLocal => {
                    let idx = self.pop().as_number().expect("local slot index must be a number") as usize;
                    let value = self.peek(0).clone();
                    let base = self.frames[frame_index].base;
                    let pos = self.resolve_local_position(base, idx - 1);
                    self.stack[pos] = value;
                }
                OpCode::MarkLocal => {
                    let top = self.marks.len() - 1;
                    self.marks[top] = true;
                }
                OpCode::Jump => {
                    let offset = self.read_u16(frame_index);
                    self.frames[frame_index].ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16(frame_index);
                    if self.peek(0).is_falsey() {
                        self.frames[frame_index].ip += offset as usize;
                    }
                }
                OpCode::JumpIfTrue => {
                    let offset = self.read_u16(frame_index);
                    if !self.peek(0).is_falsey() {
                        self.frames[frame_index].ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16(frame_index);
                    self.frames[frame_index].ip -= offset as usize;
                }
                OpCode::Call => {
                    let argc = self.read_byte(frame_index) as usize;
                    self.call_value(argc, frame_index)?;
                }
                OpCode::Return => {
                    let value = self.pop();
                    let frame = self.frames.pop().unwrap();
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.stack.truncate(frame.base);
                    self.marks.truncate(frame.base);
                    self.push(value)?;
                }
            }
        }
    }

    fn type_error(&self, message: &str, frame_index: usize) -> RuntimeError {
        RuntimeError::type_error(message, SourceLocation::new(self.current_line(frame_index)))
    }

    fn undefined_global(&self, name: &str, frame_index: usize) -> RuntimeError {
        let suggestion = crate::errors::find_closest_match(name, self.globals.names());
        RuntimeError::undefined_variable(name, SourceLocation::new(self.current_line(frame_index)), suggestion)
    }

    fn numeric_binop(&mut self, frame_index: usize, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                self.push(Value::Number(op(x, y)))?;
                Ok(())
            }
            _ => Err(self.type_error("operands must be numbers", frame_index)),
        }
    }

    fn compare_binop(&mut self, frame_index: usize, op: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                self.push(Value::Bool(op(x, y)))?;
                Ok(())
            }
            _ => Err(self.type_error("operands must be numbers", frame_index)),
        }
    }

    fn add(&mut self, frame_index: usize) -> Result<(), RuntimeError> {
        let b = self.pop();
        let a = self.pop();
        match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => self.push(Value::Number(x + y)),
            (Value::Obj(Obj::String(x)), Value::Obj(Obj::String(y))) => {
                let mut combined = String::with_capacity(x.bytes.len() + y.bytes.len());
                combined.push_str(&x.bytes);
                combined.push_str(&y.bytes);
                self.push(Value::Obj(Obj::String(Rc::new(ObjString::new(combined)))))
            }
            _ => Err(self.type_error("operands must be two numbers or two strings", frame_index)),
        }
    }

    fn call_value(&mut self, argc: usize, frame_index: usize) -> Result<(), RuntimeError> {
        let callee = self.peek(0).clone();
        match callee {
            Value::Obj(Obj::Function(function)) => {
                if function.arity != argc {
                    return Err(RuntimeError::arity_mismatch(
                        function.arity,
                        argc,
                        SourceLocation::new(self.current_line(frame_index)),
                    ));
                }
                if self.frames.len() >= FRAMES_MAX {
                    return Err(RuntimeError::stack_overflow(SourceLocation::new(
                        self.current_line(frame_index),
                    )));
                }
                self.pop(); // the callee itself
                let base = self.stack.len() - argc;
                self.frames.push(CallFrame { function, ip: 0, base });
                Ok(())
            }
            Value::Obj(Obj::Native(native)) => {
                self.pop(); // the callee itself
                let start = self.stack.len() - argc;
                let args: Vec<Value> = self.stack[start..].to_vec();
                self.stack.truncate(start);
                self.marks.truncate(start);
                let result = (native.func)(self, &args)?;
                self.push(result)
            }
            _ => Err(RuntimeError::not_callable(SourceLocation::new(self.current_line(frame_index)))),
        }
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn run(source: &str) -> Result<VM, RuntimeError> {
        let (stmts, errors) = parse(tokenize(source));
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        let function = compile(&stmts).expect("expected successful compile");
        let mut vm = VM::new();
        vm.interpret(function)?;
        Ok(vm)
    }

    #[test]
    fn arithmetic_and_globals_round_trip() {
        let vm = run("var x = 10; x = x + 5;").unwrap();
        assert!(matches!(vm.globals.get("x"), Some(Value::Number(n)) if *n == 15.0));
    }

    #[test]
    fn recursive_function_calls_return_correctly() {
        let vm = run(
            "function fact(n) { if (n < 2) { return 1; } return n * fact(n - 1); } var r = fact(5);",
        )
        .unwrap();
        assert!(matches!(vm.globals.get("r"), Some(Value::Number(n)) if *n == 120.0));
    }

    #[test]
    fn string_concatenation_allocates_a_new_string() {
        let vm = run(r#"var s = "foo" + "bar";"#).unwrap();
        assert!(matches!(vm.globals.get("s"), Some(Value::Obj(Obj::String(s))) if s.bytes == "foobar"));
    }

    #[test]
    fn undefined_global_read_is_a_runtime_error() {
        assert!(run("print(nope);").is_err());
    }

    #[test]
    fn wrong_arity_call_is_a_runtime_error() {
        assert!(run("function f(a) { return a; } f(1, 2);").is_err());
    }

    #[test]
    fn while_loop_accumulates_correctly() {
        let vm = run("var s = 0; var i = 0; while (i < 5) { s = s + i; i = i + 1; }").unwrap();
        assert!(matches!(vm.globals.get("s"), Some(Value::Number(n)) if *n == 10.0));
    }

    #[test]
    fn shadowed_block_local_does_not_leak_into_outer_scope() {
        let vm = run("var x = 1; { var x = 2; } var y = x;").unwrap();
        assert!(matches!(vm.globals.get("y"), Some(Value::Number(n)) if *n == 1.0));
    }

    #[test]
    fn interning_means_globals_lookup_by_content() {
        let vm = run(r#"var name = "value"; var same = name;"#).unwrap();
        assert!(matches!(vm.globals.get(&intern("same").bytes), Some(Value::Obj(Obj::String(s))) if s.bytes == "value"));
    }
}

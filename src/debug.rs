// Bytecode disassembler, used by `--dump-bytecode` to print a chunk in a
// human-readable form before the VM runs it.

use crate::bytecode::{Chunk, OpCode};

pub fn disassemble(chunk: &Chunk, name: &str) {
    eprintln!("== {} ==", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(chunk, offset);
    }
}

fn disassemble_instruction(chunk: &Chunk, offset: usize) -> usize {
    let line = chunk.lines.get(offset).copied().unwrap_or(0);
    if offset > 0 && chunk.lines.get(offset - 1) == Some(&line) {
        eprint!("{:04}    | ", offset);
    } else {
        eprint!("{:04} {:4} ", offset, line);
    }

    let byte = chunk.code[offset];
    match OpCode::from_byte(byte) {
        Some(OpCode::Constant) => constant_instruction("OP_CONSTANT", chunk, offset),
        Some(OpCode::Jump) => jump_instruction("OP_JUMP", 1, chunk, offset),
        Some(OpCode::JumpIfFalse) => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
        Some(OpCode::JumpIfTrue) => jump_instruction("OP_JUMP_IF_TRUE", 1, chunk, offset),
        Some(OpCode::Loop) => jump_instruction("OP_LOOP", -1, chunk, offset),
        Some(OpCode::Call) => byte_instruction("OP_CALL", chunk, offset),
        Some(op) => simple_instruction(mnemonic(op), offset),
        None => {
            eprintln!("unknown opcode {}", byte);
            offset + 1
        }
    }
}

fn mnemonic(op: OpCode) -> &'static str {
    match op {
        OpCode::Constant => "OP_CONSTANT",
        OpCode::Negate => "OP_NEGATE",
        OpCode::Not => "OP_NOT",
        OpCode::Add => "OP_ADD",
        OpCode::Sub => "OP_SUB",
        OpCode::Mul => "OP_MUL",
        OpCode::Div => "OP_DIV",
        OpCode::Less => "OP_LESS",
        OpCode::Greater => "OP_GREATER",
        OpCode::Equal => "OP_EQUAL",
        OpCode::True => "OP_TRUE",
        OpCode::False => "OP_FALSE",
        OpCode::Null => "OP_NULL",
        OpCode::Pop => "OP_POP",
        OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
        OpCode::GetGlobal => "OP_GET_GLOBAL",
        OpCode::SetGlobal => "OP_SET_GLOBAL",
        OpCode::GetLocal => "OP_GET_LOCAL",
        OpCode::SetLocal => "OP_SET_LOCAL",
        OpCode::MarkLocal => "OP_MARK_LOCAL",
        OpCode::Jump => "OP_JUMP",
        OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
        OpCode::JumpIfTrue => "OP_JUMP_IF_TRUE",
        OpCode::Loop => "OP_LOOP",
        OpCode::Call => "OP_CALL",
        OpCode::Return => "OP_RETURN",
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    eprintln!("{}", name);
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    eprintln!("{:<18} {:4}", name, slot);
    offset + 2
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let index = chunk.code[offset + 1] as usize;
    eprintln!("{:<18} {:4} '{}'", name, index, chunk.constants[index]);
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let jump = chunk.read_u16(offset + 1) as i32;
    let target = offset as i32 + 3 + sign * jump;
    eprintln!("{:<18} {:4} -> {}", name, offset, target);
    offset + 3
}

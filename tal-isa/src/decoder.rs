use crate::encoding::{read_int1, read_int4, read_uint1, read_uint4};
use crate::opcode::{Opcode, OperandKind, lookup};

/// Errors from [`decode`] and [`decode_one`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Unknown opcode at the given byte offset.
    #[error("invalid opcode {opcode:#04x} at offset {offset}")]
    InvalidOpcode { offset: usize, opcode: u8 },
    /// Bytecode truncated at the given byte offset.
    #[error("truncated instruction at offset {0}")]
    Truncated(usize),
}

/// A decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Plain integer (counts, immediates, encoded list indices).
    Imm(i64),
    /// Local variable slot.
    Local(u32),
    /// Literal pool index.
    Literal(u32),
    /// Auxiliary data index.
    Aux(u32),
    /// Jump offset relative to the instruction start.
    JumpOffset(i32),
    /// Character class selector.
    CharClass(u8),
}

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Byte offset of the opcode within the decoded slice.
    pub offset: usize,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Encoded size in bytes.
    pub size: usize,
}

impl Instruction {
    /// Absolute jump target, for jump instructions.
    pub fn jump_target(&self) -> Option<usize> {
        self.operands.iter().find_map(|op| match op {
            Operand::JumpOffset(rel) => usize::try_from(self.offset as i64 + *rel as i64).ok(),
            _ => None,
        })
    }
}

/// Encoded size of the instruction starting at `offset`.
pub fn instruction_size(code: &[u8], offset: usize) -> Result<usize, DecodeError> {
    let raw = *code.get(offset).ok_or(DecodeError::Truncated(offset))?;
    let info = lookup(raw).ok_or(DecodeError::InvalidOpcode {
        offset,
        opcode: raw,
    })?;
    let size = info.size();
    if offset + size > code.len() {
        return Err(DecodeError::Truncated(offset));
    }
    Ok(size)
}

/// Decode the instruction starting at `offset`.
pub fn decode_one(code: &[u8], offset: usize) -> Result<Instruction, DecodeError> {
    let size = instruction_size(code, offset)?;
    let opcode = Opcode(code[offset]);
    // instruction_size already validated the opcode.
    let kinds = lookup(opcode.raw()).map_or(&[][..], |info| info.operands());

    let mut operands = Vec::with_capacity(kinds.len());
    let mut at = offset + 1;
    for &kind in kinds {
        operands.push(read_operand(code, at, kind));
        at += kind.width();
    }

    Ok(Instruction {
        offset,
        opcode,
        operands,
        size,
    })
}

/// Decode a whole code slice into instructions.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let insn = decode_one(code, offset)?;
        offset += insn.size;
        instructions.push(insn);
    }
    Ok(instructions)
}

fn read_operand(code: &[u8], at: usize, kind: OperandKind) -> Operand {
    match kind {
        OperandKind::Int1 => Operand::Imm(read_int1(code, at) as i64),
        OperandKind::Uint1 => Operand::Imm(read_uint1(code, at) as i64),
        OperandKind::Int4 | OperandKind::Idx4 => Operand::Imm(read_int4(code, at) as i64),
        OperandKind::Uint4 => Operand::Imm(read_uint4(code, at) as i64),
        OperandKind::Lvt1 => Operand::Local(read_uint1(code, at) as u32),
        OperandKind::Lvt4 => Operand::Local(read_uint4(code, at)),
        OperandKind::Lit1 => Operand::Literal(read_uint1(code, at) as u32),
        OperandKind::Lit4 => Operand::Literal(read_uint4(code, at)),
        OperandKind::Aux4 => Operand::Aux(read_uint4(code, at)),
        OperandKind::Offset1 => Operand::JumpOffset(read_int1(code, at) as i32),
        OperandKind::Offset4 => Operand::JumpOffset(read_int4(code, at)),
        OperandKind::Scls1 => Operand::CharClass(read_uint1(code, at)),
    }
}

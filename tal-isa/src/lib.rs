//! Opcode definitions for the stack bytecode interpreter.
//!
//! This crate provides the numeric opcode table, operand kinds and widths,
//! the non-throwing opcode set, big-endian operand encoding helpers, and a
//! decoder that walks an opcode stream instruction by instruction.

pub mod decoder;
pub mod encoding;
mod opcode;

pub use decoder::{DecodeError, Instruction, Operand, decode, decode_one, instruction_size};
pub use opcode::{
    NON_THROWING, Opcode, OpcodeFlags, OpcodeInfo, OperandKind, lookup, opcode_count,
    opcode_table,
};

use tal_isa::Opcode;
use tal_isa::encoding::push_int4;

/// Build a code buffer from `(opcode, operand bytes)` pieces.
pub fn code(parts: &[(Opcode, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (op, operands) in parts {
        out.push(op.raw());
        out.extend_from_slice(operands);
    }
    out
}

pub fn int4(value: i64) -> Vec<u8> {
    let mut out = Vec::new();
    push_int4(&mut out, value);
    out
}

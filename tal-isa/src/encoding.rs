//! Big-endian operand encoding shared by the assembler and the decoder.

/// Append a one-byte operand (truncating to the low 8 bits).
#[inline]
pub fn push_int1(code: &mut Vec<u8>, value: i64) {
    code.push(value as u8);
}

/// Append a four-byte big-endian operand (truncating to the low 32 bits).
#[inline]
pub fn push_int4(code: &mut Vec<u8>, value: i64) {
    code.extend_from_slice(&(value as u32).to_be_bytes());
}

/// Overwrite the byte at `at`.
#[inline]
pub fn store_int1(code: &mut [u8], at: usize, value: i64) {
    code[at] = value as u8;
}

/// Overwrite four bytes at `at` with a big-endian value.
#[inline]
pub fn store_int4(code: &mut [u8], at: usize, value: i64) {
    code[at..at + 4].copy_from_slice(&(value as u32).to_be_bytes());
}

/// Read a signed byte at `at`.
#[inline]
pub fn read_int1(code: &[u8], at: usize) -> i8 {
    code[at] as i8
}

/// Read an unsigned byte at `at`.
#[inline]
pub fn read_uint1(code: &[u8], at: usize) -> u8 {
    code[at]
}

/// Read a signed big-endian four-byte value at `at`.
#[inline]
pub fn read_int4(code: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
}

/// Read an unsigned big-endian four-byte value at `at`.
#[inline]
pub fn read_uint4(code: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([code[at], code[at + 1], code[at + 2], code[at + 3]])
}

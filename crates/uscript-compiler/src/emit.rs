//! Byte-level code buffer.
//!
//! Operands are little-endian. Code offsets are 16-bit positions relative to
//! the start of the buffer. Operators and casts are compiled after their
//! operands, so the buffer supports splicing: an instruction emitted at the
//! end can be rotated in front of a previously emitted range.

use uscript_core::db::{FieldId, ObjectRef};
use uscript_core::{CompileError, Name};

use crate::bytecode::{EX_EXTENDED_NATIVE, ExprToken, MAX_SCRIPT_SIZE};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    code: Vec<u8>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(code: Vec<u8>) -> Self {
        Self { code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.code
    }

    // =========================================================================
    // Emission
    // =========================================================================

    pub fn emit_op(&mut self, op: ExprToken) {
        self.code.push(op.byte());
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn emit_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_f32(&mut self, value: f32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_name(&mut self, name: &Name) {
        self.emit_u32(name.index());
    }

    pub fn emit_field(&mut self, field: FieldId) {
        self.emit_u32(field.handle());
    }

    pub fn emit_object(&mut self, object: ObjectRef) {
        self.emit_u32(object.handle());
    }

    /// Emits a string constant, narrow when every character fits in one byte.
    pub fn emit_string(&mut self, text: &str) {
        if text.chars().all(|c| (c as u32) < 0x100) {
            self.emit_op(ExprToken::StringConst);
            self.code.extend(text.chars().map(|c| c as u8));
            self.code.push(0);
        } else {
            self.emit_op(ExprToken::UnicodeStringConst);
            for unit in text.encode_utf16() {
                self.emit_u16(unit);
            }
            self.emit_u16(0);
        }
    }

    /// Emits a call to a native function bound to a fixed id.
    pub fn emit_native_call(&mut self, native: u16) {
        if native < 0x100 {
            self.code.push(native as u8);
        } else {
            self.code.push(EX_EXTENDED_NATIVE + (native / 0x100) as u8);
            self.code.push((native % 0x100) as u8);
        }
    }

    /// Emits a zero u16 to be patched later and returns its position.
    pub fn emit_placeholder(&mut self) -> usize {
        let at = self.code.len();
        self.emit_u16(0);
        at
    }

    /// Pads with `Nothing` until the length is a multiple of `align`.
    pub fn align(&mut self, align: usize) {
        while self.code.len() % align != 0 {
            self.emit_op(ExprToken::Nothing);
        }
    }

    // =========================================================================
    // Patching
    // =========================================================================

    pub fn patch_u8(&mut self, at: usize, value: u8) {
        self.code[at] = value;
    }

    pub fn patch_u16(&mut self, at: usize, value: u16) {
        self.code[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn read_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.code[at], self.code[at + 1]])
    }

    /// Current position as a 16-bit code offset.
    pub fn offset(&self, line: u32) -> Result<u16, CompileError> {
        self.check_size(line)?;
        Ok(self.code.len() as u16)
    }

    pub fn check_size(&self, line: u32) -> Result<(), CompileError> {
        if self.code.len() >= MAX_SCRIPT_SIZE {
            return Err(CompileError::Semantic {
                message: "Code space for this function overflowed".to_string(),
                line,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Splicing
    // =========================================================================

    /// Moves `[mid, len)` in front of `[start, mid)`.
    pub fn rotate(&mut self, start: usize, mid: usize) {
        self.code[start..].rotate_left(mid - start);
    }

    /// Inserts `bytes` at `at`.
    pub fn insert(&mut self, at: usize, bytes: &[u8]) {
        self.code.splice(at..at, bytes.iter().copied());
    }

    /// Removes and returns everything from `start` on.
    pub fn drain_from(&mut self, start: usize) -> Vec<u8> {
        self.code.drain(start..).collect()
    }

    pub fn remove_range(&mut self, start: usize, end: usize) {
        self.code.drain(start..end);
    }

    pub fn truncate(&mut self, len: usize) {
        self.code.truncate(len);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands_are_little_endian() {
        let mut code = CodeBuffer::new();
        code.emit_u16(0x1234);
        code.emit_i32(-2);
        assert_eq!(code.bytes(), &[0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn native_ids() {
        let mut code = CodeBuffer::new();
        code.emit_native_call(0x90);
        code.emit_native_call(0x1F3);
        assert_eq!(code.bytes(), &[0x90, 0x61, 0xF3]);
    }

    #[test]
    fn narrow_and_wide_strings() {
        let mut code = CodeBuffer::new();
        code.emit_string("hi");
        assert_eq!(code.bytes(), &[0x1F, b'h', b'i', 0]);
        let mut wide = CodeBuffer::new();
        wide.emit_string("\u{3042}");
        assert_eq!(wide.bytes(), &[0x34, 0x42, 0x30, 0, 0]);
    }

    #[test]
    fn rotate_moves_tail_in_front() {
        let mut code = CodeBuffer::from_vec(vec![9, 1, 2, 3, 0xA]);
        code.rotate(1, 4);
        assert_eq!(code.bytes(), &[9, 0xA, 1, 2, 3]);
    }

    #[test]
    fn placeholder_patch() {
        let mut code = CodeBuffer::new();
        code.emit_op(ExprToken::Jump);
        let at = code.emit_placeholder();
        code.patch_u16(at, 0x0102);
        assert_eq!(code.bytes(), &[0x06, 0x02, 0x01]);
        assert_eq!(code.read_u16(at), 0x0102);
    }

    #[test]
    fn align_pads_with_nothing() {
        let mut code = CodeBuffer::from_vec(vec![0x08]);
        code.align(4);
        assert_eq!(code.bytes(), &[0x08, 0x0B, 0x0B, 0x0B]);
    }

    #[test]
    fn overflow_is_reported() {
        let code = CodeBuffer::from_vec(vec![0; MAX_SCRIPT_SIZE]);
        assert!(code.check_size(7).is_err());
    }
}

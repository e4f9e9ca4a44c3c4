//! Expression tokens: the instruction set of the script interpreter.
//!
//! Every instruction starts with one of these bytes. Values at or above
//! [`EX_EXTENDED_NATIVE`] are native function calls and are self-describing
//! by range, so the numeric values below are fixed.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// First byte of a two byte native call (`0x60 + id / 256`, `id % 256`).
pub const EX_EXTENDED_NATIVE: u8 = 0x60;
/// Lowest native id callable with a single byte.
pub const EX_FIRST_NATIVE: u16 = 0x70;
/// Native ids must stay below this.
pub const EX_MAX_NATIVE: u16 = 0x1000;

/// Code offset written by `default:` and by the switch terminator.
pub const MAX_CODE_OFFSET: u16 = 0xFFFF;
/// Largest script buffer addressable by 16-bit code offsets.
pub const MAX_SCRIPT_SIZE: usize = 65534;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ExprToken {
    // =========================================================================
    // Variables
    // =========================================================================
    /// Operand: property handle (u32).
    LocalVariable = 0x00,
    /// Operand: property handle (u32).
    InstanceVariable = 0x01,
    /// Operand: property handle (u32).
    DefaultVariable = 0x02,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Operand: expression or `Nothing`.
    Return = 0x04,
    /// Operands: u8 value size, expression.
    Switch = 0x05,
    /// Operand: u16 code offset.
    Jump = 0x06,
    /// Operands: u16 code offset, bool expression.
    JumpIfNot = 0x07,
    Stop = 0x08,
    /// Operands: u16 line, bool expression.
    Assert = 0x09,
    /// Operands: u16 next case offset, constant (absent for `default`).
    Case = 0x0A,
    Nothing = 0x0B,
    /// Followed by (name u32, offset u32) pairs.
    LabelTable = 0x0C,
    /// Operand: name expression.
    GotoLabel = 0x0D,
    /// Operand: string expression whose value is discarded.
    EatString = 0x0E,
    /// Operands: lvalue, rvalue.
    Let = 0x0F,
    /// Operands: index, array expression.
    DynArrayElement = 0x10,
    /// Operands: outer, name, flags, class.
    New = 0x11,
    /// Like `Context` but evaluates to a class default object.
    ClassContext = 0x12,
    /// Operands: class handle (u32), expression.
    MetaCast = 0x13,
    LetBool = 0x14,
    /// Operand: u16 line.
    DebugInfo = 0x15,
    EndFunctionParms = 0x16,
    SelfRef = 0x17,
    /// Operand: u16 distance.
    Skip = 0x18,
    /// Operands: object, u16 skip, u8 size, member.
    Context = 0x19,
    /// Operands: index, array expression.
    ArrayElement = 0x1A,
    /// Operands: u8 via super, name (u32).
    VirtualFunction = 0x1B,
    /// Operand: function handle (u32).
    FinalFunction = 0x1C,

    // =========================================================================
    // Constants
    // =========================================================================
    IntConst = 0x1D,
    FloatConst = 0x1E,
    /// Null-terminated narrow string.
    StringConst = 0x1F,
    ObjectConst = 0x20,
    NameConst = 0x21,
    RotationConst = 0x22,
    VectorConst = 0x23,
    ByteConst = 0x24,
    IntZero = 0x25,
    IntOne = 0x26,
    True = 0x27,
    False = 0x28,
    NativeParm = 0x29,
    NoObject = 0x2A,
    IntConstByte = 0x2C,
    /// Prefix marking the following variable access as a bool.
    BoolVariable = 0x2D,
    /// Operands: class handle (u32), expression.
    DynamicCast = 0x2E,

    // =========================================================================
    // Iterators, structs and arrays
    // =========================================================================
    /// Operands: iterator call, u16 end offset.
    Iterator = 0x2F,
    IteratorPop = 0x30,
    IteratorNext = 0x31,
    /// Operands: struct handle (u32), left, right.
    StructCmpEq = 0x32,
    StructCmpNe = 0x33,
    /// Null-terminated UTF-16 string.
    UnicodeStringConst = 0x34,
    /// Operands: property handle (u32), struct expression.
    StructMember = 0x36,
    DynArrayLength = 0x37,
    /// Operand: name (u32), resolved at runtime.
    GlobalFunction = 0x38,
    /// Operands: u8 cast code, expression.
    PrimitiveCast = 0x39,
    DynArrayInsert = 0x3A,
    DynArrayRemove = 0x3B,
    /// Operands: u8 is local, property handle (u32), name (u32).
    DelegateFunction = 0x3C,
    /// Operand: name (u32).
    DelegateProperty = 0x3D,
    LetDelegate = 0x3E,
    /// Evaluates to the outer object of `self`.
    SelfOuter = 0x3F,
}

impl ExprToken {
    /// Opcode byte.
    #[inline]
    pub fn byte(self) -> u8 {
        self.into()
    }

    /// Bytes of a `Context` or `ClassContext` header that follow the object
    /// expression: u16 skip plus u8 size.
    pub const CONTEXT_OPERANDS: usize = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_fixed() {
        assert_eq!(ExprToken::LocalVariable.byte(), 0x00);
        assert_eq!(ExprToken::Context.byte(), 0x19);
        assert_eq!(ExprToken::PrimitiveCast.byte(), 0x39);
        assert_eq!(ExprToken::SelfOuter.byte(), 0x3F);
    }

    #[test]
    fn round_trips_through_byte() {
        assert_eq!(ExprToken::try_from(0x1C), Ok(ExprToken::FinalFunction));
        assert!(ExprToken::try_from(0x03).is_err());
        assert!(ExprToken::try_from(EX_EXTENDED_NATIVE).is_err());
    }
}

//! Instruction set and primitive cast table.

mod cast;
mod opcode;

pub use cast::{CastEntry, CastToken, ConversionFlags, get_conversion};
pub use opcode::{
    EX_EXTENDED_NATIVE, EX_FIRST_NATIVE, EX_MAX_NATIVE, ExprToken, MAX_CODE_OFFSET,
    MAX_SCRIPT_SIZE,
};

//! Primitive cast codes and the static conversion table.
//!
//! The table is indexed by `[dest][source]` kind. A cell is either empty or a
//! cast code tagged with whether the compiler may insert it implicitly and
//! whether it loses information.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use uscript_core::PropertyKind;

/// Operand of `PrimitiveCast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CastToken {
    RotatorToVector = 0x39,
    ByteToInt = 0x3A,
    ByteToBool = 0x3B,
    ByteToFloat = 0x3C,
    IntToByte = 0x3D,
    IntToBool = 0x3E,
    IntToFloat = 0x3F,
    BoolToByte = 0x40,
    BoolToInt = 0x41,
    BoolToFloat = 0x42,
    FloatToByte = 0x43,
    FloatToInt = 0x44,
    FloatToBool = 0x45,
    ObjectToBool = 0x47,
    NameToBool = 0x48,
    StringToByte = 0x49,
    StringToInt = 0x4A,
    StringToBool = 0x4B,
    StringToFloat = 0x4C,
    StringToVector = 0x4D,
    StringToRotator = 0x4E,
    VectorToBool = 0x4F,
    VectorToRotator = 0x50,
    RotatorToBool = 0x51,
    ByteToString = 0x52,
    IntToString = 0x53,
    BoolToString = 0x54,
    FloatToString = 0x55,
    ObjectToString = 0x56,
    NameToString = 0x57,
    VectorToString = 0x58,
    RotatorToString = 0x59,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConversionFlags: u8 {
        /// May be applied without explicit cast syntax.
        const AUTO = 1 << 0;
        /// Narrows the value.
        const TRUNCATE = 1 << 1;
    }
}

/// One non-empty cell of the conversion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastEntry {
    pub token: CastToken,
    pub flags: ConversionFlags,
}

impl CastEntry {
    const fn explicit(token: CastToken) -> Option<Self> {
        Some(Self {
            token,
            flags: ConversionFlags::empty(),
        })
    }

    const fn auto(token: CastToken) -> Option<Self> {
        Some(Self {
            token,
            flags: ConversionFlags::AUTO,
        })
    }

    const fn auto_truncate(token: CastToken) -> Option<Self> {
        Some(Self {
            token,
            flags: ConversionFlags::AUTO.union(ConversionFlags::TRUNCATE),
        })
    }

    pub fn is_auto(&self) -> bool {
        self.flags.contains(ConversionFlags::AUTO)
    }

    pub fn is_truncating(&self) -> bool {
        self.flags.contains(ConversionFlags::TRUNCATE)
    }
}

/// Looks up the conversion from `source` to `dest`.
///
/// Identity and object/struct/enum relationships are never in the table.
pub fn get_conversion(dest: PropertyKind, source: PropertyKind) -> Option<CastEntry> {
    use CastToken::*;
    use PropertyKind as K;

    match (dest, source) {
        (K::Byte, K::Int) => CastEntry::auto_truncate(IntToByte),
        (K::Byte, K::Bool) => CastEntry::explicit(BoolToByte),
        (K::Byte, K::Float) => CastEntry::auto_truncate(FloatToByte),
        (K::Byte, K::String) => CastEntry::explicit(StringToByte),

        (K::Int, K::Byte) => CastEntry::auto(ByteToInt),
        (K::Int, K::Bool) => CastEntry::explicit(BoolToInt),
        (K::Int, K::Float) => CastEntry::auto_truncate(FloatToInt),
        (K::Int, K::String) => CastEntry::explicit(StringToInt),

        (K::Bool, K::Byte) => CastEntry::explicit(ByteToBool),
        (K::Bool, K::Int) => CastEntry::explicit(IntToBool),
        (K::Bool, K::Float) => CastEntry::explicit(FloatToBool),
        (K::Bool, K::Object) => CastEntry::explicit(ObjectToBool),
        (K::Bool, K::Name) => CastEntry::explicit(NameToBool),
        (K::Bool, K::Vector) => CastEntry::explicit(VectorToBool),
        (K::Bool, K::Rotator) => CastEntry::explicit(RotatorToBool),
        (K::Bool, K::String) => CastEntry::explicit(StringToBool),

        (K::Float, K::Byte) => CastEntry::auto(ByteToFloat),
        (K::Float, K::Int) => CastEntry::auto(IntToFloat),
        (K::Float, K::Bool) => CastEntry::explicit(BoolToFloat),
        (K::Float, K::String) => CastEntry::explicit(StringToFloat),

        (K::Vector, K::Rotator) => CastEntry::explicit(RotatorToVector),
        (K::Vector, K::String) => CastEntry::explicit(StringToVector),

        (K::Rotator, K::Vector) => CastEntry::explicit(VectorToRotator),
        (K::Rotator, K::String) => CastEntry::explicit(StringToRotator),

        (K::String, K::Byte) => CastEntry::explicit(ByteToString),
        (K::String, K::Int) => CastEntry::explicit(IntToString),
        (K::String, K::Bool) => CastEntry::explicit(BoolToString),
        (K::String, K::Float) => CastEntry::explicit(FloatToString),
        (K::String, K::Object) => CastEntry::explicit(ObjectToString),
        (K::String, K::Name) => CastEntry::explicit(NameToString),
        (K::String, K::Vector) => CastEntry::explicit(VectorToString),
        (K::String, K::Rotator) => CastEntry::explicit(RotatorToString),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_conversion_is_empty() {
        for kind in PropertyKind::ALL {
            assert_eq!(get_conversion(kind, kind), None, "{kind:?}");
        }
    }

    #[test]
    fn auto_entries_have_a_cast_code() {
        for dest in PropertyKind::ALL {
            for source in PropertyKind::ALL {
                if let Some(entry) = get_conversion(dest, source) {
                    assert!((0x39..=0x59).contains(&u8::from(entry.token)));
                    if entry.is_truncating() {
                        assert!(entry.is_auto());
                    }
                }
            }
        }
    }

    #[test]
    fn conversions_to_string_are_explicit() {
        for source in PropertyKind::ALL {
            if let Some(entry) = get_conversion(PropertyKind::String, source) {
                assert!(!entry.is_auto(), "{source:?}");
            }
        }
    }

    #[test]
    fn widening_and_truncation() {
        let widen = get_conversion(PropertyKind::Int, PropertyKind::Byte).unwrap();
        assert!(widen.is_auto() && !widen.is_truncating());
        let narrow = get_conversion(PropertyKind::Byte, PropertyKind::Int).unwrap();
        assert!(narrow.is_truncating());
        assert_eq!(
            get_conversion(PropertyKind::Int, PropertyKind::Float).map(|e| e.token),
            Some(CastToken::FloatToInt)
        );
    }
}

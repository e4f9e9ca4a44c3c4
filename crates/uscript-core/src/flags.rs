//! Qualifier flag sets for properties, functions, states, classes and structs.

use bitflags::bitflags;

bitflags! {
    /// Property and expression-result qualifiers.
    ///
    /// On an expression result, `OUT_PARM` marks an l-value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        const EDIT          = 1 << 0;
        const CONST         = 1 << 1;
        const INPUT         = 1 << 2;
        const EXPORT_OBJECT = 1 << 3;
        const OPTIONAL_PARM = 1 << 4;
        const NET           = 1 << 5;
        const PARM          = 1 << 7;
        const OUT_PARM      = 1 << 8;
        const SKIP_PARM     = 1 << 9;
        const RETURN_PARM   = 1 << 10;
        const COERCE_PARM   = 1 << 11;
        const NATIVE        = 1 << 12;
        const TRANSIENT     = 1 << 13;
        const CONFIG        = 1 << 14;
        const LOCALIZED     = 1 << 15;
        const TRAVEL        = 1 << 16;
        const EDIT_CONST    = 1 << 17;
        const GLOBAL_CONFIG = 1 << 18;
        const NO_EXPORT     = 1 << 19;
        const DEPRECATED    = 1 << 20;
        const EDIT_INLINE   = 1 << 21;
        const PRIVATE       = 1 << 22;
        const PROTECTED     = 1 << 23;
    }
}

bitflags! {
    /// Function qualifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u32 {
        const FINAL        = 1 << 0;
        const DEFINED      = 1 << 1;
        const ITERATOR     = 1 << 2;
        const LATENT       = 1 << 3;
        const PRE_OPERATOR = 1 << 4;
        const SINGULAR     = 1 << 5;
        const NET          = 1 << 6;
        const NET_RELIABLE = 1 << 7;
        const SIMULATED    = 1 << 8;
        const EXEC         = 1 << 9;
        const NATIVE       = 1 << 10;
        const EVENT        = 1 << 11;
        const OPERATOR     = 1 << 12;
        const STATIC       = 1 << 13;
        const CONST        = 1 << 14;
        const PRIVATE      = 1 << 15;
        const PROTECTED    = 1 << 16;
        const DELEGATE     = 1 << 17;
    }
}

bitflags! {
    /// State qualifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StateFlags: u32 {
        const EDITABLE  = 1 << 0;
        const AUTO      = 1 << 1;
        const SIMULATED = 1 << 2;
    }
}

bitflags! {
    /// Class qualifiers and compile status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u32 {
        const ABSTRACT            = 1 << 0;
        const COMPILED            = 1 << 1;
        const CONFIG              = 1 << 2;
        const TRANSIENT           = 1 << 3;
        const PARSED              = 1 << 4;
        const LOCALIZED           = 1 << 5;
        const NATIVE              = 1 << 6;
        const NO_EXPORT           = 1 << 7;
        const PLACEABLE           = 1 << 8;
        const PER_OBJECT_CONFIG   = 1 << 9;
        const NATIVE_REPLICATION  = 1 << 10;
        const EDIT_INLINE_NEW     = 1 << 11;
        const COLLAPSE_CATEGORIES = 1 << 12;
        const INTRINSIC           = 1 << 13;
        const SAFE_REPLACE        = 1 << 14;
    }
}

bitflags! {
    /// Struct qualifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StructFlags: u32 {
        const NATIVE = 1 << 0;
        const EXPORT = 1 << 1;
    }
}

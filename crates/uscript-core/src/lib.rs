//! Reflection data model shared by the UnrealScript compiler.
//!
//! - [`name`]: case-insensitive interned names
//! - [`flags`]: property, function, state, class and struct flag sets
//! - [`types`]: the static type of declarations and expressions
//! - [`db`]: the field store classes are compiled into
//! - [`error`]: compile errors

pub mod db;
pub mod error;
pub mod flags;
pub mod name;
pub mod types;

pub use db::{Database, Field, FieldId, FieldKind, ObjectRef};
pub use error::CompileError;
pub use flags::{ClassFlags, FunctionFlags, PropertyFlags, StateFlags, StructFlags};
pub use name::{Name, NameTable};
pub use types::{PropertyKind, PropertyType};

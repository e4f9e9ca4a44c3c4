//! UnrealScript compiler.
//!
//! Register class sources in a [`Database`](core::Database), then compile
//! them with a [`Session`](compiler::Session):
//!
//! ```
//! use uscript::prelude::*;
//!
//! let mut db = Database::new();
//! let actor = db.add_class("Actor", "class Actor extends Object; var int Health;");
//! let mut session = Session::new(CompilerOptions::default());
//! assert!(session.make(&mut db, &[actor]));
//! ```

pub use uscript_compiler as compiler;
pub use uscript_core as core;

pub mod prelude {
    pub use uscript_compiler::{
        CodeBuffer, CompileError, CompilerOptions, Diagnostic, DiagnosticKind, Diagnostics, ExprToken, Pass,
        Session,
    };
    pub use uscript_core::db::ObjectRef;
    pub use uscript_core::{
        ClassFlags, Database, Field, FieldId, FieldKind, FunctionFlags, Name, PropertyFlags, PropertyKind,
        PropertyType, StateFlags, StructFlags,
    };
}

//! UnrealScript compiler.
//!
//! Compiles class sources registered in a [`Database`](uscript_core::Database)
//! into bytecode stored on the class's functions and states.
//!
//! ## Architecture
//!
//! - **Declare pass**: parse every declaration, create fields with complete
//!   signatures, then lay out properties and parameter frames
//! - **Generate pass**: re-read function bodies, state code and replication
//!   conditions and emit bytecode
//!
//! ## Modules
//!
//! - [`bytecode`]: instruction set and primitive cast table
//! - [`lexer`]: character cursor and raw tokenizer
//! - [`emit`]: byte-level code buffer with splicing
//! - [`conversion`]: conversion costs for overloads and coercion
//! - [`diagnostics`]: warnings and errors collected per session
//! - [`options`]: session settings
//! - [`post_parse`]: layout after the declare pass
//! - [`driver`]: [`Session`] and batch compilation

pub mod bytecode;
mod compiler;
pub mod conversion;
mod decl;
pub mod diagnostics;
pub mod driver;
pub mod emit;
mod expr;
mod expr_info;
pub mod lexer;
mod nest;
pub mod options;
pub mod post_parse;
mod resolve;
mod stmt;

pub use bytecode::ExprToken;
pub use compiler::Pass;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use driver::Session;
pub use emit::CodeBuffer;
pub use expr_info::ExprInfo;
pub use options::CompilerOptions;

pub use uscript_core::CompileError;

//! Compile errors.
//!
//! Variants follow how an error propagates rather than what caused it. Every
//! variant aborts the current class; `Internal` marks a compiler defect rather
//! than bad source.

use thiserror::Error;

/// A fatal error raised while compiling one class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Unterminated string or comment, oversized token.
    #[error("line {line}: {message}")]
    Lexical { message: String, line: u32 },

    /// Missing symbol, unbalanced braces, statement not allowed here.
    #[error("line {line}: {message}")]
    Syntax { message: String, line: u32 },

    /// Unresolved name, type mismatch, ambiguity, visibility, limits.
    #[error("line {line}: {message}")]
    Semantic { message: String, line: u32 },

    /// A fix-up never resolved, nest stack misuse and similar defects.
    #[error("line {line}: internal compiler error: {message}")]
    Internal { message: String, line: u32 },

    /// An ancestor class failed its declaration pass.
    #[error("'{class}': superclass '{parent}' has errors")]
    ParentHasErrors { class: String, parent: String },
}

impl CompileError {
    /// Line the error was raised on (0 when not tied to source).
    pub fn line(&self) -> u32 {
        match self {
            CompileError::Lexical { line, .. }
            | CompileError::Syntax { line, .. }
            | CompileError::Semantic { line, .. }
            | CompileError::Internal { line, .. } => *line,
            CompileError::ParentHasErrors { .. } => 0,
        }
    }

    /// Error text without the line prefix.
    pub fn message(&self) -> String {
        match self {
            CompileError::Lexical { message, .. }
            | CompileError::Syntax { message, .. }
            | CompileError::Semantic { message, .. }
            | CompileError::Internal { message, .. } => message.clone(),
            CompileError::ParentHasErrors { class, parent } => {
                format!("'{class}': superclass '{parent}' has errors")
            }
        }
    }

    /// Whether this error indicates a compiler bug.
    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Internal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line() {
        let err = CompileError::Syntax {
            message: "Missing ';'".to_string(),
            line: 12,
        };
        assert_eq!(err.to_string(), "line 12: Missing ';'");
        assert_eq!(err.line(), 12);
        assert!(!err.is_internal());
    }

    #[test]
    fn internal_is_flagged() {
        let err = CompileError::Internal {
            message: "unresolved fixup".to_string(),
            line: 3,
        };
        assert!(err.is_internal());
        assert!(err.to_string().contains("internal compiler error"));
    }
}

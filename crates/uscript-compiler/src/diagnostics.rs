//! Warnings and errors reported while compiling a batch of classes.

use std::collections::VecDeque;
use std::fmt;

/// A single compiler message.
///
/// ```
/// use uscript_compiler::{Diagnostic, DiagnosticKind};
///
/// let diagnostic = Diagnostic {
///     kind: DiagnosticKind::Warning,
///     message: "'Speed' obscures 'Speed' defined in base class 'Actor'".to_string(),
///     section: Some("Pawn".to_string()),
///     row: 12,
/// };
/// assert_eq!(diagnostic.to_string(), "Pawn:12: warning: 'Speed' obscures 'Speed' defined in base class 'Actor'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Name of the class being compiled, if any.
    pub section: Option<String>,
    /// Source line, 0 when not tied to a line.
    pub row: u32,
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The class failed to compile.
    Error,
    /// Compilation continues.
    Warning,
    Info,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(f, "{}:{}: {}: {}", section, self.row, self.kind, self.message),
            None => write!(f, "{}: {}: {}", self.row, self.kind, self.message),
        }
    }
}

/// Collected messages for one compiler session.
///
/// `has_errors` is the batch-level failure flag: once any class fails, steps
/// that need every class compiled should not run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic, latching the error flag for errors.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Error {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    pub fn warn(&mut self, section: &str, row: u32, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{section}:{row}: {message}");
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Warning,
            message,
            section: Some(section.to_string()),
            row,
        });
    }

    pub fn error(&mut self, section: &str, row: u32, message: impl Into<String>) {
        let message = message.into();
        log::error!("{section}:{row}: {message}");
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Error,
            message,
            section: Some(section.to_string()),
            row,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Removes all messages and resets the error flag.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_set_error_flag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn("Actor", 4, "unreferenced local 'i'");
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert_eq!(diagnostics.warning_count(), 1);
    }

    #[test]
    fn errors_latch_until_cleared() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("Pawn", 9, "Missing ';'");
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.to_string(), "Pawn:9: error: Missing ';'\n");
        diagnostics.clear();
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.is_empty());
    }
}

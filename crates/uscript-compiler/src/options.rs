//! Compiler configuration.

/// Settings fixed for the lifetime of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Emit a `DebugInfo` opcode with the line number before each statement.
    pub emit_debug_info: bool,
    /// Warn about locals that are declared but never read or written.
    pub warn_unreferenced_locals: bool,
    /// Compare computed class sizes against sizes reported by native code.
    pub check_native_sizes: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            emit_debug_info: false,
            warn_unreferenced_locals: true,
            check_native_sizes: true,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.emit_debug_info = enabled;
        self
    }

    pub fn with_unreferenced_local_warnings(mut self, enabled: bool) -> Self {
        self.warn_unreferenced_locals = enabled;
        self
    }

    pub fn with_native_size_checks(mut self, enabled: bool) -> Self {
        self.check_native_sizes = enabled;
        self
    }
}

//! Per-class compilation context.
//!
//! A `Compiler` lives for one pass over one class. It owns the lexer, the
//! nest stack and the code buffer of the innermost code owner; everything it
//! allocates for bookkeeping comes from the arena handed in by the driver.

use rustc_hash::FxHashSet;
use uscript_core::db::{FieldId, FieldKind};
use uscript_core::{CompileError, Database, FunctionFlags, Name};

use crate::diagnostics::Diagnostics;
use crate::emit::CodeBuffer;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::nest::{NestKind, NestStack};
use crate::options::CompilerOptions;

/// Which of the two passes over a class is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Declare every field and signature. No code is generated.
    Declare,
    /// Generate code for function bodies, state code and replication.
    Generate,
}

/// Function-level bookkeeping, reset when a function nest is pushed.
#[derive(Debug, Default)]
pub(crate) struct FunctionState {
    pub locals: Vec<FieldId>,
    pub referenced: FxHashSet<FieldId>,
    pub got_return_value: bool,
    /// The last statement at function level was a `return`.
    pub last_returned: bool,
}

pub(crate) struct Compiler<'c, 'a> {
    pub db: &'c mut Database,
    pub options: &'c CompilerOptions,
    pub diagnostics: &'c mut Diagnostics,
    pub lexer: Lexer,
    pub nest: NestStack<'a>,
    pub code: CodeBuffer,
    pub class: FieldId,
    pub class_name: String,
    pub pass: Pass,
    pub function: FunctionState,
}

impl<'c, 'a> Compiler<'c, 'a> {
    pub fn new(
        db: &'c mut Database,
        options: &'c CompilerOptions,
        diagnostics: &'c mut Diagnostics,
        arena: &'a bumpalo::Bump,
        class: FieldId,
        pass: Pass,
    ) -> Self {
        let field = db.field(class);
        let class_name = field.name.to_string();
        let source = field
            .as_class()
            .map(|c| c.source.clone())
            .unwrap_or_else(|| std::rc::Rc::from(""));
        Self {
            db,
            options,
            diagnostics,
            lexer: Lexer::new(&source, 1),
            nest: NestStack::new(arena),
            code: CodeBuffer::new(),
            class,
            class_name,
            pass,
            function: FunctionState::default(),
        }
    }

    /// Compiles the whole class source for the current pass.
    pub fn compile(&mut self) -> Result<(), CompileError> {
        let line = self.line();
        self.nest.push(NestKind::None, self.class, line)?;
        while self.compile_statement()? {}
        match self.nest.top_kind() {
            NestKind::Class => {
                self.finish_nest()?;
                self.nest.pop(self.line())?;
                Ok(())
            }
            NestKind::None => Err(self.syntax("Script does not contain a 'class' declaration")),
            kind => Err(self.syntax(format!("Unexpected end of script in '{}' block", kind.name()))),
        }
    }

    // =========================================================================
    // Errors and warnings
    // =========================================================================

    pub fn line(&self) -> u32 {
        self.lexer.line()
    }

    pub fn syntax(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            message: message.into(),
            line: self.line(),
        }
    }

    pub fn semantic(&self, message: impl Into<String>) -> CompileError {
        CompileError::Semantic {
            message: message.into(),
            line: self.line(),
        }
    }

    pub fn internal(&self, message: impl Into<String>) -> CompileError {
        CompileError::Internal {
            message: message.into(),
            line: self.line(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let line = self.line();
        self.diagnostics.warn(&self.class_name, line, message);
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    pub fn get_raw(&mut self) -> Result<Token, CompileError> {
        self.lexer.get_raw_token(true)
    }

    pub fn peek_raw(&mut self) -> Result<Token, CompileError> {
        self.lexer.peek_raw_token(true)
    }

    pub fn unget(&mut self, token: &Token) {
        self.lexer.unget_token(token);
    }

    pub fn match_symbol(&mut self, symbol: &str) -> Result<bool, CompileError> {
        let token = self.get_raw()?;
        if token.matches_symbol(symbol) {
            return Ok(true);
        }
        self.unget(&token);
        Ok(false)
    }

    pub fn require_symbol(&mut self, symbol: &str, tag: &str) -> Result<(), CompileError> {
        if self.match_symbol(symbol)? {
            return Ok(());
        }
        let found = self.peek_raw()?.describe();
        Err(self.syntax(format!("Missing '{symbol}' in {tag}, found '{found}'")))
    }

    pub fn match_identifier(&mut self, word: &str) -> Result<bool, CompileError> {
        let token = self.get_raw()?;
        if token.matches(word) {
            return Ok(true);
        }
        self.unget(&token);
        Ok(false)
    }

    pub fn require_identifier(&mut self, word: &str, tag: &str) -> Result<(), CompileError> {
        if self.match_identifier(word)? {
            return Ok(());
        }
        Err(self.syntax(format!("Missing '{word}' in {tag}")))
    }

    /// Reads an identifier, failing with a message naming `tag`.
    pub fn get_name(&mut self, tag: &str) -> Result<Token, CompileError> {
        let token = self.get_raw()?;
        if token.kind != TokenKind::Identifier {
            return Err(self.syntax(format!("Missing name for {tag}, found '{}'", token.describe())));
        }
        Ok(token)
    }

    pub fn intern(&mut self, text: &str) -> Name {
        self.db.intern(text)
    }

    // =========================================================================
    // Scope queries
    // =========================================================================

    /// Field code is currently generated for.
    pub fn scope(&self) -> FieldId {
        self.nest.top().map_or(self.class, |nest| nest.node)
    }

    /// Innermost function being compiled.
    pub fn current_function(&self) -> Option<FieldId> {
        self.nest
            .innermost(&[NestKind::Function])
            .map(|index| self.nest.get(index).node)
    }

    /// Whether `self` and instance members are usable here.
    pub fn has_instance_context(&self) -> bool {
        match self.current_function() {
            Some(function) => !self
                .db
                .field(function)
                .as_function()
                .is_some_and(|f| f.flags.contains(FunctionFlags::STATIC)),
            None => true,
        }
    }

    pub fn is_class(&self, id: FieldId) -> bool {
        matches!(self.db.field(id).kind, FieldKind::Class(_))
    }

    /// Pushes a nest, giving code owners a fresh buffer.
    pub fn push_nest(&mut self, kind: NestKind, node: FieldId) -> Result<(), CompileError> {
        let line = self.line();
        let saved = kind.owns_code().then(|| std::mem::take(&mut self.code));
        let nest = self.nest.push(kind, node, line)?;
        nest.saved_code = saved;
        if kind == NestKind::Function {
            self.function = FunctionState::default();
        }
        Ok(())
    }
}

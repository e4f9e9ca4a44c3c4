//! Declaration compiler.
//!
//! Declarations are fully parsed in the declare pass, which creates the
//! fields, and skipped in the generate pass except where they open code:
//! function bodies, state code and the replication block. Function bodies
//! are skipped as text in the declare pass; the generate pass finds the
//! function again by the source offset of its header and resumes lexing at
//! the recorded body position.

mod class;
mod function;
mod state;
mod types;
mod var;

use uscript_core::CompileError;

use crate::compiler::{Compiler, Pass};
use crate::lexer::Token;
use crate::nest::{AllowFlags, NestKind};
use crate::stmt::NestClose;

type Result<T> = std::result::Result<T, CompileError>;

/// Words that can start a function declaration.
const FUNCTION_WORDS: &[&str] = &[
    "function",
    "event",
    "delegate",
    "operator",
    "preoperator",
    "postoperator",
    "native",
    "final",
    "static",
    "simulated",
    "latent",
    "iterator",
    "singular",
    "exec",
    "private",
    "protected",
];

impl Compiler<'_, '_> {
    /// Compiles `token` as a declaration if it starts one. Returns `false`
    /// when the token belongs to a statement.
    pub(crate) fn compile_declaration(&mut self, token: &Token) -> Result<bool> {
        if token.matches_symbol("}") {
            self.close_brace()?;
            return Ok(true);
        }
        if token.matches_symbol("#") {
            self.compile_directive()?;
            return Ok(true);
        }
        if token.matches_symbol(";") && matches!(self.nest.top_kind(), NestKind::Class | NestKind::State) {
            return Ok(true);
        }
        if !token.is_identifier() {
            return Ok(false);
        }

        let word = token.text.to_ascii_lowercase();
        let next = self.peek_raw()?;
        if next.matches_symbol(".") || next.matches_symbol("=") {
            return Ok(false);
        }
        match word.as_str() {
            "class" if self.nest.allows(AllowFlags::CLASS) => self.compile_class_header()?,
            "var" if self.nest.allows(AllowFlags::INSTANCE_VAR) => self.compile_var()?,
            "local" if self.nest.allows(AllowFlags::VAR_DECL) => self.compile_local()?,
            "local" if self.nest.innermost(&[NestKind::Function]).is_some() => {
                return Err(self.syntax("Local variables must be declared before any code"));
            }
            "const" if self.nest.allows(AllowFlags::TYPE_DECL) => self.compile_const_decl()?,
            "enum" if self.nest.allows(AllowFlags::TYPE_DECL) => self.compile_enum_statement()?,
            "struct" if self.nest.allows(AllowFlags::TYPE_DECL) => self.compile_struct_statement()?,
            "replication" if self.nest.allows(AllowFlags::REPLICATION) => self.compile_replication()?,
            "defaultproperties" | "cpptext" if self.nest.top_kind() == NestKind::Class => {
                self.compile_text_block(&word)?;
            }
            "ignores" if self.nest.allows(AllowFlags::IGNORES) => self.compile_ignores()?,
            "state" | "auto" if self.nest.allows(AllowFlags::STATE) => self.compile_state(token)?,
            "simulated"
                if self.nest.allows(AllowFlags::STATE) && (next.matches("state") || next.matches("auto")) =>
            {
                self.compile_state(token)?;
            }
            w if FUNCTION_WORDS.contains(&w) && self.nest.allows(AllowFlags::FUNCTION) => {
                self.compile_function(token)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// A `}` closing a function, state or braced control block.
    fn close_brace(&mut self) -> Result<()> {
        let braced = self.nest.top().is_some_and(|nest| nest.braced);
        if !braced || matches!(self.nest.top_kind(), NestKind::None | NestKind::Class) {
            return Err(self.syntax("Unexpected '}'"));
        }
        if self.close_nest()? == NestClose::Popped {
            self.end_statement()?;
        }
        Ok(())
    }

    /// `#exec` lines are skipped; `#error` aborts the class.
    fn compile_directive(&mut self) -> Result<()> {
        let directive = self.get_name("compiler directive")?;
        let start = self.lexer.pos();
        self.lexer.skip_line();
        let rest = self.lexer.slice(start, self.lexer.pos());
        match directive.text.to_ascii_lowercase().as_str() {
            "exec" => Ok(()),
            "error" => Err(self.syntax(format!("#error {}", rest.trim()))),
            _ => Err(self.syntax(format!("Unrecognized compiler directive '{}'", directive.text))),
        }
    }

    /// Skips tokens up to and including the next `;` outside braces.
    pub(crate) fn skip_declaration(&mut self) -> Result<()> {
        let mut depth = 0u32;
        loop {
            let token = self.get_raw()?;
            if token.is_end() {
                return Err(self.syntax("Missing ';' at end of declaration"));
            }
            if token.matches_symbol("{") {
                depth += 1;
            } else if token.matches_symbol("}") {
                depth = depth.saturating_sub(1);
            } else if token.matches_symbol(";") && depth == 0 {
                return Ok(());
            }
        }
    }

    /// Skips a declaration whose body is a `{ }` block, with an optional
    /// trailing `;`.
    pub(crate) fn skip_block_declaration(&mut self) -> Result<()> {
        loop {
            let token = self.get_raw()?;
            if token.is_end() {
                return Err(self.syntax("Missing '{' in declaration"));
            }
            if token.matches_symbol("{") {
                break;
            }
        }
        self.lexer.skip_text_block()?;
        self.match_symbol(";")?;
        Ok(())
    }

    /// `defaultproperties { ... }` and `cpptext { ... }`. The text is kept
    /// for the default property importer and native header export.
    fn compile_text_block(&mut self, word: &str) -> Result<()> {
        self.require_symbol("{", word)?;
        let text = self.lexer.skip_text_block()?;
        if self.pass == Pass::Declare {
            let class = self.class;
            if let Some(def) = self.db.field_mut(class).as_class_mut() {
                if word == "cpptext" {
                    def.cpp_text = text;
                } else {
                    def.default_properties = text;
                }
            }
        }
        Ok(())
    }
}

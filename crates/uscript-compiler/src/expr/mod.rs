//! Expression compiler.
//!
//! Expressions compile straight to bytecode in one left-to-right scan. When a
//! construct turns out to need an opcode in front of code that is already
//! emitted (a cast, an operator call, a context header) the bytes are spliced
//! into the buffer at the recorded start of the operand.
//!
//! [`Compiler::compile_expr`] is the single entry point. It compiles a
//! primary term with its postfix chain, then folds binary operators by
//! precedence climbing, then coerces the result to the type the caller
//! requires.

mod binary;
mod calls;
mod cast;
mod identifiers;
mod literals;
mod member;
mod unary;

pub(crate) use identifiers::FieldContext;

use uscript_core::{CompileError, FieldKind, PropertyFlags, PropertyKind, PropertyType};

use crate::bytecode::{CastEntry, ExprToken};
use crate::compiler::Compiler;
use crate::conversion::implicit_cast;
use crate::expr_info::ExprInfo;
use crate::lexer::{Literal, Token, TokenKind};

type Result<T> = std::result::Result<T, CompileError>;

/// Ceiling that lets every binary operator apply.
pub(crate) const MAX_PRECEDENCE: u32 = u32::MAX;

/// Outcome of [`Compiler::compile_expr`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ExprMatch {
    /// No expression was present.
    Absent,
    /// An expression was compiled but cannot be used as the required type.
    Mismatch(ExprInfo),
    /// The expression has, or was converted to, the required type.
    Matched(ExprInfo),
}

impl ExprMatch {
    pub fn info(self) -> Option<ExprInfo> {
        match self {
            ExprMatch::Absent => None,
            ExprMatch::Mismatch(info) | ExprMatch::Matched(info) => Some(info),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ExprMatch::Absent)
    }
}

impl Compiler<'_, '_> {
    /// Compiles an expression.
    ///
    /// `required` is the type the result must have; `PropertyType::none()`
    /// accepts anything including no expression at all. An `OUT_PARM` flag
    /// on `required` demands an assignable variable. When `tag` is given a
    /// type mismatch is a fatal error naming the tag, otherwise it is
    /// returned as [`ExprMatch::Mismatch`]. Only binary operators whose
    /// precedence is below `max_prec` are folded into the result. `hint`
    /// resolves bare enum tags.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_expr(
        &mut self,
        required: &PropertyType,
        tag: Option<&str>,
        max_prec: u32,
        hint: Option<&PropertyType>,
    ) -> Result<ExprMatch> {
        let start = self.code.len();
        let hint = hint.or((!required.is_none()).then_some(required));
        let mut result = self.compile_primary(required, hint)?;

        loop {
            let token = self.get_raw()?;
            if token.operator_text().is_none() {
                self.unget(&token);
                break;
            }
            let applied = match result {
                None => self.apply_pre_operator(&token, start)?,
                Some(left) => self.apply_operator(&token, left, start, max_prec)?,
            };
            match applied {
                Some(info) => result = Some(info),
                None => {
                    self.unget(&token);
                    break;
                }
            }
        }

        match result {
            None => Ok(ExprMatch::Absent),
            Some(info) => self.coerce_result(info, required, tag, start),
        }
    }

    /// Compiles a required expression of a fixed type.
    pub fn compile_required(&mut self, required: &PropertyType, tag: &str) -> Result<ExprInfo> {
        match self.compile_expr(required, Some(tag), MAX_PRECEDENCE, None)? {
            ExprMatch::Matched(info) | ExprMatch::Mismatch(info) => Ok(info),
            ExprMatch::Absent => Err(self.syntax(format!("Bad or missing expression in {tag}"))),
        }
    }

    /// Compiles any expression, failing if none is present.
    pub fn compile_any(&mut self, tag: &str) -> Result<ExprInfo> {
        self.compile_required(&PropertyType::none(), tag)
    }

    /// Compiles one primary term and its postfix chain. `None` when the next
    /// token does not start an expression; the token is left unread.
    fn compile_primary(&mut self, required: &PropertyType, hint: Option<&PropertyType>) -> Result<Option<ExprInfo>> {
        let start = self.code.len();
        let token = self.get_token(hint, false)?;
        let info = match &token.kind {
            TokenKind::End => return Ok(None),
            TokenKind::Const(Literal::NoObject) if required.kind == PropertyKind::Delegate => {
                let none = self.db.none_name();
                self.code.emit_op(ExprToken::DelegateProperty);
                self.code.emit_name(&none);
                ExprInfo::literal(PropertyType::delegate(required.function))
            }
            TokenKind::Const(literal) => self.emit_constant(literal.clone(), required)?,
            TokenKind::Symbol if token.matches_symbol("(") => {
                let Some(inner) = self
                    .compile_expr(&PropertyType::none(), None, MAX_PRECEDENCE, hint)?
                    .info()
                else {
                    return Err(self.syntax("Bad or missing expression in parenthesis"));
                };
                self.require_symbol(")", "expression")?;
                inner
            }
            TokenKind::Symbol => {
                self.unget(&token);
                return Ok(None);
            }
            TokenKind::Identifier => match self.compile_identifier_primary(&token, required, start)? {
                Some(info) => info,
                None => {
                    self.unget(&token);
                    return Ok(None);
                }
            },
        };
        self.compile_postfix(info, start).map(Some)
    }

    /// Identifier followed by `(` may be a conversion; everything else is a
    /// field access.
    fn compile_identifier_primary(
        &mut self,
        token: &Token,
        required: &PropertyType,
        start: usize,
    ) -> Result<Option<ExprInfo>> {
        if token.matches("class") && self.peek_raw()?.matches_symbol("<") {
            return self.compile_meta_cast(start).map(Some);
        }
        if self.peek_raw()?.matches_symbol("(") {
            if let Some(kind) = PropertyKind::from_keyword(&token.text) {
                return self.compile_primitive_cast(kind, start).map(Some);
            }
            if let Some(class) = self.db.find_class(&token.text) {
                return self.compile_dynamic_cast(class, start).map(Some);
            }
            let found = self
                .db
                .find_name(&token.text)
                .and_then(|name| self.find_field(self.scope(), &name));
            if let Some(id) = found {
                match &self.db.field(id).kind {
                    FieldKind::Enum(_) => return self.compile_enum_cast(id, start).map(Some),
                    FieldKind::Struct(_) if Some(id) == self.db.vector_struct() => {
                        return self.compile_primitive_cast(PropertyKind::Vector, start).map(Some);
                    }
                    FieldKind::Struct(_) if Some(id) == self.db.rotator_struct() => {
                        return self.compile_primitive_cast(PropertyKind::Rotator, start).map(Some);
                    }
                    _ => {}
                }
            }
        }
        self.compile_identifier(token, required)
    }

    /// Checks `info` against `required`, inserting a conversion if one is
    /// allowed.
    fn coerce_result(
        &mut self,
        info: ExprInfo,
        required: &PropertyType,
        tag: Option<&str>,
        start: usize,
    ) -> Result<ExprMatch> {
        if required.is_none() {
            return Ok(ExprMatch::Matched(info));
        }

        if required.flags.contains(PropertyFlags::OUT_PARM) {
            if info.is_assignable() && required.matches_type(&info.ty, false, self.db) {
                return Ok(ExprMatch::Matched(info));
            }
            let Some(tag) = tag else {
                return Ok(ExprMatch::Mismatch(info));
            };
            if info.constant || !info.is_lvalue() {
                return Err(self.semantic(format!(
                    "Type mismatch in {tag}: expecting a variable, not a constant or expression"
                )));
            }
            if !info.is_assignable() {
                return Err(self.semantic(format!("Type mismatch in {tag}: can't modify const variable")));
            }
            return Err(self.mismatch_error(tag, &info.ty, required));
        }

        if required.matches_type(&info.ty, false, self.db) {
            return Ok(ExprMatch::Matched(info));
        }
        if required.array_dim == info.ty.array_dim {
            if let Some(entry) = implicit_cast(required, &info.ty, self.db) {
                self.splice_cast(start, entry);
                let ty = required.without_flags(PropertyFlags::all());
                return Ok(ExprMatch::Matched(ExprInfo { ty, ..info }));
            }
        }
        match tag {
            Some(tag) => Err(self.mismatch_error(tag, &info.ty, required)),
            None => Ok(ExprMatch::Mismatch(info)),
        }
    }

    fn mismatch_error(&self, tag: &str, found: &PropertyType, required: &PropertyType) -> CompileError {
        self.semantic(format!(
            "Type mismatch in {tag}: '{}' is incompatible with '{}'",
            found.describe(self.db),
            required.describe(self.db)
        ))
    }

    /// Inserts a primitive cast in front of the operand starting at `at`.
    pub(crate) fn splice_cast(&mut self, at: usize, entry: CastEntry) {
        self.code
            .insert(at, &[ExprToken::PrimitiveCast.byte(), u8::from(entry.token)]);
    }
}

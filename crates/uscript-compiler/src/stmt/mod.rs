//! Statement compiler.
//!
//! Statements are compiled one at a time by [`Compiler::compile_statement`],
//! driven by the loop in [`Compiler::compile`]. Control constructs push a
//! nest and return; their body statements arrive through later calls, and
//! the nest is closed either by its `}` or, for a single-statement body, as
//! soon as that statement is complete.

mod close;
mod control;

pub(crate) use close::NestClose;

use uscript_core::{CompileError, PropertyFlags, PropertyKind, PropertyType};

use crate::bytecode::ExprToken;
use crate::compiler::{Compiler, Pass};
use crate::expr::{ExprMatch, MAX_PRECEDENCE};
use crate::expr_info::ExprInfo;
use crate::lexer::Token;
use crate::nest::{AllowFlags, FixupKind, NestKind};

type Result<T> = std::result::Result<T, CompileError>;

impl Compiler<'_, '_> {
    /// Compiles one declaration or statement. Returns `false` at the end of
    /// the input.
    pub(crate) fn compile_statement(&mut self) -> Result<bool> {
        let token = self.get_raw()?;
        if token.is_end() {
            return Ok(false);
        }
        if self.compile_declaration(&token)? {
            return Ok(true);
        }

        if self.pass == Pass::Declare {
            if self.nest.top_kind() == NestKind::State {
                self.unget(&token);
                self.skip_state_code()?;
                return Ok(true);
            }
            return Err(self.syntax(format!("Unexpected '{}'", token.describe())));
        }
        let case_label = self.nest.top_kind() == NestKind::Switch
            && (token.matches("case") || (token.matches("default") && self.peek_raw()?.matches_symbol(":")));
        if !case_label && !self.nest.allows(AllowFlags::CMD) {
            if self.nest.top_kind() == NestKind::Switch {
                return Err(self.syntax(format!("Missing 'case' in switch, found '{}'", token.describe())));
            }
            return Err(self.syntax(format!("Unexpected '{}'", token.describe())));
        }

        self.begin_code();
        if self.options.emit_debug_info && !case_label {
            let line = self.line();
            self.code.emit_op(ExprToken::DebugInfo);
            self.code.emit_u16(line as u16);
        }
        self.function.last_returned = false;
        if self.compile_command(&token)? {
            self.end_statement()?;
        }
        self.code.check_size(self.line())?;
        Ok(true)
    }

    /// Code has started in the current function or state: locals and nested
    /// declarations are no longer allowed there.
    fn begin_code(&mut self) {
        if let Some(index) = self.nest.innermost(&[NestKind::Function, NestKind::State]) {
            let nest = self.nest.get_mut(index);
            nest.code_started = true;
            nest.allow.remove(AllowFlags::VAR_DECL | AllowFlags::FUNCTION | AllowFlags::IGNORES);
        }
    }

    /// Closes every single-statement nest whose statement just completed.
    pub(crate) fn end_statement(&mut self) -> Result<()> {
        while self.nest.top().is_some_and(|nest| !nest.braced) {
            if self.close_nest()? == NestClose::Continued {
                break;
            }
        }
        Ok(())
    }

    /// Reads the body opener of a control construct: `{` for a block,
    /// anything else starts a single statement.
    pub(crate) fn open_body(&mut self) -> Result<()> {
        let braced = self.match_symbol("{")?;
        if let Some(nest) = self.nest.top_mut() {
            nest.braced = braced;
        }
        Ok(())
    }

    /// Compiles a command. Returns `true` when a complete statement was
    /// compiled, `false` when the command opened a nest or was a label.
    fn compile_command(&mut self, token: &Token) -> Result<bool> {
        if token.is_identifier() {
            let keyword = token.text.to_ascii_lowercase();
            match keyword.as_str() {
                "if" => return self.compile_if().map(|_| false),
                "while" => return self.compile_while().map(|_| false),
                "do" => return self.compile_do().map(|_| false),
                "for" => return self.compile_for().map(|_| false),
                "foreach" => return self.compile_foreach().map(|_| false),
                "switch" => return self.compile_switch().map(|_| false),
                "case" => return self.compile_case().map(|_| false),
                "default" if self.peek_raw()?.matches_symbol(":") => {
                    return self.compile_default().map(|_| false);
                }
                "break" => return self.compile_break().map(|_| true),
                "continue" => return self.compile_continue().map(|_| true),
                "return" => return self.compile_return().map(|_| true),
                "goto" => return self.compile_goto().map(|_| true),
                "stop" => return self.compile_stop().map(|_| true),
                "assert" => return self.compile_assert().map(|_| true),
                "else" => return Err(self.syntax("'else' without a matching 'if'")),
                _ => {}
            }
            if self.peek_raw()?.matches_symbol(":") {
                self.compile_label(token)?;
                return Ok(false);
            }
        }
        self.unget(token);
        self.compile_expression_statement()?;
        self.require_symbol(";", "statement")?;
        Ok(true)
    }

    /// An assignment or an expression evaluated for its effect, without the
    /// terminating `;`.
    pub(crate) fn compile_expression_statement(&mut self) -> Result<()> {
        let start = self.code.len();
        let info = match self.compile_expr(&PropertyType::none(), None, MAX_PRECEDENCE, None)? {
            ExprMatch::Absent => {
                let found = self.peek_raw()?.describe();
                return Err(self.syntax(format!("Bad or missing statement, found '{found}'")));
            }
            ExprMatch::Matched(info) | ExprMatch::Mismatch(info) => info,
        };

        if self.match_symbol("=")? {
            return self.compile_assignment(info, start);
        }
        if !info.effect {
            return Err(self.semantic("Expression has no effect"));
        }
        if info.ty.kind == PropertyKind::String && info.ty.is_scalar() {
            self.code.insert(start, &[ExprToken::EatString.byte()]);
        }
        Ok(())
    }

    /// `lvalue = expr`, with the left side already emitted at `start`.
    fn compile_assignment(&mut self, target: ExprInfo, start: usize) -> Result<()> {
        if !target.is_lvalue() || target.constant {
            return Err(self.semantic("Can't assign to a constant or an expression"));
        }
        if !target.is_assignable() {
            return Err(self.semantic("Can't assign to a const variable"));
        }
        let op = match target.ty.kind {
            PropertyKind::Bool => ExprToken::LetBool,
            PropertyKind::Delegate => ExprToken::LetDelegate,
            _ => ExprToken::Let,
        };
        self.code.insert(start, &[op.byte()]);
        let required = target.ty.without_flags(PropertyFlags::all());
        self.compile_required(&required, "assignment")?;
        Ok(())
    }

    /// `Name:` inside a function or state.
    fn compile_label(&mut self, token: &Token) -> Result<()> {
        self.require_symbol(":", "label")?;
        if !self.nest.allows(AllowFlags::LABEL) {
            return Err(self.syntax(format!("Label '{}' is not allowed here", token.text)));
        }
        let Some(index) = self.nest.innermost(&[NestKind::Function, NestKind::State]) else {
            return Err(self.syntax(format!("Label '{}' is not allowed here", token.text)));
        };
        let name = self.intern(&token.text);
        let offset = self.code.offset(self.line())?;
        if !self.nest.get_mut(index).define_label(name, offset) {
            return Err(self.semantic(format!("Duplicate label '{}'", token.text)));
        }
        Ok(())
    }

    /// Emits `op` with a u16 placeholder resolved when nest `index` closes.
    pub(crate) fn emit_jump(&mut self, op: ExprToken, kind: FixupKind, index: usize) {
        self.code.emit_op(op);
        let at = self.code.emit_placeholder();
        let line = self.line();
        self.nest.get_mut(index).request(kind, at, None, line);
    }

    /// Index of the top nest.
    pub(crate) fn top_index(&self) -> usize {
        self.nest.len().saturating_sub(1)
    }

    /// Records the current code offset in a fix-up slot of the top nest.
    pub(crate) fn set_fixup_here(&mut self, kind: FixupKind) -> Result<()> {
        let offset = self.code.offset(self.line())?;
        if let Some(nest) = self.nest.top_mut() {
            nest.set_fixup(kind, offset);
        }
        Ok(())
    }

    /// Skips the code of a state during the declaration pass and closes it.
    fn skip_state_code(&mut self) -> Result<()> {
        self.lexer.skip_text_block()?;
        self.close_nest()?;
        Ok(())
    }
}

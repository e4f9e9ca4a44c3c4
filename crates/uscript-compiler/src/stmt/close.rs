//! Closing nests: trailing code, fix-up resolution and storing the bytecode
//! of functions, states and classes.

use uscript_core::PropertyType;

use super::Result;
use crate::bytecode::ExprToken;
use crate::compiler::{Compiler, Pass};
use crate::nest::{AllowFlags, FixupKind, NestKind};

/// Outcome of [`Compiler::close_nest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NestClose {
    /// The nest was popped.
    Popped,
    /// An `else` arm was opened; the `if` nest stays on the stack.
    Continued,
}

impl Compiler<'_, '_> {
    /// Emits the closing code of the top nest and pops it.
    pub(crate) fn close_nest(&mut self) -> Result<NestClose> {
        if self.pass == Pass::Generate {
            match self.nest.top_kind() {
                NestKind::If => {
                    if self.close_if()? == NestClose::Continued {
                        return Ok(NestClose::Continued);
                    }
                }
                NestKind::Loop => self.close_loop()?,
                NestKind::For => self.close_for()?,
                NestKind::ForEach => self.close_foreach()?,
                NestKind::Switch => self.close_switch()?,
                NestKind::Function => self.close_function()?,
                NestKind::State => self.close_state()?,
                NestKind::Class => {}
                NestKind::None => return Err(self.syntax("Unexpected '}' at global scope")),
            }
        }
        self.pop_nest()?;
        Ok(NestClose::Popped)
    }

    /// Closes the class nest at the end of the source.
    pub(crate) fn finish_nest(&mut self) -> Result<()> {
        self.close_nest().map(|_| ())
    }

    /// Resolves pending jumps, restores the enclosing code buffer and stores
    /// finished bytecode on its field.
    fn pop_nest(&mut self) -> Result<()> {
        let line = self.line();
        let mut nest = self.nest.pop(line)?;
        nest.resolve(&mut self.code)?;
        if !nest.kind.owns_code() {
            return Ok(());
        }
        let saved = nest.saved_code.take().unwrap_or_default();
        let code = std::mem::replace(&mut self.code, saved);
        if self.pass == Pass::Generate {
            code.check_size(line)?;
            if let Some(scope) = self.db.field_mut(nest.node).scope_mut() {
                scope.script = code.into_vec();
            }
        }
        Ok(())
    }

    fn close_if(&mut self) -> Result<NestClose> {
        let token = self.get_raw()?;
        if !token.matches("else") {
            self.unget(&token);
            self.patch_if_chain()?;
            self.set_fixup_here(FixupKind::IfEnd)?;
            return Ok(NestClose::Popped);
        }

        if !self.nest.allows(AllowFlags::ELSE_IF) {
            return Err(self.syntax("'else' without a matching 'if'"));
        }
        let index = self.top_index();
        self.emit_jump(ExprToken::Jump, FixupKind::IfEnd, index);
        self.patch_if_chain()?;
        if self.match_identifier("if")? {
            let at = self.compile_condition("'if'")?;
            self.nest.get_mut(index).chain = Some(at);
        } else {
            self.nest.get_mut(index).allow.remove(AllowFlags::ELSE_IF);
        }
        self.open_body()?;
        Ok(NestClose::Continued)
    }

    /// Points the pending false branch of the current `if` arm here.
    fn patch_if_chain(&mut self) -> Result<()> {
        let offset = self.code.offset(self.line())?;
        if let Some(at) = self.nest.top_mut().and_then(|nest| nest.chain.take()) {
            self.code.patch_u16(at, offset);
        }
        Ok(())
    }

    fn close_loop(&mut self) -> Result<()> {
        let index = self.top_index();
        if !self.nest.get(index).do_loop {
            self.emit_jump(ExprToken::Jump, FixupKind::LoopStart, index);
            return self.set_fixup_here(FixupKind::LoopEnd);
        }

        self.set_fixup_here(FixupKind::LoopPostCond)?;
        if self.match_identifier("until")? {
            self.require_symbol("(", "'until'")?;
            self.emit_jump(ExprToken::JumpIfNot, FixupKind::LoopStart, index);
            self.compile_required(&PropertyType::bool(), "'until'")?;
            self.require_symbol(")", "'until'")?;
        } else if self.peek_raw()?.matches("while") {
            return Err(self.syntax("Use 'until' instead of 'while' to end a 'do' loop"));
        } else {
            // A `do` block without a condition loops until a break.
            self.emit_jump(ExprToken::Jump, FixupKind::LoopStart, index);
        }
        self.set_fixup_here(FixupKind::LoopEnd)?;
        self.match_symbol(";")?;
        Ok(())
    }

    fn close_for(&mut self) -> Result<()> {
        let index = self.top_index();
        self.set_fixup_here(FixupKind::ForInc)?;
        let increment: Vec<u8> = self.nest.get(index).for_increment.to_vec();
        self.code.extend(&increment);
        self.emit_jump(ExprToken::Jump, FixupKind::ForStart, index);
        self.set_fixup_here(FixupKind::ForEnd)
    }

    fn close_foreach(&mut self) -> Result<()> {
        self.set_fixup_here(FixupKind::IteratorNext)?;
        self.code.emit_op(ExprToken::IteratorNext);
        self.set_fixup_here(FixupKind::IteratorEnd)?;
        self.code.emit_op(ExprToken::IteratorPop);
        Ok(())
    }

    fn close_switch(&mut self) -> Result<()> {
        if self.nest.allows(AllowFlags::DEFAULT) {
            let offset = self.code.offset(self.line())?;
            if let Some(at) = self.nest.top_mut().and_then(|nest| nest.chain.take()) {
                self.code.patch_u16(at, offset);
            }
            self.code.emit_op(ExprToken::Case);
            self.code.emit_u16(u16::MAX);
        }
        self.set_fixup_here(FixupKind::SwitchEnd)
    }

    fn close_function(&mut self) -> Result<()> {
        let Some(function) = self.nest.top().map(|nest| nest.node) else {
            return Ok(());
        };
        if !self.function.last_returned {
            self.code.emit_op(ExprToken::Return);
            self.code.emit_op(ExprToken::Nothing);
        }

        if self.options.warn_unreferenced_locals {
            let unused: Vec<String> = self
                .function
                .locals
                .iter()
                .filter(|local| !self.function.referenced.contains(*local))
                .map(|&local| self.db.field(local).name.to_string())
                .collect();
            for name in unused {
                self.warn(format!("Unreferenced local variable '{name}'"));
            }
        }

        if self.db.return_param(function).is_some() && !self.function.got_return_value {
            let name = self.db.field(function).name.to_string();
            self.warn(format!("Function '{name}' does not return a value"));
        }
        Ok(())
    }

    fn close_state(&mut self) -> Result<()> {
        let Some(state) = self.nest.top().map(|nest| nest.node) else {
            return Ok(());
        };
        self.code.emit_op(ExprToken::Stop);

        let labels = self.nest.top().map(|nest| nest.labels().to_vec()).unwrap_or_default();
        if labels.is_empty() {
            return Ok(());
        }
        self.code.align(4);
        self.code.emit_op(ExprToken::LabelTable);
        let table = self.code.offset(self.line())?;
        for (name, offset) in &labels {
            self.code.emit_name(name);
            self.code.emit_u32(u32::from(*offset));
        }
        let none = self.db.none_name();
        self.code.emit_name(&none);
        self.code.emit_u32(u32::from(u16::MAX));
        if let Some(def) = self.db.field_mut(state).state_mut() {
            def.label_table_offset = Some(table);
        }
        Ok(())
    }
}

//! Control statements.
//!
//! Jump operands follow their opcode directly and precede any condition
//! expression, so a conditional jump is always emitted as
//! `[JumpIfNot][u16 target][bool expr]`.

use uscript_core::{PropertyFlags, PropertyType};

use super::Result;
use crate::bytecode::ExprToken;
use crate::compiler::Compiler;
use crate::nest::{AllowFlags, FixupKind, NestKind};

impl Compiler<'_, '_> {
    /// `[JumpIfNot][u16][cond]` with the placeholder returned for patching.
    pub(crate) fn emit_condition(&mut self, tag: &str) -> Result<usize> {
        self.code.emit_op(ExprToken::JumpIfNot);
        let at = self.code.emit_placeholder();
        self.compile_required(&PropertyType::bool(), tag)?;
        Ok(at)
    }

    /// A parenthesised condition emitted after a conditional jump.
    pub(crate) fn compile_condition(&mut self, tag: &str) -> Result<usize> {
        self.require_symbol("(", tag)?;
        let at = self.emit_condition(tag)?;
        self.require_symbol(")", tag)?;
        Ok(at)
    }

    pub(super) fn compile_if(&mut self) -> Result<()> {
        let scope = self.scope();
        self.push_nest(NestKind::If, scope)?;
        let at = self.compile_condition("'if'")?;
        if let Some(nest) = self.nest.top_mut() {
            nest.chain = Some(at);
        }
        self.open_body()
    }

    pub(super) fn compile_while(&mut self) -> Result<()> {
        let scope = self.scope();
        self.push_nest(NestKind::Loop, scope)?;
        self.set_fixup_here(FixupKind::LoopStart)?;
        self.require_symbol("(", "'while'")?;
        let index = self.top_index();
        self.emit_jump(ExprToken::JumpIfNot, FixupKind::LoopEnd, index);
        self.compile_required(&PropertyType::bool(), "'while'")?;
        self.require_symbol(")", "'while'")?;
        self.open_body()
    }

    pub(super) fn compile_do(&mut self) -> Result<()> {
        let scope = self.scope();
        self.push_nest(NestKind::Loop, scope)?;
        if let Some(nest) = self.nest.top_mut() {
            nest.do_loop = true;
        }
        self.set_fixup_here(FixupKind::LoopStart)?;
        self.open_body()
    }

    pub(super) fn compile_for(&mut self) -> Result<()> {
        let scope = self.scope();
        self.push_nest(NestKind::For, scope)?;
        let index = self.top_index();
        self.require_symbol("(", "'for'")?;

        self.compile_expression_statement()?;
        self.require_symbol(";", "'for'")?;

        self.set_fixup_here(FixupKind::ForStart)?;
        self.emit_jump(ExprToken::JumpIfNot, FixupKind::ForEnd, index);
        self.compile_required(&PropertyType::bool(), "'for'")?;
        self.require_symbol(";", "'for'")?;

        let start = self.code.len();
        self.compile_expression_statement()?;
        let increment = self.code.drain_from(start);
        self.nest.get_mut(index).for_increment.extend_from_slice(&increment);
        self.require_symbol(")", "'for'")?;
        self.open_body()
    }

    pub(super) fn compile_foreach(&mut self) -> Result<()> {
        let scope = self.scope();
        self.push_nest(NestKind::ForEach, scope)?;
        let index = self.top_index();
        self.nest.get_mut(index).allow |= AllowFlags::ITERATOR;

        self.code.emit_op(ExprToken::Iterator);
        self.compile_any("'foreach'")?;
        if self.nest.get(index).allow.contains(AllowFlags::ITERATOR) {
            return Err(self.semantic("'foreach' requires an iterator function"));
        }
        let at = self.code.emit_placeholder();
        let line = self.line();
        self.nest.get_mut(index).request(FixupKind::IteratorEnd, at, None, line);
        self.open_body()
    }

    pub(super) fn compile_switch(&mut self) -> Result<()> {
        let scope = self.scope();
        self.push_nest(NestKind::Switch, scope)?;
        self.require_symbol("(", "'switch'")?;
        self.code.emit_op(ExprToken::Switch);
        let size_at = self.code.len();
        self.code.emit_u8(0);
        let info = self.compile_any("'switch'")?;
        let size = info.ty.size(self.db).min(u32::from(u8::MAX)) as u8;
        self.code.patch_u8(size_at, size);
        self.require_symbol(")", "'switch'")?;

        if let Some(nest) = self.nest.top_mut() {
            nest.switch_type = info.ty.without_flags(PropertyFlags::all());
        }
        self.require_symbol("{", "'switch'")?;
        Ok(())
    }

    /// Points the last `case` of the switch at the current offset.
    fn patch_case_chain(&mut self) -> Result<()> {
        let offset = self.code.offset(self.line())?;
        if let Some(at) = self.nest.top_mut().and_then(|nest| nest.chain.take()) {
            self.code.patch_u16(at, offset);
        }
        Ok(())
    }

    pub(super) fn compile_case(&mut self) -> Result<()> {
        if !self.nest.allows(AllowFlags::CASE) {
            return Err(self.syntax("Misplaced 'case'"));
        }
        self.patch_case_chain()?;
        self.code.emit_op(ExprToken::Case);
        let at = self.code.emit_placeholder();
        let switch_type = self.nest.top().map(|nest| nest.switch_type).unwrap_or_else(PropertyType::none);
        self.compile_required(&switch_type, "'case'")?;
        self.require_symbol(":", "'case'")?;
        if let Some(nest) = self.nest.top_mut() {
            nest.chain = Some(at);
            nest.allow |= AllowFlags::CMD;
        }
        Ok(())
    }

    pub(super) fn compile_default(&mut self) -> Result<()> {
        if !self.nest.allows(AllowFlags::DEFAULT) {
            return Err(self.syntax("Misplaced 'default'"));
        }
        self.patch_case_chain()?;
        self.code.emit_op(ExprToken::Case);
        self.code.emit_u16(u16::MAX);
        self.require_symbol(":", "'default'")?;
        if let Some(nest) = self.nest.top_mut() {
            nest.allow.remove(AllowFlags::CASE | AllowFlags::DEFAULT);
            nest.allow |= AllowFlags::CMD;
        }
        Ok(())
    }

    pub(super) fn compile_break(&mut self) -> Result<()> {
        if !self.nest.allows(AllowFlags::BREAK) {
            return Err(self.syntax("'break' is not allowed here"));
        }
        let kinds = [NestKind::Loop, NestKind::For, NestKind::ForEach, NestKind::Switch];
        let index = self
            .nest
            .innermost(&kinds)
            .ok_or_else(|| self.internal("'break' without an enclosing loop"))?;
        let target = match self.nest.get(index).kind {
            NestKind::For => FixupKind::ForEnd,
            NestKind::ForEach => FixupKind::IteratorEnd,
            NestKind::Switch => FixupKind::SwitchEnd,
            _ => FixupKind::LoopEnd,
        };
        self.emit_jump(ExprToken::Jump, target, index);
        self.require_symbol(";", "'break'")
    }

    pub(super) fn compile_continue(&mut self) -> Result<()> {
        if !self.nest.allows(AllowFlags::CONTINUE) {
            return Err(self.syntax("'continue' is not allowed here"));
        }
        let kinds = [NestKind::Loop, NestKind::For, NestKind::ForEach];
        let index = self
            .nest
            .innermost(&kinds)
            .ok_or_else(|| self.internal("'continue' without an enclosing loop"))?;
        let nest = self.nest.get(index);
        let target = match nest.kind {
            NestKind::For => FixupKind::ForInc,
            NestKind::ForEach => FixupKind::IteratorNext,
            _ if nest.do_loop => FixupKind::LoopPostCond,
            _ => FixupKind::LoopStart,
        };
        self.emit_jump(ExprToken::Jump, target, index);
        self.require_symbol(";", "'continue'")
    }

    pub(super) fn compile_return(&mut self) -> Result<()> {
        if !self.nest.allows(AllowFlags::RETURN) {
            return Err(self.syntax("'return' is not allowed here"));
        }
        let function = self
            .current_function()
            .ok_or_else(|| self.internal("'return' outside a function"))?;

        // Iterators still running inside the function are popped first.
        let open_iterators = self
            .nest
            .iter()
            .rev()
            .take_while(|nest| nest.kind != NestKind::Function)
            .filter(|nest| nest.kind == NestKind::ForEach)
            .count();
        for _ in 0..open_iterators {
            self.code.emit_op(ExprToken::IteratorPop);
        }

        self.code.emit_op(ExprToken::Return);
        match self.db.return_param(function) {
            Some(param) if !self.peek_raw()?.matches_symbol(";") => {
                let ty = self
                    .db
                    .field(param)
                    .as_property()
                    .map(|p| p.ty.without_flags(PropertyFlags::all()))
                    .ok_or_else(|| self.internal("return value is not a property"))?;
                self.compile_required(&ty, "'return'")?;
                self.function.got_return_value = true;
            }
            _ => self.code.emit_op(ExprToken::Nothing),
        }
        self.require_symbol(";", "'return'")?;
        self.function.last_returned = self.nest.top_kind() == NestKind::Function;
        Ok(())
    }

    pub(super) fn compile_goto(&mut self) -> Result<()> {
        let owner = self
            .nest
            .innermost(&[NestKind::Function, NestKind::State])
            .ok_or_else(|| self.syntax("'goto' is not allowed here"))?;
        // Same rule as labels: never inside an if, loop or switch.
        if !self.nest.allows(AllowFlags::LABEL) {
            return Err(self.syntax("'goto' is not allowed here"));
        }

        if self.nest.get(owner).kind == NestKind::Function {
            let label = self.get_name("'goto' label")?;
            let name = self.intern(&label.text);
            self.code.emit_op(ExprToken::Jump);
            let at = self.code.emit_placeholder();
            let line = self.line();
            self.nest.get_mut(owner).request(FixupKind::Label, at, Some(name), line);
        } else {
            if !self.nest.allows(AllowFlags::LATENT) {
                return Err(self.syntax("'goto' is not allowed here"));
            }
            self.code.emit_op(ExprToken::GotoLabel);
            self.compile_required(&PropertyType::name(), "'goto'")?;
        }
        self.require_symbol(";", "'goto'")
    }

    pub(super) fn compile_stop(&mut self) -> Result<()> {
        if !self.nest.allows(AllowFlags::LATENT) {
            return Err(self.syntax("'stop' is only allowed in state code"));
        }
        self.code.emit_op(ExprToken::Stop);
        self.require_symbol(";", "'stop'")
    }

    pub(super) fn compile_assert(&mut self) -> Result<()> {
        let line = self.line();
        self.code.emit_op(ExprToken::Assert);
        self.code.emit_u16(line as u16);
        self.require_symbol("(", "'assert'")?;
        self.compile_required(&PropertyType::bool(), "'assert'")?;
        self.require_symbol(")", "'assert'")?;
        self.require_symbol(";", "'assert'")
    }
}

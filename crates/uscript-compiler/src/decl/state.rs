//! State declarations and `ignores` lists.

use uscript_core::db::{ScopeData, StateDef};
use uscript_core::{FieldKind, StateFlags};

use super::Result;
use crate::compiler::{Compiler, Pass};
use crate::lexer::Token;
use crate::nest::NestKind;

impl Compiler<'_, '_> {
    /// `[auto] [simulated] state[()] Name [extends Parent] {`
    ///
    /// A state with the name of a state in a parent class overrides it and
    /// inherits its functions and code labels.
    pub(super) fn compile_state(&mut self, first: &Token) -> Result<()> {
        self.unget(first);
        let mut flags = StateFlags::empty();
        loop {
            if self.match_identifier("auto")? {
                flags |= StateFlags::AUTO;
            } else if self.match_identifier("simulated")? {
                flags |= StateFlags::SIMULATED;
            } else {
                break;
            }
        }
        self.require_identifier("state", "state declaration")?;
        if self.match_symbol("(")? {
            self.require_symbol(")", "state declaration")?;
            flags |= StateFlags::EDITABLE;
        }
        let token = self.get_name("state")?;
        let name = self.intern(&token.text);
        let class = self.class;

        if self.pass == Pass::Generate {
            let state = self
                .db
                .find_child(class, &name)
                .filter(|&id| matches!(self.db.field(id).kind, FieldKind::State(_)))
                .ok_or_else(|| self.internal(format!("state '{name}' not found in the generate pass")))?;
            while !self.match_symbol("{")? {
                if self.get_raw()?.is_end() {
                    return Err(self.syntax("Missing '{' in state declaration"));
                }
            }
            return self.push_nest(NestKind::State, state);
        }

        if let Some(existing) = self.db.find_child(class, &name) {
            let kind = self.db.field(existing).kind_name();
            return Err(self.semantic(format!("'{name}' conflicts with previously defined {kind} '{name}'")));
        }

        let inherited = self
            .db
            .super_field(class)
            .and_then(|parent| self.db.find_member(parent, &name))
            .filter(|&id| matches!(self.db.field(id).kind, FieldKind::State(_)));
        let mut super_field = inherited;
        if self.match_identifier("extends")? {
            let parent = self.get_name("state parent")?;
            let found = self
                .db
                .find_name(&parent.text)
                .and_then(|n| self.db.find_child(class, &n))
                .filter(|&id| matches!(self.db.field(id).kind, FieldKind::State(_)));
            let Some(found) = found else {
                return Err(self.semantic(format!("Parent state '{}' not found in this class", parent.text)));
            };
            if inherited.is_some() {
                return Err(self.semantic(format!(
                    "State '{name}' overrides a parent class state and can't also extend '{}'",
                    parent.text
                )));
            }
            super_field = Some(found);
        }

        if flags.contains(StateFlags::AUTO) {
            let other_auto = self.db.children(class).iter().any(|&child| {
                matches!(&self.db.field(child).kind, FieldKind::State(s) if s.flags.contains(StateFlags::AUTO))
            });
            if other_auto {
                return Err(self.semantic("Only one state can be marked 'auto'"));
            }
        }

        self.require_symbol("{", "state declaration")?;
        let mark = self.lexer.mark();
        let def = StateDef {
            scope: ScopeData {
                super_field,
                text_pos: mark.pos,
                line: mark.line,
                ..Default::default()
            },
            flags,
            ..Default::default()
        };
        let state = self.db.create_field(Some(class), name, FieldKind::State(def));
        self.push_nest(NestKind::State, state)
    }

    /// `ignores A, B;` inside a state: the named functions are not
    /// dispatched while the state is active.
    pub(super) fn compile_ignores(&mut self) -> Result<()> {
        if self.pass == Pass::Generate {
            return self.skip_declaration();
        }
        let state = self.scope();
        loop {
            let token = self.get_name("'ignores'")?;
            let found = self
                .db
                .find_name(&token.text)
                .and_then(|n| self.find_field(state, &n))
                .filter(|&id| self.db.field(id).as_function().is_some());
            if found.is_none() {
                return Err(self.semantic(format!("'{}' is not a function", token.text)));
            }
            let name = self.intern(&token.text);
            if let Some(def) = self.db.field_mut(state).state_mut() {
                def.ignored.push(name);
            }
            if !self.match_symbol(",")? {
                break;
            }
        }
        self.require_symbol(";", "'ignores'")
    }
}

//! Name resolution against the scope chain.
//!
//! A lookup starts at the scope code is generated for and walks outward:
//! function, then state and its parent states, then the class and its
//! superclasses. Functions contribute only their own parameters and locals;
//! every other level also sees what its super field declares.

use uscript_core::db::{FieldId, FieldKind};
use uscript_core::{CompileError, FunctionFlags, Name, PropertyFlags};

use crate::compiler::Compiler;

/// Where a name was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved {
    /// Visible from the current scope.
    Scope(FieldId),
    /// Member of the class the current class is declared `within`.
    Outer(FieldId),
}

impl Compiler<'_, '_> {
    /// Scopes searched from `start`, innermost first, without duplicates.
    pub(crate) fn lookup_levels(&self, start: FieldId) -> Vec<FieldId> {
        let mut levels = Vec::new();
        let mut current = Some(start);
        while let Some(level) = current {
            let field = self.db.field(level);
            if matches!(field.kind, FieldKind::Function(_)) {
                levels.push(level);
            } else {
                for scope in self.db.super_chain(level) {
                    if !levels.contains(&scope) {
                        levels.push(scope);
                    }
                }
            }
            current = field.outer;
        }
        levels
    }

    /// Finds `name` walking outward from `start`.
    pub(crate) fn find_field(&self, start: FieldId, name: &Name) -> Option<FieldId> {
        self.lookup_levels(start)
            .into_iter()
            .find_map(|level| self.db.find_child(level, name))
    }

    /// Finds a member of `class` or one of its superclasses.
    pub(crate) fn find_in_class(&self, class: FieldId, name: &Name) -> Option<FieldId> {
        self.db.find_member(class, name)
    }

    /// Resolves an unqualified name, falling back to the `within` class.
    pub(crate) fn resolve_name(&self, start: FieldId, name: &Name) -> Option<Resolved> {
        if let Some(found) = self.find_field(start, name) {
            return Some(Resolved::Scope(found));
        }
        let within = self.db.class_within(self.class)?;
        self.find_in_class(within, name)
            .filter(|&found| {
                matches!(
                    self.db.field(found).kind,
                    FieldKind::Property(_) | FieldKind::Function(_)
                )
            })
            .map(Resolved::Outer)
    }

    /// Fails if `name` is already declared directly in `scope`, warns if an
    /// ancestor of `scope` declares it.
    pub(crate) fn check_declaration(&mut self, scope: FieldId, name: &Name) -> Result<(), CompileError> {
        if let Some(existing) = self.db.find_child(scope, name) {
            let kind = self.db.field(existing).kind_name();
            return Err(self.semantic(format!("'{name}' conflicts with previously defined {kind} '{name}'")));
        }
        self.check_obscures(scope, name);
        Ok(())
    }

    /// Warns when a new field hides a same-named field of a super scope.
    pub(crate) fn check_obscures(&mut self, scope: FieldId, name: &Name) {
        let inherited = self
            .db
            .super_chain(scope)
            .skip(1)
            .find_map(|ancestor| self.db.find_child(ancestor, name));
        if let Some(existing) = inherited {
            let owner = self.db.owner_class(existing);
            let owner = self.db.field(owner).name.clone();
            self.warn(format!("'{name}' obscures '{name}' defined in base class '{owner}'"));
        }
    }

    /// Enforces private and protected visibility of a property or function.
    pub(crate) fn check_access(&self, field: FieldId) -> Result<(), CompileError> {
        let (private, protected) = match &self.db.field(field).kind {
            FieldKind::Property(p) => (
                p.flags().contains(PropertyFlags::PRIVATE),
                p.flags().contains(PropertyFlags::PROTECTED),
            ),
            FieldKind::Function(f) => (
                f.flags.contains(FunctionFlags::PRIVATE),
                f.flags.contains(FunctionFlags::PROTECTED),
            ),
            _ => return Ok(()),
        };
        if !private && !protected {
            return Ok(());
        }
        let owner = self.db.owner_class(field);
        if owner == self.class {
            return Ok(());
        }
        let kind = self.db.field(field).kind_name();
        let name = &self.db.field(field).name;
        let owner_name = &self.db.field(owner).name;
        if private {
            return Err(self.semantic(format!(
                "Can't access private {kind} '{name}' in '{owner_name}' from '{}'",
                self.class_name
            )));
        }
        // Protected members are visible to every subclass, with or without
        // an override of their own.
        if self.db.is_child_of(self.class, owner) {
            return Ok(());
        }
        if self.db.is_child_of(owner, self.class) {
            return Err(self.semantic(format!(
                "Can't access protected {kind} '{name}' declared in subclass '{owner_name}' from '{}'",
                self.class_name
            )));
        }
        Err(self.semantic(format!(
            "Can't access protected {kind} '{name}' in '{owner_name}' from '{}'",
            self.class_name
        )))
    }
}

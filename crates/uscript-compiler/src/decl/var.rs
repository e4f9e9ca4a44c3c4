//! Instance, struct member and local variable declarations.

use uscript_core::db::PropertyDef;
use uscript_core::{FieldId, FieldKind, PropertyFlags};

use super::Result;
use crate::compiler::{Compiler, Pass};

/// `var` qualifiers and the flags they set.
const VAR_QUALIFIERS: &[(&str, PropertyFlags)] = &[
    ("const", PropertyFlags::CONST),
    ("editconst", PropertyFlags::EDIT_CONST),
    ("config", PropertyFlags::CONFIG),
    ("globalconfig", PropertyFlags::GLOBAL_CONFIG.union(PropertyFlags::CONFIG)),
    ("localized", PropertyFlags::LOCALIZED.union(PropertyFlags::CONST)),
    ("transient", PropertyFlags::TRANSIENT),
    ("native", PropertyFlags::NATIVE),
    ("private", PropertyFlags::PRIVATE),
    ("protected", PropertyFlags::PROTECTED),
    ("input", PropertyFlags::INPUT),
    ("travel", PropertyFlags::TRAVEL),
    ("export", PropertyFlags::EXPORT_OBJECT),
    ("noexport", PropertyFlags::NO_EXPORT),
    ("deprecated", PropertyFlags::DEPRECATED),
    ("editinline", PropertyFlags::EDIT_INLINE),
];

impl Compiler<'_, '_> {
    /// `var[(Category)] qualifiers Type Name[, Name...];` at class level.
    pub(super) fn compile_var(&mut self) -> Result<()> {
        if self.pass == Pass::Generate {
            return self.skip_declaration();
        }
        let class = self.class;
        self.compile_var_fields(class)
    }

    /// Declares the properties of one `var` line in `scope`, a class or a
    /// struct. The `var` keyword has been consumed.
    pub(super) fn compile_var_fields(&mut self, scope: FieldId) -> Result<()> {
        let mut flags = PropertyFlags::empty();
        let mut category = self.db.none_name();
        if self.match_symbol("(")? {
            flags |= PropertyFlags::EDIT;
            category = if self.peek_raw()?.matches_symbol(")") {
                self.db.field(scope).name.clone()
            } else {
                let token = self.get_name("editable category")?;
                self.intern(&token.text)
            };
            self.require_symbol(")", "editable category")?;
        }

        'qualifiers: loop {
            let token = self.get_raw()?;
            for &(word, flag) in VAR_QUALIFIERS {
                if token.matches(word) {
                    flags |= flag;
                    continue 'qualifiers;
                }
            }
            self.unget(&token);
            break;
        }
        if flags.contains(PropertyFlags::PRIVATE | PropertyFlags::PROTECTED) {
            return Err(self.semantic("A variable can't be both private and protected"));
        }

        let ty = self.compile_type("variable declaration", true)?.with_flags(flags);
        loop {
            let token = self.get_name("variable declaration")?;
            let name = self.intern(&token.text);
            let dim = self.parse_array_dim(&ty)?;
            self.check_declaration(scope, &name)?;
            let mut property_type = ty;
            if !ty.is_dynamic_array() {
                property_type.array_dim = dim;
            }
            self.db.create_field(
                Some(scope),
                name,
                FieldKind::Property(PropertyDef::new(property_type, category.clone())),
            );
            if !self.match_symbol(",")? {
                break;
            }
        }
        self.require_symbol(";", "variable declaration")
    }

    /// `local Type Name[, Name...];` inside a function body. Locals are laid
    /// out after the parameters as they are declared.
    pub(super) fn compile_local(&mut self) -> Result<()> {
        let Some(function) = self.current_function() else {
            return Err(self.syntax("'local' is only allowed in functions"));
        };
        let ty = self.compile_type("local variable declaration", false)?;
        loop {
            let token = self.get_name("local variable declaration")?;
            let name = self.intern(&token.text);
            let dim = self.parse_array_dim(&ty)?;
            if let Some(existing) = self.db.find_child(function, &name) {
                let kind = self.db.field(existing).kind_name();
                return Err(self.semantic(format!("'{name}' conflicts with previously defined {kind} '{name}'")));
            }

            let mut local_type = ty;
            if !ty.is_dynamic_array() {
                local_type.array_dim = dim;
            }
            let size = local_type.size(self.db);
            let align = local_type.alignment(self.db);
            let frame = self.db.field(function).scope().map_or(0, |s| s.properties_size);
            let offset = frame.next_multiple_of(align);

            let none = self.db.none_name();
            let mut def = PropertyDef::new(local_type, none);
            def.offset = offset;
            let local = self.db.create_field(Some(function), name, FieldKind::Property(def));
            if let Some(scope) = self.db.field_mut(function).scope_mut() {
                scope.properties_size = offset + size;
            }
            self.function.locals.push(local);

            if !self.match_symbol(",")? {
                break;
            }
        }
        self.require_symbol(";", "local variable declaration")
    }
}

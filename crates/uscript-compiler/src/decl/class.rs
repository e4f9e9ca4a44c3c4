//! Class header and replication block.

use uscript_core::{ClassFlags, CompileError, FieldKind, FunctionFlags, Name, PropertyFlags, PropertyType};

use super::Result;
use crate::compiler::{Compiler, Pass};
use crate::nest::NestKind;

/// Class flags a subclass inherits from its parent.
const INHERITED_CLASS_FLAGS: ClassFlags = ClassFlags::TRANSIENT
    .union(ClassFlags::CONFIG)
    .union(ClassFlags::LOCALIZED)
    .union(ClassFlags::PER_OBJECT_CONFIG)
    .union(ClassFlags::PLACEABLE)
    .union(ClassFlags::EDIT_INLINE_NEW)
    .union(ClassFlags::COLLAPSE_CATEGORIES);

impl Compiler<'_, '_> {
    /// `class Name [extends Parent] [within Outer] modifiers... ;`
    pub(super) fn compile_class_header(&mut self) -> Result<()> {
        if self.pass == Pass::Generate {
            self.skip_declaration()?;
            return self.push_nest(NestKind::Class, self.class);
        }

        let name = self.get_name("class")?;
        if !name.text.eq_ignore_ascii_case(&self.class_name) {
            return Err(self.semantic(format!(
                "Script vs. class name mismatch ({} vs. {})",
                self.class_name, name.text
            )));
        }

        let mut parent = None;
        if self.match_identifier("extends")? {
            let parent_name = self.get_name("'extends'")?;
            let Some(id) = self.db.find_class(&parent_name.text) else {
                return Err(self.semantic(format!("Superclass '{}' not found", parent_name.text)));
            };
            if self.db.is_child_of(id, self.class) {
                return Err(self.semantic(format!("Class '{}' can't extend itself", self.class_name)));
            }
            if !self.db.class_flags(id).contains(ClassFlags::PARSED) {
                return Err(CompileError::ParentHasErrors {
                    class: self.class_name.clone(),
                    parent: parent_name.text,
                });
            }
            parent = Some(id);
        } else if self.class != self.db.object_class() {
            return Err(self.syntax(format!("Class '{}' must extend a class", self.class_name)));
        }

        let mut flags = ClassFlags::empty();
        let mut within = None;
        let mut config_name = None;
        if let Some(parent) = parent {
            let def = self.db.field(parent).as_class();
            flags = def.map_or(ClassFlags::empty(), |d| d.flags & INHERITED_CLASS_FLAGS);
            within = def.and_then(|d| d.within);
            config_name = def.and_then(|d| d.config_name.clone());
        }

        if self.match_identifier("within")? {
            let outer = self.get_name("'within'")?;
            let Some(id) = self.db.find_class(&outer.text) else {
                return Err(self.semantic(format!("Within class '{}' not found", outer.text)));
            };
            if let Some(inherited) = within {
                if !self.db.is_child_of(id, inherited) {
                    let inherited = self.db.field(inherited).name.clone();
                    return Err(self.semantic(format!(
                        "Parent class declared within '{inherited}', can't override with '{}'",
                        outer.text
                    )));
                }
            }
            within = Some(id);
        }

        let mut hide_categories = Vec::new();
        let mut dependencies = Vec::new();
        loop {
            let token = self.get_raw()?;
            if token.matches_symbol(";") {
                break;
            }
            if !token.is_identifier() {
                return Err(self.syntax(format!("Missing ';' in class declaration, found '{}'", token.describe())));
            }
            match token.text.to_ascii_lowercase().as_str() {
                "abstract" => flags |= ClassFlags::ABSTRACT,
                "native" => flags |= ClassFlags::NATIVE,
                "nativereplication" => flags |= ClassFlags::NATIVE_REPLICATION,
                "placeable" => flags |= ClassFlags::PLACEABLE,
                "notplaceable" => flags.remove(ClassFlags::PLACEABLE),
                "perobjectconfig" => flags |= ClassFlags::PER_OBJECT_CONFIG,
                "transient" => flags |= ClassFlags::TRANSIENT,
                "nontransient" => flags.remove(ClassFlags::TRANSIENT),
                "localized" => flags |= ClassFlags::LOCALIZED,
                "noexport" => flags |= ClassFlags::NO_EXPORT,
                "editinlinenew" => flags |= ClassFlags::EDIT_INLINE_NEW,
                "noteditinlinenew" => flags.remove(ClassFlags::EDIT_INLINE_NEW),
                "collapsecategories" => flags |= ClassFlags::COLLAPSE_CATEGORIES,
                "dontcollapsecategories" => flags.remove(ClassFlags::COLLAPSE_CATEGORIES),
                "safereplace" => flags |= ClassFlags::SAFE_REPLACE,
                "config" => {
                    flags |= ClassFlags::CONFIG;
                    if self.match_symbol("(")? {
                        let config = self.get_name("'config'")?;
                        config_name = Some(self.intern(&config.text));
                        self.require_symbol(")", "'config'")?;
                    } else if config_name.is_none() {
                        config_name = Some(self.intern("System"));
                    }
                }
                "hidecategories" => hide_categories.extend(self.parse_name_list("'hidecategories'")?),
                "showcategories" => {
                    let shown = self.parse_name_list("'showcategories'")?;
                    hide_categories.retain(|hidden| !shown.contains(hidden));
                }
                "dependson" => dependencies.extend(self.parse_name_list("'dependson'")?),
                _ => {
                    return Err(self.syntax(format!("Class declaration: unknown modifier '{}'", token.text)));
                }
            }
        }

        let class = self.class;
        if let Some(def) = self.db.field_mut(class).as_class_mut() {
            def.state.scope.super_field = parent;
            def.flags = (def.flags & ClassFlags::INTRINSIC) | flags;
            def.within = within;
            def.config_name = config_name;
            def.hide_categories = hide_categories;
            def.dependencies = dependencies;
        }
        log::debug!("declared class {} extends {:?}", self.class_name, parent);
        self.push_nest(NestKind::Class, class)
    }

    /// `(A, B, C)`.
    fn parse_name_list(&mut self, tag: &str) -> Result<Vec<Name>> {
        self.require_symbol("(", tag)?;
        let mut names = Vec::new();
        loop {
            let name = self.get_name(tag)?;
            names.push(self.intern(&name.text));
            if !self.match_symbol(",")? {
                break;
            }
        }
        self.require_symbol(")", tag)?;
        Ok(names)
    }

    /// `replication { [reliable|unreliable] if (cond) A, B; ... }`
    ///
    /// Conditions are compiled into the class script; each replicated
    /// variable or function records the offset of its condition.
    pub(super) fn compile_replication(&mut self) -> Result<()> {
        self.require_symbol("{", "replication definition")?;
        if self.pass == Pass::Declare {
            self.lexer.skip_text_block()?;
            return Ok(());
        }

        while !self.match_symbol("}")? {
            let reliable = if self.match_identifier("reliable")? {
                true
            } else if self.match_identifier("unreliable")? {
                false
            } else {
                let found = self.peek_raw()?.describe();
                return Err(self.syntax(format!("Missing 'reliable' or 'unreliable' in replication definition, found '{found}'")));
            };
            self.require_identifier("if", "replication definition")?;
            self.require_symbol("(", "replication condition")?;
            let offset = self.code.offset(self.line())?;
            self.compile_required(&PropertyType::bool(), "replication condition")?;
            self.require_symbol(")", "replication condition")?;

            loop {
                let token = self.get_name("replicated item")?;
                self.mark_replicated(&token.text, offset, reliable)?;
                if !self.match_symbol(",")? {
                    break;
                }
            }
            self.require_symbol(";", "replication definition")?;
        }
        Ok(())
    }

    fn mark_replicated(&mut self, text: &str, offset: u16, reliable: bool) -> Result<()> {
        let found = self
            .db
            .find_name(text)
            .and_then(|name| self.db.find_child(self.class, &name));
        let Some(field) = found else {
            return Err(self.semantic(format!(
                "'{text}' is not a variable or function declared in class '{}'",
                self.class_name
            )));
        };
        if !matches!(self.db.field(field).kind, FieldKind::Property(_) | FieldKind::Function(_)) {
            return Err(self.semantic(format!("'{text}' is not a variable or function")));
        }
        let already = match &mut self.db.field_mut(field).kind {
            FieldKind::Property(property) => {
                let already = property.rep_offset.is_some();
                property.rep_offset = Some(offset);
                property.ty.flags |= PropertyFlags::NET;
                already
            }
            FieldKind::Function(function) => {
                let already = function.rep_offset.is_some();
                function.rep_offset = Some(offset);
                function.flags |= FunctionFlags::NET;
                if reliable {
                    function.flags |= FunctionFlags::NET_RELIABLE;
                }
                already
            }
            _ => false,
        };
        if already {
            return Err(self.semantic(format!("'{text}' already replicated")));
        }
        Ok(())
    }
}

//! Type expressions and the type-like declarations: enums, structs and
//! named constants.

use uscript_core::db::{ConstDef, EnumDef, ScopeData, StructDef};
use uscript_core::{FieldId, FieldKind, PropertyFlags, PropertyKind, PropertyType, StructFlags};

use super::Result;
use crate::compiler::{Compiler, Pass};
use crate::lexer::Mark;

/// Most tags an enum can hold; tags are stored as bytes.
const MAX_ENUM_TAGS: usize = 255;

impl Compiler<'_, '_> {
    /// Parses a type. With `inline_types`, `enum` and `struct` declarations
    /// may appear in type position.
    pub(super) fn compile_type(&mut self, tag: &str, inline_types: bool) -> Result<PropertyType> {
        let token = self.get_name(tag)?;
        if let Some(kind) = PropertyKind::from_keyword(&token.text) {
            let ty = PropertyType::new(kind);
            if token.matches("button") {
                return Ok(ty.with_flags(PropertyFlags::INPUT));
            }
            return Ok(ty);
        }

        match token.text.to_ascii_lowercase().as_str() {
            "array" => {
                self.require_symbol("<", "'array'")?;
                let element = self.compile_type(tag, inline_types)?;
                if element.is_dynamic_array() {
                    return Err(self.semantic("Arrays within arrays are not supported"));
                }
                if element.kind == PropertyKind::Bool {
                    return Err(self.semantic("Bool arrays are not allowed"));
                }
                self.require_close_angle("'array'")?;
                Ok(PropertyType {
                    array_dim: 0,
                    ..element
                })
            }
            "class" => {
                let mut meta = self.db.object_class();
                if self.match_symbol("<")? {
                    let name = self.get_name("'class' limitor")?;
                    meta = self
                        .db
                        .find_class(&name.text)
                        .ok_or_else(|| self.semantic(format!("Limitor '{}' is not a class name", name.text)))?;
                    self.require_close_angle("'class'")?;
                }
                Ok(PropertyType::class_ref(self.db.class_class(), meta))
            }
            "delegate" => {
                self.require_symbol("<", "'delegate'")?;
                let name = self.get_name("'delegate'")?;
                let function = self
                    .db
                    .find_name(&name.text)
                    .and_then(|n| self.find_field(self.scope(), &n))
                    .filter(|&f| self.db.field(f).as_function().is_some())
                    .ok_or_else(|| self.semantic(format!("Can't find function '{}' for delegate", name.text)))?;
                self.require_close_angle("'delegate'")?;
                Ok(PropertyType::delegate(Some(function)))
            }
            "enum" if inline_types => {
                let id = self.compile_enum_decl()?;
                Ok(PropertyType::byte(Some(id)))
            }
            "struct" if inline_types => {
                let id = self.compile_struct_decl()?;
                Ok(self.struct_type(id))
            }
            _ => self.named_type(&token.text),
        }
    }

    /// An enum, struct or class referred to by name.
    fn named_type(&mut self, text: &str) -> Result<PropertyType> {
        let field = self
            .db
            .find_name(text)
            .and_then(|name| self.find_field(self.scope(), &name));
        if let Some(id) = field {
            match self.db.field(id).kind {
                FieldKind::Enum(_) => return Ok(PropertyType::byte(Some(id))),
                FieldKind::Struct(_) => return Ok(self.struct_type(id)),
                _ => {}
            }
        }
        match self.db.find_class(text) {
            Some(class) => Ok(PropertyType::object(Some(class))),
            None => Err(self.semantic(format!("Unrecognized type '{text}'"))),
        }
    }

    fn struct_type(&self, id: FieldId) -> PropertyType {
        let kind = if Some(id) == self.db.vector_struct() {
            PropertyKind::Vector
        } else if Some(id) == self.db.rotator_struct() {
            PropertyKind::Rotator
        } else {
            PropertyKind::Struct
        };
        PropertyType::structure(kind, id)
    }

    /// Consumes a `>`, splitting `>>` and `>>>` when templates nest.
    fn require_close_angle(&mut self, tag: &str) -> Result<()> {
        let token = self.get_raw()?;
        if token.matches_symbol(">") {
            return Ok(());
        }
        if token.is_symbol() && token.text.starts_with('>') {
            self.lexer.reset(Mark {
                pos: token.start.pos + 1,
                line: token.start.line,
            });
            return Ok(());
        }
        Err(self.syntax(format!("Missing '>' in {tag}, found '{}'", token.describe())))
    }

    /// `[N]` after a variable name. Returns 1 when absent.
    pub(super) fn parse_array_dim(&mut self, ty: &PropertyType) -> Result<u32> {
        if !self.match_symbol("[")? {
            return Ok(1);
        }
        if ty.is_dynamic_array() {
            return Err(self.semantic("Static arrays of dynamic arrays are not allowed"));
        }
        if ty.kind == PropertyKind::Bool {
            return Err(self.semantic("Bool arrays are not allowed"));
        }

        let token = self.peek_raw()?;
        let enum_size = token
            .is_identifier()
            .then(|| self.db.find_name(&token.text))
            .flatten()
            .and_then(|name| self.find_field(self.scope(), &name))
            .and_then(|id| self.db.field(id).as_enum().map(|e| e.tags.len() as i32));
        let dim = match enum_size {
            Some(size) => {
                self.get_raw()?;
                size
            }
            None => self.parse_int_constant("array size")?,
        };
        self.require_symbol("]", "array size")?;
        if dim <= 0 || dim > 2048 {
            return Err(self.semantic(format!("Bad array size {dim}, must be between 1 and 2048")));
        }
        Ok(dim as u32)
    }

    // =========================================================================
    // Enums
    // =========================================================================

    /// `enum E { ... };` at class level.
    pub(super) fn compile_enum_statement(&mut self) -> Result<()> {
        if self.pass == Pass::Generate {
            return self.skip_block_declaration();
        }
        self.compile_enum_decl()?;
        self.match_symbol(";")?;
        Ok(())
    }

    /// `Name { Tag, Tag, ... }`. Enums always belong to the class.
    fn compile_enum_decl(&mut self) -> Result<FieldId> {
        let token = self.get_name("enumeration")?;
        let name = self.intern(&token.text);
        let class = self.class;
        self.check_declaration(class, &name)?;
        self.require_symbol("{", "enumeration")?;

        let mut tags = Vec::new();
        while !self.match_symbol("}")? {
            let tag = self.get_name("enumeration tag")?;
            let tag_name = self.intern(&tag.text);
            if tags.contains(&tag_name) {
                return Err(self.semantic(format!("Duplicate enumeration tag '{}'", tag.text)));
            }
            tags.push(tag_name);
            if tags.len() > MAX_ENUM_TAGS {
                return Err(self.semantic(format!("Exceeded maximum of {MAX_ENUM_TAGS} enumeration tags")));
            }
            if !self.match_symbol(",")? {
                self.require_symbol("}", "enumeration")?;
                break;
            }
        }
        if tags.is_empty() {
            return Err(self.semantic(format!("Enumeration '{}' must contain at least one tag", token.text)));
        }
        Ok(self.db.create_field(Some(class), name, FieldKind::Enum(EnumDef { tags })))
    }

    // =========================================================================
    // Structs
    // =========================================================================

    /// `struct [native] [export] S [extends P] { ... };` at class level.
    pub(super) fn compile_struct_statement(&mut self) -> Result<()> {
        if self.pass == Pass::Generate {
            return self.skip_block_declaration();
        }
        self.compile_struct_decl()?;
        self.match_symbol(";")?;
        Ok(())
    }

    fn compile_struct_decl(&mut self) -> Result<FieldId> {
        let mut flags = StructFlags::empty();
        loop {
            if self.match_identifier("native")? {
                flags |= StructFlags::NATIVE;
            } else if self.match_identifier("export")? {
                flags |= StructFlags::EXPORT;
            } else {
                break;
            }
        }

        let token = self.get_name("struct")?;
        let name = self.intern(&token.text);
        let class = self.class;
        self.check_declaration(class, &name)?;

        let mut super_field = None;
        if self.match_identifier("extends")? {
            let parent = self.get_name("struct parent")?;
            let found = self
                .db
                .find_name(&parent.text)
                .and_then(|n| self.find_field(class, &n))
                .filter(|&id| self.db.field(id).as_struct().is_some());
            let Some(found) = found else {
                return Err(self.semantic(format!("Base struct '{}' not found", parent.text)));
            };
            super_field = Some(found);
        }

        let def = StructDef {
            scope: ScopeData {
                super_field,
                line: self.line(),
                ..Default::default()
            },
            flags,
            ..Default::default()
        };
        let id = self.db.create_field(Some(class), name, FieldKind::Struct(def));
        self.require_symbol("{", "struct")?;

        loop {
            let token = self.get_raw()?;
            if token.is_end() {
                return Err(self.syntax(format!("Unexpected end of script in struct '{}'", self.db.field(id).name)));
            }
            if token.matches_symbol("}") {
                break;
            }
            if token.matches_symbol(";") {
                continue;
            }
            if token.matches("var") {
                self.compile_var_fields(id)?;
            } else if token.matches("structcpptext") || token.matches("cpptext") {
                self.require_symbol("{", "'structcpptext'")?;
                let text = self.lexer.skip_text_block()?;
                if let Some(def) = self.db.field_mut(id).as_struct_mut() {
                    def.cpp_text = text;
                }
            } else if token.matches("structdefaultproperties") {
                self.require_symbol("{", "'structdefaultproperties'")?;
                let text = self.lexer.skip_text_block()?;
                if let Some(def) = self.db.field_mut(id).as_struct_mut() {
                    def.default_properties = text;
                }
            } else {
                return Err(self.syntax(format!("'{}' is not allowed in a struct", token.describe())));
            }
        }
        Ok(id)
    }

    // =========================================================================
    // Constants
    // =========================================================================

    /// `const Name = literal;`. The literal text is stored unparsed and
    /// re-lexed wherever the constant is used.
    pub(super) fn compile_const_decl(&mut self) -> Result<()> {
        if self.pass == Pass::Generate {
            return self.skip_declaration();
        }
        let token = self.get_name("const")?;
        let name = self.intern(&token.text);
        self.require_symbol("=", "const")?;

        let line = self.line();
        let start = self.lexer.pos();
        let end = loop {
            let before = self.lexer.pos();
            let value = self.lexer.get_raw_token(false)?;
            if value.is_end() {
                return Err(self.syntax("Missing ';' in const"));
            }
            if value.matches_symbol(";") {
                break before;
            }
        };
        let value = self.lexer.slice(start, end).trim().to_string();
        if value.is_empty() {
            return Err(self.syntax(format!("Missing value for const '{}'", token.text)));
        }

        let class = self.class;
        self.check_declaration(class, &name)?;
        self.db
            .create_field(Some(class), name, FieldKind::Const(ConstDef { value, line }));
        Ok(())
    }
}

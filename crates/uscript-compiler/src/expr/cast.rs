//! Explicit conversions written as calls: `Int(x)`, `Vector(r)`,
//! `Actor(o)`, `class<Pawn>(c)` and `EEnum(i)`.
//!
//! The operand is compiled first; the conversion opcode is then spliced in
//! front of it.

use uscript_core::{FieldId, PropertyKind, PropertyType};

use super::Result;
use crate::bytecode::{CastToken, ExprToken, get_conversion};
use crate::compiler::Compiler;
use crate::expr_info::ExprInfo;

impl Compiler<'_, '_> {
    /// Compiles `( expr )` for a cast and returns the operand.
    fn cast_operand(&mut self, tag: &str) -> Result<ExprInfo> {
        self.require_symbol("(", tag)?;
        let info = self.compile_any(tag)?;
        self.require_symbol(")", tag)?;
        Ok(info)
    }

    /// `Byte(x)`, `Int(x)`, `String(x)`, `Vector(x)` and the other
    /// primitive conversions.
    pub(super) fn compile_primitive_cast(&mut self, kind: PropertyKind, start: usize) -> Result<ExprInfo> {
        let target = self.kind_type(kind);
        let tag = format!("'{}' conversion", kind.keyword());
        let info = self.cast_operand(&tag)?;
        let source = info.ty.kind;
        if source == kind && info.ty.is_scalar() {
            return Err(self.semantic(format!(
                "No need to cast '{}' to itself",
                info.ty.describe(self.db)
            )));
        }
        let entry = get_conversion(kind, source).filter(|_| info.ty.is_scalar());
        let Some(entry) = entry else {
            return Err(self.semantic(format!(
                "Can't convert '{}' to '{}'",
                info.ty.describe(self.db),
                target.describe(self.db)
            )));
        };
        self.splice_cast(start, entry);
        Ok(ExprInfo::rvalue(target))
    }

    /// `ClassName(expr)` object downcast.
    pub(super) fn compile_dynamic_cast(&mut self, target: FieldId, start: usize) -> Result<ExprInfo> {
        let target_name = self.db.field(target).name.clone();
        let info = self.cast_operand(&format!("cast to '{target_name}'"))?;
        if info.ty.kind != PropertyKind::Object || !info.ty.is_scalar() || info.ty.meta_class.is_some() {
            return Err(self.semantic(format!(
                "Can't cast '{}' to '{target_name}'",
                info.ty.describe(self.db)
            )));
        }
        let source = info.ty.class.unwrap_or(self.db.object_class());
        let result = ExprInfo::rvalue(PropertyType::object(Some(target)));
        if self.db.is_child_of(source, target) {
            return Ok(result);
        }
        if !self.db.is_child_of(target, source) {
            return Err(self.semantic(format!(
                "Cast from '{}' to '{target_name}' will always fail",
                self.db.field(source).name
            )));
        }
        let mut head = vec![ExprToken::DynamicCast.byte()];
        head.extend_from_slice(&target.handle().to_le_bytes());
        self.code.insert(start, &head);
        Ok(result)
    }

    /// `class<Meta>(expr)` downcast of a class reference.
    pub(super) fn compile_meta_cast(&mut self, start: usize) -> Result<ExprInfo> {
        self.require_symbol("<", "metaclass cast")?;
        let meta_token = self.get_name("metaclass")?;
        let Some(meta) = self.db.find_class(&meta_token.text) else {
            return Err(self.semantic(format!("Unknown class '{}'", meta_token.text)));
        };
        self.require_symbol(">", "metaclass cast")?;
        let info = self.cast_operand("metaclass cast")?;
        let Some(source) = info.ty.meta_class else {
            return Err(self.semantic(format!(
                "Can't cast '{}' to 'class<{}>'",
                info.ty.describe(self.db),
                meta_token.text
            )));
        };
        let result = ExprInfo::rvalue(PropertyType::class_ref(self.db.class_class(), meta));
        if self.db.is_child_of(source, meta) {
            return Ok(result);
        }
        if !self.db.is_child_of(meta, source) {
            return Err(self.semantic(format!(
                "Cast from 'class<{}>' to 'class<{}>' will always fail",
                self.db.field(source).name,
                meta_token.text
            )));
        }
        let mut head = vec![ExprToken::MetaCast.byte()];
        head.extend_from_slice(&meta.handle().to_le_bytes());
        self.code.insert(start, &head);
        Ok(result)
    }

    /// `EnumName(expr)` reinterprets an integer or byte as an enum value.
    pub(super) fn compile_enum_cast(&mut self, enum_def: FieldId, start: usize) -> Result<ExprInfo> {
        let name = self.db.field(enum_def).name.clone();
        let info = self.cast_operand(&format!("cast to '{name}'"))?;
        match info.ty.kind {
            PropertyKind::Byte if info.ty.is_scalar() => {}
            PropertyKind::Int if info.ty.is_scalar() => {
                self.code
                    .insert(start, &[ExprToken::PrimitiveCast.byte(), u8::from(CastToken::IntToByte)]);
            }
            _ => {
                return Err(self.semantic(format!(
                    "Can't convert '{}' to '{name}'",
                    info.ty.describe(self.db)
                )));
            }
        }
        Ok(ExprInfo::rvalue(PropertyType::byte(Some(enum_def))))
    }
}

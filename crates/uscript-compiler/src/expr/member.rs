//! Postfix chains: array indexing, dynamic array members, struct members
//! and object context expressions.
//!
//! A context expression `a.b` compiles to
//! `[Context][a][u16 skip][u8 size][b]`. When `a` is `None` at runtime the
//! interpreter skips `skip` bytes and yields `size` zero bytes instead of
//! evaluating `b`.

use uscript_core::{FieldKind, PropertyFlags, PropertyKind, PropertyType};

use super::identifiers::FieldContext;
use super::Result;
use crate::bytecode::ExprToken;
use crate::compiler::Compiler;
use crate::expr_info::ExprInfo;

impl Compiler<'_, '_> {
    /// Applies `.member` and `[index]` suffixes to the value that starts at
    /// `start`.
    pub(super) fn compile_postfix(&mut self, mut info: ExprInfo, start: usize) -> Result<ExprInfo> {
        loop {
            let token = self.get_raw()?;
            let dot = token.matches_symbol(".");
            if dot && info.ty.is_dynamic_array() {
                match self.compile_dynamic_array_member(info, start)? {
                    Some(next) => info = next,
                    None => return Ok(ExprInfo::rvalue(PropertyType::none()).with_effect()),
                }
            } else if token.matches_symbol("[") && !info.ty.is_scalar() {
                info = self.compile_index(info, start)?;
            } else if dot && info.ty.is_scalar() && info.ty.kind.is_struct_like() {
                info = self.compile_struct_member(info, start)?;
            } else if dot && info.ty.is_scalar() && info.ty.kind == PropertyKind::Object {
                info = self.compile_context(info, start)?;
            } else {
                self.unget(&token);
                return Ok(info);
            }
        }
    }

    /// `.Length`, `.Insert(i, n)` or `.Remove(i, n)`. The last two end the
    /// chain and return `None`.
    fn compile_dynamic_array_member(&mut self, info: ExprInfo, start: usize) -> Result<Option<ExprInfo>> {
        let member = self.get_name("dynamic array member")?;
        if member.matches("Length") {
            self.code.insert(start, &[ExprToken::DynArrayLength.byte()]);
            let flags = info.ty.flags & (PropertyFlags::CONST | PropertyFlags::OUT_PARM);
            return Ok(Some(ExprInfo {
                ty: PropertyType::int().with_flags(flags),
                ..info
            }));
        }
        let op = if member.matches("Insert") {
            ExprToken::DynArrayInsert
        } else if member.matches("Remove") {
            ExprToken::DynArrayRemove
        } else {
            return Err(self.semantic(format!("Unknown dynamic array member '{}'", member.text)));
        };
        if !info.is_assignable() {
            return Err(self.semantic(format!("Can't call '{}' on a const array", member.text)));
        }
        self.code.insert(start, &[op.byte()]);
        let tag = format!("'{}'", member.text);
        self.require_symbol("(", &tag)?;
        self.compile_required(&PropertyType::int(), &format!("{tag} index"))?;
        self.require_symbol(",", &tag)?;
        self.compile_required(&PropertyType::int(), &format!("{tag} count"))?;
        self.require_symbol(")", &tag)?;
        Ok(None)
    }

    /// `[index]`: `[ArrayElement|DynArrayElement][index][base]`.
    fn compile_index(&mut self, info: ExprInfo, start: usize) -> Result<ExprInfo> {
        let op = if info.ty.is_dynamic_array() {
            ExprToken::DynArrayElement
        } else {
            ExprToken::ArrayElement
        };
        let base = self.code.drain_from(start);
        self.code.emit_op(op);
        self.compile_required(&PropertyType::int(), "array index")?;
        self.require_symbol("]", "array index")?;
        self.code.extend(&base);
        Ok(ExprInfo {
            ty: info.ty.element(),
            ..info
        })
    }

    /// `.member` of a struct value: `[BoolVariable?][StructMember][member][base]`.
    fn compile_struct_member(&mut self, info: ExprInfo, start: usize) -> Result<ExprInfo> {
        let member = self.get_name("struct member")?;
        let Some(struct_def) = info.ty.struct_def else {
            return Err(self.semantic(format!("Unknown member '{}' of a struct without a definition", member.text)));
        };
        let found = self
            .db
            .find_name(&member.text)
            .and_then(|name| self.db.find_member(struct_def, &name))
            .filter(|&id| matches!(self.db.field(id).kind, FieldKind::Property(_)));
        let Some(property) = found else {
            return Err(self.semantic(format!(
                "Unknown member '{}' in struct '{}'",
                member.text,
                self.db.field(struct_def).name
            )));
        };
        let Some(ty) = self.db.field(property).as_property().map(|p| p.ty) else {
            return Err(self.internal("struct member is not a property"));
        };

        let mut head = Vec::with_capacity(6);
        if ty.kind == PropertyKind::Bool {
            head.push(ExprToken::BoolVariable.byte());
        }
        head.push(ExprToken::StructMember.byte());
        head.extend_from_slice(&property.handle().to_le_bytes());
        self.code.insert(start, &head);

        let flags = (ty.flags & PropertyFlags::CONST)
            | (info.ty.flags & (PropertyFlags::CONST | PropertyFlags::OUT_PARM));
        Ok(ExprInfo {
            ty: ty.without_flags(PropertyFlags::all()).with_flags(flags),
            constant: false,
            const_class: None,
            effect: false,
        })
    }

    /// `object.member`, or `class.default.member`, `class.static.f()` and
    /// `class.const.NAME` on a class reference.
    fn compile_context(&mut self, info: ExprInfo, start: usize) -> Result<ExprInfo> {
        if let Some(meta) = info.ty.meta_class {
            let token = self.get_raw()?;
            if token.matches("const") {
                self.require_symbol(".", "'const.'")?;
                self.code.truncate(start);
                let name = self.get_name("'const.'")?;
                let found = self
                    .db
                    .find_name(&name.text)
                    .and_then(|n| self.find_in_class(meta, &n))
                    .filter(|&id| self.db.field(id).as_const().is_some());
                let Some(id) = found else {
                    return Err(self.semantic(format!(
                        "Unknown constant '{}' in class '{}'",
                        name.text,
                        self.db.field(meta).name
                    )));
                };
                return self.compile_const(id, &PropertyType::none());
            }
            let ctx = if token.matches("default") {
                Some(FieldContext {
                    default: true,
                    ..FieldContext::member(meta)
                })
            } else if token.matches("static") {
                Some(FieldContext {
                    static_only: true,
                    ..FieldContext::member(meta)
                })
            } else {
                self.unget(&token);
                None
            };
            if let Some(ctx) = ctx {
                self.require_symbol(".", &format!("'{}.'", token.text))?;
                return self.compile_member(start, ExprToken::ClassContext, ctx);
            }
        }
        let class = info.ty.class.unwrap_or(self.db.object_class());
        self.compile_member(start, ExprToken::Context, FieldContext::member(class))
    }

    fn compile_member(&mut self, start: usize, op: ExprToken, ctx: FieldContext) -> Result<ExprInfo> {
        self.code.insert(start, &[op.byte()]);
        let skip_at = self.code.emit_placeholder();
        self.code.emit_u8(0);
        let member_start = self.code.len();

        let token = self.get_name("member access")?;
        let Some(member) = self.compile_field(&token, &PropertyType::none(), ctx)? else {
            return Err(self.semantic(format!("'{}' is not a member", token.text)));
        };

        let skip = self.code.len() - member_start;
        self.code.patch_u16(skip_at, skip as u16);
        let size = self.context_size(&token.text, &member.ty)?;
        self.code.patch_u8(skip_at + 2, size);
        Ok(member)
    }

    /// Size byte of a context header: the number of zero bytes yielded when
    /// the context object is `None`.
    pub(super) fn context_size(&self, member: &str, ty: &PropertyType) -> Result<u8> {
        let size = ty.size(self.db);
        u8::try_from(size).map_err(|_| {
            self.semantic(format!(
                "'{member}' is too large to access through an object ({size} bytes, at most 255)"
            ))
        })
    }
}

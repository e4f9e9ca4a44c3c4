//! Identifier expressions: `self`, `new`, and resolution of names to
//! enums, constants, properties and functions, including the `default.`,
//! `static.`, `const.`, `global.` and `super.` prefixes.

use uscript_core::{FieldId, FieldKind, FunctionFlags, PropertyFlags, PropertyKind, PropertyType};

use super::{MAX_PRECEDENCE, Result};
use crate::bytecode::ExprToken;
use crate::compiler::Compiler;
use crate::expr_info::ExprInfo;
use crate::lexer::Token;
use crate::resolve::Resolved;

/// How a name is looked up and how a call through it is bound.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FieldContext {
    /// Look the name up as a member of this class, after `expr.`.
    pub member_of: Option<FieldId>,
    /// Start an unqualified lookup here instead of the current scope.
    pub scope: Option<FieldId>,
    /// Address the class default value instead of the instance.
    pub default: bool,
    /// Only static functions may be called.
    pub static_only: bool,
    pub force_final: bool,
    pub force_global: bool,
    /// A specifier prefix was consumed, so the name must resolve.
    pub prefixed: bool,
}

impl FieldContext {
    pub fn member(class: FieldId) -> Self {
        Self {
            member_of: Some(class),
            prefixed: true,
            ..Self::default()
        }
    }
}

impl Compiler<'_, '_> {
    /// Compiles an expression that starts with an identifier. Returns `None`
    /// when the identifier does not start an expression.
    pub(super) fn compile_identifier(&mut self, token: &Token, required: &PropertyType) -> Result<Option<ExprInfo>> {
        if token.matches("self") {
            if !self.has_instance_context() {
                return Err(self.semantic("Can't use 'self' in a static function"));
            }
            self.code.emit_op(ExprToken::SelfRef);
            return Ok(Some(ExprInfo::rvalue(PropertyType::object(Some(self.class)))));
        }
        if token.matches("new") {
            return self.compile_new().map(Some);
        }
        let mut ctx = FieldContext::default();
        let name_token = self.compile_prefix(token, &mut ctx)?;
        self.compile_field(&name_token, required, ctx)
    }

    /// Consumes a specifier prefix, filling in `ctx`, and returns the token
    /// naming the field.
    fn compile_prefix(&mut self, token: &Token, ctx: &mut FieldContext) -> Result<Token> {
        let word = token.text.to_ascii_lowercase();
        match word.as_str() {
            "default" | "static" | "const" | "global" if self.match_symbol(".")? => {
                ctx.prefixed = true;
                match word.as_str() {
                    "default" => {
                        ctx.default = true;
                        ctx.scope = Some(self.class);
                    }
                    "static" => ctx.static_only = true,
                    "global" => {
                        if !self.has_instance_context() {
                            return Err(self.semantic("Can't use 'global' in a static function"));
                        }
                        ctx.force_global = true;
                        ctx.scope = Some(self.class);
                    }
                    _ => {}
                }
                self.get_name(&format!("'{word}.'"))
            }
            "super" if self.peek_raw()?.matches_symbol("(") => {
                self.match_symbol("(")?;
                let class_token = self.get_name("'super('")?;
                self.require_symbol(")", "'super('")?;
                self.require_symbol(".", "'super(..)'")?;
                let ancestor = self
                    .db
                    .find_class(&class_token.text)
                    .filter(|&c| c != self.class && self.db.is_child_of(self.class, c));
                let Some(ancestor) = ancestor else {
                    return Err(self.semantic(format!(
                        "'{}' is not a superclass of '{}'",
                        class_token.text, self.class_name
                    )));
                };
                ctx.scope = Some(ancestor);
                ctx.force_final = true;
                ctx.prefixed = true;
                self.get_name("'super(..).'")
            }
            "super" if self.match_symbol(".")? => {
                let Some(scope) = self.super_scope() else {
                    return Err(self.semantic("'super' has no meaning here"));
                };
                ctx.scope = Some(scope);
                ctx.force_final = true;
                ctx.prefixed = true;
                self.get_name("'super.'")
            }
            _ => Ok(token.clone()),
        }
    }

    /// Scope `super.` searches: one level above the structural parent of the
    /// code being compiled.
    fn super_scope(&self) -> Option<FieldId> {
        let owner = match self.current_function() {
            Some(function) => self.db.field(function).outer?,
            None => self.scope(),
        };
        match self.db.super_field(owner) {
            Some(parent) => Some(parent),
            None if !self.is_class(owner) => Some(self.db.owner_class(owner)),
            None => None,
        }
    }

    /// Resolves a name and compiles the access it denotes.
    pub(crate) fn compile_field(
        &mut self,
        token: &Token,
        required: &PropertyType,
        ctx: FieldContext,
    ) -> Result<Option<ExprInfo>> {
        let resolved = self.db.find_name(&token.text).and_then(|name| {
            if let Some(class) = ctx.member_of {
                self.find_in_class(class, &name).map(Resolved::Scope)
            } else if let Some(scope) = ctx.scope {
                self.find_field(scope, &name).map(Resolved::Scope)
            } else {
                self.resolve_name(self.scope(), &name)
            }
        });
        let Some(resolved) = resolved else {
            if ctx.prefixed {
                return Err(self.semantic(format!("Unknown member '{}'", token.text)));
            }
            return Ok(None);
        };

        let (field, outer_at) = match resolved {
            Resolved::Scope(field) => (field, None),
            Resolved::Outer(field) => {
                if !self.has_instance_context() {
                    return Err(self.semantic(format!(
                        "Can't access '{}' of the outer object from a static function",
                        token.text
                    )));
                }
                let start = self.code.len();
                self.code.emit_op(ExprToken::Context);
                self.code.emit_op(ExprToken::SelfOuter);
                let at = self.code.emit_placeholder();
                self.code.emit_u8(0);
                (field, Some((start, at)))
            }
        };
        let mut ctx = ctx;
        if outer_at.is_some() {
            ctx.member_of = self.db.class_within(self.class);
        }

        let info = match &self.db.field(field).kind {
            FieldKind::Enum(_) => self.compile_enum_tag(field)?,
            FieldKind::Const(_) => Some(self.compile_const(field, required)?),
            FieldKind::Property(_) => Some(self.compile_property(field, &ctx)?),
            FieldKind::Function(def) => {
                let delegate = def.flags.contains(FunctionFlags::DELEGATE);
                if self.match_symbol("(")? {
                    Some(self.compile_call(field, &ctx)?)
                } else if required.kind == PropertyKind::Delegate && !delegate {
                    Some(self.compile_delegate_reference(field, required)?)
                } else if let Some(property) = delegate.then(|| self.delegate_property(field)).flatten() {
                    Some(self.compile_property(property, &ctx)?)
                } else {
                    return Err(self.syntax(format!("Missing '(' in call to '{}'", token.text)));
                }
            }
            FieldKind::Struct(_) | FieldKind::State(_) | FieldKind::Class(_) => None,
        };

        match (info, outer_at) {
            (None, Some((start, _))) => {
                self.code.truncate(start);
                if ctx.prefixed {
                    return Err(self.semantic(format!("'{}' is not a value", token.text)));
                }
                Ok(None)
            }
            (None, None) if ctx.prefixed => Err(self.semantic(format!("'{}' is not a value", token.text))),
            (Some(info), Some((_, at))) => {
                let skip = self.code.len() - (at + 3);
                self.code.patch_u16(at, skip as u16);
                let size = self.context_size(&token.text, &info.ty)?;
                self.code.patch_u8(at + 2, size);
                Ok(Some(info))
            }
            (info, None) => Ok(info),
        }
    }

    /// `Enum.Tag` or `Enum.EnumCount`. A bare enum name is a type, not a
    /// value.
    fn compile_enum_tag(&mut self, enum_def: FieldId) -> Result<Option<ExprInfo>> {
        if !self.match_symbol(".")? {
            return Ok(None);
        }
        let tag = self.get_name("enum tag")?;
        let Some(def) = self.db.field(enum_def).as_enum() else {
            return Err(self.internal("enum lookup returned a non-enum field"));
        };
        let value = if tag.matches("EnumCount") {
            Some(def.tags.len() as u8)
        } else {
            self.db.find_name(&tag.text).and_then(|name| def.tag_index(&name))
        };
        let Some(value) = value else {
            return Err(self.semantic(format!(
                "'{}' is not a member of enum '{}'",
                tag.text,
                self.db.field(enum_def).name
            )));
        };
        self.code.emit_op(ExprToken::ByteConst);
        self.code.emit_u8(value);
        Ok(Some(ExprInfo::literal(PropertyType::byte(Some(enum_def)))))
    }

    /// Emits a variable access.
    pub(crate) fn compile_property(&mut self, property: FieldId, ctx: &FieldContext) -> Result<ExprInfo> {
        self.check_access(property)?;
        let field = self.db.field(property);
        let name = field.name.clone();
        let Some(mut ty) = field.as_property().map(|p| p.ty) else {
            return Err(self.internal("property lookup returned a non-property field"));
        };
        let owner = field.outer;
        let local = owner.is_some_and(|o| self.db.field(o).as_function().is_some());

        let op = if ctx.default {
            if local {
                return Err(self.semantic(format!("You can't access the default value of local variable '{name}'")));
            }
            ExprToken::DefaultVariable
        } else if local {
            self.function.referenced.insert(property);
            ExprToken::LocalVariable
        } else {
            if ctx.member_of.is_none() && !self.has_instance_context() {
                return Err(self.semantic(format!("Can't access instance variable '{name}' in a static function")));
            }
            ExprToken::InstanceVariable
        };

        if ty.kind == PropertyKind::Bool {
            self.code.emit_op(ExprToken::BoolVariable);
        }
        self.code.emit_op(op);
        self.code.emit_field(property);

        if ty.flags.contains(PropertyFlags::DEPRECATED) {
            self.warn(format!("'{name}' is deprecated"));
        }

        if owner == Some(self.db.object_class()) {
            let lookup = ctx.member_of.unwrap_or(self.class);
            if name.matches("Class") {
                let flags = ty.flags;
                ty = PropertyType::class_ref(self.db.class_class(), lookup).with_flags(flags);
            } else if name.matches("Outer") {
                ty.class = Some(self.db.class_within(lookup).unwrap_or(self.db.object_class()));
            }
        }

        ty.flags &= PropertyFlags::CONST;
        Ok(ExprInfo::variable(ty))
    }

    /// `new [(outer [, name [, flags]])] ClassExpr [()]`.
    fn compile_new(&mut self) -> Result<ExprInfo> {
        self.code.emit_op(ExprToken::New);
        let outer = PropertyType::object(Some(self.db.object_class()));
        let slots = [
            (outer, "'new' outer"),
            (PropertyType::string(), "'new' name"),
            (PropertyType::int(), "'new' flags"),
        ];
        let mut given = 0;
        if self.match_symbol("(")? {
            while !self.match_symbol(")")? {
                let Some((ty, tag)) = slots.get(given) else {
                    return Err(self.syntax("Too many parameters to 'new'"));
                };
                if self.peek_raw()?.matches_symbol(",") {
                    self.code.emit_op(ExprToken::Nothing);
                } else {
                    self.compile_required(ty, tag)?;
                }
                given += 1;
                if !self.match_symbol(",")? {
                    self.require_symbol(")", "'new'")?;
                    break;
                }
            }
        }
        for _ in given..slots.len() {
            self.code.emit_op(ExprToken::Nothing);
        }

        let class_type = PropertyType::class_ref(self.db.class_class(), self.db.object_class());
        let class = match self.compile_expr(&class_type, Some("'new' class"), MAX_PRECEDENCE, None)?.info() {
            Some(info) => info.const_class.or(info.ty.meta_class),
            None => return Err(self.syntax("Missing class expression after 'new'")),
        };

        if self.match_symbol("(")? {
            self.require_symbol(")", "'new' parameters")?;
        }
        Ok(ExprInfo::rvalue(PropertyType::object(class)).with_effect())
    }
}

//! Function calls and delegate references.
//!
//! A call is encoded as a dispatch header, the arguments in declaration
//! order, and `EndFunctionParms`. The header shape depends on how the call
//! is bound:
//!
//! | binding                  | header                                        |
//! |--------------------------|-----------------------------------------------|
//! | final, native id         | native id (1 or 2 bytes)                      |
//! | final                    | `FinalFunction` + function                    |
//! | `global.`                | `GlobalFunction` + name                       |
//! | delegate                 | `DelegateFunction` + is-local + property + name |
//! | virtual                  | `VirtualFunction` + via-super + name          |

use uscript_core::{FieldId, FunctionFlags, Name, PropertyFlags, PropertyKind, PropertyType};

use super::identifiers::FieldContext;
use super::{ExprMatch, MAX_PRECEDENCE, Result};
use crate::bytecode::ExprToken;
use crate::compiler::Compiler;
use crate::expr_info::ExprInfo;
use crate::nest::AllowFlags;

impl Compiler<'_, '_> {
    /// Friendly name of a function, falling back to its field name.
    pub(crate) fn function_name(&self, function: FieldId) -> Name {
        let field = self.db.field(function);
        field
            .as_function()
            .and_then(|f| f.friendly_name.clone())
            .unwrap_or_else(|| field.name.clone())
    }

    /// Statically bound call header.
    ///
    /// A function with a native id is called through it even when only a
    /// `super.` prefix forced the static binding.
    pub(crate) fn emit_final_call(&mut self, function: FieldId) {
        let native = self.db.field(function).as_function().map_or(0, |f| f.native);
        if native != 0 {
            self.code.emit_native_call(native);
        } else {
            self.code.emit_op(ExprToken::FinalFunction);
            self.code.emit_field(function);
        }
    }

    fn emit_call_head(&mut self, function: FieldId, ctx: &FieldContext) -> Result<()> {
        let flags = self
            .db
            .field(function)
            .as_function()
            .map_or(FunctionFlags::empty(), |f| f.flags);
        let name = self.function_name(function);

        if flags.contains(FunctionFlags::FINAL) || ctx.force_final {
            self.emit_final_call(function);
        } else if ctx.force_global {
            self.code.emit_op(ExprToken::GlobalFunction);
            self.code.emit_name(&name);
        } else if flags.contains(FunctionFlags::DELEGATE) {
            let Some(property) = self.delegate_property(function) else {
                return Err(self.internal(format!("delegate '{name}' has no backing property")));
            };
            let is_local = self
                .db
                .field(property)
                .outer
                .is_some_and(|outer| self.db.field(outer).as_function().is_some());
            self.code.emit_op(ExprToken::DelegateFunction);
            self.code.emit_u8(u8::from(is_local));
            self.code.emit_field(property);
            self.code.emit_name(&name);
        } else {
            self.code.emit_op(ExprToken::VirtualFunction);
            self.code.emit_u8(0);
            self.code.emit_name(&name);
        }
        Ok(())
    }

    /// The `__Name__Delegate` property backing a delegate function.
    pub(crate) fn delegate_property(&self, function: FieldId) -> Option<FieldId> {
        let field = self.db.field(function);
        let name = self.db.find_name(&format!("__{}__Delegate", field.name))?;
        self.db.find_member(field.outer?, &name)
    }

    /// Compiles a call after its opening parenthesis.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn compile_call(&mut self, function: FieldId, ctx: &FieldContext) -> Result<ExprInfo> {
        self.check_access(function)?;
        let name = self.function_name(function);
        let flags = self
            .db
            .field(function)
            .as_function()
            .map_or(FunctionFlags::empty(), |f| f.flags);

        if flags.contains(FunctionFlags::LATENT) && !self.nest.allows(AllowFlags::LATENT) {
            return Err(self.semantic(format!("Can't call latent function '{name}' here")));
        }
        if flags.contains(FunctionFlags::ITERATOR) {
            if !self.nest.allows(AllowFlags::ITERATOR) {
                return Err(self.semantic(format!(
                    "Iterator function '{name}' can only be called from a 'foreach' statement"
                )));
            }
            if let Some(nest) = self.nest.top_mut() {
                nest.allow.remove(AllowFlags::ITERATOR);
            }
        }
        let is_static = flags.contains(FunctionFlags::STATIC);
        if ctx.static_only && !is_static {
            return Err(self.semantic(format!("'{name}' is not a static function")));
        }
        if !is_static && ctx.member_of.is_none() && !self.has_instance_context() {
            return Err(self.semantic(format!("Can't call instance function '{name}' from a static function")));
        }

        self.emit_call_head(function, ctx)?;
        let first_class = self.compile_arguments(function, &name, flags)?;
        self.code.emit_op(ExprToken::EndFunctionParms);

        let mut result = self.result_type(function);
        if name.matches("Spawn") && result.kind == PropertyKind::Object {
            if let Some(class) = first_class {
                result.class = Some(class);
            }
        }
        Ok(ExprInfo::rvalue(result).with_effect())
    }

    /// Compiles the argument list up to and including `)`. Returns the
    /// constant class passed as the first argument, if any.
    fn compile_arguments(&mut self, function: FieldId, name: &Name, flags: FunctionFlags) -> Result<Option<FieldId>> {
        let params: Vec<(Name, PropertyType)> = self
            .db
            .parameters(function)
            .filter_map(|p| {
                let field = self.db.field(p);
                field.as_property().map(|def| (field.name.clone(), def.ty))
            })
            .collect();

        let mut first_class = None;
        let mut closed = self.match_symbol(")")?;
        for (index, (param_name, param)) in params.iter().enumerate() {
            let optional = param.flags.contains(PropertyFlags::OPTIONAL_PARM);
            if closed {
                if !optional {
                    return Err(self.semantic(format!(
                        "Call to '{name}': missing parameter '{param_name}'"
                    )));
                }
                self.code.emit_op(ExprToken::Nothing);
                continue;
            }

            let mut expected = *param;
            if index == 1 && flags.contains(FunctionFlags::ITERATOR) && expected.kind == PropertyKind::Object {
                let first_is_meta = params[0].1.meta_class.is_some();
                if let (true, Some(class)) = (first_is_meta, first_class) {
                    expected.class = Some(class);
                }
            }

            let tag = format!("parameter '{param_name}' of call to '{name}'");
            let next = self.peek_raw()?;
            let info = if next.matches_symbol(",") || next.matches_symbol(")") {
                None
            } else {
                match self.compile_expr(&expected, Some(&tag), MAX_PRECEDENCE, Some(&expected))? {
                    ExprMatch::Absent => None,
                    ExprMatch::Matched(info) | ExprMatch::Mismatch(info) => Some(info),
                }
            };
            match info {
                Some(info) => {
                    if index == 0 {
                        first_class = info.const_class;
                    }
                }
                None if optional => self.code.emit_op(ExprToken::Nothing),
                None => {
                    return Err(self.syntax(format!("Call to '{name}': bad or missing parameter '{param_name}'")));
                }
            }

            if self.match_symbol(",")? {
                if index + 1 == params.len() {
                    return Err(self.syntax(format!("Call to '{name}': too many parameters")));
                }
            } else {
                self.require_symbol(")", &format!("call to '{name}'"))?;
                closed = true;
            }
        }
        if !closed {
            self.require_symbol(")", &format!("call to '{name}'"))?;
        }
        Ok(first_class)
    }

    /// A bare function name used where a delegate value is required.
    pub(crate) fn compile_delegate_reference(
        &mut self,
        function: FieldId,
        required: &PropertyType,
    ) -> Result<ExprInfo> {
        let name = self.function_name(function);
        if let Some(signature) = required.function {
            let ours = self.param_types(function);
            let theirs = self.param_types(signature);
            let same_return = self.db.return_param(function).is_some() == self.db.return_param(signature).is_some();
            let same_params = ours.len() == theirs.len()
                && ours
                    .iter()
                    .zip(&theirs)
                    .all(|(a, b)| b.matches_type(a, true, self.db));
            if !same_return || !same_params {
                return Err(self.semantic(format!(
                    "Function '{name}' does not match the signature of delegate '{}'",
                    self.db.field(signature).name
                )));
            }
        }
        self.code.emit_op(ExprToken::DelegateProperty);
        self.code.emit_name(&name);
        Ok(ExprInfo::rvalue(PropertyType::delegate(required.function.or(Some(function)))))
    }
}

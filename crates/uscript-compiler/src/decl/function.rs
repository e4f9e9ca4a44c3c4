//! Function, event, delegate and operator declarations.

use uscript_core::db::{FunctionDef, PropertyDef, ScopeData};
use uscript_core::{FieldId, FieldKind, FunctionFlags, Name, PropertyFlags, PropertyType};

use super::Result;
use crate::bytecode::{EX_FIRST_NATIVE, EX_MAX_NATIVE};
use crate::compiler::{Compiler, Pass};
use crate::lexer::{Mark, Token};
use crate::nest::NestKind;

/// Specifiers that must agree between a function and the one it overrides.
const OVERRIDE_MATCH: FunctionFlags = FunctionFlags::LATENT
    .union(FunctionFlags::ITERATOR)
    .union(FunctionFlags::PRE_OPERATOR)
    .union(FunctionFlags::OPERATOR)
    .union(FunctionFlags::STATIC)
    .union(FunctionFlags::DELEGATE);

/// Specifiers an override inherits.
const OVERRIDE_INHERIT: FunctionFlags = FunctionFlags::EXEC.union(FunctionFlags::EVENT);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Binary,
    Pre,
    Post,
}

#[derive(Debug, Default)]
struct Specifiers {
    flags: FunctionFlags,
    native: u16,
    precedence: u8,
    operator: Option<Operator>,
}

impl Compiler<'_, '_> {
    /// A function declaration starting at `first`.
    ///
    /// The declare pass creates the function and skips its body. The
    /// generate pass finds the function by the offset of `first` and
    /// compiles the body.
    pub(super) fn compile_function(&mut self, first: &Token) -> Result<()> {
        let decl_pos = first.start.pos;
        if self.pass == Pass::Generate {
            return self.enter_function_body(decl_pos);
        }
        self.unget(first);

        let specifiers = self.parse_function_specifiers()?;
        let scope = self.scope();

        let lead = self.get_raw()?;
        let (return_type, name_token) = if self.peek_raw()?.matches_symbol("(") {
            (None, lead)
        } else {
            self.unget(&lead);
            let ty = self.compile_type("function return type", false)?;
            (Some(ty), self.get_raw()?)
        };
        let valid_name = match specifiers.operator {
            Some(_) => name_token.operator_text().is_some(),
            None => name_token.is_identifier(),
        };
        if !valid_name {
            return Err(self.syntax(format!("Bad function name '{}'", name_token.describe())));
        }
        let friendly = self.intern(&name_token.text);
        if specifiers.operator.is_none() {
            if let Some(existing) = self.db.find_child(scope, &friendly) {
                let kind = self.db.field(existing).kind_name();
                return Err(self.semantic(format!("'{friendly}' conflicts with previously defined {kind} '{friendly}'")));
            }
        }

        let def = FunctionDef {
            scope: ScopeData {
                line: self.line(),
                ..Default::default()
            },
            flags: specifiers.flags,
            native: specifiers.native,
            precedence: specifiers.precedence,
            friendly_name: Some(friendly.clone()),
            decl_pos,
            ..Default::default()
        };
        let function = self.db.create_field(Some(scope), friendly.clone(), FieldKind::Function(def));

        self.require_symbol("(", "function declaration")?;
        if !self.match_symbol(")")? {
            loop {
                self.compile_parameter(function, specifiers.operator.is_some())?;
                if !self.match_symbol(",")? {
                    break;
                }
            }
            self.require_symbol(")", "function declaration")?;
        }
        if let Some(ty) = return_type {
            let name = self.intern("ReturnValue");
            let none = self.db.none_name();
            let ty = ty.with_flags(PropertyFlags::PARM | PropertyFlags::RETURN_PARM);
            self.db
                .create_field(Some(function), name, FieldKind::Property(PropertyDef::new(ty, none)));
        }

        if let Some(operator) = specifiers.operator {
            self.check_operator(function, operator, &friendly)?;
        }
        if self.match_identifier("const")? {
            self.function_flags_mut(function, |flags| *flags |= FunctionFlags::CONST);
        }

        let token = self.get_raw()?;
        if token.matches_symbol("{") {
            if specifiers.flags.contains(FunctionFlags::NATIVE) {
                return Err(self.semantic(format!("Native function '{friendly}' can't have a body")));
            }
            let mark = self.lexer.mark();
            if let Some(def) = self.db.field_mut(function).as_function_mut() {
                def.flags |= FunctionFlags::DEFINED;
                def.scope.text_pos = mark.pos;
                def.scope.line = mark.line;
            }
            self.lexer.skip_text_block()?;
        } else if !token.matches_symbol(";") {
            return Err(self.syntax(format!(
                "Missing '{{' or ';' in declaration of '{friendly}', found '{}'",
                token.describe()
            )));
        }

        if specifiers.flags.contains(FunctionFlags::DELEGATE) {
            self.declare_delegate_property(scope, function, &friendly)?;
        }
        self.resolve_override(scope, function)
    }

    fn parse_function_specifiers(&mut self) -> Result<Specifiers> {
        let mut spec = Specifiers::default();
        loop {
            let token = self.get_raw()?;
            let flag = match token.text.to_ascii_lowercase().as_str() {
                _ if !token.is_identifier() => None,
                "function" => break,
                "event" => {
                    spec.flags |= FunctionFlags::EVENT;
                    break;
                }
                "delegate" => {
                    spec.flags |= FunctionFlags::DELEGATE;
                    break;
                }
                "operator" => {
                    self.require_symbol("(", "'operator'")?;
                    let precedence = self.parse_int_constant("operator precedence")?;
                    self.require_symbol(")", "'operator'")?;
                    spec.precedence = u8::try_from(precedence)
                        .map_err(|_| self.semantic(format!("Bad operator precedence {precedence}")))?;
                    spec.flags |= FunctionFlags::OPERATOR;
                    spec.operator = Some(Operator::Binary);
                    break;
                }
                "preoperator" => {
                    spec.flags |= FunctionFlags::PRE_OPERATOR;
                    spec.operator = Some(Operator::Pre);
                    break;
                }
                "postoperator" => {
                    spec.flags |= FunctionFlags::OPERATOR;
                    spec.operator = Some(Operator::Post);
                    break;
                }
                "native" => {
                    if self.match_symbol("(")? {
                        let id = self.parse_int_constant("native function id")?;
                        self.require_symbol(")", "'native'")?;
                        spec.native = u16::try_from(id)
                            .ok()
                            .filter(|&id| (EX_FIRST_NATIVE..EX_MAX_NATIVE).contains(&id))
                            .ok_or_else(|| self.semantic(format!("Bad native function id {id}")))?;
                    }
                    Some(FunctionFlags::NATIVE)
                }
                "final" => Some(FunctionFlags::FINAL),
                "static" => Some(FunctionFlags::STATIC),
                "simulated" => Some(FunctionFlags::SIMULATED),
                "latent" => Some(FunctionFlags::LATENT),
                "iterator" => Some(FunctionFlags::ITERATOR),
                "singular" => Some(FunctionFlags::SINGULAR),
                "exec" => Some(FunctionFlags::EXEC),
                "private" => Some(FunctionFlags::PRIVATE),
                "protected" => Some(FunctionFlags::PROTECTED),
                _ => None,
            };
            match flag {
                Some(flag) => spec.flags |= flag,
                None => {
                    return Err(self.syntax(format!(
                        "Missing 'function' in declaration, found '{}'",
                        token.describe()
                    )));
                }
            }
        }
        if spec.flags.contains(FunctionFlags::PRIVATE | FunctionFlags::PROTECTED) {
            return Err(self.semantic("A function can't be both private and protected"));
        }
        Ok(spec)
    }

    /// `[optional] [out] [coerce] [skip] [const] Type Name[[N]]`.
    fn compile_parameter(&mut self, function: FieldId, operator: bool) -> Result<()> {
        let mut flags = PropertyFlags::PARM;
        loop {
            if self.match_identifier("optional")? {
                flags |= PropertyFlags::OPTIONAL_PARM;
            } else if self.match_identifier("out")? {
                flags |= PropertyFlags::OUT_PARM;
            } else if self.match_identifier("coerce")? {
                flags |= PropertyFlags::COERCE_PARM;
            } else if self.match_identifier("const")? {
                flags |= PropertyFlags::CONST;
            } else if self.match_identifier("skip")? {
                if !operator {
                    return Err(self.semantic("'skip' is only allowed on operator parameters"));
                }
                flags |= PropertyFlags::SKIP_PARM;
            } else {
                break;
            }
        }

        let mut ty = self.compile_type("function parameter", false)?.with_flags(flags);
        let token = self.get_name("function parameter")?;
        let name = self.intern(&token.text);
        let dim = self.parse_array_dim(&ty)?;
        if !ty.is_dynamic_array() {
            ty.array_dim = dim;
        }
        if let Some(existing) = self.db.find_child(function, &name) {
            let kind = self.db.field(existing).kind_name();
            return Err(self.semantic(format!("'{name}' conflicts with previously defined {kind} '{name}'")));
        }
        let none = self.db.none_name();
        self.db
            .create_field(Some(function), name, FieldKind::Property(PropertyDef::new(ty, none)));
        Ok(())
    }

    /// Checks operator arity and gives the operator a field name unique to
    /// its signature. Operators are matched by friendly name.
    fn check_operator(&mut self, function: FieldId, operator: Operator, friendly: &Name) -> Result<()> {
        let params: Vec<PropertyType> = self
            .db
            .parameters(function)
            .filter_map(|p| self.db.field(p).as_property().map(|d| d.ty))
            .collect();
        let expected = match operator {
            Operator::Binary => 2,
            Operator::Pre | Operator::Post => 1,
        };
        if params.len() != expected {
            let kind = match operator {
                Operator::Binary => "Binary operators",
                Operator::Pre | Operator::Post => "Unary operators",
            };
            return Err(self.semantic(format!("{kind} must have exactly {expected} parameter(s)")));
        }

        let signature: Vec<String> = params.iter().map(|ty| ty.describe(self.db)).collect();
        let fixity = match operator {
            Operator::Binary => "",
            Operator::Pre => "pre",
            Operator::Post => "post",
        };
        let mangled = self.intern(&format!("{fixity}{friendly}_{}", signature.join("_")));
        let scope = self.scope();
        if self.db.find_child(scope, &mangled).is_some() {
            return Err(self.semantic(format!(
                "Operator '{friendly}' is already defined for ({})",
                signature.join(", ")
            )));
        }
        self.db.field_mut(function).name = mangled;
        Ok(())
    }

    /// The `__Name__Delegate` property holding the bound target of a
    /// delegate.
    fn declare_delegate_property(&mut self, scope: FieldId, function: FieldId, friendly: &Name) -> Result<()> {
        let name = self.intern(&format!("__{friendly}__Delegate"));
        self.check_declaration(scope, &name)?;
        let none = self.db.none_name();
        let ty = PropertyType::delegate(Some(function));
        self.db
            .create_field(Some(scope), name, FieldKind::Property(PropertyDef::new(ty, none)));
        Ok(())
    }

    /// Links a function to the function it overrides in a parent state or
    /// class and validates the override.
    fn resolve_override(&mut self, scope: FieldId, function: FieldId) -> Result<()> {
        let name = self.db.field(function).name.clone();
        let parent = self
            .lookup_levels(scope)
            .into_iter()
            .filter(|&level| level != scope)
            .find_map(|level| self.db.find_child(level, &name))
            .filter(|&found| found != function && self.db.field(found).as_function().is_some());
        let Some(parent) = parent else {
            return Ok(());
        };

        let (Some(child_def), Some(parent_def)) = (
            self.db.field(function).as_function(),
            self.db.field(parent).as_function(),
        ) else {
            return Ok(());
        };
        if parent_def.flags.contains(FunctionFlags::FINAL) {
            return Err(self.semantic(format!("Function '{name}' can't override a final function")));
        }
        if (child_def.flags ^ parent_def.flags).intersects(OVERRIDE_MATCH) {
            return Err(self.semantic(format!("Function '{name}' specifiers differ from original")));
        }
        let inherited = parent_def.flags & OVERRIDE_INHERIT;
        if !self.same_signature(function, parent) {
            return Err(self.semantic(format!("Redefinition of function '{name}' differs from original")));
        }

        if let Some(def) = self.db.field_mut(function).as_function_mut() {
            def.flags |= inherited;
            def.scope.super_field = Some(parent);
        }
        Ok(())
    }

    /// Parameters and return value agree in type and passing mode.
    fn same_signature(&self, a: FieldId, b: FieldId) -> bool {
        let mode = PropertyFlags::OUT_PARM
            | PropertyFlags::OPTIONAL_PARM
            | PropertyFlags::SKIP_PARM
            | PropertyFlags::RETURN_PARM;
        let signature = |f: FieldId| -> Vec<PropertyType> {
            self.db
                .children(f)
                .iter()
                .filter_map(|&c| self.db.field(c).as_property())
                .map(|p| p.ty)
                .filter(|ty| ty.flags.contains(PropertyFlags::PARM))
                .collect()
        };
        let (left, right) = (signature(a), signature(b));
        left.len() == right.len()
            && left.iter().zip(&right).all(|(x, y)| {
                (x.flags & mode) == (y.flags & mode) && x.matches_type(y, true, self.db)
            })
    }

    /// Generate pass: resumes lexing inside the body of the function
    /// declared at `decl_pos` and opens its nest.
    fn enter_function_body(&mut self, decl_pos: usize) -> Result<()> {
        let scope = self.scope();
        let found = self.db.children(scope).iter().copied().find(|&child| {
            self.db
                .field(child)
                .as_function()
                .is_some_and(|f| f.decl_pos == decl_pos)
        });
        let Some(function) = found else {
            return Err(self.internal("function declaration not found in the generate pass"));
        };
        let Some(def) = self.db.field(function).as_function() else {
            return Err(self.internal("function lookup returned a non-function field"));
        };
        if !def.flags.contains(FunctionFlags::DEFINED) {
            return self.skip_declaration();
        }
        let mark = Mark {
            pos: def.scope.text_pos,
            line: def.scope.line,
        };
        self.lexer.reset(mark);
        self.push_nest(NestKind::Function, function)
    }

    fn function_flags_mut(&mut self, function: FieldId, update: impl FnOnce(&mut FunctionFlags)) {
        if let Some(def) = self.db.field_mut(function).as_function_mut() {
            update(&mut def.flags);
        }
    }
}

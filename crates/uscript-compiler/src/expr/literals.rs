//! Literal constants.
//!
//! The semantic tokenizer turns identifier-shaped constants (`Vect(..)`,
//! `Rot(..)`, `true`, `None`, enum tags, `Class'Path'` object references,
//! `ArrayCount(..)`) into [`Literal`]s on top of the raw lexer, and the
//! emitter writes literals in their most compact opcode form.

use uscript_core::{FieldId, PropertyKind, PropertyType};

use super::{MAX_PRECEDENCE, Result};
use crate::bytecode::ExprToken;
use crate::compiler::Compiler;
use crate::expr_info::ExprInfo;
use crate::lexer::{Lexer, Literal, Token, TokenKind};

impl Compiler<'_, '_> {
    /// Reads a token, resolving identifier-shaped constants.
    pub fn get_token(&mut self, hint: Option<&PropertyType>, no_consts: bool) -> Result<Token> {
        let token = self.lexer.get_raw_token(no_consts)?;
        if !token.is_identifier() {
            return Ok(token);
        }
        let literal = match token.text.to_ascii_lowercase().as_str() {
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            "none" => Some(Literal::NoObject),
            "vect" if self.next_is_paren()? => Some(self.parse_vector()?),
            "rot" if self.next_is_paren()? => Some(self.parse_rotator()?),
            "arraycount" if self.next_is_paren()? => Some(self.parse_array_count()?),
            _ => None,
        };
        let literal = match literal {
            Some(literal) => Some(literal),
            None => self.enum_tag(&token, hint),
        };
        let literal = match literal {
            Some(literal) => Some(literal),
            None if !no_consts && self.lexer.peek_char() == '\'' => self.parse_object_const(&token)?,
            None => None,
        };
        Ok(match literal {
            Some(literal) => Token {
                kind: TokenKind::Const(literal),
                ..token
            },
            None => token,
        })
    }

    fn next_is_paren(&mut self) -> Result<bool> {
        Ok(self.peek_raw()?.matches_symbol("("))
    }

    fn enum_tag(&self, token: &Token, hint: Option<&PropertyType>) -> Option<Literal> {
        let hint = hint.filter(|h| h.kind == PropertyKind::Byte)?;
        let enum_def = hint.enum_def?;
        let name = self.db.find_name(&token.text)?;
        let value = self.db.field(enum_def).as_enum()?.tag_index(&name)?;
        Some(Literal::Byte {
            value,
            enum_def: Some(enum_def),
        })
    }

    /// Number, folding a leading sign.
    fn numeric_component(&mut self, tag: &str) -> Result<f64> {
        let token = self.lexer.get_raw_token(false)?;
        match token.literal() {
            Some(Literal::Int(v)) => Ok(f64::from(*v)),
            Some(Literal::Float(v)) => Ok(f64::from(*v)),
            _ => Err(self.syntax(format!("Missing {tag} component, found '{}'", token.describe()))),
        }
    }

    fn parse_components(&mut self, tag: &str) -> Result<[f64; 3]> {
        self.require_symbol("(", tag)?;
        let mut out = [0.0; 3];
        for (i, slot) in out.iter_mut().enumerate() {
            if i > 0 {
                self.require_symbol(",", tag)?;
            }
            *slot = self.numeric_component(tag)?;
        }
        self.require_symbol(")", tag)?;
        Ok(out)
    }

    fn parse_vector(&mut self) -> Result<Literal> {
        let [x, y, z] = self.parse_components("vector constant")?;
        Ok(Literal::Vector([x as f32, y as f32, z as f32]))
    }

    fn parse_rotator(&mut self) -> Result<Literal> {
        let [p, y, r] = self.parse_components("rotation constant")?;
        Ok(Literal::Rotator([p as i32, y as i32, r as i32]))
    }

    /// `ArrayCount(expr)`: the dimension of a fixed-size array. The operand
    /// is compiled only to learn its type.
    fn parse_array_count(&mut self) -> Result<Literal> {
        self.require_symbol("(", "'ArrayCount'")?;
        let start = self.code.len();
        let info = self.compile_expr(&PropertyType::none(), None, MAX_PRECEDENCE, None)?;
        self.code.truncate(start);
        self.require_symbol(")", "'ArrayCount'")?;
        match info.info() {
            Some(info) if info.ty.array_dim > 1 => Ok(Literal::Int(info.ty.array_dim as i32)),
            _ => Err(self.semantic("'ArrayCount' argument is not a fixed-size array")),
        }
    }

    /// `Class'Package.Object'` object constant. Unresolved references warn
    /// and become `None`.
    fn parse_object_const(&mut self, token: &Token) -> Result<Option<Literal>> {
        let Some(class) = self.db.find_class(&token.text) else {
            return Ok(None);
        };
        self.lexer.get_char(false)?;
        let mut path = String::new();
        loop {
            let c = self.lexer.get_char(false)?;
            match c {
                '\'' => break,
                c if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ' ') => path.push(c),
                _ => return Err(self.lexer.lexical(format!("Illegal character in object constant '{}'", token.text))),
            }
            if path.len() >= crate::lexer::NAME_SIZE * 4 {
                return Err(self.lexer.lexical("Object constant path is too long"));
            }
        }
        let object = self.db.find_object(class, &path);
        if object.is_none() {
            self.warn(format!("Can't find {} '{path}'", token.text));
        }
        Ok(Some(Literal::Object { class, object }))
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Static type of a literal.
    pub fn literal_type(&self, literal: &Literal) -> (PropertyType, Option<FieldId>) {
        match literal {
            Literal::Int(_) => (PropertyType::int(), None),
            Literal::Float(_) => (PropertyType::float(), None),
            Literal::Bool(_) => (PropertyType::bool(), None),
            Literal::Byte { enum_def, .. } => (PropertyType::byte(*enum_def), None),
            Literal::String(_) => (PropertyType::string(), None),
            Literal::Name(_) => (PropertyType::name(), None),
            Literal::Vector(_) => (self.kind_type(PropertyKind::Vector), None),
            Literal::Rotator(_) => (self.kind_type(PropertyKind::Rotator), None),
            Literal::Object {
                class,
                object: Some(uscript_core::ObjectRef::Class(referenced)),
            } if *class == self.db.class_class() => (
                PropertyType::class_ref(self.db.class_class(), *referenced),
                Some(*referenced),
            ),
            Literal::Object { class, .. } => (PropertyType::object(Some(*class)), None),
            Literal::NoObject => (PropertyType::object(None), None),
        }
    }

    /// Type of a value of a primitive kind.
    pub fn kind_type(&self, kind: PropertyKind) -> PropertyType {
        let structure = match kind {
            PropertyKind::Vector => self.db.vector_struct(),
            PropertyKind::Rotator => self.db.rotator_struct(),
            _ => None,
        };
        match structure {
            Some(def) => PropertyType::structure(kind, def),
            None => PropertyType::new(kind),
        }
    }

    /// Converts a numeric literal to `required` at compile time when an
    /// implicit conversion would be allowed at runtime.
    fn fold_literal(&self, literal: Literal, required: &PropertyType) -> Literal {
        if !required.is_scalar() {
            return literal;
        }
        match (required.kind, &literal) {
            (PropertyKind::Float, Literal::Int(v)) => Literal::Float(*v as f32),
            (PropertyKind::Float, Literal::Byte { value, enum_def: None }) => Literal::Float(f32::from(*value)),
            (PropertyKind::Int, Literal::Byte { value, enum_def: None }) => Literal::Int(i32::from(*value)),
            (PropertyKind::Int, Literal::Float(v)) => Literal::Int(*v as i32),
            (PropertyKind::Byte, Literal::Int(v)) if required.enum_def.is_none() => Literal::Byte {
                value: *v as u8,
                enum_def: None,
            },
            (PropertyKind::Byte, Literal::Float(v)) if required.enum_def.is_none() => Literal::Byte {
                value: *v as u8,
                enum_def: None,
            },
            _ => literal,
        }
    }

    /// Emits a literal, folding it to `required` first.
    pub fn emit_constant(&mut self, literal: Literal, required: &PropertyType) -> Result<ExprInfo> {
        let literal = self.fold_literal(literal, required);
        let (ty, const_class) = self.literal_type(&literal);
        let name = match &literal {
            Literal::Name(text) => Some(self.db.intern(text)),
            _ => None,
        };
        let code = &mut self.code;
        match &literal {
            Literal::Int(0) => code.emit_op(ExprToken::IntZero),
            Literal::Int(1) => code.emit_op(ExprToken::IntOne),
            Literal::Int(v) if (0..=255).contains(v) => {
                code.emit_op(ExprToken::IntConstByte);
                code.emit_u8(*v as u8);
            }
            Literal::Int(v) => {
                code.emit_op(ExprToken::IntConst);
                code.emit_i32(*v);
            }
            Literal::Float(v) => {
                code.emit_op(ExprToken::FloatConst);
                code.emit_f32(*v);
            }
            Literal::Bool(true) => code.emit_op(ExprToken::True),
            Literal::Bool(false) => code.emit_op(ExprToken::False),
            Literal::Byte { value, .. } => {
                code.emit_op(ExprToken::ByteConst);
                code.emit_u8(*value);
            }
            Literal::String(text) => code.emit_string(text),
            Literal::Name(_) => {
                code.emit_op(ExprToken::NameConst);
                if let Some(name) = &name {
                    code.emit_name(name);
                }
            }
            Literal::Vector(v) => {
                code.emit_op(ExprToken::VectorConst);
                v.iter().for_each(|c| code.emit_f32(*c));
            }
            Literal::Rotator(r) => {
                code.emit_op(ExprToken::RotationConst);
                r.iter().for_each(|c| code.emit_i32(*c));
            }
            Literal::Object {
                object: Some(object), ..
            } => {
                code.emit_op(ExprToken::ObjectConst);
                code.emit_object(*object);
            }
            Literal::Object { object: None, .. } | Literal::NoObject => code.emit_op(ExprToken::NoObject),
        }
        Ok(ExprInfo {
            const_class,
            ..ExprInfo::literal(ty)
        })
    }

    /// Emits a named constant by re-reading its stored text.
    pub fn compile_const(&mut self, id: FieldId, required: &PropertyType) -> Result<ExprInfo> {
        let Some(def) = self.db.field(id).as_const().cloned() else {
            return Err(self.internal("constant lookup returned a non-constant field"));
        };
        let saved = std::mem::replace(&mut self.lexer, Lexer::new(&def.value, def.line));
        let token = self.get_token(Some(required), false);
        self.lexer = saved;
        match token?.kind {
            TokenKind::Const(literal) => self.emit_constant(literal, required),
            _ => Err(self.semantic(format!(
                "Bad value '{}' for constant '{}'",
                def.value,
                self.db.field(id).name
            ))),
        }
    }

    /// Reads an integer literal or the name of an integer constant.
    pub fn parse_int_constant(&mut self, tag: &str) -> Result<i32> {
        let token = self.get_token(None, false)?;
        if let Some(Literal::Int(v)) = token.literal() {
            return Ok(*v);
        }
        if token.is_identifier() {
            if let Some(name) = self.db.find_name(&token.text) {
                if let Some(id) = self.find_field(self.scope(), &name) {
                    if let Some(def) = self.db.field(id).as_const().cloned() {
                        let saved = std::mem::replace(&mut self.lexer, Lexer::new(&def.value, def.line));
                        let token = self.lexer.get_raw_token(false);
                        self.lexer = saved;
                        if let Some(Literal::Int(v)) = token?.literal() {
                            return Ok(*v);
                        }
                    }
                }
            }
        }
        Err(self.syntax(format!("Missing integer constant in {tag}, found '{}'", token.describe())))
    }
}

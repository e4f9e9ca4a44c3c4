//! Expression result information.
//!
//! `ExprInfo` is what every expression compile step hands back: the static
//! type of the value left by the emitted bytecode plus the few facts the
//! caller needs beyond the type.

use uscript_core::{FieldId, PropertyFlags, PropertyType};

/// Result of compiling an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprInfo {
    /// Static type. `OUT_PARM` in its flags marks an l-value, `CONST` a
    /// read-only one.
    pub ty: PropertyType,
    /// The value is a literal constant.
    pub constant: bool,
    /// Class named by a constant `class'Name'` value.
    pub const_class: Option<FieldId>,
    /// Evaluating the expression changes state, so it may stand alone as a
    /// statement.
    pub effect: bool,
}

impl ExprInfo {
    /// A temporary value.
    pub fn rvalue(ty: PropertyType) -> Self {
        Self {
            ty: ty.without_flags(PropertyFlags::OUT_PARM),
            constant: false,
            const_class: None,
            effect: false,
        }
    }

    /// An assignable variable, possibly const.
    pub fn variable(ty: PropertyType) -> Self {
        Self {
            ty: ty.with_flags(PropertyFlags::OUT_PARM),
            constant: false,
            const_class: None,
            effect: false,
        }
    }

    pub fn literal(ty: PropertyType) -> Self {
        Self {
            constant: true,
            ..Self::rvalue(ty)
        }
    }

    pub fn with_effect(mut self) -> Self {
        self.effect = true;
        self
    }

    pub fn is_lvalue(&self) -> bool {
        self.ty.is_lvalue()
    }

    /// Can be assigned to.
    pub fn is_assignable(&self) -> bool {
        self.is_lvalue() && !self.ty.flags.contains(PropertyFlags::CONST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rvalue_is_not_assignable() {
        let info = ExprInfo::rvalue(PropertyType::int().with_flags(PropertyFlags::OUT_PARM));
        assert!(!info.is_lvalue());
        assert!(!info.is_assignable());
    }

    #[test]
    fn const_variable_is_read_only() {
        let info = ExprInfo::variable(PropertyType::int().with_flags(PropertyFlags::CONST));
        assert!(info.is_lvalue());
        assert!(!info.is_assignable());
    }

    #[test]
    fn literal_has_no_effect() {
        let info = ExprInfo::literal(PropertyType::float());
        assert!(info.constant);
        assert!(!info.effect);
        assert!(info.with_effect().effect);
    }
}

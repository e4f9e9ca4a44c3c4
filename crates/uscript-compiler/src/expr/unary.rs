//! Prefix and postfix operators.

use uscript_core::{FieldId, PropertyFlags, PropertyType};

use super::Result;
use super::binary::Selection;
use crate::compiler::Compiler;
use crate::conversion::implicit_cast;
use crate::expr_info::ExprInfo;
use crate::lexer::Token;

impl Compiler<'_, '_> {
    /// Applies a prefix operator when no primary term was found. The operand
    /// binds tighter than any binary operator.
    pub(super) fn apply_pre_operator(&mut self, token: &Token, start: usize) -> Result<Option<ExprInfo>> {
        let Some(op) = token.operator_text().map(str::to_owned) else {
            return Ok(None);
        };
        let candidates = self.find_operators(&op, true);
        if candidates.is_empty() {
            return Ok(None);
        }
        let Some(operand) = self
            .compile_expr(&PropertyType::none(), None, 0, None)?
            .info()
        else {
            return Err(self.syntax(format!("Bad or missing expression after '{op}'")));
        };
        self.apply_unary(&op, &candidates, operand, start).map(Some)
    }

    /// Resolves a one-operand operator and wraps `operand`, which starts at
    /// `start`, in its call.
    pub(super) fn apply_unary(
        &mut self,
        op: &str,
        candidates: &[FieldId],
        operand: ExprInfo,
        start: usize,
    ) -> Result<ExprInfo> {
        let function = match self.select_operator(op, candidates, &[operand])? {
            Selection::Found(function) => function,
            Selection::Incompatible { .. } => {
                return Err(self.semantic(format!(
                    "Type '{}' is incompatible with '{op}'",
                    operand.ty.describe(self.db)
                )));
            }
        };
        let params = self.param_types(function);
        if let Some(cast) = implicit_cast(&params[0], &operand.ty, self.db) {
            self.splice_cast(start, cast);
        }
        self.emit_operator_head(function, start);

        let info = ExprInfo::rvalue(self.result_type(function));
        Ok(if params[0].flags.contains(PropertyFlags::OUT_PARM) {
            info.with_effect()
        } else {
            info
        })
    }
}

//! Binary operators.
//!
//! Operators are ordinary functions flagged as operators and matched by
//! friendly name. Every visible candidate is scored by the conversion cost
//! of each operand; the strictly cheapest one wins.

use uscript_core::{FieldId, FunctionFlags, PropertyFlags, PropertyKind, PropertyType};

use super::{ExprMatch, Result};
use crate::bytecode::ExprToken;
use crate::compiler::Compiler;
use crate::conversion::{conversion_cost, implicit_cast};
use crate::expr_info::ExprInfo;
use crate::lexer::Token;

/// Winner of overload resolution over a set of operator candidates.
pub(super) enum Selection {
    Found(FieldId),
    /// No candidate accepts the operands. The flags tell which operand
    /// positions some candidate would have accepted.
    Incompatible { accepted: Vec<bool> },
}

impl Compiler<'_, '_> {
    /// Operator functions visible from the current scope whose friendly name
    /// is `text`.
    pub(super) fn find_operators(&self, text: &str, pre: bool) -> Vec<FieldId> {
        let Some(name) = self.db.find_name(text) else {
            return Vec::new();
        };
        let wanted = if pre {
            FunctionFlags::PRE_OPERATOR
        } else {
            FunctionFlags::OPERATOR
        };
        let mut found = Vec::new();
        let mut overridden = Vec::new();
        for level in self.lookup_levels(self.scope()) {
            for &child in self.db.children(level) {
                let Some(def) = self.db.field(child).as_function() else {
                    continue;
                };
                if !def.flags.contains(wanted) || def.friendly_name.as_ref() != Some(&name) {
                    continue;
                }
                if overridden.contains(&child) {
                    continue;
                }
                if let Some(parent) = def.scope.super_field {
                    overridden.push(parent);
                }
                found.push(child);
            }
        }
        found
    }

    pub(super) fn param_types(&self, function: FieldId) -> Vec<PropertyType> {
        self.db
            .parameters(function)
            .filter_map(|p| self.db.field(p).as_property().map(|p| p.ty))
            .collect()
    }

    pub(super) fn result_type(&self, function: FieldId) -> PropertyType {
        self.db
            .return_param(function)
            .and_then(|p| self.db.field(p).as_property())
            .map_or(PropertyType::none(), |p| p.ty.without_flags(PropertyFlags::all()))
    }

    /// Cost of passing `operand` to a parameter of type `param`.
    pub(super) fn operand_cost(&self, param: &PropertyType, operand: &ExprInfo) -> Option<u32> {
        if param.flags.contains(PropertyFlags::OUT_PARM) && !operand.is_assignable() {
            return None;
        }
        conversion_cost(param, &operand.ty, self.db)
    }

    /// Scores `candidates` against `operands`, combining per-operand costs
    /// with `max`.
    pub(super) fn select_operator(
        &self,
        op: &str,
        candidates: &[FieldId],
        operands: &[ExprInfo],
    ) -> Result<Selection> {
        let mut accepted = vec![false; operands.len()];
        let mut best: Option<(FieldId, u32)> = None;
        let mut ties = 0usize;
        for &candidate in candidates {
            let params = self.param_types(candidate);
            if params.len() != operands.len() {
                continue;
            }
            let costs: Vec<Option<u32>> = params
                .iter()
                .zip(operands)
                .map(|(param, operand)| self.operand_cost(param, operand))
                .collect();
            for (slot, cost) in accepted.iter_mut().zip(&costs) {
                *slot |= cost.is_some();
            }
            let Some(cost) = costs.iter().try_fold(0u32, |acc, c| c.map(|c| acc.max(c))) else {
                continue;
            };
            match best {
                Some((_, best_cost)) if cost > best_cost => {}
                Some((_, best_cost)) if cost == best_cost => ties += 1,
                _ => {
                    best = Some((candidate, cost));
                    ties = 1;
                }
            }
        }
        match best {
            Some((_, cost)) if ties > 1 => Err(self.semantic(format!(
                "Operator '{op}': {ties} candidates are equally good matches with conversion cost {cost}"
            ))),
            Some((winner, _)) => Ok(Selection::Found(winner)),
            None => Ok(Selection::Incompatible { accepted }),
        }
    }

    /// Tries to apply a binary or postfix operator to `left`. Returns `None`
    /// when `token` is not an operator that binds here.
    pub(super) fn apply_operator(
        &mut self,
        token: &Token,
        left: ExprInfo,
        start: usize,
        max_prec: u32,
    ) -> Result<Option<ExprInfo>> {
        let Some(op) = token.operator_text().map(str::to_owned) else {
            return Ok(None);
        };
        let candidates = self.find_operators(&op, false);
        if candidates.is_empty() {
            return Ok(None);
        }
        let (binary, post): (Vec<FieldId>, Vec<FieldId>) = candidates
            .into_iter()
            .partition(|&f| self.db.parameters(f).count() == 2);
        if binary.is_empty() {
            return self.apply_unary(&op, &post, left, start).map(Some);
        }

        let min_prec = binary
            .iter()
            .filter_map(|&f| self.db.field(f).as_function().map(|d| u32::from(d.precedence)))
            .min()
            .unwrap_or(0);
        if min_prec >= max_prec {
            return Ok(None);
        }

        let left_end = self.code.len();
        let right = match self.compile_expr(&PropertyType::none(), None, min_prec, Some(&left.ty))? {
            ExprMatch::Absent => {
                return Err(self.syntax(format!("Bad or missing expression after '{op}'")));
            }
            ExprMatch::Matched(info) | ExprMatch::Mismatch(info) => info,
        };

        match self.select_operator(&op, &binary, &[left, right])? {
            Selection::Found(function) => {
                self.emit_binary(function, &left, &right, start, left_end).map(Some)
            }
            Selection::Incompatible { accepted } => {
                if let Some(info) = self.struct_compare(&op, &left, &right, start) {
                    return Ok(Some(info));
                }
                let l = left.ty.describe(self.db);
                let r = right.ty.describe(self.db);
                let message = match (accepted[0], accepted[1]) {
                    (true, false) => format!("Right type '{r}' is incompatible with '{op}'"),
                    (false, true) => format!("Left type '{l}' is incompatible with '{op}'"),
                    _ => format!("Types '{l}' and '{r}' are incompatible with '{op}'"),
                };
                Err(self.semantic(message))
            }
        }
    }

    /// Splices casts and the call header around already emitted operands:
    /// `[call][cast? left][skip?][cast? right][EndFunctionParms]`.
    fn emit_binary(
        &mut self,
        function: FieldId,
        left: &ExprInfo,
        right: &ExprInfo,
        start: usize,
        left_end: usize,
    ) -> Result<ExprInfo> {
        let params = self.param_types(function);
        let (lp, rp) = (params[0], params[1]);

        if let Some(cast) = implicit_cast(&rp, &right.ty, self.db) {
            self.splice_cast(left_end, cast);
        }
        if rp.flags.contains(PropertyFlags::SKIP_PARM) {
            let len = (self.code.len() - left_end) as u16;
            let mut skip = vec![ExprToken::Skip.byte()];
            skip.extend_from_slice(&len.to_le_bytes());
            self.code.insert(left_end, &skip);
        }
        if let Some(cast) = implicit_cast(&lp, &left.ty, self.db) {
            self.splice_cast(start, cast);
        }
        self.emit_operator_head(function, start);

        let effect = params.iter().any(|p| p.flags.contains(PropertyFlags::OUT_PARM));
        let info = ExprInfo::rvalue(self.result_type(function));
        Ok(if effect { info.with_effect() } else { info })
    }

    /// Emits the final-call header of an operator in front of its operands
    /// and closes the parameter list.
    pub(super) fn emit_operator_head(&mut self, function: FieldId, start: usize) {
        let head = self.code.len();
        self.emit_final_call(function);
        self.code.rotate(start, head);
        self.code.emit_op(ExprToken::EndFunctionParms);
    }

    /// `==` and `!=` between two values of the same struct type.
    fn struct_compare(
        &mut self,
        op: &str,
        left: &ExprInfo,
        right: &ExprInfo,
        start: usize,
    ) -> Option<ExprInfo> {
        let token = match op {
            "==" => ExprToken::StructCmpEq,
            "!=" => ExprToken::StructCmpNe,
            _ => return None,
        };
        let struct_like = matches!(
            left.ty.kind,
            PropertyKind::Struct | PropertyKind::Vector | PropertyKind::Rotator
        );
        let def = left.ty.struct_def?;
        if !struct_like || right.ty.struct_def != Some(def) || !left.ty.is_scalar() || !right.ty.is_scalar() {
            return None;
        }
        let mut head = vec![token.byte()];
        head.extend_from_slice(&def.handle().to_le_bytes());
        self.code.insert(start, &head);
        Some(ExprInfo::rvalue(PropertyType::bool()))
    }
}

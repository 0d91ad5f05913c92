//! Constant propagation.
//!
//! Tracks the literal value of every variable, folding arithmetic, string
//! concatenation, comparisons and boolean operators over known operands.

use super::{comparison, condition, holds};
use crate::dataflow::Engine;
use crate::errors::AnalysisResult;
use crate::flowgraph::Branch;
use crate::lattice::Joiner;
use crate::value::{invocation_operands, ValueAnalysis, ValueState};
use serde::Serialize;
use std::fmt;
use tf_tree::*;

/// `Unknown < Known(_) < Conflict`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ConstantValue {
    /// No path computed a value yet.
    Unknown,
    Known(Literal),
    /// Several values, or a value that is not a compile-time constant.
    Conflict,
}

impl ConstantValue {
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Unknown, x) | (x, Self::Unknown) => x.clone(),
            (Self::Known(a), Self::Known(b)) if a == b => self.clone(),
            _ => Self::Conflict,
        }
    }

    #[must_use]
    pub fn literal(&self) -> Option<&Literal> {
        match self {
            Self::Known(literal) => Some(literal),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Known(literal) => write!(f, "{literal}"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantJoiner;

impl Joiner for ConstantJoiner {
    type Value = ConstantValue;

    fn join(&self, values: &[ConstantValue]) -> ConstantValue {
        values
            .iter()
            .fold(ConstantValue::Unknown, |acc, value| acc.join(value))
    }

    fn lower_bound(&self) -> ConstantValue {
        ConstantValue::Unknown
    }

    fn default_initialization(&self) -> ConstantValue {
        ConstantValue::Unknown
    }

    // parameters and fields may hold anything
    fn unbound(&self) -> ConstantValue {
        ConstantValue::Conflict
    }
}

fn concat_text(literal: &Literal) -> String {
    match literal {
        Literal::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Folds `left op right`; `None` when the result is not a constant.
#[must_use]
pub fn fold_binary(op: BinaryOp, left: &Literal, right: &Literal) -> Option<Literal> {
    use Literal::{Boolean, Integer};

    match (op, left, right) {
        (BinaryOp::Add, Literal::String(_), _) | (BinaryOp::Add, _, Literal::String(_)) => Some(
            Literal::String(format!("{}{}", concat_text(left), concat_text(right))),
        ),
        (BinaryOp::Add, Integer(a), Integer(b)) => a.checked_add(*b).map(Integer),
        (BinaryOp::Sub, Integer(a), Integer(b)) => a.checked_sub(*b).map(Integer),
        (BinaryOp::Mul, Integer(a), Integer(b)) => a.checked_mul(*b).map(Integer),
        (BinaryOp::Div, Integer(a), Integer(b)) => a.checked_div(*b).map(Integer),
        (BinaryOp::Rem, Integer(a), Integer(b)) => a.checked_rem(*b).map(Integer),
        (BinaryOp::Lt, Integer(a), Integer(b)) => Some(Boolean(a < b)),
        (BinaryOp::Le, Integer(a), Integer(b)) => Some(Boolean(a <= b)),
        (BinaryOp::Gt, Integer(a), Integer(b)) => Some(Boolean(a > b)),
        (BinaryOp::Ge, Integer(a), Integer(b)) => Some(Boolean(a >= b)),
        (BinaryOp::Eq, a, b) => Some(Boolean(a == b)),
        (BinaryOp::Ne, a, b) => Some(Boolean(a != b)),
        (BinaryOp::And, Boolean(a), Boolean(b)) => Some(Boolean(*a && *b)),
        (BinaryOp::Or, Boolean(a), Boolean(b)) => Some(Boolean(*a || *b)),
        _ => None,
    }
}

/// Abstract counterpart of [`fold_binary`].
#[must_use]
pub fn evaluate_binary(op: BinaryOp, left: &ConstantValue, right: &ConstantValue) -> ConstantValue {
    match (left, right) {
        (ConstantValue::Conflict, _) | (_, ConstantValue::Conflict) => ConstantValue::Conflict,
        (ConstantValue::Unknown, _) | (_, ConstantValue::Unknown) => ConstantValue::Unknown,
        (ConstantValue::Known(a), ConstantValue::Known(b)) => {
            fold_binary(op, a, b).map_or(ConstantValue::Conflict, ConstantValue::Known)
        }
    }
}

fn evaluate_unary(op: UnaryOp, operand: &ConstantValue) -> ConstantValue {
    let ConstantValue::Known(literal) = operand else {
        return operand.clone();
    };
    let folded = match (op, literal) {
        (UnaryOp::Not, Literal::Boolean(b)) => Some(Literal::Boolean(!b)),
        (UnaryOp::Neg, Literal::Integer(i)) => i.checked_neg().map(Literal::Integer),
        (UnaryOp::Pos, Literal::Integer(i)) => Some(Literal::Integer(*i)),
        _ => None,
    };
    folded.map_or(ConstantValue::Conflict, ConstantValue::Known)
}

#[derive(Debug, Default)]
pub struct ConstantPropagation {
    joiner: ConstantJoiner,
}

impl ConstantPropagation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueAnalysis for ConstantPropagation {
    type Value = ConstantValue;
    type Joiner = ConstantJoiner;

    fn joiner(&self) -> &ConstantJoiner {
        &self.joiner
    }

    fn transfer_literal(
        &self,
        _point: Cursor,
        node: &Literal,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.push(ConstantValue::Known(node.clone())))
    }

    fn transfer_binary(
        &self,
        _point: Cursor,
        node: &Binary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        let value = evaluate_binary(node.op, state.expr_at(1)?, state.expr()?);
        Ok(state.pop_n(2)?.push(value))
    }

    fn transfer_unary(
        &self,
        _point: Cursor,
        node: &Unary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        let value = evaluate_unary(node.op, state.expr()?);
        Ok(state.pop()?.push(value))
    }

    fn transfer_method_invocation(
        &self,
        _point: Cursor,
        node: &MethodInvocation,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state
            .pop_n(invocation_operands(node))?
            .push(ConstantValue::Conflict))
    }

    fn transfer_new_class(
        &self,
        _point: Cursor,
        node: &NewClass,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.pop_n(node.args.len())?.push(ConstantValue::Conflict))
    }

    fn transfer_field_access(
        &self,
        _point: Cursor,
        _node: &FieldAccess,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.pop()?.push(ConstantValue::Conflict))
    }

    fn narrow_on_branch(
        &self,
        construct: Cursor,
        state: ValueState<Self>,
        branch: Branch,
    ) -> AnalysisResult<ValueState<Self>> {
        let Some((cond, negated)) = condition(construct) else {
            return Ok(state);
        };
        match comparison(cond) {
            Some(test) if test.equal == holds(branch, negated) => Ok(state.set(
                test.variable.clone(),
                ConstantValue::Known(test.literal.clone()),
            )),
            _ => Ok(state),
        }
    }
}

/// Literal value of `variable` after `point`, if it is a constant.
#[must_use]
pub fn constant_at(
    engine: &Engine<'_, ConstantPropagation>,
    point: NodeId,
    variable: &Variable,
) -> Option<Literal> {
    engine.value_at(point, variable).literal().cloned()
}

//! Null analysis.
//!
//! The value of a variable answers "is it null?" as a [`ModalBoolean`]:
//! `True` when it is null on every path, `False` when it never is,
//! `Conflict` when paths disagree and `NoIdea` when it comes from code the
//! analysis cannot see through.

use super::{comparison, condition, holds};
use crate::dataflow::Engine;
use crate::errors::AnalysisResult;
use crate::flowgraph::Branch;
use crate::lattice::{ModalBoolean, ModalJoiner};
use crate::matcher::MethodMatcher;
use crate::value::{invocation_operands, ValueAnalysis, ValueState};
use lazy_static::lazy_static;
use tf_tree::*;

lazy_static! {
    /// Library methods that never return null.
    static ref NON_NULL_METHODS: Vec<MethodMatcher> = [
        "java.lang.String concat(..)",
        "java.lang.String format(..)",
        "java.lang.String replace(..)",
        "java.lang.String replaceAll(..)",
        "java.lang.String substring(..)",
        "java.lang.String toLowerCase(..)",
        "java.lang.String toUpperCase(..)",
        "java.lang.String trim()",
        "java.lang.String valueOf(..)",
        "java.lang.StringBuilder toString()",
        "java.io.File getAbsolutePath()",
        "java.io.File toPath()",
        "java.nio.file.Path resolve(..)",
        "java.util.Objects requireNonNull(..)",
    ]
    .iter()
    .map(|pattern| MethodMatcher::new(pattern).expect("non-null method pattern"))
    .collect();
}

#[derive(Debug, Clone)]
pub struct NullAnalysis {
    joiner: ModalJoiner,
}

/// Variables declared without initializer are null.
impl Default for NullAnalysis {
    fn default() -> Self {
        Self {
            joiner: ModalJoiner::new(ModalBoolean::True),
        }
    }
}

impl NullAnalysis {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `node` calls a method known to never return null.
    #[must_use]
    pub fn is_non_null_method(node: &MethodInvocation) -> bool {
        NON_NULL_METHODS
            .iter()
            .any(|matcher| matcher.matches_invocation(node))
    }
}

impl ValueAnalysis for NullAnalysis {
    type Value = ModalBoolean;
    type Joiner = ModalJoiner;

    fn joiner(&self) -> &ModalJoiner {
        &self.joiner
    }

    fn transfer_literal(
        &self,
        _point: Cursor,
        node: &Literal,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.push(ModalBoolean::from_bool(node.is_null())))
    }

    fn transfer_binary(
        &self,
        _point: Cursor,
        _node: &Binary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.pop_n(2)?.push(ModalBoolean::False))
    }

    fn transfer_unary(
        &self,
        _point: Cursor,
        _node: &Unary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.pop()?.push(ModalBoolean::False))
    }

    fn transfer_new_class(
        &self,
        _point: Cursor,
        node: &NewClass,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.pop_n(node.args.len())?.push(ModalBoolean::False))
    }

    fn transfer_method_invocation(
        &self,
        _point: Cursor,
        node: &MethodInvocation,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        let value = if Self::is_non_null_method(node) {
            ModalBoolean::False
        } else {
            ModalBoolean::NoIdea
        };
        Ok(state.pop_n(invocation_operands(node))?.push(value))
    }

    fn transfer_field_access(
        &self,
        _point: Cursor,
        _node: &FieldAccess,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state.pop()?.push(ModalBoolean::NoIdea))
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
        let Some(test) = comparison(cond) else {
            return Ok(state);
        };
        let equal = test.equal == holds(branch, negated);
        let value = match (test.literal.is_null(), equal) {
            (true, equal) => ModalBoolean::from_bool(equal),
            // equal to a non-null literal
            (false, true) => ModalBoolean::False,
            (false, false) => return Ok(state),
        };
        Ok(state.set(test.variable.clone(), value))
    }
}

/// Whether `variable` is null after `point`: definitely (`True`), never
/// (`False`), or maybe (any other value).
#[must_use]
pub fn is_null_at(
    engine: &Engine<'_, NullAnalysis>,
    point: NodeId,
    variable: &Variable,
) -> ModalBoolean {
    engine.value_at(point, variable)
}

//! Dataflow analysis framework.
//!
//! An analysis is described by a [`DataFlowAnalysis`] implementation: a
//! lattice (through its [`Joiner`]) and one transfer hook per kind of
//! program point. The [`Engine`] computes, for every program point the
//! query depends on, the state holding after that point, iterating with a
//! worklist until a fixed point is reached.

use crate::errors::AnalysisResult;
use crate::flowgraph::Branch;
use crate::lattice::Joiner;
use crate::state::ProgramState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tf_tree::*;

mod dispatch;
mod solver;

pub use solver::Engine;

pub(crate) use dispatch::transfer;

/// State type of an analysis.
pub type State<A> = ProgramState<<A as DataFlowAnalysis>::Value>;

/// A forward dataflow analysis over the program points of a tree.
///
/// Every transfer hook receives the point, its typed node and the state
/// holding before the point, and returns the state holding after it. All
/// hooks default to [`DataFlowAnalysis::default_transfer`], which lets the
/// state through unchanged.
///
/// Transfer functions must be monotone with respect to the lattice order
/// for the engine to terminate.
pub trait DataFlowAnalysis: Sized {
    type Value: Clone + Eq + fmt::Debug + fmt::Display;
    type Joiner: Joiner<Value = Self::Value>;

    fn joiner(&self) -> &Self::Joiner;

    /// Fallback of every transfer hook.
    ///
    /// # Errors
    ///
    /// The default implementation never fails.
    fn default_transfer(&self, _point: Cursor, state: State<Self>) -> AnalysisResult<State<Self>> {
        Ok(state)
    }

    fn transfer_block(
        &self,
        point: Cursor,
        _node: &Block,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_variable_declarations(
        &self,
        point: Cursor,
        _node: &VariableDeclarations,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_named_variable(
        &self,
        point: Cursor,
        _node: &NamedVariable,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_expression_statement(
        &self,
        point: Cursor,
        _node: &ExpressionStatement,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_if(
        &self,
        point: Cursor,
        _node: &If,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_else(
        &self,
        point: Cursor,
        _node: &Else,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_while_loop(
        &self,
        point: Cursor,
        _node: &WhileLoop,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_for_loop(
        &self,
        point: Cursor,
        _node: &ForLoop,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_control_parentheses(
        &self,
        point: Cursor,
        _node: &ControlParentheses,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_parentheses(
        &self,
        point: Cursor,
        _node: &Parentheses,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_binary(
        &self,
        point: Cursor,
        _node: &Binary,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_unary(
        &self,
        point: Cursor,
        _node: &Unary,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_assignment(
        &self,
        point: Cursor,
        _node: &Assignment,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_method_invocation(
        &self,
        point: Cursor,
        _node: &MethodInvocation,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_new_class(
        &self,
        point: Cursor,
        _node: &NewClass,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_field_access(
        &self,
        point: Cursor,
        _node: &FieldAccess,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_return(
        &self,
        point: Cursor,
        _node: &Return,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_literal(
        &self,
        point: Cursor,
        _node: &Literal,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_identifier(
        &self,
        point: Cursor,
        _node: &Identifier,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    fn transfer_empty(&self, point: Cursor, state: State<Self>) -> AnalysisResult<State<Self>> {
        self.default_transfer(point, state)
    }

    /// Refines the state flowing out of the condition of `construct` (an
    /// `if`, `while` or `for`) along `branch`.
    ///
    /// # Errors
    ///
    /// The default implementation never fails.
    fn narrow_on_branch(
        &self,
        _construct: Cursor,
        state: State<Self>,
        _branch: Branch,
    ) -> AnalysisResult<State<Self>> {
        Ok(state)
    }

    /// Adapts the state after the left operand of `binary` (a `&&` or
    /// `||`) when the right operand is skipped. The result is joined with
    /// the state after the right operand, so both must have the same stack
    /// height.
    ///
    /// # Errors
    ///
    /// The default implementation never fails.
    fn transfer_short_circuit(
        &self,
        _binary: Cursor,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        Ok(state)
    }
}

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Do not enqueue a point already waiting in the worklist.
    pub dedup_worklist: bool,
    /// Dump input and output states at trace level.
    pub log_states: bool,
}

/// Default values deduplicate the worklist and log states.
impl Default for Options {
    fn default() -> Self {
        Self {
            dedup_worklist: true,
            log_states: true,
        }
    }
}

impl Options {
    #[must_use]
    pub const fn keep_duplicates(self) -> Self {
        Self {
            dedup_worklist: false,
            ..self
        }
    }

    #[must_use]
    pub const fn without_state_logs(self) -> Self {
        Self {
            log_states: false,
            ..self
        }
    }
}

/// Dataflow analysis result object.
///
/// Contains the state holding after every program point the last run
/// discovered.
#[derive(Debug, Clone, Serialize)]
pub struct Dataflow<V> {
    pub states: BTreeMap<NodeId, ProgramState<V>>,
}

impl<V> Default for Dataflow<V> {
    fn default() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }
}

impl<V> Dataflow<V> {
    #[must_use]
    pub fn get(&self, point: NodeId) -> Option<&ProgramState<V>> {
        self.states.get(&point)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Figures of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Program points discovered from the root.
    pub points: usize,
    /// Distinct dependencies between them.
    pub edges: usize,
    /// Points taken out of the worklist.
    pub iterations: usize,
}

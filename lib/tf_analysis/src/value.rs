//! Value tracking on top of the dataflow framework.
//!
//! A [`ValueAnalysis`] gives every expression an abstract value: expressions
//! push their value on the expression stack, consumers pop the values of
//! their operands, and variables get the value assigned to them. Clients
//! only override the hooks where their lattice says more than "nothing is
//! known", and reuse the free functions of this module for the rest.

use crate::dataflow::{DataFlowAnalysis, State};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::flowgraph::Branch;
use crate::lattice::Joiner;
use crate::state::ProgramState;
use std::fmt;
use tf_tree::*;

/// Pushes the least value of the lattice.
#[must_use]
pub fn push_unknown<J: Joiner>(joiner: &J, state: ProgramState<J::Value>) -> ProgramState<J::Value> {
    state.push(joiner.lower_bound())
}

/// Pushes the value bound to the identifier, or [`Joiner::unbound`].
#[must_use]
pub fn identifier<J: Joiner>(
    joiner: &J,
    node: &Identifier,
    state: ProgramState<J::Value>,
) -> ProgramState<J::Value> {
    let value = state
        .get(&node.name)
        .cloned()
        .unwrap_or_else(|| joiner.unbound());
    state.push(value)
}

/// Replaces the `operands` top values with the least value.
///
/// # Errors
///
/// Fails if the stack holds less than `operands` values.
pub fn consume<J: Joiner>(
    joiner: &J,
    operands: usize,
    state: ProgramState<J::Value>,
) -> AnalysisResult<ProgramState<J::Value>> {
    Ok(state.pop_n(operands)?.push(joiner.lower_bound()))
}

/// Number of values a method invocation consumes.
#[must_use]
pub fn invocation_operands(node: &MethodInvocation) -> usize {
    node.args.len() + usize::from(node.select.is_some())
}

/// Binds the assigned variable to the value on top of the stack, which
/// stays there as the value of the assignment.
///
/// # Errors
///
/// Only identifiers can be assigned to, and the stack must not be empty.
pub fn assignment<T: Clone>(
    point: Cursor,
    node: &Assignment,
    state: ProgramState<T>,
) -> AnalysisResult<ProgramState<T>> {
    let target = point.tree().cursor(node.target)?;
    let NodeKind::Identifier(ident) = target.kind() else {
        return Err(AnalysisError::unhandled(target));
    };
    let value = state.expr()?.clone();
    Ok(state.set(ident.name.clone(), value))
}

/// Binds the declared variable to its initializer value, or to the default
/// initialization of the lattice.
///
/// # Errors
///
/// Fails if an initializer left no value on the stack.
pub fn named_variable<J: Joiner>(
    joiner: &J,
    node: &NamedVariable,
    state: ProgramState<J::Value>,
) -> AnalysisResult<ProgramState<J::Value>> {
    match node.initializer {
        Some(_) => {
            let value = state.expr()?.clone();
            Ok(state.pop()?.set(node.name.clone(), value))
        }
        None => Ok(state.set(node.name.clone(), joiner.default_initialization())),
    }
}

/// Drops the value of a consumed expression.
///
/// # Errors
///
/// Fails on an empty stack.
pub fn discard<T>(state: ProgramState<T>) -> AnalysisResult<ProgramState<T>> {
    Ok(state.pop()?)
}

/// Duplicates the left operand of a short-circuiting operator, standing for
/// the skipped right operand.
///
/// # Errors
///
/// Fails on an empty stack.
pub fn short_circuit<T: Clone>(state: ProgramState<T>) -> AnalysisResult<ProgramState<T>> {
    let left = state.expr()?.clone();
    Ok(state.push(left))
}

/// State type of a value analysis.
pub type ValueState<A> = ProgramState<<A as ValueAnalysis>::Value>;

/// A dataflow analysis tracking one abstract value per expression and
/// variable.
///
/// Every hook defaults to the stack discipline implemented by the free
/// functions of this module. Each `ValueAnalysis` is a
/// [`DataFlowAnalysis`].
pub trait ValueAnalysis: Sized {
    type Value: Clone + Eq + fmt::Debug + fmt::Display;
    type Joiner: Joiner<Value = Self::Value>;

    fn joiner(&self) -> &Self::Joiner;

    fn transfer_block(
        &self,
        _point: Cursor,
        _node: &Block,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_variable_declarations(
        &self,
        _point: Cursor,
        _node: &VariableDeclarations,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_named_variable(
        &self,
        _point: Cursor,
        node: &NamedVariable,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        named_variable(ValueAnalysis::joiner(self), node, state)
    }

    fn transfer_expression_statement(
        &self,
        _point: Cursor,
        _node: &ExpressionStatement,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        discard(state)
    }

    fn transfer_if(
        &self,
        _point: Cursor,
        _node: &If,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_else(
        &self,
        _point: Cursor,
        _node: &Else,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_while_loop(
        &self,
        _point: Cursor,
        _node: &WhileLoop,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_for_loop(
        &self,
        _point: Cursor,
        _node: &ForLoop,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_control_parentheses(
        &self,
        _point: Cursor,
        _node: &ControlParentheses,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        discard(state)
    }

    fn transfer_parentheses(
        &self,
        _point: Cursor,
        _node: &Parentheses,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_binary(
        &self,
        _point: Cursor,
        _node: &Binary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        consume(ValueAnalysis::joiner(self), 2, state)
    }

    fn transfer_unary(
        &self,
        _point: Cursor,
        _node: &Unary,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        consume(ValueAnalysis::joiner(self), 1, state)
    }

    fn transfer_assignment(
        &self,
        point: Cursor,
        node: &Assignment,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        assignment(point, node, state)
    }

    fn transfer_method_invocation(
        &self,
        _point: Cursor,
        node: &MethodInvocation,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        consume(ValueAnalysis::joiner(self), invocation_operands(node), state)
    }

    fn transfer_new_class(
        &self,
        _point: Cursor,
        node: &NewClass,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        consume(ValueAnalysis::joiner(self), node.args.len(), state)
    }

    fn transfer_field_access(
        &self,
        _point: Cursor,
        _node: &FieldAccess,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        consume(ValueAnalysis::joiner(self), 1, state)
    }

    fn transfer_return(
        &self,
        _point: Cursor,
        node: &Return,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        match node.expr {
            Some(_) => discard(state),
            None => Ok(state),
        }
    }

    fn transfer_literal(
        &self,
        _point: Cursor,
        _node: &Literal,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(push_unknown(ValueAnalysis::joiner(self), state))
    }

    fn transfer_identifier(
        &self,
        _point: Cursor,
        node: &Identifier,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(identifier(ValueAnalysis::joiner(self), node, state))
    }

    fn transfer_empty(&self, _point: Cursor, state: ValueState<Self>) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    /// See [`DataFlowAnalysis::narrow_on_branch`].
    fn narrow_on_branch(
        &self,
        _construct: Cursor,
        state: ValueState<Self>,
        _branch: Branch,
    ) -> AnalysisResult<ValueState<Self>> {
        Ok(state)
    }

    fn transfer_short_circuit(
        &self,
        _binary: Cursor,
        state: ValueState<Self>,
    ) -> AnalysisResult<ValueState<Self>> {
        short_circuit(state)
    }
}

impl<A: ValueAnalysis> DataFlowAnalysis for A {
    type Value = <A as ValueAnalysis>::Value;
    type Joiner = <A as ValueAnalysis>::Joiner;

    fn joiner(&self) -> &Self::Joiner {
        ValueAnalysis::joiner(self)
    }

    fn transfer_block(
        &self,
        point: Cursor,
        node: &Block,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_block(self, point, node, state)
    }

    fn transfer_variable_declarations(
        &self,
        point: Cursor,
        node: &VariableDeclarations,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_variable_declarations(self, point, node, state)
    }

    fn transfer_named_variable(
        &self,
        point: Cursor,
        node: &NamedVariable,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_named_variable(self, point, node, state)
    }

    fn transfer_expression_statement(
        &self,
        point: Cursor,
        node: &ExpressionStatement,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_expression_statement(self, point, node, state)
    }

    fn transfer_if(
        &self,
        point: Cursor,
        node: &If,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_if(self, point, node, state)
    }

    fn transfer_else(
        &self,
        point: Cursor,
        node: &Else,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_else(self, point, node, state)
    }

    fn transfer_while_loop(
        &self,
        point: Cursor,
        node: &WhileLoop,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_while_loop(self, point, node, state)
    }

    fn transfer_for_loop(
        &self,
        point: Cursor,
        node: &ForLoop,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_for_loop(self, point, node, state)
    }

    fn transfer_control_parentheses(
        &self,
        point: Cursor,
        node: &ControlParentheses,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_control_parentheses(self, point, node, state)
    }

    fn transfer_parentheses(
        &self,
        point: Cursor,
        node: &Parentheses,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_parentheses(self, point, node, state)
    }

    fn transfer_binary(
        &self,
        point: Cursor,
        node: &Binary,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_binary(self, point, node, state)
    }

    fn transfer_unary(
        &self,
        point: Cursor,
        node: &Unary,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_unary(self, point, node, state)
    }

    fn transfer_assignment(
        &self,
        point: Cursor,
        node: &Assignment,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_assignment(self, point, node, state)
    }

    fn transfer_method_invocation(
        &self,
        point: Cursor,
        node: &MethodInvocation,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_method_invocation(self, point, node, state)
    }

    fn transfer_new_class(
        &self,
        point: Cursor,
        node: &NewClass,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_new_class(self, point, node, state)
    }

    fn transfer_field_access(
        &self,
        point: Cursor,
        node: &FieldAccess,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_field_access(self, point, node, state)
    }

    fn transfer_return(
        &self,
        point: Cursor,
        node: &Return,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_return(self, point, node, state)
    }

    fn transfer_literal(
        &self,
        point: Cursor,
        node: &Literal,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_literal(self, point, node, state)
    }

    fn transfer_identifier(
        &self,
        point: Cursor,
        node: &Identifier,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_identifier(self, point, node, state)
    }

    fn transfer_empty(&self, point: Cursor, state: State<Self>) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_empty(self, point, state)
    }

    fn narrow_on_branch(
        &self,
        construct: Cursor,
        state: State<Self>,
        branch: Branch,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::narrow_on_branch(self, construct, state, branch)
    }

    fn transfer_short_circuit(
        &self,
        binary: Cursor,
        state: State<Self>,
    ) -> AnalysisResult<State<Self>> {
        ValueAnalysis::transfer_short_circuit(self, binary, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::Engine;
    use crate::errors::StateError;
    use crate::fixtures::{method_with, point};
    use crate::lattice::{ModalBoolean, ModalJoiner};

    /// Every expression is `NoIdea`, every declared variable `True`.
    struct Opaque {
        joiner: ModalJoiner,
    }

    impl ValueAnalysis for Opaque {
        type Value = ModalBoolean;
        type Joiner = ModalJoiner;

        fn joiner(&self) -> &ModalJoiner {
            &self.joiner
        }

        fn transfer_literal(
            &self,
            _point: Cursor,
            _node: &Literal,
            state: ValueState<Self>,
        ) -> AnalysisResult<ValueState<Self>> {
            Ok(state.push(ModalBoolean::NoIdea))
        }
    }

    fn opaque() -> Opaque {
        Opaque {
            joiner: ModalJoiner::new(ModalBoolean::True),
        }
    }

    #[test]
    fn free_functions_keep_stack_discipline() {
        let joiner = ModalJoiner::default();
        let state = push_unknown(&joiner, ProgramState::new());
        let state = push_unknown(&joiner, state.push(ModalBoolean::True));
        assert_eq!(state.stack_len(), 2);

        let state = consume(&joiner, 2, state).unwrap();
        assert_eq!(state.expr(), Ok(&ModalBoolean::Bottom));
        assert_eq!(state.stack_len(), 1);

        let state = short_circuit(state).unwrap();
        assert_eq!(state.stack_len(), 2);
        let state = discard(discard(state).unwrap()).unwrap();
        assert!(matches!(
            consume(&joiner, 1, state),
            Err(AnalysisError::ProtocolViolation {
                source: StateError::EmptyStack,
                ..
            })
        ));
    }

    #[test]
    fn values_flow_into_variables() {
        // String s = "a"; String t; t = s; f(s, t);
        let fixture = method_with(|b| {
            let a = b.string("a");
            let s_decl = b.var_decl("String", vec![("s", Some(a))]);
            let t_decl = b.var_decl("String", vec![("t", None)]);
            let s = b.ident("s");
            let assign = b.assign_stmt("t", s);
            let s2 = b.ident("s");
            let t2 = b.ident("t");
            let call = b.call_stmt("f", vec![s2, t2]);
            vec![s_decl, t_decl, assign, call]
        });
        let mut engine = Engine::new(&fixture.tree, opaque());
        engine.run(fixture.end).unwrap();

        let s = Variable::new("s");
        let t = Variable::new("t");
        let after_decl = engine.result_at(point(&fixture.tree, "t"));
        assert_eq!(after_decl.get(&t), Some(&ModalBoolean::True));
        assert_eq!(after_decl.stack_len(), 0);

        let assigned = engine.result_at(point(&fixture.tree, "t = s"));
        assert_eq!(assigned.get(&t), Some(&ModalBoolean::NoIdea));
        assert_eq!(assigned.expr(), Ok(&ModalBoolean::NoIdea));

        let call = engine.result_at(point(&fixture.tree, "f(s, t)"));
        assert_eq!(call.stack().copied().collect::<Vec<_>>(), vec![ModalBoolean::Bottom]);
        assert_eq!(engine.value_at(fixture.end, &s), ModalBoolean::NoIdea);
        assert_eq!(engine.result_at(fixture.end).stack_len(), 0);
    }

    #[test]
    fn absent_variables_read_as_lower_bound() {
        let fixture = method_with(|b| {
            let u = b.ident("u");
            vec![b.var_decl("String", vec![("s", Some(u))])]
        });
        let mut engine = Engine::new(&fixture.tree, opaque());
        engine.run(fixture.end).unwrap();
        assert_eq!(
            engine.result_at(point(&fixture.tree, "u")).expr(),
            Ok(&ModalBoolean::Bottom)
        );
        assert_eq!(
            engine.value_at(fixture.end, &Variable::new("s")),
            ModalBoolean::Bottom
        );
    }

    #[test]
    fn assigning_a_field_is_unhandled() {
        // x.f = 1;
        let fixture = method_with(|b| {
            let x = b.ident("x");
            let target = b.field(x, "f");
            let one = b.int(1);
            let assign = b.assign_to(target, one);
            vec![b.expr_stmt(assign)]
        });
        let mut engine = Engine::new(&fixture.tree, opaque());
        let err = engine.run(fixture.end).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnhandledConstruct {
                kind: "FieldAccess",
                ..
            }
        ));
    }

    #[test]
    fn return_consumes_its_value() {
        let fixture = method_with(|b| {
            let one = b.int(1);
            vec![b.ret(Some(one))]
        });
        let mut engine = Engine::new(&fixture.tree, opaque());
        engine.run(fixture.end).unwrap();
        assert_eq!(engine.result_at(point(&fixture.tree, "return 1;")).stack_len(), 0);
    }
}

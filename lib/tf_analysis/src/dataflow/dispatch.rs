use super::{DataFlowAnalysis, State};
use crate::errors::{AnalysisError, AnalysisResult};
use tf_tree::{Cursor, NodeKind};

/// Routes `point` to the transfer hook of its kind.
pub(crate) fn transfer<A: DataFlowAnalysis>(
    analysis: &A,
    point: Cursor,
    state: State<A>,
) -> AnalysisResult<State<A>> {
    match point.kind() {
        NodeKind::Block(node) => analysis.transfer_block(point, node, state),
        NodeKind::VariableDeclarations(node) => {
            analysis.transfer_variable_declarations(point, node, state)
        }
        NodeKind::NamedVariable(node) => analysis.transfer_named_variable(point, node, state),
        NodeKind::ExpressionStatement(node) => {
            analysis.transfer_expression_statement(point, node, state)
        }
        NodeKind::If(node) => analysis.transfer_if(point, node, state),
        NodeKind::Else(node) => analysis.transfer_else(point, node, state),
        NodeKind::WhileLoop(node) => analysis.transfer_while_loop(point, node, state),
        NodeKind::ForLoop(node) => analysis.transfer_for_loop(point, node, state),
        NodeKind::ControlParentheses(node) => {
            analysis.transfer_control_parentheses(point, node, state)
        }
        NodeKind::Parentheses(node) => analysis.transfer_parentheses(point, node, state),
        NodeKind::Binary(node) => analysis.transfer_binary(point, node, state),
        NodeKind::Unary(node) => analysis.transfer_unary(point, node, state),
        NodeKind::Assignment(node) => analysis.transfer_assignment(point, node, state),
        NodeKind::MethodInvocation(node) => analysis.transfer_method_invocation(point, node, state),
        NodeKind::NewClass(node) => analysis.transfer_new_class(point, node, state),
        NodeKind::FieldAccess(node) => analysis.transfer_field_access(point, node, state),
        NodeKind::Return(node) => analysis.transfer_return(point, node, state),
        NodeKind::Literal(node) => analysis.transfer_literal(point, node, state),
        NodeKind::Identifier(node) => analysis.transfer_identifier(point, node, state),
        NodeKind::Empty => analysis.transfer_empty(point, state),
        // declarations are flow roots, never points
        NodeKind::CompilationUnit(_)
        | NodeKind::ClassDeclaration(_)
        | NodeKind::MethodDeclaration(_)
        | NodeKind::Ternary(_)
        | NodeKind::Throw(_)
        | NodeKind::Break => Err(AnalysisError::unhandled(point)),
    }
}

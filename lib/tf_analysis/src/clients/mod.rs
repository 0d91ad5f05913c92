//! Ready-made value analyses.
//!
//! - [`constant_propagation`]: literal value of variables;
//! - [`nullness`]: whether variables hold `null`;
//! - [`path_safety`]: file paths built from archive entry names and not
//!   checked to stay under their destination directory.

use crate::flowgraph::Branch;
use tf_tree::{BinaryOp, Cursor, Literal, NodeKind, Unary, UnaryOp, Variable};

pub mod constant_propagation;
pub mod nullness;
pub mod path_safety;

fn strip_parentheses(mut cursor: Cursor) -> Option<Cursor> {
    while let NodeKind::Parentheses(parens) = cursor.kind() {
        cursor = cursor.at(parens.expr)?;
    }
    Some(cursor)
}

/// Condition of an `if` or a loop without its parentheses and `!`
/// operators, and whether an odd number of `!` was removed.
pub(crate) fn condition(construct: Cursor) -> Option<(Cursor, bool)> {
    let id = match construct.kind() {
        NodeKind::If(if_) => if_.condition,
        NodeKind::WhileLoop(while_) => while_.condition,
        NodeKind::ForLoop(for_) => for_.condition,
        _ => return None,
    };
    let mut negated = false;
    let mut cursor = construct.at(id)?;
    loop {
        cursor = match cursor.kind() {
            NodeKind::ControlParentheses(parens) => cursor.at(parens.expr)?,
            NodeKind::Parentheses(parens) => cursor.at(parens.expr)?,
            NodeKind::Unary(Unary {
                op: UnaryOp::Not,
                operand,
            }) => {
                negated = !negated;
                cursor.at(*operand)?
            }
            _ => return Some((cursor, negated)),
        };
    }
}

/// Whether a condition, negated or not, holds along `branch`.
pub(crate) fn holds(branch: Branch, negated: bool) -> bool {
    (branch == Branch::Then) != negated
}

/// An equality test between a variable and a literal.
pub(crate) struct Comparison<'t> {
    pub(crate) equal: bool,
    pub(crate) variable: &'t Variable,
    pub(crate) literal: &'t Literal,
}

pub(crate) fn comparison(cursor: Cursor) -> Option<Comparison> {
    let NodeKind::Binary(binary) = cursor.kind() else {
        return None;
    };
    let equal = match binary.op {
        BinaryOp::Eq => true,
        BinaryOp::Ne => false,
        _ => return None,
    };
    let left = strip_parentheses(cursor.at(binary.left)?)?;
    let right = strip_parentheses(cursor.at(binary.right)?)?;
    match (left.kind(), right.kind()) {
        (NodeKind::Identifier(ident), NodeKind::Literal(literal))
        | (NodeKind::Literal(literal), NodeKind::Identifier(ident)) => Some(Comparison {
            equal,
            variable: &ident.name,
            literal,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tf_tree::TreeBuilder;

    #[test]
    fn conditions_are_unwrapped() {
        // if (!(null != s)) { }
        let mut b = TreeBuilder::new();
        let null = b.null();
        let s = b.ident("s");
        let ne = b.binary(BinaryOp::Ne, null, s);
        let parens = b.parens(ne);
        let not = b.unary(UnaryOp::Not, parens);
        let then_part = b.block(vec![]);
        let if_ = b.if_then(not, then_part, None);
        let tree = b.finish(if_).unwrap();

        let (cond, negated) = condition(tree.root_cursor()).unwrap();
        assert_eq!(cond.id(), ne);
        assert!(negated);
        assert!(!holds(Branch::Then, negated));
        assert!(holds(Branch::Exit, negated));

        let test = comparison(cond).unwrap();
        assert!(!test.equal);
        assert_eq!(test.variable, &Variable::new("s"));
        assert_eq!(test.literal, &Literal::Null);
        assert!(condition(tree.cursor(s).unwrap()).is_none());
    }
}

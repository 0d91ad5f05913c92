//! Lookup helpers, mostly useful to write tests against printed source.

use crate::node::NodeKind;
use crate::{NodeId, Tree, Variable};

/// First node, in post-order, whose printed text is `text`.
///
/// Post-order makes the innermost match win: in `b();` the text `b()`
/// designates the invocation, not the statement.
#[must_use]
pub fn find_program_point(tree: &Tree, text: &str) -> Option<NodeId> {
    tree.post_order()
        .into_iter()
        .find(|id| tree.cursor(*id).map_or(false, |c| c.to_string() == text))
}

/// Identity of the first variable declared with `name`, either as a local
/// or as a method parameter.
#[must_use]
pub fn find_variable(tree: &Tree, name: &str) -> Option<Variable> {
    tree.post_order().into_iter().find_map(|id| match tree.kind(id) {
        Ok(NodeKind::NamedVariable(var)) if var.name.name() == name => Some(var.name.clone()),
        Ok(NodeKind::MethodDeclaration(method)) => method
            .params
            .iter()
            .find(|param| param.name.name() == name)
            .map(|param| param.name.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryOp, TreeBuilder};

    #[test]
    fn finds_innermost_point() {
        let mut b = TreeBuilder::new();
        let u = b.ident("u");
        let v = b.ident("v");
        let sum = b.binary(BinaryOp::Add, u, v);
        let decl = b.var_decl("int", vec![("i", Some(sum))]);
        let call = b.call_stmt("b", vec![]);
        let body = b.block(vec![decl, call]);
        let method = b.method("void", "m", &[("int", "u"), ("int", "v")], Some(body));
        let tree = b.finish(method).unwrap();

        assert_eq!(find_program_point(&tree, "u + v"), Some(sum));
        let named = find_program_point(&tree, "i = u + v").unwrap();
        assert_eq!(tree.parent(named), Some(decl));
        let invocation = find_program_point(&tree, "b()").unwrap();
        assert_eq!(tree.parent(invocation), Some(call));
        assert_eq!(find_program_point(&tree, "b();"), Some(call));
        assert_eq!(find_program_point(&tree, "c()"), None);
    }

    #[test]
    fn finds_locals_and_parameters() {
        let mut b = TreeBuilder::new();
        let decl = b.var_decl("String", vec![("s", None)]);
        let body = b.block(vec![decl]);
        let method = b.method("void", "m", &[("String", "u")], Some(body));
        let tree = b.finish(method).unwrap();

        assert_eq!(find_variable(&tree, "s"), Some(Variable::new("s")));
        assert_eq!(find_variable(&tree, "u"), Some(Variable::new("u")));
        assert_eq!(find_variable(&tree, "w"), None);
    }
}

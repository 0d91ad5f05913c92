//! Trees shared by the unit tests.

use tf_tree::search::find_program_point;
use tf_tree::{NodeId, Tree, TreeBuilder};

pub(crate) struct Fixture {
    pub(crate) tree: Tree,
    /// The `b();` statement closing the fragment.
    pub(crate) end: NodeId,
}

/// Builds
/// `class C { void a() { } void b() { } void m(String u, String v) { a(); FRAGMENT b(); } }`.
pub(crate) fn method_with<F>(fragment: F) -> Fixture
where
    F: FnOnce(&mut TreeBuilder) -> Vec<NodeId>,
{
    let mut b = TreeBuilder::new();
    let a_body = b.block(vec![]);
    let a = b.method("void", "a", &[], Some(a_body));
    let b_body = b.block(vec![]);
    let b_decl = b.method("void", "b", &[], Some(b_body));

    let start = b.call_stmt("a", vec![]);
    let mut statements = vec![start];
    statements.extend(fragment(&mut b));
    let end = b.call_stmt("b", vec![]);
    statements.push(end);
    let body = b.block(statements);
    let m = b.method("void", "m", &[("String", "u"), ("String", "v")], Some(body));
    let class = b.class("C", vec![a, b_decl, m]);
    let tree = b.finish(class).unwrap();
    Fixture { tree, end }
}

pub(crate) fn point(tree: &Tree, text: &str) -> NodeId {
    find_program_point(tree, text).unwrap_or_else(|| panic!("no program point `{text}`"))
}

//! Implicit flow graph over program points.
//!
//! No graph is materialized: predecessors are computed on demand from the
//! shape of the tree. Program points are expression and simple-statement
//! nodes; compound nodes (blocks, loops, conditionals, declaration lists)
//! are resolved inward to the points they start or end with, and are never
//! returned as predecessors themselves.

use crate::errors::{AnalysisError, AnalysisResult};
use serde::Serialize;
use std::fmt;
use tf_tree::{Cursor, NodeId, NodeKind, Tree};

/// Annotation of a flow edge leaving a branching construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Branch {
    /// Into the then-part of an `if`, or into a loop body.
    Then,
    /// Into the else-part of an `if`.
    Else,
    /// Out of a loop, or out of an `if` without else-part, when the
    /// condition does not hold.
    Exit,
    /// From the left operand of `&&` or `||` directly to the operator.
    ShortCircuit,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Then => write!(f, "then"),
            Self::Else => write!(f, "else"),
            Self::Exit => write!(f, "exit"),
            Self::ShortCircuit => write!(f, "short-circuit"),
        }
    }
}

/// A predecessor point, with the annotation of the edge reaching from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub point: NodeId,
    pub branch: Option<Branch>,
}

impl Edge {
    #[must_use]
    pub const fn plain(point: NodeId) -> Self {
        Self {
            point,
            branch: None,
        }
    }
}

/// Where, relative to a node, predecessors are asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Before the node itself, as a program point.
    Entry,
    /// After the node completed: its last points.
    Exit,
    /// Before the given direct child.
    Child(NodeId),
}

fn tagged(mut edges: Vec<Edge>, branch: Branch) -> Vec<Edge> {
    for edge in &mut edges {
        edge.branch = Some(branch);
    }
    edges
}

fn union(mut edges: Vec<Edge>, more: Vec<Edge>) -> Vec<Edge> {
    for edge in more {
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }
    edges
}

#[derive(Debug, Clone, Copy)]
pub struct FlowGraph<'t> {
    tree: &'t Tree,
}

impl<'t> FlowGraph<'t> {
    #[must_use]
    pub fn new(tree: &'t Tree) -> Self {
        Self { tree }
    }

    #[inline]
    #[must_use]
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    /// Points whose output flows into `point`.
    ///
    /// # Errors
    ///
    /// Fails on unsupported node kinds.
    pub fn previous(&self, point: NodeId) -> AnalysisResult<Vec<Edge>> {
        self.previous_in(point, Position::Entry)
    }

    /// Points whose output is the state after `node` completed.
    ///
    /// # Errors
    ///
    /// Fails on unsupported node kinds.
    pub fn last(&self, node: NodeId) -> AnalysisResult<Vec<Edge>> {
        self.previous_in(node, Position::Exit)
    }

    /// # Errors
    ///
    /// Fails on unsupported node kinds, and with an invariant violation
    /// when a `Position::Child` is not a direct child of `node`.
    pub fn previous_in(&self, node: NodeId, position: Position) -> AnalysisResult<Vec<Edge>> {
        let cursor = self.tree.cursor(node)?;
        match position {
            Position::Entry => self.entry(cursor),
            Position::Exit => self.exit(cursor),
            Position::Child(child) => {
                if cursor.child(child).is_none() {
                    return Err(AnalysisError::invariant(
                        cursor,
                        format!("{child} is not a child"),
                    ));
                }
                self.before_child(cursor, child)
            }
        }
    }

    fn exit_of(&self, id: NodeId) -> AnalysisResult<Vec<Edge>> {
        self.exit(self.tree.cursor(id)?)
    }

    // predecessors of `cursor` as decided by its parent
    fn context(&self, cursor: Cursor<'t>) -> AnalysisResult<Vec<Edge>> {
        match cursor.parent() {
            Some(parent) => self.before_child(parent, cursor.id()),
            None => Ok(Vec::new()),
        }
    }

    // predecessors of `child` within a sequence evaluated in order
    fn sequence<F>(&self, items: &[NodeId], child: NodeId, before_first: F) -> AnalysisResult<Vec<Edge>>
    where
        F: FnOnce() -> AnalysisResult<Vec<Edge>>,
    {
        match items.iter().position(|item| *item == child) {
            Some(0) | None => before_first(),
            Some(i) => self.exit_of(items[i - 1]),
        }
    }

    fn entry(&self, cursor: Cursor<'t>) -> AnalysisResult<Vec<Edge>> {
        match cursor.kind() {
            NodeKind::CompilationUnit(_)
            | NodeKind::ClassDeclaration(_)
            | NodeKind::MethodDeclaration(_) => Ok(Vec::new()),
            NodeKind::Block(_)
            | NodeKind::VariableDeclarations(_)
            | NodeKind::If(_)
            | NodeKind::Else(_)
            | NodeKind::WhileLoop(_)
            | NodeKind::ForLoop(_)
            | NodeKind::Parentheses(_)
            | NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::Empty => self.context(cursor),
            NodeKind::NamedVariable(var) => match var.initializer {
                Some(init) => self.exit_of(init),
                None => self.context(cursor),
            },
            NodeKind::ExpressionStatement(stmt) => self.exit_of(stmt.expr),
            NodeKind::ControlParentheses(parens) => self.exit_of(parens.expr),
            NodeKind::Binary(binary) => {
                let edges = self.exit_of(binary.right)?;
                if binary.op.is_short_circuit() {
                    let skipped = tagged(self.exit_of(binary.left)?, Branch::ShortCircuit);
                    Ok(union(edges, skipped))
                } else {
                    Ok(edges)
                }
            }
            NodeKind::Unary(unary) => self.exit_of(unary.operand),
            NodeKind::Assignment(assign) => self.exit_of(assign.value),
            NodeKind::FieldAccess(access) => self.exit_of(access.target),
            NodeKind::MethodInvocation(call) => match (call.args.last(), call.select) {
                (Some(last), _) => self.exit_of(*last),
                (None, Some(select)) => self.exit_of(select),
                (None, None) => self.context(cursor),
            },
            NodeKind::NewClass(new) => match new.args.last() {
                Some(last) => self.exit_of(*last),
                None => self.context(cursor),
            },
            NodeKind::Return(ret) => match ret.expr {
                Some(expr) => self.exit_of(expr),
                None => self.context(cursor),
            },
            NodeKind::Ternary(_) | NodeKind::Throw(_) | NodeKind::Break => {
                Err(AnalysisError::unhandled(cursor))
            }
        }
    }

    fn exit(&self, cursor: Cursor<'t>) -> AnalysisResult<Vec<Edge>> {
        match cursor.kind() {
            NodeKind::CompilationUnit(_) | NodeKind::ClassDeclaration(_) => Ok(Vec::new()),
            NodeKind::MethodDeclaration(method) => match method.body {
                Some(body) => self.exit_of(body),
                None => Ok(Vec::new()),
            },
            NodeKind::Block(block) => match block.statements.last() {
                Some(last) => self.exit_of(*last),
                None => self.context(cursor),
            },
            NodeKind::VariableDeclarations(decls) => match decls.variables.last() {
                Some(last) => self.exit_of(*last),
                None => self.context(cursor),
            },
            NodeKind::If(if_) => {
                let then_exit = self.exit_of(if_.then_part)?;
                let other = match if_.else_part {
                    Some(else_part) => self.exit_of(else_part)?,
                    None => tagged(self.exit_of(if_.condition)?, Branch::Exit),
                };
                Ok(union(then_exit, other))
            }
            NodeKind::Else(else_) => self.exit_of(else_.body),
            NodeKind::WhileLoop(while_) => Ok(union(
                self.exit_of(while_.body)?,
                tagged(self.exit_of(while_.condition)?, Branch::Exit),
            )),
            NodeKind::ForLoop(for_) => {
                let last = match (for_.update.last(), for_.init.last()) {
                    (Some(last), _) | (None, Some(last)) => self.exit_of(*last)?,
                    (None, None) => self.context(cursor)?,
                };
                Ok(union(
                    last,
                    tagged(self.exit_of(for_.condition)?, Branch::Exit),
                ))
            }
            NodeKind::Parentheses(parens) => self.exit_of(parens.expr),
            NodeKind::NamedVariable(_)
            | NodeKind::ExpressionStatement(_)
            | NodeKind::ControlParentheses(_)
            | NodeKind::Binary(_)
            | NodeKind::Unary(_)
            | NodeKind::Assignment(_)
            | NodeKind::MethodInvocation(_)
            | NodeKind::NewClass(_)
            | NodeKind::FieldAccess(_)
            | NodeKind::Return(_)
            | NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::Empty => Ok(vec![Edge::plain(cursor.id())]),
            NodeKind::Ternary(_) | NodeKind::Throw(_) | NodeKind::Break => {
                Err(AnalysisError::unhandled(cursor))
            }
        }
    }

    fn before_child(&self, cursor: Cursor<'t>, child: NodeId) -> AnalysisResult<Vec<Edge>> {
        match cursor.kind() {
            NodeKind::CompilationUnit(_)
            | NodeKind::ClassDeclaration(_)
            | NodeKind::MethodDeclaration(_) => Ok(Vec::new()),
            NodeKind::Block(block) => {
                self.sequence(&block.statements, child, || self.context(cursor))
            }
            NodeKind::VariableDeclarations(decls) => {
                self.sequence(&decls.variables, child, || self.context(cursor))
            }
            NodeKind::NamedVariable(_)
            | NodeKind::ExpressionStatement(_)
            | NodeKind::Else(_)
            | NodeKind::ControlParentheses(_)
            | NodeKind::Parentheses(_)
            | NodeKind::Unary(_)
            | NodeKind::FieldAccess(_)
            | NodeKind::Return(_) => self.context(cursor),
            NodeKind::If(if_) => {
                if child == if_.condition {
                    self.context(cursor)
                } else if child == if_.then_part {
                    Ok(tagged(self.exit_of(if_.condition)?, Branch::Then))
                } else {
                    Ok(tagged(self.exit_of(if_.condition)?, Branch::Else))
                }
            }
            NodeKind::WhileLoop(while_) => {
                if child == while_.condition {
                    let entering = self.context(cursor)?;
                    Ok(union(entering, self.exit_of(while_.body)?))
                } else {
                    Ok(tagged(self.exit_of(while_.condition)?, Branch::Then))
                }
            }
            NodeKind::ForLoop(for_) => {
                let last_init = || match for_.init.last() {
                    Some(last) => self.exit_of(*last),
                    None => self.context(cursor),
                };
                if child == for_.condition {
                    let last_update = match for_.update.last() {
                        Some(last) => self.exit_of(*last)?,
                        None => self.exit_of(for_.body)?,
                    };
                    Ok(union(last_init()?, last_update))
                } else if child == for_.body {
                    Ok(tagged(self.exit_of(for_.condition)?, Branch::Then))
                } else if for_.init.contains(&child) {
                    self.sequence(&for_.init, child, || self.context(cursor))
                } else {
                    self.sequence(&for_.update, child, || self.exit_of(for_.body))
                }
            }
            NodeKind::Binary(binary) => {
                if child == binary.left {
                    self.context(cursor)
                } else {
                    self.exit_of(binary.left)
                }
            }
            NodeKind::Assignment(assign) => {
                if child == assign.target {
                    Ok(Vec::new())
                } else {
                    self.context(cursor)
                }
            }
            NodeKind::MethodInvocation(call) => {
                if Some(child) == call.select {
                    self.context(cursor)
                } else {
                    self.sequence(&call.args, child, || match call.select {
                        Some(select) => self.exit_of(select),
                        None => self.context(cursor),
                    })
                }
            }
            NodeKind::NewClass(new) => self.sequence(&new.args, child, || self.context(cursor)),
            NodeKind::Literal(_) | NodeKind::Identifier(_) | NodeKind::Empty => Err(
                AnalysisError::invariant(cursor, format!("{child} is not a child")),
            ),
            NodeKind::Ternary(_) | NodeKind::Throw(_) | NodeKind::Break => {
                Err(AnalysisError::unhandled(cursor))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{method_with, point};
    use tf_tree::{BinaryOp, TreeBuilder};

    fn texts(tree: &Tree, edges: &[Edge]) -> Vec<String> {
        edges
            .iter()
            .map(|edge| {
                let text = tree.cursor(edge.point).unwrap().to_string();
                match edge.branch {
                    Some(branch) => format!("{text} [{branch}]"),
                    None => text,
                }
            })
            .collect()
    }

    fn previous(tree: &Tree, text: &str) -> Vec<String> {
        let graph = FlowGraph::new(tree);
        texts(tree, &graph.previous(point(tree, text)).unwrap())
    }

    fn last(tree: &Tree, text: &str) -> Vec<String> {
        let graph = FlowGraph::new(tree);
        texts(tree, &graph.last(point(tree, text)).unwrap())
    }

    #[test]
    fn declarations_flow_left_to_right() {
        // int i = u + v, j = w;
        let fixture = method_with(|b| {
            let u = b.ident("u");
            let v = b.ident("v");
            let sum = b.binary(BinaryOp::Add, u, v);
            let w = b.ident("w");
            vec![b.var_decl("int", vec![("i", Some(sum)), ("j", Some(w))])]
        });
        let tree = &fixture.tree;

        assert_eq!(previous(tree, "u"), vec!["a();"]);
        assert_eq!(previous(tree, "v"), vec!["u"]);
        assert_eq!(previous(tree, "u + v"), vec!["v"]);
        assert_eq!(previous(tree, "i = u + v"), vec!["u + v"]);
        assert_eq!(previous(tree, "w"), vec!["i = u + v"]);
        assert_eq!(previous(tree, "j = w"), vec!["w"]);
        assert_eq!(previous(tree, "b()"), vec!["j = w"]);
        assert_eq!(previous(tree, "b();"), vec!["b()"]);
        assert_eq!(last(tree, "int i = u + v, j = w;"), vec!["j = w"]);
    }

    #[test]
    fn if_else_branches_are_tagged() {
        // if (c) { s = "a"; } else { s = "b"; }
        let fixture = method_with(|b| {
            let c = b.ident("c");
            let a = b.string("a");
            let then_stmt = b.assign_stmt("s", a);
            let then_part = b.block(vec![then_stmt]);
            let bb = b.string("b");
            let else_stmt = b.assign_stmt("s", bb);
            let else_part = b.block(vec![else_stmt]);
            vec![b.if_then(c, then_part, Some(else_part))]
        });
        let tree = &fixture.tree;

        assert_eq!(previous(tree, "c"), vec!["a();"]);
        assert_eq!(previous(tree, "(c)"), vec!["c"]);
        assert_eq!(previous(tree, "\"a\""), vec!["(c) [then]"]);
        assert_eq!(previous(tree, "\"b\""), vec!["(c) [else]"]);
        assert_eq!(
            last(tree, "if (c) { s = \"a\"; } else { s = \"b\"; }"),
            vec!["s = \"a\";", "s = \"b\";"]
        );
    }

    #[test]
    fn if_without_else_exits_through_condition() {
        let fixture = method_with(|b| {
            let c = b.ident("c");
            let a = b.string("a");
            let then_stmt = b.assign_stmt("s", a);
            let then_part = b.block(vec![then_stmt]);
            vec![b.if_then(c, then_part, None)]
        });
        let tree = &fixture.tree;

        assert_eq!(
            last(tree, "if (c) { s = \"a\"; }"),
            vec!["s = \"a\";", "(c) [exit]"]
        );
        assert_eq!(previous(tree, "b()"), vec!["s = \"a\";", "(c) [exit]"]);
    }

    #[test]
    fn while_condition_has_back_edge() {
        // String s = null; while (c) { s = "a"; }
        let fixture = method_with(|b| {
            let null = b.null();
            let decl = b.var_decl("String", vec![("s", Some(null))]);
            let c = b.ident("c");
            let a = b.string("a");
            let stmt = b.assign_stmt("s", a);
            let body = b.block(vec![stmt]);
            vec![decl, b.while_loop(c, body)]
        });
        let tree = &fixture.tree;

        assert_eq!(previous(tree, "c"), vec!["s = null", "s = \"a\";"]);
        assert_eq!(previous(tree, "\"a\""), vec!["(c) [then]"]);
        assert_eq!(
            last(tree, "while (c) { s = \"a\"; }"),
            vec!["s = \"a\";", "(c) [exit]"]
        );
    }

    #[test]
    fn empty_loop_body_loops_on_condition() {
        let fixture = method_with(|b| {
            let c = b.ident("c");
            let body = b.block(vec![]);
            vec![b.while_loop(c, body)]
        });
        let tree = &fixture.tree;
        assert_eq!(previous(tree, "c"), vec!["a();", "(c) [then]"]);
    }

    #[test]
    fn for_loop_wiring() {
        // for (int i = 0; i < 3; i = i + 1) { s = "a"; }
        let mut update_stmt = None;
        let fixture = method_with(|b| {
            let zero = b.int(0);
            let init = b.var_decl("int", vec![("i", Some(zero))]);
            let i = b.ident("i");
            let three = b.int(3);
            let cond = b.binary(BinaryOp::Lt, i, three);
            let i2 = b.ident("i");
            let one = b.int(1);
            let next = b.binary(BinaryOp::Add, i2, one);
            let update = b.assign_stmt("i", next);
            update_stmt = Some(update);
            let a = b.string("a");
            let stmt = b.assign_stmt("s", a);
            let body = b.block(vec![stmt]);
            vec![b.for_loop(vec![init], cond, vec![update], body)]
        });
        let tree = &fixture.tree;
        let graph = FlowGraph::new(tree);
        let for_ = point(tree, "for (int i = 0; i < 3; i = i + 1) { s = \"a\"; }");

        assert_eq!(previous(tree, "0"), vec!["a();"]);
        assert_eq!(previous(tree, "i < 3"), vec!["3"]);
        assert_eq!(previous(tree, "\"a\""), vec!["(i < 3) [then]"]);
        assert_eq!(
            texts(tree, &graph.last(for_).unwrap()),
            vec!["i = i + 1;", "(i < 3) [exit]"]
        );
        let update = update_stmt.unwrap();
        assert_eq!(
            texts(
                tree,
                &graph.previous_in(for_, Position::Child(update)).unwrap()
            ),
            vec!["s = \"a\";"]
        );
        let NodeKind::ForLoop(node) = tree.kind(for_).unwrap() else {
            panic!("not a for loop");
        };
        assert_eq!(
            texts(
                tree,
                &graph
                    .previous_in(for_, Position::Child(node.condition))
                    .unwrap()
            ),
            vec!["i = 0", "i = i + 1;"]
        );
    }

    #[test]
    fn short_circuit_edge() {
        let fixture = method_with(|b| {
            let c = b.ident("c");
            let d = b.ident("d");
            let and = b.binary(BinaryOp::And, c, d);
            vec![b.var_decl("boolean", vec![("f", Some(and))])]
        });
        let tree = &fixture.tree;
        assert_eq!(previous(tree, "c && d"), vec!["d", "c [short-circuit]"]);
        assert_eq!(previous(tree, "d"), vec!["c"]);
    }

    #[test]
    fn invocation_evaluates_select_then_arguments() {
        let fixture = method_with(|b| {
            let x = b.ident("x");
            let u = b.ident("u");
            let v = b.ident("v");
            let call = b.invoke(Some(x), "f", vec![u, v]);
            let new = b.new_class("File", vec![]);
            let field = b.field(new, "path");
            vec![b.expr_stmt(call), b.var_decl("String", vec![("p", Some(field))])]
        });
        let tree = &fixture.tree;
        assert_eq!(previous(tree, "x"), vec!["a();"]);
        assert_eq!(previous(tree, "u"), vec!["x"]);
        assert_eq!(previous(tree, "x.f(u, v)"), vec!["v"]);
        assert_eq!(previous(tree, "new File()"), vec!["x.f(u, v);"]);
        assert_eq!(previous(tree, "new File().path"), vec!["new File()"]);
    }

    #[test]
    fn assignment_target_is_not_a_point() {
        let fixture = method_with(|b| {
            let one = b.int(1);
            vec![b.assign_stmt("x", one)]
        });
        let tree = &fixture.tree;
        let graph = FlowGraph::new(tree);
        let assign = point(tree, "x = 1");
        let NodeKind::Assignment(node) = tree.kind(assign).unwrap() else {
            panic!("not an assignment");
        };
        assert!(graph
            .previous_in(assign, Position::Child(node.target))
            .unwrap()
            .is_empty());
        assert_eq!(previous(tree, "x = 1"), vec!["1"]);
        assert_eq!(previous(tree, "1"), vec!["a();"]);
    }

    #[test]
    fn declarations_are_flow_roots() {
        let fixture = method_with(|_| vec![]);
        let tree = &fixture.tree;
        let graph = FlowGraph::new(tree);
        assert!(graph.previous(tree.root()).unwrap().is_empty());
        assert!(graph.last(tree.root()).unwrap().is_empty());
        assert_eq!(previous(tree, "a()"), Vec::<String>::new());
        assert_eq!(last(tree, "void b() { }"), Vec::<String>::new());
        assert_eq!(
            last(tree, "void m(String u, String v) { a(); b(); }"),
            vec!["b();"]
        );
    }

    #[test]
    fn unsupported_kinds_are_reported() {
        let fixture = method_with(|b| {
            let c = b.ident("c");
            let a = b.string("a");
            let bb = b.string("b");
            let ternary = b.ternary(c, a, bb);
            vec![b.var_decl("String", vec![("s", Some(ternary))])]
        });
        let tree = &fixture.tree;
        let graph = FlowGraph::new(tree);
        let err = graph
            .previous(point(tree, "s = c ? \"a\" : \"b\""))
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnhandledConstruct {
                kind: "Ternary",
                ..
            }
        ));
    }

    #[test]
    fn foreign_child_is_an_invariant_violation() {
        let mut b = TreeBuilder::new();
        let x = b.ident("x");
        let stmt = b.expr_stmt(x);
        let y = b.ident("y");
        let other = b.expr_stmt(y);
        let block = b.block(vec![stmt, other]);
        let tree = b.finish(block).unwrap();
        let graph = FlowGraph::new(&tree);

        assert!(matches!(
            graph.previous_in(block, Position::Child(x)),
            Err(AnalysisError::InvariantViolation { .. })
        ));
        assert_eq!(
            graph.previous_in(block, Position::Child(other)).unwrap(),
            vec![Edge::plain(stmt)]
        );
    }
}

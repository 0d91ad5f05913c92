//! One-line Java-like rendering of subtrees.

use crate::node::NodeKind;
use crate::{Cursor, NodeId, Tree};
use std::fmt;

impl fmt::Display for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_node(self.tree(), self.id(), f)
    }
}

fn write_list(tree: &Tree, ids: &[NodeId], sep: &str, f: &mut fmt::Formatter) -> fmt::Result {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write_node(tree, *id, f)?;
    }
    Ok(())
}

// statements of a for-loop header, without their trailing semicolon
fn write_bare(tree: &Tree, ids: &[NodeId], f: &mut fmt::Formatter) -> fmt::Result {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        match &tree.node(*id).kind {
            NodeKind::VariableDeclarations(decls) => {
                write!(f, "{} ", decls.type_name)?;
                write_list(tree, &decls.variables, ", ", f)?;
            }
            NodeKind::ExpressionStatement(stmt) => write_node(tree, stmt.expr, f)?,
            _ => write_node(tree, *id, f)?,
        }
    }
    Ok(())
}

fn write_block(tree: &Tree, statements: &[NodeId], f: &mut fmt::Formatter) -> fmt::Result {
    if statements.is_empty() {
        return write!(f, "{{ }}");
    }
    write!(f, "{{ ")?;
    write_list(tree, statements, " ", f)?;
    write!(f, " }}")
}

fn write_node(tree: &Tree, id: NodeId, f: &mut fmt::Formatter) -> fmt::Result {
    match &tree.node(id).kind {
        NodeKind::CompilationUnit(cu) => write_list(tree, &cu.classes, "\n", f),
        NodeKind::ClassDeclaration(class) => {
            write!(f, "class {} ", class.name)?;
            write_block(tree, &class.members, f)
        }
        NodeKind::MethodDeclaration(method) => {
            write!(f, "{} {}(", method.return_type, method.name)?;
            for (i, param) in method.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", param.type_name, param.name)?;
            }
            match method.body {
                Some(body) => {
                    write!(f, ") ")?;
                    write_node(tree, body, f)
                }
                None => write!(f, ");"),
            }
        }
        NodeKind::Block(block) => write_block(tree, &block.statements, f),
        NodeKind::VariableDeclarations(decls) => {
            write!(f, "{} ", decls.type_name)?;
            write_list(tree, &decls.variables, ", ", f)?;
            write!(f, ";")
        }
        NodeKind::NamedVariable(var) => {
            write!(f, "{}", var.name)?;
            if let Some(init) = var.initializer {
                write!(f, " = ")?;
                write_node(tree, init, f)?;
            }
            Ok(())
        }
        NodeKind::ExpressionStatement(stmt) => {
            write_node(tree, stmt.expr, f)?;
            write!(f, ";")
        }
        NodeKind::If(if_) => {
            write!(f, "if ")?;
            write_node(tree, if_.condition, f)?;
            write!(f, " ")?;
            write_node(tree, if_.then_part, f)?;
            if let Some(else_part) = if_.else_part {
                write!(f, " ")?;
                write_node(tree, else_part, f)?;
            }
            Ok(())
        }
        NodeKind::Else(else_) => {
            write!(f, "else ")?;
            write_node(tree, else_.body, f)
        }
        NodeKind::WhileLoop(while_) => {
            write!(f, "while ")?;
            write_node(tree, while_.condition, f)?;
            write!(f, " ")?;
            write_node(tree, while_.body, f)
        }
        NodeKind::ForLoop(for_) => {
            write!(f, "for (")?;
            write_bare(tree, &for_.init, f)?;
            write!(f, "; ")?;
            match &tree.node(for_.condition).kind {
                NodeKind::ControlParentheses(control) => write_node(tree, control.expr, f)?,
                _ => write_node(tree, for_.condition, f)?,
            }
            write!(f, "; ")?;
            write_bare(tree, &for_.update, f)?;
            write!(f, ") ")?;
            write_node(tree, for_.body, f)
        }
        NodeKind::ControlParentheses(parens) => {
            write!(f, "(")?;
            write_node(tree, parens.expr, f)?;
            write!(f, ")")
        }
        NodeKind::Parentheses(parens) => {
            write!(f, "(")?;
            write_node(tree, parens.expr, f)?;
            write!(f, ")")
        }
        NodeKind::Binary(binary) => {
            write_node(tree, binary.left, f)?;
            write!(f, " {} ", binary.op.symbol())?;
            write_node(tree, binary.right, f)
        }
        NodeKind::Unary(unary) => {
            write!(f, "{}", unary.op.symbol())?;
            write_node(tree, unary.operand, f)
        }
        NodeKind::Assignment(assign) => {
            write_node(tree, assign.target, f)?;
            write!(f, " = ")?;
            write_node(tree, assign.value, f)
        }
        NodeKind::MethodInvocation(call) => {
            if let Some(select) = call.select {
                write_node(tree, select, f)?;
                write!(f, ".")?;
            }
            write!(f, "{}(", call.name)?;
            write_list(tree, &call.args, ", ", f)?;
            write!(f, ")")
        }
        NodeKind::NewClass(new) => {
            write!(f, "new {}(", new.class_name)?;
            write_list(tree, &new.args, ", ", f)?;
            write!(f, ")")
        }
        NodeKind::FieldAccess(access) => {
            write_node(tree, access.target, f)?;
            write!(f, ".{}", access.name)
        }
        NodeKind::Return(ret) => match ret.expr {
            Some(expr) => {
                write!(f, "return ")?;
                write_node(tree, expr, f)?;
                write!(f, ";")
            }
            None => write!(f, "return;"),
        },
        NodeKind::Literal(literal) => write!(f, "{literal}"),
        NodeKind::Identifier(ident) => write!(f, "{}", ident.name),
        NodeKind::Empty => write!(f, ";"),
        NodeKind::Ternary(ternary) => {
            write_node(tree, ternary.condition, f)?;
            write!(f, " ? ")?;
            write_node(tree, ternary.then_expr, f)?;
            write!(f, " : ")?;
            write_node(tree, ternary.else_expr, f)
        }
        NodeKind::Throw(throw) => {
            write!(f, "throw ")?;
            write_node(tree, throw.expr, f)?;
            write!(f, ";")
        }
        NodeKind::Break => write!(f, "break;"),
    }
}

#[cfg(test)]
mod tests {
    use crate::{BinaryOp, TreeBuilder, UnaryOp};

    #[test]
    fn prints_control_flow() {
        let mut b = TreeBuilder::new();
        let x = b.ident("x");
        let zero = b.int(0);
        let cond = b.binary(BinaryOp::Eq, x, zero);
        let value = b.string("b");
        let assign = b.assign_stmt("s", value);
        let body = b.block(vec![assign]);
        let while_ = b.while_loop(cond, body);
        let tree = b.finish(while_).unwrap();
        assert_eq!(
            tree.root_cursor().to_string(),
            "while (x == 0) { s = \"b\"; }"
        );
    }

    #[test]
    fn prints_for_header_without_semicolons() {
        let mut b = TreeBuilder::new();
        let zero = b.int(0);
        let init = b.var_decl("int", vec![("i", Some(zero))]);
        let i = b.ident("i");
        let ten = b.int(10);
        let cond = b.binary(BinaryOp::Lt, i, ten);
        let i2 = b.ident("i");
        let one = b.int(1);
        let next = b.binary(BinaryOp::Add, i2, one);
        let update = b.assign_stmt("i", next);
        let body = b.block(vec![]);
        let for_ = b.for_loop(vec![init], cond, vec![update], body);
        let tree = b.finish(for_).unwrap();
        assert_eq!(
            tree.root_cursor().to_string(),
            "for (int i = 0; i < 10; i = i + 1) { }"
        );
    }

    #[test]
    fn prints_declarations_and_calls() {
        let mut b = TreeBuilder::new();
        let a = b.string("a");
        let select = b.parens(a);
        let call = b.invoke(Some(select), "toUpperCase", vec![]);
        let not = b.boolean(true);
        let neg = b.unary(UnaryOp::Not, not);
        let decl = b.var_decl("String", vec![("s", Some(call)), ("t", None)]);
        let flag = b.var_decl("boolean", vec![("f", Some(neg))]);
        let body = b.block(vec![decl, flag]);
        let method = b.method("void", "m", &[("String", "u")], Some(body));
        let class = b.class("C", vec![method]);
        let tree = b.finish(class).unwrap();
        assert_eq!(
            tree.root_cursor().to_string(),
            "class C { void m(String u) { String s = (\"a\").toUpperCase(), t; boolean f = !true; } }"
        );
    }
}

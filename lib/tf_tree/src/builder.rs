use crate::errors::{TreeError, TreeResult};
use crate::node::*;
use crate::{Node, NodeId, Tree};

/// Bottom-up tree construction.
///
/// Children are created before their parent; creating the parent attaches
/// them. Misuse (attaching a node twice, referring to an unknown node) does
/// not fail immediately: the first error is remembered and reported by
/// [`TreeBuilder::finish`].
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    error: Option<TreeError>,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        for child in kind.children() {
            match self.nodes.get_mut(child.index()) {
                None => self.fail(TreeError::UnknownNode(child)),
                Some(node) => match node.parent {
                    Some(parent) => self.fail(TreeError::AlreadyAttached { child, parent }),
                    None => node.parent = Some(id),
                },
            }
        }
        self.nodes.push(Node { kind, parent: None });
        id
    }

    fn fail(&mut self, error: TreeError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Seals the tree.
    ///
    /// # Errors
    ///
    /// Returns the first construction error, or an error if `root` is not
    /// the only node without a parent.
    pub fn finish(self, root: NodeId) -> TreeResult<Tree> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let node = self
            .nodes
            .get(root.index())
            .ok_or(TreeError::UnknownNode(root))?;
        if node.parent.is_some() {
            return Err(TreeError::NoRoot(root));
        }
        if let Some(index) = self
            .nodes
            .iter()
            .enumerate()
            .position(|(index, node)| index != root.index() && node.parent.is_none())
        {
            return Err(TreeError::Detached(NodeId::new(index as u32)));
        }
        Ok(Tree {
            nodes: self.nodes,
            root,
        })
    }

    pub fn literal(&mut self, literal: Literal) -> NodeId {
        self.add(NodeKind::Literal(literal))
    }

    pub fn null(&mut self) -> NodeId {
        self.literal(Literal::Null)
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.literal(Literal::String(value.to_string()))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.literal(Literal::Integer(value))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.literal(Literal::Boolean(value))
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Identifier(Identifier {
            name: Variable::new(name),
        }))
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Binary(Binary { op, left, right }))
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.add(NodeKind::Unary(Unary { op, operand }))
    }

    pub fn parens(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::Parentheses(Parentheses { expr }))
    }

    pub fn control(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::ControlParentheses(ControlParentheses { expr }))
    }

    /// `name = value`
    pub fn assign(&mut self, name: &str, value: NodeId) -> NodeId {
        let target = self.ident(name);
        self.assign_to(target, value)
    }

    pub fn assign_to(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.add(NodeKind::Assignment(Assignment { target, value }))
    }

    pub fn invoke(&mut self, select: Option<NodeId>, name: &str, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::MethodInvocation(MethodInvocation {
            select,
            name: name.to_string(),
            args,
            method_type: None,
        }))
    }

    pub fn typed_invoke(
        &mut self,
        select: Option<NodeId>,
        name: &str,
        args: Vec<NodeId>,
        method_type: MethodType,
    ) -> NodeId {
        self.add(NodeKind::MethodInvocation(MethodInvocation {
            select,
            name: name.to_string(),
            args,
            method_type: Some(method_type),
        }))
    }

    pub fn new_class(&mut self, class_name: &str, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::NewClass(NewClass {
            class_name: class_name.to_string(),
            args,
            constructor_type: None,
        }))
    }

    pub fn typed_new_class(
        &mut self,
        class_name: &str,
        args: Vec<NodeId>,
        constructor_type: MethodType,
    ) -> NodeId {
        self.add(NodeKind::NewClass(NewClass {
            class_name: class_name.to_string(),
            args,
            constructor_type: Some(constructor_type),
        }))
    }

    pub fn field(&mut self, target: NodeId, name: &str) -> NodeId {
        self.add(NodeKind::FieldAccess(FieldAccess {
            target,
            name: name.to_string(),
        }))
    }

    pub fn ternary(&mut self, condition: NodeId, then_expr: NodeId, else_expr: NodeId) -> NodeId {
        self.add(NodeKind::Ternary(Ternary {
            condition,
            then_expr,
            else_expr,
        }))
    }

    pub fn named_var(&mut self, name: &str, initializer: Option<NodeId>) -> NodeId {
        self.add(NodeKind::NamedVariable(NamedVariable {
            name: Variable::new(name),
            initializer,
        }))
    }

    /// `type_name a = .., b, ..;`
    pub fn var_decl(&mut self, type_name: &str, variables: Vec<(&str, Option<NodeId>)>) -> NodeId {
        let variables = variables
            .into_iter()
            .map(|(name, init)| self.named_var(name, init))
            .collect();
        self.add(NodeKind::VariableDeclarations(VariableDeclarations {
            type_name: type_name.to_string(),
            variables,
        }))
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::ExpressionStatement(ExpressionStatement { expr }))
    }

    /// `name = value;`
    pub fn assign_stmt(&mut self, name: &str, value: NodeId) -> NodeId {
        let assign = self.assign(name, value);
        self.expr_stmt(assign)
    }

    /// `name(args);`
    pub fn call_stmt(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        let call = self.invoke(None, name, args);
        self.expr_stmt(call)
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Block(Block { statements }))
    }

    /// Builds an `if`, wrapping `condition` in control parentheses and the
    /// else-part in an `Else` node.
    pub fn if_then(&mut self, condition: NodeId, then_part: NodeId, else_part: Option<NodeId>) -> NodeId {
        let condition = self.control(condition);
        let else_part = else_part.map(|body| self.add(NodeKind::Else(Else { body })));
        self.add(NodeKind::If(If {
            condition,
            then_part,
            else_part,
        }))
    }

    pub fn while_loop(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        let condition = self.control(condition);
        self.add(NodeKind::WhileLoop(WhileLoop { condition, body }))
    }

    pub fn for_loop(
        &mut self,
        init: Vec<NodeId>,
        condition: NodeId,
        update: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let condition = self.control(condition);
        self.add(NodeKind::ForLoop(ForLoop {
            init,
            condition,
            update,
            body,
        }))
    }

    pub fn ret(&mut self, expr: Option<NodeId>) -> NodeId {
        self.add(NodeKind::Return(Return { expr }))
    }

    pub fn throw(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::Throw(Throw { expr }))
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.add(NodeKind::Break)
    }

    pub fn empty(&mut self) -> NodeId {
        self.add(NodeKind::Empty)
    }

    /// `return_type name(type param, ..) body`
    pub fn method(
        &mut self,
        return_type: &str,
        name: &str,
        params: &[(&str, &str)],
        body: Option<NodeId>,
    ) -> NodeId {
        let params = params
            .iter()
            .map(|(type_name, name)| Parameter {
                type_name: (*type_name).to_string(),
                name: Variable::new(*name),
            })
            .collect();
        self.add(NodeKind::MethodDeclaration(MethodDeclaration {
            return_type: return_type.to_string(),
            name: name.to_string(),
            params,
            body,
        }))
    }

    pub fn class(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::ClassDeclaration(ClassDeclaration {
            name: name.to_string(),
            members,
        }))
    }

    pub fn compilation_unit(&mut self, classes: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::CompilationUnit(CompilationUnit { classes }))
    }
}

//! Node kinds of the syntax tree.
//!
//! Every structural kind carries its own struct holding the identifiers of
//! its sub-parts, in source (and evaluation) order.

use crate::NodeId;
use serde::Serialize;
use std::fmt;

/// Resolved identity of a local variable or parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Variable(String);

impl Variable {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl Literal {
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// `&&` and `||` may skip their right operand.
    #[inline]
    #[must_use]
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

impl UnaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "-",
            Self::Pos => "+",
        }
    }
}

/// Type attribution of an invoked method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodType {
    pub declaring_type: String,
    pub parameter_types: Vec<String>,
}

impl MethodType {
    pub fn new<S: Into<String>>(declaring_type: S, parameter_types: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            parameter_types: parameter_types.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub classes: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDeclaration {
    pub name: String,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub type_name: String,
    pub name: Variable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDeclaration {
    pub return_type: String,
    pub name: String,
    pub params: Vec<Parameter>,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDeclarations {
    pub type_name: String,
    pub variables: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedVariable {
    pub name: Variable,
    pub initializer: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionStatement {
    pub expr: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    /// Always a `ControlParentheses` node.
    pub condition: NodeId,
    pub then_part: NodeId,
    /// Always an `Else` node.
    pub else_part: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Else {
    pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhileLoop {
    pub condition: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForLoop {
    pub init: Vec<NodeId>,
    pub condition: NodeId,
    pub update: Vec<NodeId>,
    pub body: NodeId,
}

/// Parentheses around the condition of a control construct.
///
/// The value of the condition is consumed here, which makes this node the
/// source of the branch edges of its enclosing `if`, `while` or `for`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlParentheses {
    pub expr: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parentheses {
    pub expr: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub target: NodeId,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInvocation {
    pub select: Option<NodeId>,
    pub name: String,
    pub args: Vec<NodeId>,
    pub method_type: Option<MethodType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClass {
    pub class_name: String,
    pub args: Vec<NodeId>,
    pub constructor_type: Option<MethodType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccess {
    pub target: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return {
    pub expr: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: Variable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ternary {
    pub condition: NodeId,
    pub then_expr: NodeId,
    pub else_expr: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throw {
    pub expr: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    CompilationUnit(CompilationUnit),
    ClassDeclaration(ClassDeclaration),
    MethodDeclaration(MethodDeclaration),
    Block(Block),
    VariableDeclarations(VariableDeclarations),
    NamedVariable(NamedVariable),
    ExpressionStatement(ExpressionStatement),
    If(If),
    Else(Else),
    WhileLoop(WhileLoop),
    ForLoop(ForLoop),
    ControlParentheses(ControlParentheses),
    Parentheses(Parentheses),
    Binary(Binary),
    Unary(Unary),
    Assignment(Assignment),
    MethodInvocation(MethodInvocation),
    NewClass(NewClass),
    FieldAccess(FieldAccess),
    Return(Return),
    Literal(Literal),
    Identifier(Identifier),
    Empty,
    Ternary(Ternary),
    Throw(Throw),
    Break,
}

impl NodeKind {
    /// Name of the kind, as used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CompilationUnit(_) => "CompilationUnit",
            Self::ClassDeclaration(_) => "ClassDeclaration",
            Self::MethodDeclaration(_) => "MethodDeclaration",
            Self::Block(_) => "Block",
            Self::VariableDeclarations(_) => "VariableDeclarations",
            Self::NamedVariable(_) => "NamedVariable",
            Self::ExpressionStatement(_) => "ExpressionStatement",
            Self::If(_) => "If",
            Self::Else(_) => "Else",
            Self::WhileLoop(_) => "WhileLoop",
            Self::ForLoop(_) => "ForLoop",
            Self::ControlParentheses(_) => "ControlParentheses",
            Self::Parentheses(_) => "Parentheses",
            Self::Binary(_) => "Binary",
            Self::Unary(_) => "Unary",
            Self::Assignment(_) => "Assignment",
            Self::MethodInvocation(_) => "MethodInvocation",
            Self::NewClass(_) => "NewClass",
            Self::FieldAccess(_) => "FieldAccess",
            Self::Return(_) => "Return",
            Self::Literal(_) => "Literal",
            Self::Identifier(_) => "Identifier",
            Self::Empty => "Empty",
            Self::Ternary(_) => "Ternary",
            Self::Throw(_) => "Throw",
            Self::Break => "Break",
        }
    }

    /// Direct children, in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::CompilationUnit(cu) => cu.classes.clone(),
            Self::ClassDeclaration(class) => class.members.clone(),
            Self::MethodDeclaration(method) => method.body.into_iter().collect(),
            Self::Block(block) => block.statements.clone(),
            Self::VariableDeclarations(decls) => decls.variables.clone(),
            Self::NamedVariable(var) => var.initializer.into_iter().collect(),
            Self::ExpressionStatement(stmt) => vec![stmt.expr],
            Self::If(if_) => {
                let mut children = vec![if_.condition, if_.then_part];
                children.extend(if_.else_part);
                children
            }
            Self::Else(else_) => vec![else_.body],
            Self::WhileLoop(while_) => vec![while_.condition, while_.body],
            Self::ForLoop(for_) => {
                let mut children = for_.init.clone();
                children.push(for_.condition);
                children.push(for_.body);
                children.extend(for_.update.iter().copied());
                children
            }
            Self::ControlParentheses(parens) => vec![parens.expr],
            Self::Parentheses(parens) => vec![parens.expr],
            Self::Binary(binary) => vec![binary.left, binary.right],
            Self::Unary(unary) => vec![unary.operand],
            Self::Assignment(assign) => vec![assign.target, assign.value],
            Self::MethodInvocation(call) => {
                let mut children: Vec<NodeId> = call.select.into_iter().collect();
                children.extend(call.args.iter().copied());
                children
            }
            Self::NewClass(new) => new.args.clone(),
            Self::FieldAccess(access) => vec![access.target],
            Self::Return(ret) => ret.expr.into_iter().collect(),
            Self::Ternary(ternary) => vec![ternary.condition, ternary.then_expr, ternary.else_expr],
            Self::Throw(throw) => vec![throw.expr],
            Self::Literal(_) | Self::Identifier(_) | Self::Empty | Self::Break => Vec::new(),
        }
    }

    /// Statements printed with a trailing semicolon.
    #[must_use]
    pub const fn is_simple_statement(&self) -> bool {
        matches!(
            self,
            Self::VariableDeclarations(_)
                | Self::ExpressionStatement(_)
                | Self::Return(_)
                | Self::Throw(_)
                | Self::Break
                | Self::Empty
        )
    }
}

//! # `tf_tree`
//!
//! A small arena-allocated syntax tree for a Java-like language, built
//! programmatically through a [`TreeBuilder`]. The tree is immutable once
//! built; a [`Cursor`] gives access to a node together with its ancestors,
//! which is what flow analyses need to decide what precedes a node.
//!
//! ```rust
//! use tf_tree::{TreeBuilder, Literal};
//!
//! let mut b = TreeBuilder::new();
//! let init = b.literal(Literal::String("a".to_string()));
//! let decl = b.var_decl("String", vec![("s", Some(init))]);
//! let body = b.block(vec![decl]);
//! let tree = b.finish(body)?;
//! assert_eq!(tree.root_cursor().to_string(), "{ String s = \"a\"; }");
//! # Ok::<(), tf_tree::errors::TreeError>(())
//! ```

use serde::Serialize;
use std::fmt;

mod builder;
mod cursor;
pub mod errors;
mod node;
mod printer;
pub mod search;

pub use builder::TreeBuilder;
pub use cursor::{Ancestors, Cursor};
pub use node::*;

use errors::{TreeError, TreeResult};

/// Index of a node in its tree arena.
///
/// Node ids are only meaningful for the tree that allocated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
}

/// An immutable syntax tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn root_cursor(&self) -> Cursor<'_> {
        Cursor::new(self, self.root)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// # Errors
    ///
    /// Returns [`TreeError::UnknownNode`] when `id` was not allocated by
    /// this tree.
    pub fn cursor(&self, id: NodeId) -> TreeResult<Cursor<'_>> {
        if self.contains(id) {
            Ok(Cursor::new(self, id))
        } else {
            Err(TreeError::UnknownNode(id))
        }
    }

    /// # Errors
    ///
    /// Returns [`TreeError::UnknownNode`] when `id` was not allocated by
    /// this tree.
    pub fn kind(&self, id: NodeId) -> TreeResult<&NodeKind> {
        self.nodes
            .get(id.index())
            .map(|node| &node.kind)
            .ok_or(TreeError::UnknownNode(id))
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|node| node.parent)
    }

    /// Every node reachable from the root, children before their parent.
    #[must_use]
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.node(id).kind.children().into_iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    // ids handed out by a tree are always in bounds
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

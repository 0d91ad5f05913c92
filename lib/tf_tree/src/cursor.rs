use crate::node::NodeKind;
use crate::{NodeId, Tree};
use std::fmt;
use std::ptr;

/// A node of a tree, seen together with its position in that tree.
///
/// Cursors are cheap to copy. Two cursors are equal when they designate the
/// same node of the same tree.
#[derive(Clone, Copy)]
pub struct Cursor<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> Cursor<'t> {
    pub(crate) fn new(tree: &'t Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    #[inline]
    #[must_use]
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'t NodeKind {
        &self.tree.node(self.id).kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<Cursor<'t>> {
        self.tree
            .node(self.id)
            .parent
            .map(|parent| Self::new(self.tree, parent))
    }

    /// Ancestors from the parent up to the root.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'t> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// Closest strict ancestor whose kind satisfies `predicate`.
    pub fn first_enclosing<P>(&self, predicate: P) -> Option<Cursor<'t>>
    where
        P: Fn(&NodeKind) -> bool,
    {
        self.ancestors().find(|cursor| predicate(cursor.kind()))
    }

    pub fn children(&self) -> impl Iterator<Item = Cursor<'t>> + 't {
        let tree = self.tree;
        self.kind()
            .children()
            .into_iter()
            .map(move |id| Self::new(tree, id))
    }

    /// Moves to `id` if it is a direct child of this node.
    #[must_use]
    pub fn child(&self, id: NodeId) -> Option<Cursor<'t>> {
        (self.tree.parent(id) == Some(self.id)).then(|| Self::new(self.tree, id))
    }

    /// Moves to another node of the same tree.
    #[must_use]
    pub fn at(&self, id: NodeId) -> Option<Cursor<'t>> {
        self.tree.contains(id).then(|| Self::new(self.tree, id))
    }
}

impl PartialEq for Cursor<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && ptr::eq(self.tree, other.tree)
    }
}

impl Eq for Cursor<'_> {}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.kind().name(), self.id)
    }
}

pub struct Ancestors<'t> {
    next: Option<Cursor<'t>>,
}

impl<'t> Iterator for Ancestors<'t> {
    type Item = Cursor<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

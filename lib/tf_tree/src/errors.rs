//! Tree construction and navigation errors.

use crate::NodeId;
use thiserror::Error;

/// An alias for result that can be a [`TreeError`].
pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A node was given as child to more than one parent.
    #[error("node {child} is already attached to {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    /// A node other than the root was never given a parent.
    #[error("node {0} is not attached to the tree")]
    Detached(NodeId),

    #[error("the root {0} has a parent")]
    NoRoot(NodeId),
}

//! Global error handling.
//!
//! Each sub-crate of the project defines its own error type. They are
//! unified here when winding results at the top-level.
//!
//! ```rust
//! use treeflow::prelude::*;
//! use treeflow::tree::TreeBuilder;
//!
//! fn main() -> TfResult<()> {
//!     let mut b = TreeBuilder::new();
//!     let one = b.int(1);
//!     let stmt = b.expr_stmt(one);
//!     let tree = b.finish(stmt)?; // can return a TreeError
//!     let mut engine = Engine::new(&tree, ConstantPropagation::new());
//!     engine.run(stmt)?; // can return an AnalysisError
//!     Ok(())
//! }
//! ```

use tf_analysis::errors::AnalysisError;
use tf_tree::errors::TreeError;
use thiserror::Error;

/// An alias for result that can be a [`TfError`].
pub type TfResult<T> = Result<T, TfError>;

/// The main error type for error winding at the top-level.
#[derive(Debug, Error)]
pub enum TfError {
    /// Error that can be returned while building or navigating a tree.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Error that can be returned from [`tf_analysis`] functions.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

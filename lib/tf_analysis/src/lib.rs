//! This crate provides the dataflow analysis engine of the `TreeFlow`
//! project: abstract states, an implicit flow graph computed from the shape
//! of a [`tf_tree::Tree`], a worklist solver and a few ready-made value
//! analyses.
//!
//! ```rust
//! use tf_analysis::clients::nullness::{is_null_at, NullAnalysis};
//! use tf_analysis::dataflow::Engine;
//! use tf_analysis::lattice::ModalBoolean;
//! use tf_tree::{TreeBuilder, Variable};
//!
//! // String s = null; while (c) { s = "a"; } b();
//! let mut b = TreeBuilder::new();
//! let null = b.null();
//! let decl = b.var_decl("String", vec![("s", Some(null))]);
//! let c = b.ident("c");
//! let a = b.string("a");
//! let assign = b.assign_stmt("s", a);
//! let body = b.block(vec![assign]);
//! let loop_ = b.while_loop(c, body);
//! let end = b.call_stmt("b", vec![]);
//! let block = b.block(vec![decl, loop_, end]);
//! let tree = b.finish(block)?;
//!
//! let mut engine = Engine::new(&tree, NullAnalysis::new());
//! engine.run(end)?;
//! assert_eq!(is_null_at(&engine, end, &Variable::new("s")), ModalBoolean::Conflict);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod clients;
pub mod dataflow;
pub mod errors;
pub mod flowgraph;
pub mod lattice;
pub mod matcher;
pub mod state;
pub mod value;

#[cfg(test)]
mod fixtures;

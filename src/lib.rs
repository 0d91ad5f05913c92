//! # `TreeFlow`
//!
//! `treeflow` is the main crate of the `TreeFlow` dataflow analysis project.
//! The project is subdivided into two crates; `treeflow` acts as entry point
//! by reexporting their important structs and functions, mostly within the
//! `treeflow::prelude` namespace.
//!
//! ## Library basics
//!
//! Trees are built bottom-up with a [`TreeBuilder`](tree::TreeBuilder). An
//! [`Engine`](analysis::dataflow::Engine) then runs an analysis up to a
//! program point and answers queries about the states it computed:
//!
//! ```rust
//! use treeflow::prelude::*;
//! use treeflow::tree::{TreeBuilder, Variable};
//!
//! // String s = "a"; while (x == 0) { s = "b"; } b();
//! let mut b = TreeBuilder::new();
//! let a = b.string("a");
//! let decl = b.var_decl("String", vec![("s", Some(a))]);
//! let x = b.ident("x");
//! let zero = b.int(0);
//! let cond = b.binary(BinaryOp::Eq, x, zero);
//! let bb = b.string("b");
//! let assign = b.assign_stmt("s", bb);
//! let body = b.block(vec![assign]);
//! let loop_ = b.while_loop(cond, body);
//! let end = b.call_stmt("b", vec![]);
//! let block = b.block(vec![decl, loop_, end]);
//! let tree = b.finish(block)?;
//!
//! let mut engine = Engine::new(&tree, ConstantPropagation::new());
//! let stats = engine.run(end)?;
//! println!("{} points, {} iterations", stats.points, stats.iterations);
//! assert_eq!(
//!     engine.value_at(end, &Variable::new("s")),
//!     ConstantValue::Conflict
//! );
//! # Ok::<(), TfError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`tf_tree`] contains the syntax tree, its cursors, builder and
//!    printer,
//!  - [`tf_analysis`] contains the lattices, program states, flow graph,
//!    solver and client analyses.

mod errors;

pub use tf_analysis as analysis;
pub use tf_tree as tree;

use rayon::prelude::*;
use tf_analysis::dataflow::{DataFlowAnalysis, Dataflow, Engine, Options};
use tf_tree::{NodeId, Tree};

/// Runs one engine per root, in parallel, over a shared tree.
///
/// Every job gets a fresh analysis from `analysis`. Results come back in
/// the order of `roots`.
pub fn analyze_parallel<A, F>(
    tree: &Tree,
    roots: &[NodeId],
    analysis: F,
    options: Options,
) -> Vec<errors::TfResult<Dataflow<A::Value>>>
where
    A: DataFlowAnalysis,
    A::Value: Send + Sync,
    F: Fn() -> A + Sync,
{
    roots
        .par_iter()
        .map(|root| -> errors::TfResult<Dataflow<A::Value>> {
            let mut engine = Engine::with_options(tree, analysis(), options);
            let stats = engine.run(*root)?;
            log::debug!(
                "root {root}: {} points, {} iterations",
                stats.points,
                stats.iterations
            );
            Ok(engine.into_results())
        })
        .collect()
}

/// Logger configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Overrides the level read from `TF_LOG`.
    pub level: Option<log::LevelFilter>,
    /// Elastic Common Schema output.
    pub ecs: bool,
}

/// Reexport module of commonly used structures and functions from
/// `TreeFlow` project sub-crates:
///
/// ```rust
/// use treeflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{TfError, TfResult};
    pub use crate::{analyze_parallel, LogOptions};

    pub use tf_analysis::clients::constant_propagation::{ConstantPropagation, ConstantValue};
    pub use tf_analysis::clients::nullness::NullAnalysis;
    pub use tf_analysis::clients::path_safety::{PathSafety, ZipSlipValue};
    pub use tf_analysis::dataflow::{DataFlowAnalysis, Dataflow, Engine, Options};
    pub use tf_analysis::lattice::{Joiner, ModalBoolean};
    pub use tf_analysis::state::ProgramState;

    pub use tf_tree::{BinaryOp, Cursor, NodeId, NodeKind, Tree};

    pub fn init_logger(options: &LogOptions) {
        let env = env_logger::Env::new()
            .filter_or("TF_LOG", "info")
            .write_style("TF_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if let Some(level) = options.level {
            builder.filter_level(level);
        }
        if options.ecs {
            builder.format(ecs_logger::format);
        }
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::analysis::errors::AnalysisError;
    use crate::tree::{TreeBuilder, Variable};

    // String s = null; while (c) { s = "a"; } String t = s; b();
    fn tree() -> (Tree, Vec<NodeId>) {
        let mut b = TreeBuilder::new();
        let null = b.null();
        let decl = b.var_decl("String", vec![("s", Some(null))]);
        let c = b.ident("c");
        let a = b.string("a");
        let assign = b.assign_stmt("s", a);
        let body = b.block(vec![assign]);
        let loop_ = b.while_loop(c, body);
        let s = b.ident("s");
        let copy = b.var_decl("String", vec![("t", Some(s))]);
        let end = b.call_stmt("b", vec![]);
        let block = b.block(vec![decl, loop_, copy, end]);
        (b.finish(block).unwrap(), vec![end, a, s, c])
    }

    #[test]
    fn parallel_runs_match_sequential_ones() {
        let (tree, roots) = tree();
        let results = analyze_parallel(&tree, &roots, NullAnalysis::new, Options::default());
        assert_eq!(results.len(), roots.len());

        for (root, result) in roots.iter().zip(results) {
            let mut engine = Engine::new(&tree, NullAnalysis::new());
            engine.run(*root).unwrap();
            assert_eq!(result.unwrap().states, engine.into_results().states);
        }
    }

    #[test]
    fn parallel_errors_are_per_job() {
        let (tree, mut roots) = tree();
        roots.push(NodeId::new(10_000));
        let results =
            analyze_parallel(&tree, &roots, ConstantPropagation::new, Options::default());
        assert!(results[..4].iter().all(Result::is_ok));
        assert!(matches!(
            results[4],
            Err(TfError::Analysis(AnalysisError::Tree(_)))
        ));
    }

    #[test]
    fn results_serialize_to_json() {
        let (tree, roots) = tree();
        let mut engine = Engine::new(&tree, NullAnalysis::new());
        engine.run(roots[0]).unwrap();
        let state = engine.result_at(roots[0]);
        assert_eq!(
            state.get(&Variable::new("t")),
            Some(&ModalBoolean::Conflict)
        );

        let json = serde_json::to_value(engine.results()).unwrap();
        let dumped = &json["states"][roots[0].index().to_string().as_str()];
        assert_eq!(dumped["variables"]["t"], "Conflict");
        assert_eq!(dumped["stack"], serde_json::json!([]));
    }
}

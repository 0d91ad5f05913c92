use super::{transfer, DataFlowAnalysis, Dataflow, Options, RunStats, State};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::flowgraph::{Branch, Edge, FlowGraph};
use crate::lattice::Joiner;
use crate::state::ProgramState;
use fixedbitset::FixedBitSet;
use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tf_tree::{Cursor, NodeId, Tree, Variable};

/// Label of a discovered dependency between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dependency(Option<Branch>);

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(branch) => write!(f, "{branch}"),
            None => Ok(()),
        }
    }
}

/// Runs a [`DataFlowAnalysis`] over a tree and keeps its results.
///
/// ```rust
/// use tf_analysis::clients::constant_propagation::{ConstantPropagation, ConstantValue};
/// use tf_analysis::dataflow::Engine;
/// use tf_tree::{Literal, TreeBuilder, Variable};
///
/// let mut b = TreeBuilder::new();
/// let a = b.string("a");
/// let decl = b.var_decl("String", vec![("s", Some(a))]);
/// let end = b.call_stmt("b", vec![]);
/// let body = b.block(vec![decl, end]);
/// let tree = b.finish(body)?;
///
/// let mut engine = Engine::new(&tree, ConstantPropagation::new());
/// engine.run(end)?;
/// assert_eq!(
///     engine.value_at(end, &Variable::new("s")),
///     ConstantValue::Known(Literal::String("a".to_string()))
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Engine<'t, A: DataFlowAnalysis> {
    graph: FlowGraph<'t>,
    analysis: A,
    options: Options,
    results: Dataflow<A::Value>,
    dependencies: DiGraphMap<NodeId, Dependency>,
}

impl<'t, A: DataFlowAnalysis> Engine<'t, A> {
    #[must_use]
    pub fn new(tree: &'t Tree, analysis: A) -> Self {
        Self::with_options(tree, analysis, Options::default())
    }

    #[must_use]
    pub fn with_options(tree: &'t Tree, analysis: A, options: Options) -> Self {
        Self {
            graph: FlowGraph::new(tree),
            analysis,
            options,
            results: Dataflow::default(),
            dependencies: DiGraphMap::new(),
        }
    }

    #[inline]
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    #[inline]
    pub fn flow_graph(&self) -> &FlowGraph<'t> {
        &self.graph
    }

    #[inline]
    pub fn options(&self) -> Options {
        self.options
    }

    /// Computes the states of every program point `root` depends on.
    ///
    /// Results of a previous run are discarded first, and stay empty if the
    /// run fails.
    ///
    /// # Errors
    ///
    /// Any error raised by the flow graph or by a transfer function aborts
    /// the run.
    pub fn run(&mut self, root: NodeId) -> AnalysisResult<RunStats> {
        let tree = self.graph.tree();
        let cursor = tree.cursor(root)?;
        log::debug!("dataflow from {root} `{cursor}`");
        self.results = Dataflow::default();
        self.dependencies = DiGraphMap::new();

        let mut solver = Solver::new(self.graph, &self.analysis, self.options, tree.len());
        solver.init_nexts(root)?;
        solver.init_worklist(root);
        log::debug!(
            "  {} program points, {} dependencies",
            solver.preds.len(),
            solver.nexts.edge_count()
        );

        let mut results = Dataflow::default();
        let iterations = solver.iterate(&mut results)?;
        log::debug!("  fixed point after {iterations} iterations");

        let stats = RunStats {
            points: solver.preds.len(),
            edges: solver.nexts.edge_count(),
            iterations,
        };
        self.results = results;
        self.dependencies = solver.nexts;
        Ok(stats)
    }

    /// State after `point`, as computed by the last run. Points the run did
    /// not reach get the empty state.
    #[must_use]
    pub fn result_at(&self, point: NodeId) -> State<A> {
        self.results.get(point).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn result_at_cursor(&self, point: Cursor) -> State<A> {
        self.result_at(point.id())
    }

    /// Value of `variable` after `point`. An unbound variable reads as
    /// [`Joiner::unbound`], and any variable of an unreached point as the
    /// lower bound.
    #[must_use]
    pub fn value_at(&self, point: NodeId, variable: &Variable) -> A::Value {
        let joiner = self.analysis.joiner();
        match self.results.get(point) {
            Some(state) => state
                .get(variable)
                .cloned()
                .unwrap_or_else(|| joiner.unbound()),
            None => joiner.lower_bound(),
        }
    }

    /// State before `point`: the join of the results of its predecessors,
    /// narrowed along branch edges. Nothing is computed.
    ///
    /// # Errors
    ///
    /// Fails like the flow graph and the narrowing hooks do.
    pub fn state_before(&self, point: NodeId) -> AnalysisResult<State<A>> {
        let cursor = self.graph.tree().cursor(point)?;
        let edges = self.graph.previous(point)?;
        input_state(&self.analysis, cursor, &edges, &self.results).map_err(|e| e.located(cursor))
    }

    /// Checks that every computed state is the transfer of its input.
    ///
    /// # Errors
    ///
    /// Fails like the transfer functions do.
    pub fn is_fixed_point(&self) -> AnalysisResult<bool> {
        for (point, state) in &self.results.states {
            let cursor = self.graph.tree().cursor(*point)?;
            let input = self.state_before(*point)?;
            let output = transfer(&self.analysis, cursor, input).map_err(|e| e.located(cursor))?;
            if output != *state {
                log::debug!("not stable at {point}: {output} instead of {state}");
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[inline]
    pub fn results(&self) -> &Dataflow<A::Value> {
        &self.results
    }

    pub fn into_results(self) -> Dataflow<A::Value> {
        self.results
    }

    /// Graphviz rendering of the dependencies discovered by the last run.
    pub fn to_dot(&self) -> String {
        let tree = self.graph.tree();
        format!(
            "digraph {{\n{}}}\n",
            Dot::with_attr_getters(
                &self.dependencies,
                &[
                    Config::GraphContentOnly,
                    Config::EdgeNoLabel,
                    Config::NodeNoLabel,
                ],
                &|_, (_, _, dependency)| {
                    let color = match dependency.0 {
                        Some(Branch::Then) => "green",
                        Some(Branch::Else) => "red",
                        Some(Branch::Exit) => "purple",
                        Some(Branch::ShortCircuit) => "blue",
                        None => "black",
                    };
                    format!("color={color},xlabel=\"{dependency}\"")
                },
                &|_, (id, _)| {
                    let text = tree.cursor(id).map(|c| c.to_string()).unwrap_or_default();
                    let label = text.replace('\\', "\\\\").replace('"', "\\\"");
                    format!("shape=box,label=\"{label}\"")
                },
            )
        )
    }
}

/// Input of `point`: join of the already computed predecessors.
fn input_state<A: DataFlowAnalysis>(
    analysis: &A,
    point: Cursor,
    edges: &[Edge],
    results: &Dataflow<A::Value>,
) -> AnalysisResult<State<A>> {
    let mut incoming = Vec::with_capacity(edges.len());
    for edge in edges {
        let Some(state) = results.get(edge.point) else {
            continue;
        };
        let state = match edge.branch {
            None => state.clone(),
            Some(Branch::ShortCircuit) => analysis.transfer_short_circuit(point, state.clone())?,
            Some(branch) => {
                let source = point.tree().cursor(edge.point)?;
                let construct = source.parent().ok_or_else(|| {
                    AnalysisError::invariant(source, "branch edge without enclosing construct")
                })?;
                analysis.narrow_on_branch(construct, state.clone(), branch)?
            }
        };
        incoming.push(state);
    }
    Ok(ProgramState::join(analysis.joiner(), &incoming)?)
}

/// Per-run solver state.
struct Solver<'e, 't, A: DataFlowAnalysis> {
    graph: FlowGraph<'t>,
    analysis: &'e A,
    options: Options,
    visited: FixedBitSet,
    preds: BTreeMap<NodeId, Vec<Edge>>,
    nexts: DiGraphMap<NodeId, Dependency>,
    worklist: VecDeque<NodeId>,
}

impl<'e, 't, A: DataFlowAnalysis> Solver<'e, 't, A> {
    fn new(graph: FlowGraph<'t>, analysis: &'e A, options: Options, size: usize) -> Self {
        Self {
            graph,
            analysis,
            options,
            visited: FixedBitSet::with_capacity(size),
            preds: BTreeMap::new(),
            nexts: DiGraphMap::new(),
            worklist: VecDeque::new(),
        }
    }

    /// Walks predecessors backward from `root`, recording for every point
    /// the points depending on it.
    fn init_nexts(&mut self, root: NodeId) -> AnalysisResult<()> {
        let tree = self.graph.tree();
        let mut stack = vec![root];
        while let Some(point) = stack.pop() {
            if self.visited.put(point.index()) {
                continue;
            }
            let cursor = tree.cursor(point)?;
            let edges = self.graph.previous(point).map_err(|e| e.located(cursor))?;
            self.nexts.add_node(point);
            for edge in &edges {
                self.nexts.add_edge(edge.point, point, Dependency(edge.branch));
            }
            for edge in edges.iter().rev() {
                if !self.visited.contains(edge.point.index()) {
                    stack.push(edge.point);
                }
            }
            self.preds.insert(point, edges);
        }
        Ok(())
    }

    /// Seeds the worklist with every discovered point, deepest first.
    fn init_worklist(&mut self, root: NodeId) {
        let mut seen = FixedBitSet::with_capacity(self.visited.len());
        let mut stack = vec![root];
        while let Some(point) = stack.pop() {
            if seen.put(point.index()) {
                continue;
            }
            self.worklist.push_front(point);
            if let Some(edges) = self.preds.get(&point) {
                for edge in edges.iter().rev() {
                    if !seen.contains(edge.point.index()) {
                        stack.push(edge.point);
                    }
                }
            }
        }
    }

    fn iterate(&mut self, results: &mut Dataflow<A::Value>) -> AnalysisResult<usize> {
        let tree = self.graph.tree();
        let mut iterations = 0;
        while let Some(point) = self.worklist.pop_front() {
            iterations += 1;
            let cursor = tree.cursor(point)?;
            log::debug!("    ---- point {point} `{cursor}`");

            let edges = self.preds.get(&point).map_or(&[][..], Vec::as_slice);
            let input =
                input_state(self.analysis, cursor, edges, results).map_err(|e| e.located(cursor))?;
            if self.options.log_states {
                log::trace!("    before: {input}");
            }
            let output = transfer(self.analysis, cursor, input).map_err(|e| e.located(cursor))?;
            if self.options.log_states {
                log::trace!("    after:  {output}");
            }

            // a first result also counts as a change: dependents may have
            // been evaluated before this point had any state
            let changed = results.get(point).map_or(true, |old| *old != output);
            if changed {
                for next in self.nexts.neighbors_directed(point, Direction::Outgoing) {
                    if !(self.options.dedup_worklist && self.worklist.contains(&next)) {
                        self.worklist.push_back(next);
                    }
                }
                results.states.insert(point, output);
            }
        }
        Ok(iterations)
    }
}

//! Third tagging stage: function identity and classification.
//!
//! Once a function's control-flow graph is final and its aggregate symbolic
//! map (the union of effects over all exit paths) is available, the
//! [`FunctionFinalizer`] settles its canonical name, attributes it to a
//! section, counts calls at its leaves, and classifies the stack-relative
//! locations its map touches into arguments and local variables.
//!
//! Every structural anomaly — no entry, several entries, no exit, several
//! exits — is reported through [`Diagnostics`] and analysis continues with
//! best-effort data. Binaries legitimately contain non-returning functions,
//! tail-call-only functions and unreachable code; none of that is an error.

use crate::{
    analysis::{block::BasicBlock, diagnostics::Diagnostics},
    arch::ArchSpec,
    image::{ElfImage, Symbol},
    symbolic::{Location, MemLoc, SymbolicState},
    Result,
};

use std::sync::Arc;

/// A node of a function's control-flow graph.
///
/// Besides ordinary basic blocks, a graph can contain external-reference
/// nodes: placeholders for control flow that leaves the image, such as the
/// dynamically resolved routine behind a PLT thunk.
#[derive(Debug, Clone, PartialEq)]
pub enum CfgNode {
    /// A basic block of the function body
    Block(BasicBlock),
    /// Control flow into unresolved library code
    External(Arc<Symbol>),
}

impl CfgNode {
    /// Address of the node, when it has one (a block's start address, an
    /// external symbol's address).
    pub fn address(&self) -> Option<u64> {
        match self {
            CfgNode::Block(block) => Some(block.start),
            CfgNode::External(symbol) => Some(symbol.address),
        }
    }

    /// The basic block, if this node is one.
    pub fn as_block(&self) -> Option<&BasicBlock> {
        match self {
            CfgNode::Block(block) => Some(block),
            CfgNode::External(_) => None,
        }
    }

    /// The external symbol, if this node is one.
    pub fn as_external(&self) -> Option<&Arc<Symbol>> {
        match self {
            CfgNode::Block(_) => None,
            CfgNode::External(symbol) => Some(symbol),
        }
    }
}

/// The control-flow-graph query surface the finalizer consumes.
///
/// Graph mechanics — construction order, edge kinds, traversals — belong to
/// the external CFG builder; this structure stores just enough to answer the
/// two structural queries the finalizer needs, [`roots`](Self::roots) and
/// [`leaves`](Self::leaves).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionGraph {
    nodes: Vec<CfgNode>,
    edges: Vec<(usize, usize)>,
}

impl FunctionGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its index.
    pub fn add_node(&mut self, node: CfgNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Adds a directed edge between two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] when either index does not name
    /// an added node.
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return Err(crate::Error::GraphError(format!(
                "edge ({from}, {to}) references a node beyond count {}",
                self.nodes.len()
            )));
        }
        self.edges.push((from, to));
        Ok(())
    }

    /// Node by index.
    pub fn node(&self, index: usize) -> &CfgNode {
        &self.nodes[index]
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[CfgNode] {
        &self.nodes
    }

    /// Indices of nodes with no incoming edge.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|n| !self.edges.iter().any(|(_, to)| to == n))
            .collect()
    }

    /// Indices of nodes with no outgoing edge.
    pub fn leaves(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|n| !self.edges.iter().any(|(from, _)| from == n))
            .collect()
    }
}

/// Classification results attached to a function by the finalizer.
///
/// Rebuilt from scratch on every finalization, so re-running the stage never
/// accumulates stale counts. `arguments` and `variables` are disjoint:
/// arguments sit at or above the stack-relative argument floor, variables at
/// negative displacements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionTags {
    /// Name of the section containing the function, when known.
    pub section: Option<String>,
    /// Number of leaf blocks tagged as calls.
    pub call_count: u32,
    /// Number of live-in locations of the aggregate map.
    pub input_count: u32,
    /// Number of live-out locations, excluding the stack and frame registers.
    pub output_count: u32,
    /// Stack-relative argument locations read by the function.
    pub arguments: Vec<MemLoc>,
    /// Stack-relative local-variable locations written by the function.
    pub variables: Vec<MemLoc>,
}

/// A named analysis unit: a CFG plus an optional aggregate symbolic map.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Canonical name; finalization may replace it (bootstrap entry, PLT thunk).
    pub name: String,
    /// Address of the function, used for section attribution.
    pub address: u64,
    /// Control-flow graph of the body.
    pub cfg: FunctionGraph,
    /// Union symbolic state over all exit points, absent when the symbolic
    /// engine was inconclusive.
    pub aggregate: Option<SymbolicState>,
    /// Classification attached by the finalizer.
    pub tags: FunctionTags,
}

impl Function {
    /// Creates a function with no aggregate map and empty tags.
    pub fn new(name: impl Into<String>, address: u64, cfg: FunctionGraph) -> Self {
        Self {
            name: name.into(),
            address,
            cfg,
            aggregate: None,
            tags: FunctionTags::default(),
        }
    }
}

/// Settles a function's name, section, call count and argument/variable
/// classification.
pub struct FunctionFinalizer<'a> {
    arch: ArchSpec,
    image: Option<&'a ElfImage>,
}

impl<'a> FunctionFinalizer<'a> {
    /// Creates a finalizer. The image is optional: without one, entry-point
    /// naming and section attribution are skipped.
    pub fn new(arch: ArchSpec, image: Option<&'a ElfImage>) -> Self {
        Self { arch, image }
    }

    /// Finalizes the function in place. Never fails; anomalies go to the
    /// diagnostics stream.
    pub fn finalize(&self, function: &mut Function, diagnostics: &mut Diagnostics) {
        // classification is rebuilt from scratch on every run
        function.tags = FunctionTags::default();

        self.resolve_entry(function, diagnostics);

        let section = self
            .image
            .and_then(|image| image.section_at(function.address))
            .cloned();
        function.tags.section = section.as_ref().map(|s| s.name.clone());

        let leaves = function.cfg.leaves();
        if leaves.is_empty() {
            diagnostics.warn(function.name.as_str(), "no exit found");
        }
        if leaves.len() > 1 {
            diagnostics.info(function.name.as_str(), format!("{} exits", leaves.len()));
        }
        for &leaf in &leaves {
            match function.cfg.node(leaf) {
                CfgNode::External(symbol) => {
                    // canonical thunk naming: redirector into the linkage section
                    if let Some(section) = section.as_ref().filter(|s| s.name == ".plt") {
                        function.name = format!("{}{}", section.name, symbol.name);
                    }
                }
                CfgNode::Block(block) => {
                    if block.tags.func_call {
                        function.tags.call_count += 1;
                    }
                }
            }
        }

        self.classify_map(function);
    }

    /// Root discovery: structural roots first, then blocks syntactically
    /// tagged as function starts, then give up with a warning.
    fn resolve_entry(&self, function: &mut Function, diagnostics: &mut Diagnostics) {
        let mut roots = function.cfg.roots();
        if roots.is_empty() {
            roots = (0..function.cfg.nodes().len())
                .filter(|&n| {
                    function
                        .cfg
                        .node(n)
                        .as_block()
                        .is_some_and(|b| b.tags.func_start)
                })
                .collect();
            if roots.is_empty() {
                diagnostics.warn(function.name.as_str(), "no entry found");
            }
        }

        if roots.len() > 1 {
            diagnostics.info(function.name.as_str(), format!("{} entries", roots.len()));
        } else if let Some(&root) = roots.first() {
            let entry = self.image.and_then(|image| image.entry_points().first());
            if entry.is_some() && function.cfg.node(root).address() == entry.copied() {
                // the environment-bootstrap entry of the whole image
                function.name = "_start".to_string();
            }
        }
    }

    /// Live-in/live-out classification against the aggregate map.
    fn classify_map(&self, function: &mut Function) {
        let Some(map) = function.aggregate.as_ref() else {
            return;
        };

        for location in map.inputs() {
            function.tags.input_count += 1;
            if let Location::Memory(cell) = location {
                if cell.base == self.arch.stack_pointer
                    && cell.displacement >= self.arch.stack_arg_floor
                {
                    function.tags.arguments.push(*cell);
                }
            }
        }

        for location in map.outputs() {
            if *location == Location::Register(self.arch.stack_pointer)
                || *location == Location::Register(self.arch.frame_base)
            {
                continue;
            }
            function.tags.output_count += 1;
            if let Location::Memory(cell) = location {
                if cell.base == self.arch.stack_pointer && cell.displacement < 0 {
                    function.tags.variables.push(*cell);
                }
            }
        }
    }
}

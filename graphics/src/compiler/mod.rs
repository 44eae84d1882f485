//! Render graph compilation.
//!
//! This module compiles a [`FrameGraph`] into an execution plan
//! ([`CompiledGraph`]). Compilation is a state machine over the graph:
//!
//! 1. **Unvalidated**: construction errors recorded during setup abort
//!    compilation before any analysis.
//! 2. **Culled**: passes whose outputs are not transitively consumed by
//!    the frame's requested outputs are removed.
//! 3. **Ordered**: topological sort over data edges; ties break by
//!    declaration order, so an unchanged graph always compiles to the same
//!    order.
//! 4. **Scheduled**: per-resource lifetime intervals are computed and
//!    transients with disjoint lifetimes share backing slots.
//! 5. **Compiled**: barriers and cross-queue semaphores are synthesized
//!    for every hazard in the final order.
//!
//! A cycle among data edges is a fatal, frame-aborting error detected
//! before the Ordered step completes; nothing is ever recorded or
//! submitted for a graph that fails here.

mod lifetime;
mod sync;

pub use lifetime::Lifetime;
pub use sync::BarrierOp;

pub(crate) use lifetime::{TransientBufferPlan, TransientTexturePlan};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use thiserror::Error;

use crate::graph::{FrameGraph, NodeAccessError, OutputRef, PassHandle, TextureNodeId};

/// Errors that can occur during graph construction or compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The graph contains a cyclic dependency.
    ///
    /// Render graphs must be directed acyclic graphs. A cycle means passes
    /// depend on each other in a way that makes execution impossible.
    #[error("render graph contains a cyclic dependency among passes {passes:?}")]
    CyclicDependency {
        /// Names of the passes participating in the cycle.
        passes: Vec<String>,
    },

    /// A pass read a node version that was superseded by a later write.
    #[error(
        "pass '{pass}' uses stale version {version} of node '{node}' (current version is {current})"
    )]
    StaleNode {
        /// Offending pass.
        pass: String,
        /// Node name.
        node: String,
        /// Version the pass presented.
        version: u32,
        /// Most recent version at the time of the call.
        current: u32,
    },

    /// A pass wrote a node version that was already written.
    #[error("pass '{pass}' writes version {version} of node '{node}', which already has a writer")]
    DoubleWrite {
        /// Offending pass.
        pass: String,
        /// Node name.
        node: String,
        /// Version the pass tried to supersede.
        version: u32,
    },

    /// A pass referenced a node that is not registered in this frame.
    #[error("pass '{pass}' references unknown node index {index}")]
    UnknownNode {
        /// Offending pass.
        pass: String,
        /// Unregistered node index.
        index: u32,
    },

    /// Export was attempted on a node that is not rooted at an import.
    #[error("node '{node}' cannot be exported: it does not trace back to an imported resource")]
    ExportNotImported {
        /// Node name.
        node: String,
    },

    /// Export was attempted with a superseded node version.
    #[error("export uses stale version {version} of node '{node}' (current version is {current})")]
    StaleExport {
        /// Node name.
        node: String,
        /// Version presented.
        version: u32,
        /// Most recent version.
        current: u32,
    },
}

impl CompileError {
    pub(crate) fn from_access(pass: &str, error: NodeAccessError) -> Self {
        match error {
            NodeAccessError::Stale {
                name,
                version,
                current,
            } => Self::StaleNode {
                pass: pass.to_string(),
                node: name,
                version,
                current,
            },
            NodeAccessError::DoubleWrite { name, version } => Self::DoubleWrite {
                pass: pass.to_string(),
                node: name,
                version,
            },
            NodeAccessError::Unknown { index } => Self::UnknownNode {
                pass: pass.to_string(),
                index,
            },
            NodeAccessError::NotImported { name } => Self::ExportNotImported { node: name },
        }
    }

    pub(crate) fn from_export(error: NodeAccessError) -> Self {
        match error {
            NodeAccessError::Stale {
                name,
                version,
                current,
            } => Self::StaleExport {
                node: name,
                version,
                current,
            },
            NodeAccessError::NotImported { name } => Self::ExportNotImported { node: name },
            other => Self::from_access("export", other),
        }
    }
}

/// Compilation phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompilePhase {
    /// Construction finished, nothing validated yet.
    Unvalidated,
    /// Dead passes removed.
    Culled,
    /// Topological order fixed.
    Ordered,
    /// Lifetimes and aliasing assigned.
    Scheduled,
    /// Synchronization synthesized; ready to execute.
    Compiled,
}

/// Intermediate ordering data shared by the scheduling phases.
pub(crate) struct GraphMeta {
    /// Live passes in execution order.
    pub pass_order: Vec<PassHandle>,
    /// Recording wave of each position (level set of the dependency DAG).
    pub wave_of: Vec<usize>,
}

/// Dependency edges derived from the recorded accesses.
struct EdgeSet {
    /// All ordering predecessors (read-after-write, write-after-write,
    /// write-after-read) by pass index.
    full_preds: Vec<Vec<usize>>,
    /// Ordering successors, mirror of `full_preds`.
    full_succs: Vec<Vec<usize>>,
    /// Content predecessors only (read-after-write and write-after-write);
    /// used for culling, where anti-dependencies must not keep passes
    /// alive.
    content_preds: Vec<Vec<usize>>,
}

/// A compiled render graph ready for execution.
///
/// Contains the topologically sorted pass order plus everything the
/// executor needs: per-pass barriers, cross-queue semaphores, recording
/// waves, and the transient aliasing plan.
pub struct CompiledGraph {
    pass_order: Vec<PassHandle>,
    wave_of: Vec<usize>,
    barriers: Vec<Vec<BarrierOp>>,
    waits: Vec<Vec<u32>>,
    signals: Vec<Vec<u32>>,
    semaphore_count: u32,
    texture_plan: TransientTexturePlan,
    buffer_plan: TransientBufferPlan,
    texture_lifetimes: Vec<Option<Lifetime>>,
    buffer_lifetimes: Vec<Option<Lifetime>>,
}

impl CompiledGraph {
    /// Get the pass execution order as handles.
    ///
    /// Submission follows this order exactly, regardless of how recording
    /// is parallelized.
    pub fn pass_order(&self) -> &[PassHandle] {
        &self.pass_order
    }

    /// Get the number of passes in the compiled graph.
    pub fn pass_count(&self) -> usize {
        self.pass_order.len()
    }

    /// Check if the compiled graph is empty.
    pub fn is_empty(&self) -> bool {
        self.pass_order.is_empty()
    }

    /// Barriers recorded immediately before the pass at `position`.
    pub fn barriers(&self, position: usize) -> &[BarrierOp] {
        &self.barriers[position]
    }

    /// Semaphores the pass at `position` waits on.
    pub fn waits(&self, position: usize) -> &[u32] {
        &self.waits[position]
    }

    /// Semaphores the pass at `position` signals.
    pub fn signals(&self, position: usize) -> &[u32] {
        &self.signals[position]
    }

    /// Total number of cross-queue semaphores.
    pub fn semaphore_count(&self) -> u32 {
        self.semaphore_count
    }

    /// Recording wave of the pass at `position`. Passes in the same wave
    /// have no dependency edges between them.
    pub fn recording_wave(&self, position: usize) -> usize {
        self.wave_of[position]
    }

    /// Number of recording waves.
    pub fn wave_count(&self) -> usize {
        self.wave_of.iter().max().map(|w| w + 1).unwrap_or(0)
    }

    /// Physical slot assigned to a transient texture node, if scheduled.
    pub fn texture_slot(&self, node: TextureNodeId) -> Option<u32> {
        self.texture_plan
            .slot_of_node
            .get(node.index() as usize)
            .copied()
            .flatten()
    }

    /// Number of physical transient texture allocations.
    pub fn texture_slot_count(&self) -> usize {
        self.texture_plan.slots.len()
    }

    /// Number of physical transient buffer allocations.
    pub fn buffer_slot_count(&self) -> usize {
        self.buffer_plan.slots.len()
    }

    /// Lifetime interval of a texture node's backing, if scheduled.
    pub fn texture_lifetime(&self, node: TextureNodeId) -> Option<Lifetime> {
        self.texture_lifetimes
            .get(node.index() as usize)
            .copied()
            .flatten()
    }

    /// Lifetime interval of a buffer node's backing, if scheduled.
    pub fn buffer_lifetime(&self, node: crate::graph::BufferNodeId) -> Option<Lifetime> {
        self.buffer_lifetimes
            .get(node.index() as usize)
            .copied()
            .flatten()
    }

    pub(crate) fn texture_plan(&self) -> &TransientTexturePlan {
        &self.texture_plan
    }

    pub(crate) fn buffer_plan(&self) -> &TransientBufferPlan {
        &self.buffer_plan
    }
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("passes", &self.pass_order.len())
            .field("waves", &self.wave_count())
            .field("semaphores", &self.semaphore_count)
            .field("texture_slots", &self.texture_plan.slots.len())
            .finish()
    }
}

/// Compile a frame graph into an execution plan.
///
/// # Errors
///
/// Returns the first construction error recorded during setup, or
/// [`CompileError::CyclicDependency`] if the data edges contain a cycle.
pub(crate) fn compile(graph: &FrameGraph) -> Result<CompiledGraph, CompileError> {
    nightshade_core::profile_function!();

    log::debug!(
        "compile: {:?} ({} passes, {} texture nodes, {} buffer nodes)",
        CompilePhase::Unvalidated,
        graph.pass_count(),
        graph.texture_node_count(),
        graph.buffer_node_count()
    );
    if let Some(error) = graph.construction_errors().first() {
        return Err(error.clone());
    }

    let edges = build_edges(graph);

    let live = cull(graph, &edges);
    log::debug!(
        "compile: {:?} ({} of {} passes live)",
        CompilePhase::Culled,
        live.iter().filter(|&&l| l).count(),
        graph.pass_count()
    );

    let (pass_order, wave_of) = order(graph, &live, &edges)?;
    log::debug!("compile: {:?}", CompilePhase::Ordered);

    let meta = GraphMeta {
        pass_order,
        wave_of,
    };

    let (texture_lifetimes, buffer_lifetimes) = lifetime::compute_lifetimes(graph, &meta);
    let texture_plan = lifetime::assign_texture_slots(graph, &texture_lifetimes);
    let buffer_plan = lifetime::assign_buffer_slots(graph, &buffer_lifetimes);
    log::debug!(
        "compile: {:?} ({} texture slots for {} transient nodes)",
        CompilePhase::Scheduled,
        texture_plan.slots.len(),
        texture_plan.slot_of_node.iter().flatten().count()
    );

    let sync_plan = sync::synthesize(graph, &meta, &texture_plan, &buffer_plan);
    log::debug!(
        "compile: {:?} ({} semaphores)",
        CompilePhase::Compiled,
        sync_plan.semaphore_count
    );

    Ok(CompiledGraph {
        pass_order: meta.pass_order,
        wave_of: meta.wave_of,
        barriers: sync_plan.barriers,
        waits: sync_plan.waits,
        signals: sync_plan.signals,
        semaphore_count: sync_plan.semaphore_count,
        texture_plan,
        buffer_plan,
        texture_lifetimes,
        buffer_lifetimes,
    })
}

/// Derive dependency edges from the recorded accesses.
///
/// Every node version has exactly one producer, so:
/// - a pure read of version `v` depends on the producer of `v` (RAW);
/// - a write minting version `v+1` depends on the producer of `v` (WAW)
///   and on every reader of `v` (WAR), since all versions of a node share
///   backing storage.
///
/// Explicit [`FrameGraph::add_dependency`] edges are merged in as both
/// ordering and content edges.
///
/// A pass that purely reads a version it produced itself gets a self
/// edge, which the topological sort reports as a cycle: reading your own
/// in-flight output is unschedulable.
fn build_edges(graph: &FrameGraph) -> EdgeSet {
    let n = graph.pass_count();
    let nodes = graph.nodes();

    // Readers of each (node index, version), including read-modify-writes
    // which read the version they supersede.
    let mut texture_readers: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    let mut buffer_readers: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (p, pass) in graph.passes().iter().enumerate() {
        for access in pass.texture_accesses() {
            let key = if access.mode.is_write() {
                (access.node.index(), access.node.version().wrapping_sub(1))
            } else {
                (access.node.index(), access.node.version())
            };
            if access.mode.is_read() {
                texture_readers.entry(key).or_default().push(p);
            }
        }
        for access in pass.buffer_accesses() {
            let key = if access.mode.is_write() {
                (access.node.index(), access.node.version().wrapping_sub(1))
            } else {
                (access.node.index(), access.node.version())
            };
            if access.mode.is_read() {
                buffer_readers.entry(key).or_default().push(p);
            }
        }
    }

    let mut full: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    let mut content: Vec<HashSet<usize>> = vec![HashSet::new(); n];

    for (p, pass) in graph.passes().iter().enumerate() {
        for access in pass.texture_accesses() {
            if access.mode.is_write() {
                let prev = TextureNodeId {
                    index: access.node.index(),
                    version: access.node.version() - 1,
                };
                if let Some(producer) = nodes.texture_producer(prev) {
                    if producer.index() != p {
                        full[p].insert(producer.index());
                        content[p].insert(producer.index());
                    }
                }
                if let Some(readers) = texture_readers.get(&(prev.index(), prev.version())) {
                    for &reader in readers {
                        if reader != p {
                            full[p].insert(reader);
                        }
                    }
                }
            } else if let Some(producer) = nodes.texture_producer(access.node) {
                full[p].insert(producer.index());
                content[p].insert(producer.index());
            }
        }

        for access in pass.buffer_accesses() {
            if access.mode.is_write() {
                let prev = crate::graph::BufferNodeId {
                    index: access.node.index(),
                    version: access.node.version() - 1,
                };
                if let Some(producer) = nodes.buffer_producer(prev) {
                    if producer.index() != p {
                        full[p].insert(producer.index());
                        content[p].insert(producer.index());
                    }
                }
                if let Some(readers) = buffer_readers.get(&(prev.index(), prev.version())) {
                    for &reader in readers {
                        if reader != p {
                            full[p].insert(reader);
                        }
                    }
                }
            } else if let Some(producer) = nodes.buffer_producer(access.node) {
                full[p].insert(producer.index());
                content[p].insert(producer.index());
            }
        }
    }

    for &(dependent, dependency) in graph.explicit_edges() {
        full[dependent.index()].insert(dependency.index());
        content[dependent.index()].insert(dependency.index());
    }

    let mut full_preds: Vec<Vec<usize>> = Vec::with_capacity(n);
    let mut content_preds: Vec<Vec<usize>> = Vec::with_capacity(n);
    let mut full_succs: Vec<Vec<usize>> = vec![Vec::new(); n];
    for p in 0..n {
        let mut preds: Vec<usize> = full[p].iter().copied().collect();
        preds.sort_unstable();
        for &pred in &preds {
            full_succs[pred].push(p);
        }
        full_preds.push(preds);

        let mut preds: Vec<usize> = content[p].iter().copied().collect();
        preds.sort_unstable();
        content_preds.push(preds);
    }

    EdgeSet {
        full_preds,
        full_succs,
        content_preds,
    }
}

/// Remove passes that do not transitively contribute to a requested
/// output.
///
/// Follows content edges only: a pass is live if it produces the current
/// version of an output node or feeds a live pass through a read or a
/// version chain. Dead-pass elimination can never remove a contributor.
fn cull(graph: &FrameGraph, edges: &EdgeSet) -> Vec<bool> {
    let n = graph.pass_count();
    let nodes = graph.nodes();

    // No declared outputs: keep everything. An empty frame is legal, but
    // culling all passes because the caller never called mark_output would
    // turn a forgotten annotation into a silently black screen.
    if graph.outputs().is_empty() {
        return vec![true; n];
    }

    let mut live = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();

    for output in graph.outputs() {
        let producer = match *output {
            OutputRef::Texture(index) => nodes.textures()[index as usize]
                .producers
                .last()
                .copied()
                .flatten(),
            OutputRef::Buffer(index) => nodes.buffers()[index as usize]
                .producers
                .last()
                .copied()
                .flatten(),
        };
        if let Some(handle) = producer {
            if !live[handle.index()] {
                live[handle.index()] = true;
                stack.push(handle.index());
            }
        }
    }

    while let Some(p) = stack.pop() {
        for &pred in &edges.content_preds[p] {
            if !live[pred] {
                live[pred] = true;
                stack.push(pred);
            }
        }
    }

    for (p, pass) in graph.passes().iter().enumerate() {
        if !live[p] {
            log::debug!("culling pass '{}' (output not consumed)", pass.name());
        }
    }

    live
}

/// Topologically order the live passes.
///
/// Kahn's algorithm with a min-index heap: among ready passes the one
/// declared earliest always goes first, making the order deterministic and
/// idempotent for an unchanged graph.
fn order(
    graph: &FrameGraph,
    live: &[bool],
    edges: &EdgeSet,
) -> Result<(Vec<PassHandle>, Vec<usize>), CompileError> {
    let n = graph.pass_count();
    let live_count = live.iter().filter(|&&l| l).count();

    let mut in_degree = vec![0usize; n];
    for p in 0..n {
        if live[p] {
            in_degree[p] = edges.full_preds[p].iter().filter(|&&q| live[q]).count();
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n)
        .filter(|&p| live[p] && in_degree[p] == 0)
        .map(Reverse)
        .collect();

    let mut pass_order = Vec::with_capacity(live_count);
    let mut wave_by_pass = vec![0usize; n];
    let mut wave_of = Vec::with_capacity(live_count);

    while let Some(Reverse(p)) = ready.pop() {
        let wave = edges.full_preds[p]
            .iter()
            .filter(|&&q| live[q])
            .map(|&q| wave_by_pass[q] + 1)
            .max()
            .unwrap_or(0);
        wave_by_pass[p] = wave;
        wave_of.push(wave);
        pass_order.push(PassHandle::new(p as u32));

        for &succ in &edges.full_succs[p] {
            if live[succ] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }
    }

    if pass_order.len() != live_count {
        // The unprocessed passes are exactly the cycle participants (and
        // their downstream); report them by name.
        let ordered: HashSet<usize> = pass_order.iter().map(|h| h.index()).collect();
        let passes = (0..n)
            .filter(|&p| live[p] && !ordered.contains(&p))
            .map(|p| graph.passes()[p].name().to_string())
            .collect();
        return Err(CompileError::CyclicDependency { passes });
    }

    Ok((pass_order, wave_of))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::graph::{ColorAttachment, FrameGraph};
    use crate::instance::GraphicsInstance;
    use crate::registry::ResourceRegistry;
    use crate::types::{
        QueueKind, ShaderStages, TextureDescriptor, TextureFormat, TextureUsage,
    };

    fn test_graph() -> FrameGraph {
        let instance = GraphicsInstance::new().unwrap();
        let registry = ResourceRegistry::new(instance.create_device().unwrap());
        FrameGraph::new(registry)
    }

    fn color_desc() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            256,
            256,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        )
    }

    fn storage_desc() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            256,
            256,
            TextureFormat::Rgba16Float,
            TextureUsage::STORAGE_BINDING | TextureUsage::TEXTURE_BINDING,
        )
    }

    #[derive(Clone)]
    struct Produced {
        node: TextureNodeId,
    }

    /// Add a pass that creates and writes a fresh color target.
    fn produce(graph: &mut FrameGraph, name: &str) -> Produced {
        let target_name = format!("{name}_out");
        graph.add_graphics_pass(
            name,
            |builder| {
                let target = builder.create_texture(target_name.clone(), color_desc());
                Produced {
                    node: builder.add_color_attachment(ColorAttachment::new(target)),
                }
            },
            |_, _, _| {},
        )
    }

    /// Add a pass that samples `input` and writes a fresh color target.
    fn transform(graph: &mut FrameGraph, name: &str, input: TextureNodeId) -> Produced {
        let target_name = format!("{name}_out");
        graph.add_graphics_pass(
            name,
            |builder| {
                builder.add_shader_texture(input, ShaderStages::FRAGMENT);
                let target = builder.create_texture(target_name.clone(), color_desc());
                Produced {
                    node: builder.add_color_attachment(ColorAttachment::new(target)),
                }
            },
            |_, _, _| {},
        )
    }

    fn position_of(compiled: &CompiledGraph, graph: &FrameGraph, name: &str) -> usize {
        let handle = graph.pass_handle(name).unwrap();
        compiled
            .pass_order()
            .iter()
            .position(|&h| h == handle)
            .unwrap_or_else(|| panic!("pass '{name}' missing from compiled order"))
    }

    #[test]
    fn test_compile_empty_graph() {
        let graph = test_graph();
        let compiled = graph.compile().unwrap();
        assert!(compiled.is_empty());
        assert_eq!(compiled.pass_count(), 0);
    }

    #[test]
    fn test_compile_single_pass() {
        let mut graph = test_graph();
        let scene = produce(&mut graph, "scene");
        graph.mark_output_texture(scene.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 1);
    }

    #[test]
    fn test_compile_linear_chain() {
        // A writes X; B reads X and writes Y; C reads Y.
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        let c = transform(&mut graph, "C", b.node);
        graph.mark_output_texture(c.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 3);
        assert!(position_of(&compiled, &graph, "A") < position_of(&compiled, &graph, "B"));
        assert!(position_of(&compiled, &graph, "B") < position_of(&compiled, &graph, "C"));
    }

    #[test]
    fn test_compile_independent_reader() {
        // A writes X; B reads X, writes Y; C reads Y; D independently
        // reads X. A must precede everyone; B before C; D anywhere after
        // A.
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        let c = transform(&mut graph, "C", b.node);
        let d = transform(&mut graph, "D", a.node);
        graph.mark_output_texture(c.node);
        graph.mark_output_texture(d.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 4);

        let pos_a = position_of(&compiled, &graph, "A");
        let pos_b = position_of(&compiled, &graph, "B");
        let pos_c = position_of(&compiled, &graph, "C");
        let pos_d = position_of(&compiled, &graph, "D");

        assert_eq!(pos_a, 0);
        assert!(pos_b < pos_c);
        assert!(pos_a < pos_d);

        // Declaration order breaks the B/D tie.
        assert_eq!(pos_b, 1);
        assert_eq!(pos_c, 2);
        assert_eq!(pos_d, 3);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let build = || {
            let mut graph = test_graph();
            let a = produce(&mut graph, "A");
            let b = transform(&mut graph, "B", a.node);
            let c = transform(&mut graph, "C", a.node);
            let d = transform(&mut graph, "D", b.node);
            graph.mark_output_texture(c.node);
            graph.mark_output_texture(d.node);
            let order: Vec<String> = graph
                .compile()
                .unwrap()
                .pass_order()
                .iter()
                .map(|&h| graph.passes()[h.index()].name().to_string())
                .collect();
            order
        };

        // Same graph shape twice, and the same graph compiled twice.
        assert_eq!(build(), build());

        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        graph.mark_output_texture(b.node);
        let first = graph.compile().unwrap();
        let second = graph.compile().unwrap();
        assert_eq!(first.pass_order(), second.pass_order());
    }

    #[test]
    fn test_compile_cycle_from_explicit_edges() {
        // A and B each depend on the other.
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        graph.mark_output_texture(b.node);

        let a_handle = graph.pass_handle("A").unwrap();
        let b_handle = graph.pass_handle("B").unwrap();
        graph.add_dependency(a_handle, b_handle); // A also waits on B

        let result = graph.compile();
        let Err(CompileError::CyclicDependency { passes }) = result else {
            panic!("expected cycle error, got {result:?}");
        };
        assert!(passes.contains(&"A".to_string()));
        assert!(passes.contains(&"B".to_string()));
    }

    #[test]
    fn test_compile_self_read_is_a_cycle() {
        // A pass that samples the version it is itself producing.
        let mut graph = test_graph();
        let looped = graph.add_graphics_pass(
            "feedback",
            |builder| {
                let target = builder.create_texture("target", color_desc());
                let written = builder.add_color_attachment(ColorAttachment::new(target));
                builder.add_shader_texture(written, ShaderStages::FRAGMENT);
                Produced { node: written }
            },
            |_, _, _| {},
        );
        graph.mark_output_texture(looped.node);

        let result = graph.compile();
        let Err(CompileError::CyclicDependency { passes }) = result else {
            panic!("expected cycle error, got {result:?}");
        };
        assert_eq!(passes, vec!["feedback".to_string()]);
    }

    #[test]
    fn test_stale_node_version_rejected() {
        let mut graph = test_graph();
        let stale = graph.create_texture("target", color_desc());
        let _a = graph.add_graphics_pass(
            "A",
            |builder| Produced {
                node: builder.add_color_attachment(ColorAttachment::new(stale)),
            },
            |_, _, _| {},
        );

        // B reads the superseded version-0 reference.
        let _b = graph.add_graphics_pass(
            "B",
            |builder| {
                builder.add_shader_texture(stale, ShaderStages::FRAGMENT);
                Produced { node: stale }
            },
            |_, _, _| {},
        );

        let result = graph.compile();
        assert!(
            matches!(result, Err(CompileError::StaleNode { ref pass, .. }) if pass == "B"),
            "got {result:?}"
        );
    }

    #[test]
    fn test_double_write_rejected() {
        let mut graph = test_graph();
        let target = graph.create_texture("target", color_desc());
        let _a = graph.add_graphics_pass(
            "A",
            |builder| Produced {
                node: builder.add_color_attachment(ColorAttachment::new(target)),
            },
            |_, _, _| {},
        );
        let _b = graph.add_graphics_pass(
            "B",
            |builder| Produced {
                node: builder.add_color_attachment(ColorAttachment::new(target)),
            },
            |_, _, _| {},
        );

        let result = graph.compile();
        assert!(
            matches!(result, Err(CompileError::DoubleWrite { ref pass, .. }) if pass == "B"),
            "got {result:?}"
        );
    }

    #[test]
    fn test_unconsumed_passes_are_culled() {
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        let _unused = produce(&mut graph, "debug_overlay");
        graph.mark_output_texture(b.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 2);
        assert!(
            !compiled
                .pass_order()
                .iter()
                .any(|&h| graph.passes()[h.index()].name() == "debug_overlay")
        );
    }

    #[test]
    fn test_contributing_passes_survive_culling() {
        // Every pass in the chain feeding the output must survive.
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        let c = transform(&mut graph, "C", b.node);
        graph.mark_output_texture(c.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 3);
    }

    #[test]
    fn test_no_outputs_keeps_every_pass() {
        let mut graph = test_graph();
        produce(&mut graph, "A");
        produce(&mut graph, "B");

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 2);
    }

    #[test]
    fn test_transient_aliasing_requires_disjoint_lifetimes() {
        // X: [0,1], Y: [1,2], Z: [2,2]. X and Z can share one slot; Y
        // overlaps both.
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        let c = transform(&mut graph, "C", b.node);
        graph.mark_output_texture(c.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.texture_slot_count(), 2);

        let slot_x = compiled.texture_slot(a.node).unwrap();
        let slot_y = compiled.texture_slot(b.node).unwrap();
        let slot_z = compiled.texture_slot(c.node).unwrap();
        assert_eq!(slot_x, slot_z);
        assert_ne!(slot_x, slot_y);

        // Aliased resources must have disjoint lifetimes.
        let lifetime_x = compiled.texture_lifetime(a.node).unwrap();
        let lifetime_z = compiled.texture_lifetime(c.node).unwrap();
        assert!(!lifetime_x.overlaps(&lifetime_z));
    }

    #[test]
    fn test_aliasing_respects_descriptor_compatibility() {
        // Same shape as above but the last target uses another format, so
        // it cannot reuse the first slot.
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        let c = graph.add_compute_pass(
            "C",
            |builder| {
                builder.add_shader_texture(b.node, ShaderStages::COMPUTE);
                let target = builder.create_texture("hdr_out", storage_desc());
                Produced {
                    node: builder.add_storage_texture(target, ShaderStages::COMPUTE),
                }
            },
            |_, _, _| {},
        );
        graph.mark_output_texture(c.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.texture_slot_count(), 3);
    }

    #[test]
    fn test_imported_resources_are_never_aliased() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let persistent = registry.create_texture(&color_desc()).unwrap();

        let imported = graph.import_texture(persistent);
        let a = transform(&mut graph, "A", imported);
        graph.mark_output_texture(a.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.texture_slot(imported), None);
    }

    #[test]
    fn test_cross_queue_edge_gets_semaphore() {
        let mut graph = test_graph();
        let simulated = graph.add_compute_pass(
            "simulate",
            |builder| {
                let target = builder.create_texture("particles", storage_desc());
                Produced {
                    node: builder.add_storage_texture(target, ShaderStages::COMPUTE),
                }
            },
            |_, _, _| {},
        );
        let draw = transform(&mut graph, "draw", simulated.node);
        graph.mark_output_texture(draw.node);

        let compiled = graph.compile().unwrap();
        assert_eq!(compiled.pass_count(), 2);
        assert_eq!(compiled.semaphore_count(), 1);

        let sim_pos = position_of(&compiled, &graph, "simulate");
        let draw_pos = position_of(&compiled, &graph, "draw");
        assert_eq!(compiled.signals(sim_pos), &[0]);
        assert_eq!(compiled.waits(draw_pos), &[0]);
        assert_eq!(
            graph.passes()[compiled.pass_order()[sim_pos].index()].queue(),
            QueueKind::Compute
        );
    }

    #[test]
    fn test_usage_transition_gets_barrier() {
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let b = transform(&mut graph, "B", a.node);
        graph.mark_output_texture(b.node);

        let compiled = graph.compile().unwrap();
        let pos_b = position_of(&compiled, &graph, "B");
        assert!(compiled.barriers(pos_b).iter().any(|barrier| matches!(
            barrier,
            BarrierOp::Texture {
                before: crate::graph::TextureAccessMode::RenderTargetWrite,
                after: crate::graph::TextureAccessMode::ShaderRead,
                ..
            }
        )));
    }

    #[test]
    fn test_recording_waves_follow_dependencies() {
        let mut graph = test_graph();
        let a = produce(&mut graph, "A");
        let d = produce(&mut graph, "D");
        let b = transform(&mut graph, "B", a.node);
        let c = transform(&mut graph, "C", b.node);
        graph.mark_output_texture(c.node);
        graph.mark_output_texture(d.node);

        let compiled = graph.compile().unwrap();
        let wave = |name: &str| compiled.recording_wave(position_of(&compiled, &graph, name));

        assert_eq!(wave("A"), 0);
        assert_eq!(wave("D"), 0);
        assert_eq!(wave("B"), 1);
        assert_eq!(wave("C"), 2);
        assert_eq!(compiled.wave_count(), 3);
    }
}

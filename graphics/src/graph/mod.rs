//! Render graph infrastructure.
//!
//! The render graph provides a declarative way to describe one frame's
//! rendering operations and their dependencies. Passes declare the nodes
//! they read and write during an eager setup step; the compiler then
//! derives:
//!
//! - Pass ordering via topological sort (deterministic tie-breaking)
//! - Dead-pass culling against the frame's requested outputs
//! - Resource lifetimes and transient memory aliasing
//! - Barrier and cross-queue semaphore placement
//!
//! # Lifecycle
//!
//! A [`FrameGraph`] is created empty at the start of each frame and fully
//! rebuilt; only the [`ResourceRegistry`](crate::registry::ResourceRegistry)
//! persists across frames. Persistent resources are imported into fresh
//! version-0 nodes and may be exported back to their persistent ids.
//!
//! # Example
//!
//! ```ignore
//! let mut graph = FrameGraph::new(Arc::clone(&registry));
//!
//! let params = graph.add_graphics_pass(
//!     "gbuffer",
//!     |builder| {
//!         let color = builder.create_texture("gbuffer_color", color_desc);
//!         GBufferParams {
//!             color: builder.add_color_attachment(ColorAttachment::new(color)),
//!         }
//!     },
//!     |ctx, params, sink| {
//!         // record draws
//!     },
//! );
//!
//! graph.mark_output_texture(params.color);
//! let compiled = graph.compile()?;
//! ```

mod builder;
mod node;
mod pass;
mod target;
mod usage;

pub use builder::PassBuilder;
pub use node::{BufferNodeId, TextureNodeId};
pub use pass::{BufferAccess, ComputePass, GraphicsPass, Pass, TextureAccess};
pub use target::{ColorAttachment, DepthStencilAttachment, LoadOp, RenderTargetConfig, StoreOp};
pub use usage::{BufferAccessMode, TextureAccessMode};

pub(crate) use node::{BufferNodeSource, NodeAccessError, NodeTable, TextureNodeSource};

use std::sync::Arc;

use crate::backend::CommandSink;
use crate::compiler::{self, CompileError, CompiledGraph};
use crate::executor::ExecuteContext;
use crate::registry::{BufferId, ResourceRegistry, TextureId};
use crate::types::{BufferDescriptor, TextureDescriptor};

/// Handle to a pass in the render graph.
///
/// `PassHandle` is `Copy` and cheap to pass around. It is only valid within
/// the `FrameGraph` that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle(u32);

impl PassHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node reference marked as a frame output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputRef {
    /// Texture node index.
    Texture(u32),
    /// Buffer node index.
    Buffer(u32),
}

/// The render graph describing one frame's rendering operations.
pub struct FrameGraph {
    registry: Arc<ResourceRegistry>,
    nodes: NodeTable,
    passes: Vec<Pass>,
    outputs: Vec<OutputRef>,
    /// Explicit ordering edges as (dependent, dependency) pairs, on top of
    /// the edges derived from node versions.
    edges: Vec<(PassHandle, PassHandle)>,
    /// Construction errors recorded during setup; reported by `compile`.
    errors: Vec<CompileError>,
}

impl FrameGraph {
    /// Create a new empty frame graph over the given registry.
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            nodes: NodeTable::default(),
            passes: Vec::new(),
            outputs: Vec::new(),
            edges: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Get the registry this graph resolves persistent resources through.
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Node registration
    // ------------------------------------------------------------------

    /// Import a persistent texture into a version-0 node.
    ///
    /// Importing an id this frame already imported returns the existing
    /// node at its current version.
    ///
    /// # Panics
    ///
    /// Panics if the id is stale (destroyed or recycled).
    pub fn import_texture(&mut self, id: TextureId) -> TextureNodeId {
        let texture = self.registry.texture(id);
        let name = texture
            .label()
            .map(str::to_string)
            .unwrap_or_else(|| format!("imported_texture_{}", id.index()));
        self.nodes
            .import_texture(name, id, texture.descriptor().clone())
    }

    /// Import a persistent buffer into a version-0 node.
    ///
    /// Importing an id this frame already imported returns the existing
    /// node at its current version.
    ///
    /// # Panics
    ///
    /// Panics if the id is stale (destroyed or recycled).
    pub fn import_buffer(&mut self, id: BufferId) -> BufferNodeId {
        let buffer = self.registry.buffer(id);
        let name = buffer
            .label()
            .map(str::to_string)
            .unwrap_or_else(|| format!("imported_buffer_{}", id.index()));
        self.nodes
            .import_buffer(name, id, buffer.descriptor().clone())
    }

    /// Declare a frame-transient texture outside any pass.
    pub fn create_texture(
        &mut self,
        name: impl Into<String>,
        descriptor: TextureDescriptor,
    ) -> TextureNodeId {
        self.nodes.create_texture(name.into(), descriptor)
    }

    /// Declare a frame-transient buffer outside any pass.
    pub fn create_buffer(
        &mut self,
        name: impl Into<String>,
        descriptor: BufferDescriptor,
    ) -> BufferNodeId {
        self.nodes.create_buffer(name.into(), descriptor)
    }

    /// Resolve a texture node back to its persistent id and mark it as a
    /// frame output.
    ///
    /// Valid only on the most recent version of a node that was imported.
    pub fn export_texture(&mut self, node: TextureNodeId) -> Result<TextureId, CompileError> {
        let id = self
            .nodes
            .export_texture(node)
            .map_err(CompileError::from_export)?;
        self.outputs.push(OutputRef::Texture(node.index()));
        Ok(id)
    }

    /// Resolve a buffer node back to its persistent id and mark it as a
    /// frame output.
    pub fn export_buffer(&mut self, node: BufferNodeId) -> Result<BufferId, CompileError> {
        let id = self
            .nodes
            .export_buffer(node)
            .map_err(CompileError::from_export)?;
        self.outputs.push(OutputRef::Buffer(node.index()));
        Ok(id)
    }

    /// Mark a texture node as one of the frame's requested outputs.
    ///
    /// Passes that do not transitively contribute to an output are culled.
    pub fn mark_output_texture(&mut self, node: TextureNodeId) {
        self.outputs.push(OutputRef::Texture(node.index()));
    }

    /// Mark a buffer node as one of the frame's requested outputs.
    pub fn mark_output_buffer(&mut self, node: BufferNodeId) {
        self.outputs.push(OutputRef::Buffer(node.index()));
    }

    // ------------------------------------------------------------------
    // Pass registration
    // ------------------------------------------------------------------

    /// Add a graphics pass.
    ///
    /// `setup` runs immediately on the calling thread: it records the
    /// pass's accesses and configuration and returns the params value
    /// holding the node versions it produced. The returned params are
    /// usable right away by subsequently added passes, which is how a
    /// multi-pass pipeline threads resources through the graph.
    ///
    /// `execute` is stored together with a copy of the params and invoked
    /// later by the executor, possibly on a worker thread.
    pub fn add_graphics_pass<P, S, E>(&mut self, name: impl Into<String>, setup: S, execute: E) -> P
    where
        P: Clone + Send + Sync + 'static,
        S: FnOnce(&mut PassBuilder<'_>) -> P,
        E: Fn(&ExecuteContext<'_>, &P, &mut dyn CommandSink) + Send + Sync + 'static,
    {
        let name = name.into();
        log::trace!("FrameGraph: adding graphics pass '{name}'");
        let pass = Pass::Graphics(GraphicsPass::new(name));
        self.add_pass(pass, setup, execute)
    }

    /// Add a compute pass.
    ///
    /// Same contract as [`add_graphics_pass`](Self::add_graphics_pass); the
    /// pass defaults to the compute queue and may be moved to the transfer
    /// queue during setup.
    pub fn add_compute_pass<P, S, E>(&mut self, name: impl Into<String>, setup: S, execute: E) -> P
    where
        P: Clone + Send + Sync + 'static,
        S: FnOnce(&mut PassBuilder<'_>) -> P,
        E: Fn(&ExecuteContext<'_>, &P, &mut dyn CommandSink) + Send + Sync + 'static,
    {
        let name = name.into();
        log::trace!("FrameGraph: adding compute pass '{name}'");
        let pass = Pass::Compute(ComputePass::new(name));
        self.add_pass(pass, setup, execute)
    }

    fn add_pass<P, S, E>(&mut self, mut pass: Pass, setup: S, execute: E) -> P
    where
        P: Clone + Send + Sync + 'static,
        S: FnOnce(&mut PassBuilder<'_>) -> P,
        E: Fn(&ExecuteContext<'_>, &P, &mut dyn CommandSink) + Send + Sync + 'static,
    {
        let handle = PassHandle::new(self.passes.len() as u32);

        let params = {
            let mut builder = PassBuilder {
                nodes: &mut self.nodes,
                pass: &mut pass,
                handle,
                errors: &mut self.errors,
            };
            setup(&mut builder)
        };

        // Execute sees a copy of the params, never the caller's value.
        let stored = params.clone();
        let callback: pass::ExecuteFn =
            Box::new(move |context, sink| execute(context, &stored, sink));
        match &mut pass {
            Pass::Graphics(p) => p.execute = Some(callback),
            Pass::Compute(p) => p.execute = Some(callback),
        }

        self.passes.push(pass);
        params
    }

    /// Add an explicit dependency between passes.
    ///
    /// Most ordering falls out of node versions; an explicit edge covers
    /// dependencies the node table cannot see (side effects on external
    /// state, debugging overrides). The `dependent` pass will execute
    /// after the `dependency` pass.
    pub fn add_dependency(&mut self, dependent: PassHandle, dependency: PassHandle) {
        assert!(
            dependent.index() < self.passes.len(),
            "Invalid dependent handle"
        );
        assert!(
            dependency.index() < self.passes.len(),
            "Invalid dependency handle"
        );
        assert!(dependent != dependency, "Pass cannot depend on itself");

        // Check for duplicates
        let exists = self
            .edges
            .iter()
            .any(|&(d, dep)| d == dependent && dep == dependency);
        if !exists {
            self.edges.push((dependent, dependency));
        }
    }

    /// Look up a pass handle by pass name.
    ///
    /// Returns the first pass with that name, in declaration order.
    pub fn pass_handle(&self, name: &str) -> Option<PassHandle> {
        self.passes
            .iter()
            .position(|pass| pass.name() == name)
            .map(|index| PassHandle::new(index as u32))
    }

    // ------------------------------------------------------------------
    // Introspection and compilation
    // ------------------------------------------------------------------

    /// Get all passes in the graph.
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Get a pass by handle.
    pub fn pass(&self, handle: PassHandle) -> Option<&Pass> {
        self.passes.get(handle.index())
    }

    /// Get the explicit dependency edges as (dependent, dependency) pairs.
    pub fn explicit_edges(&self) -> &[(PassHandle, PassHandle)] {
        &self.edges
    }

    /// Get the number of passes in the graph.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Number of texture nodes registered this frame.
    pub fn texture_node_count(&self) -> usize {
        self.nodes.texture_count()
    }

    /// Number of buffer nodes registered this frame.
    pub fn buffer_node_count(&self) -> usize {
        self.nodes.buffer_count()
    }

    pub(crate) fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub(crate) fn outputs(&self) -> &[OutputRef] {
        &self.outputs
    }

    pub(crate) fn construction_errors(&self) -> &[CompileError] {
        &self.errors
    }

    /// Compile the graph for execution.
    ///
    /// This runs the full pipeline: validation, dead-pass culling,
    /// topological ordering, lifetime/aliasing scheduling, and barrier and
    /// semaphore synthesis.
    ///
    /// # Errors
    ///
    /// Returns the first construction error recorded during setup, or a
    /// cycle error if the data edges do not form a DAG. No command is ever
    /// recorded or submitted for a graph that fails to compile.
    pub fn compile(&self) -> Result<CompiledGraph, CompileError> {
        compiler::compile(self)
    }
}

impl std::fmt::Debug for FrameGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGraph")
            .field("passes", &self.passes.len())
            .field("texture_nodes", &self.nodes.texture_count())
            .field("buffer_nodes", &self.nodes.buffer_count())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::GraphicsInstance;
    use crate::types::{
        BufferUsage, ShaderStages, TextureDescriptor, TextureFormat, TextureUsage,
    };

    fn test_graph() -> FrameGraph {
        let instance = GraphicsInstance::new().unwrap();
        let registry = ResourceRegistry::new(instance.create_device().unwrap());
        FrameGraph::new(registry)
    }

    fn color_desc() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            128,
            128,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        )
    }

    #[derive(Clone)]
    struct Params {
        color: TextureNodeId,
    }

    #[test]
    fn test_add_graphics_pass() {
        let mut graph = test_graph();
        let params = graph.add_graphics_pass(
            "scene",
            |builder| {
                let target = builder.create_texture("scene_color", color_desc());
                Params {
                    color: builder.add_color_attachment(ColorAttachment::new(target)),
                }
            },
            |_, _, _| {},
        );

        assert_eq!(graph.pass_count(), 1);
        assert_eq!(graph.passes()[0].name(), "scene");
        assert!(graph.passes()[0].is_graphics());
        assert_eq!(params.color.version(), 1);
    }

    #[test]
    fn test_add_compute_pass() {
        let mut graph = test_graph();
        let _params = graph.add_compute_pass(
            "simulation",
            |builder| {
                let buffer = builder.create_buffer(
                    "particles",
                    crate::types::BufferDescriptor::new(4096, BufferUsage::STORAGE),
                );
                builder.add_storage_buffer(buffer, ShaderStages::COMPUTE)
            },
            |_, _: &BufferNodeId, _| {},
        );

        assert_eq!(graph.pass_count(), 1);
        assert!(graph.passes()[0].is_compute());
    }

    #[test]
    fn test_setup_runs_eagerly() {
        let mut graph = test_graph();
        let mut ran = false;
        graph.add_graphics_pass(
            "eager",
            |builder| {
                ran = true;
                builder.create_texture("t", color_desc())
            },
            |_, _: &TextureNodeId, _| {},
        );
        assert!(ran, "setup must run at add time, not at execute time");
    }

    #[test]
    fn test_params_chain_between_passes() {
        // The value returned from pass A is consumed by pass B's setup.
        let mut graph = test_graph();
        let a = graph.add_graphics_pass(
            "shadow",
            |builder| {
                let target = builder.create_texture("shadow_map", color_desc());
                Params {
                    color: builder.add_color_attachment(ColorAttachment::new(target)),
                }
            },
            |_, _, _| {},
        );

        let b = graph.add_graphics_pass(
            "lighting",
            |builder| {
                builder.add_shader_texture(a.color, ShaderStages::FRAGMENT);
                let target = builder.create_texture("lit", color_desc());
                Params {
                    color: builder.add_color_attachment(ColorAttachment::new(target)),
                }
            },
            |_, _, _| {},
        );

        assert_eq!(graph.pass_count(), 2);
        assert_ne!(a.color.index(), b.color.index());
        assert_eq!(graph.texture_node_count(), 2);
    }

    #[test]
    fn test_import_export_round_trip() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let id = registry.create_texture(&color_desc()).unwrap();

        let node = graph.import_texture(id);
        assert_eq!(node.version(), 0);
        assert_eq!(graph.export_texture(node).unwrap(), id);
    }

    #[test]
    fn test_import_is_deduplicated() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let id = registry.create_texture(&color_desc()).unwrap();

        let first = graph.import_texture(id);
        let second = graph.import_texture(id);
        assert_eq!(first, second);
        assert_eq!(graph.texture_node_count(), 1);
    }

    #[test]
    fn test_reimport_after_write_returns_current_version() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let id = registry.create_texture(&color_desc()).unwrap();

        let imported = graph.import_texture(id);
        let written = graph.add_graphics_pass(
            "writer",
            |builder| Params {
                color: builder.add_color_attachment(ColorAttachment::new(imported)),
            },
            |_, _, _| {},
        );

        let reimported = graph.import_texture(id);
        assert_eq!(reimported, written.color);
    }

    #[test]
    fn test_export_of_written_import_round_trips() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let id = registry.create_texture(&color_desc()).unwrap();

        let imported = graph.import_texture(id);
        let written = graph.add_graphics_pass(
            "writer",
            |builder| Params {
                color: builder.add_color_attachment(ColorAttachment::new(imported)),
            },
            |_, _, _| {},
        );

        assert_eq!(graph.export_texture(written.color).unwrap(), id);
    }

    #[test]
    fn test_export_transient_fails() {
        let mut graph = test_graph();
        let node = graph.create_texture("scratch", color_desc());
        assert!(matches!(
            graph.export_texture(node),
            Err(CompileError::ExportNotImported { .. })
        ));
    }

    #[test]
    fn test_export_stale_version_fails() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let id = registry.create_texture(&color_desc()).unwrap();

        let imported = graph.import_texture(id);
        graph.add_graphics_pass(
            "writer",
            |builder| Params {
                color: builder.add_color_attachment(ColorAttachment::new(imported)),
            },
            |_, _, _| {},
        );

        // `imported` is version 0, superseded by the writer.
        assert!(matches!(
            graph.export_texture(imported),
            Err(CompileError::StaleExport { version: 0, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "stale texture handle")]
    fn test_import_destroyed_id_panics() {
        let mut graph = test_graph();
        let registry = Arc::clone(graph.registry());
        let id = registry.create_texture(&color_desc()).unwrap();
        registry.destroy_texture(id).unwrap();
        let _ = graph.import_texture(id);
    }

    #[test]
    fn test_pass_handle_lookup() {
        let mut graph = test_graph();
        graph.add_graphics_pass(
            "geometry",
            |builder| builder.create_texture("g", color_desc()),
            |_, _: &TextureNodeId, _| {},
        );

        assert!(graph.pass_handle("geometry").is_some());
        assert!(graph.pass_handle("missing").is_none());
    }

    #[test]
    fn test_add_dependency_deduplicates() {
        let mut graph = test_graph();
        graph.add_graphics_pass(
            "a",
            |builder| builder.create_texture("ta", color_desc()),
            |_, _: &TextureNodeId, _| {},
        );
        graph.add_graphics_pass(
            "b",
            |builder| builder.create_texture("tb", color_desc()),
            |_, _: &TextureNodeId, _| {},
        );

        let a = graph.pass_handle("a").unwrap();
        let b = graph.pass_handle("b").unwrap();
        graph.add_dependency(b, a);
        graph.add_dependency(b, a);
        assert_eq!(graph.explicit_edges().len(), 1);
    }
}

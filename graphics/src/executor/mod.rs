//! Render graph execution.
//!
//! The [`FrameExecutor`] walks a compiled schedule: it materializes
//! transient resources from the aliasing plan, resolves every node to its
//! concrete backing resource, records each pass's commands into its own
//! sink, and submits the sinks to the backend queues.
//!
//! Recording is parallelized by dependency wave (passes with no edges
//! between them record concurrently on the task pool), but submission is
//! always the single compiled total order, with the compiled semaphores
//! attached. Parallel recording, serial submission.

use std::sync::Arc;

use nightshade_core::task::TaskPool;

use crate::backend::{
    ColorAttachmentBinding, CommandSink, DepthStencilBinding, GpuSemaphore, RenderPassBinding,
};
use crate::compiler::{BarrierOp, CompiledGraph};
use crate::error::GraphicsError;
use crate::graph::{
    BufferNodeId, BufferNodeSource, FrameGraph, Pass, TextureNodeId, TextureNodeSource,
};
use crate::registry::{Buffer, BufferId, ResourceRegistry, Texture, TextureId};

/// Execution-time node resolution handed to pass callbacks.
///
/// All lookups go through the per-frame resolution tables built by the
/// executor; persistent resources were resolved through the registry,
/// transients through the aliased slot plan.
pub struct ExecuteContext<'a> {
    registry: &'a ResourceRegistry,
    tasks: &'a TaskPool,
    textures: &'a [Option<Arc<Texture>>],
    buffers: &'a [Option<Arc<Buffer>>],
}

impl<'a> ExecuteContext<'a> {
    /// Get the resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        self.registry
    }

    /// Get the task pool, for intra-pass recording fan-out.
    ///
    /// Work spawned here is joined before the call returns
    /// ([`TaskPool::parallel_for`]), so a pass's command list is complete
    /// when its execute callback finishes.
    pub fn tasks(&self) -> &TaskPool {
        self.tasks
    }

    /// Resolve a texture node to its backing resource.
    ///
    /// # Panics
    ///
    /// Panics if the node was not declared by this graph or was culled.
    pub fn texture(&self, node: TextureNodeId) -> &Arc<Texture> {
        self.try_texture(node)
            .unwrap_or_else(|| panic!("texture node {} is not resolved", node.index()))
    }

    /// Resolve a texture node, returning `None` if it has no backing.
    pub fn try_texture(&self, node: TextureNodeId) -> Option<&Arc<Texture>> {
        self.textures.get(node.index() as usize)?.as_ref()
    }

    /// Resolve a buffer node to its backing resource.
    ///
    /// # Panics
    ///
    /// Panics if the node was not declared by this graph or was culled.
    pub fn buffer(&self, node: BufferNodeId) -> &Arc<Buffer> {
        self.try_buffer(node)
            .unwrap_or_else(|| panic!("buffer node {} is not resolved", node.index()))
    }

    /// Resolve a buffer node, returning `None` if it has no backing.
    pub fn try_buffer(&self, node: BufferNodeId) -> Option<&Arc<Buffer>> {
        self.buffers.get(node.index() as usize)?.as_ref()
    }

    fn texture_by_index(&self, index: u32) -> Option<&Arc<Texture>> {
        self.textures.get(index as usize)?.as_ref()
    }

    fn buffer_by_index(&self, index: u32) -> Option<&Arc<Buffer>> {
        self.buffers.get(index as usize)?.as_ref()
    }
}

/// Executes compiled frame graphs.
///
/// Holds the registry and the recording task pool; one executor serves
/// many frames.
pub struct FrameExecutor {
    registry: Arc<ResourceRegistry>,
    tasks: TaskPool,
}

impl FrameExecutor {
    /// Create an executor over the given registry and task pool.
    pub fn new(registry: Arc<ResourceRegistry>, tasks: TaskPool) -> Self {
        Self { registry, tasks }
    }

    /// Get the registry this executor resolves resources through.
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Execute a compiled graph.
    ///
    /// Records passes wave by wave (concurrently within a wave), then
    /// submits every sink in the compiled order with the compiled
    /// semaphore waits and signals. Transient resources are created from
    /// the aliasing plan on first use and released at the end of the
    /// frame; nothing transient survives into the next frame.
    ///
    /// # Errors
    ///
    /// Propagates resource allocation failures. Nothing is submitted
    /// unless every pass recorded successfully.
    pub fn execute(
        &self,
        graph: &FrameGraph,
        compiled: &CompiledGraph,
    ) -> Result<(), GraphicsError> {
        nightshade_core::profile_function!();

        let backend = self.registry.device().backend();
        let pass_count = compiled.pass_count();

        // Persistent resources resolve through the registry up front.
        let mut textures: Vec<Option<Arc<Texture>>> = vec![None; graph.texture_node_count()];
        let mut buffers: Vec<Option<Arc<Buffer>>> = vec![None; graph.buffer_node_count()];
        for (index, node) in graph.nodes().textures().iter().enumerate() {
            if let TextureNodeSource::Imported(id) = &node.source {
                textures[index] = Some(self.registry.texture(*id));
            }
        }
        for (index, node) in graph.nodes().buffers().iter().enumerate() {
            if let BufferNodeSource::Imported(id) = &node.source {
                buffers[index] = Some(self.registry.buffer(*id));
            }
        }

        // Transient backing, created lazily as waves reach their first use.
        let mut texture_slot_ids: Vec<Option<TextureId>> =
            vec![None; compiled.texture_plan().slots.len()];
        let mut buffer_slot_ids: Vec<Option<BufferId>> =
            vec![None; compiled.buffer_plan().slots.len()];

        // Group compiled positions into recording waves.
        let mut waves: Vec<Vec<usize>> = vec![Vec::new(); compiled.wave_count()];
        for position in 0..pass_count {
            waves[compiled.recording_wave(position)].push(position);
        }

        let mut recorded: Vec<Option<Box<dyn CommandSink>>> =
            (0..pass_count).map(|_| None).collect();

        for wave in &waves {
            nightshade_core::profile_scope!("record_wave");

            // Materialize transients whose first use is in this wave.
            for &position in wave {
                let pass = &graph.passes()[compiled.pass_order()[position].index()];
                for access in pass.texture_accesses() {
                    let index = access.node.index() as usize;
                    if textures[index].is_some() {
                        continue;
                    }
                    let Some(slot) = compiled.texture_plan().slot_of_node[index] else {
                        continue;
                    };
                    let id = match texture_slot_ids[slot as usize] {
                        Some(id) => id,
                        None => {
                            let mut descriptor =
                                compiled.texture_plan().slots[slot as usize].clone();
                            if descriptor.label.is_none() {
                                descriptor.label = Some(format!("transient_texture_slot_{slot}"));
                            }
                            let id = self.registry.create_texture(&descriptor)?;
                            texture_slot_ids[slot as usize] = Some(id);
                            id
                        }
                    };
                    textures[index] = Some(self.registry.texture(id));
                }
                for access in pass.buffer_accesses() {
                    let index = access.node.index() as usize;
                    if buffers[index].is_some() {
                        continue;
                    }
                    let Some(slot) = compiled.buffer_plan().slot_of_node[index] else {
                        continue;
                    };
                    let id = match buffer_slot_ids[slot as usize] {
                        Some(id) => id,
                        None => {
                            let mut descriptor =
                                compiled.buffer_plan().slots[slot as usize].clone();
                            if descriptor.label.is_none() {
                                descriptor.label = Some(format!("transient_buffer_slot_{slot}"));
                            }
                            let id = self.registry.create_buffer(&descriptor)?;
                            buffer_slot_ids[slot as usize] = Some(id);
                            id
                        }
                    };
                    buffers[index] = Some(self.registry.buffer(id));
                }
            }

            // Record the wave's passes concurrently, each into its own sink.
            let context = ExecuteContext {
                registry: &self.registry,
                tasks: &self.tasks,
                textures: &textures,
                buffers: &buffers,
            };
            let context = &context;

            let jobs: Vec<_> = wave
                .iter()
                .map(|&position| {
                    move || self.record_pass(graph, compiled, position, context)
                })
                .collect();

            let sinks = self.tasks.run_all(jobs);
            for (&position, sink) in wave.iter().zip(sinks) {
                recorded[position] = Some(sink?);
            }
        }

        // Serial submission in the compiled total order.
        let semaphores: Vec<GpuSemaphore> = (0..compiled.semaphore_count())
            .map(|_| self.registry.device().create_semaphore())
            .collect();

        for position in 0..pass_count {
            let handle = compiled.pass_order()[position];
            let pass = &graph.passes()[handle.index()];
            let sink = recorded[position]
                .take()
                .expect("every pass recorded before submission");

            let waits: Vec<GpuSemaphore> = compiled
                .waits(position)
                .iter()
                .map(|&s| semaphores[s as usize])
                .collect();
            let signals: Vec<GpuSemaphore> = compiled
                .signals(position)
                .iter()
                .map(|&s| semaphores[s as usize])
                .collect();

            log::trace!(
                "submitting pass '{}' on {:?} queue",
                pass.name(),
                pass.queue()
            );
            backend.submit(sink, pass.queue(), &waits, &signals);
        }

        // Frame teardown: transient backing does not outlive the frame.
        for id in texture_slot_ids.into_iter().flatten() {
            self.registry.destroy_texture(id)?;
        }
        for id in buffer_slot_ids.into_iter().flatten() {
            self.registry.destroy_buffer(id)?;
        }

        Ok(())
    }

    /// Record one pass into a fresh command sink.
    fn record_pass(
        &self,
        graph: &FrameGraph,
        compiled: &CompiledGraph,
        position: usize,
        context: &ExecuteContext<'_>,
    ) -> Result<Box<dyn CommandSink>, GraphicsError> {
        let handle = compiled.pass_order()[position];
        let pass = &graph.passes()[handle.index()];
        let backend = self.registry.device().backend();

        let mut sink = backend.create_command_sink(pass.queue());

        // Synthesized barriers come first.
        for barrier in compiled.barriers(position) {
            match *barrier {
                BarrierOp::Texture {
                    node,
                    before,
                    after,
                } => {
                    if let Some(texture) = context.texture_by_index(node) {
                        sink.texture_barrier(texture.gpu(), before, after);
                    }
                }
                BarrierOp::Buffer {
                    node,
                    before,
                    after,
                } => {
                    if let Some(buffer) = context.buffer_by_index(node) {
                        sink.buffer_barrier(buffer.gpu(), before, after);
                    }
                }
            }
        }

        match pass {
            Pass::Graphics(graphics) => {
                let pipeline = graphics
                    .pipeline()
                    .map(|descriptor| self.registry.render_pipeline(descriptor))
                    .transpose()?;

                // Keep attachment resources alive across recording.
                let colors: Vec<(Arc<Texture>, _)> = graphics
                    .render_targets()
                    .colors
                    .iter()
                    .map(|attachment| {
                        (Arc::clone(context.texture(attachment.texture)), attachment)
                    })
                    .collect();
                let depth = graphics
                    .render_targets()
                    .depth_stencil
                    .as_ref()
                    .map(|attachment| {
                        (Arc::clone(context.texture(attachment.texture)), attachment)
                    });

                let binding = RenderPassBinding {
                    label: pass.name(),
                    colors: colors
                        .iter()
                        .map(|(texture, attachment)| ColorAttachmentBinding {
                            texture: texture.gpu(),
                            load: attachment.load,
                            store: attachment.store,
                            clear: attachment.clear,
                        })
                        .collect(),
                    depth_stencil: depth.as_ref().map(|(texture, attachment)| {
                        DepthStencilBinding {
                            texture: texture.gpu(),
                            load: attachment.load,
                            store: attachment.store,
                            clear: attachment.clear,
                        }
                    }),
                };

                sink.begin_render_pass(&binding);
                if let Some(id) = pipeline {
                    sink.set_render_pipeline(self.registry.pipeline(id).gpu());
                }
                pass.execute(context, sink.as_mut());
                sink.end_render_pass();
            }
            Pass::Compute(compute) => {
                let pipeline = compute
                    .pipeline()
                    .map(|descriptor| self.registry.compute_pipeline(descriptor))
                    .transpose()?;

                sink.begin_compute_pass(pass.name());
                if let Some(id) = pipeline {
                    sink.set_compute_pipeline(self.registry.pipeline(id).gpu());
                }
                pass.execute(context, sink.as_mut());
                sink.end_compute_pass();
            }
        }

        Ok(sink)
    }
}

impl std::fmt::Debug for FrameExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameExecutor")
            .field("workers", &self.tasks.num_threads())
            .finish()
    }
}

//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations but provides a valid
//! implementation for exercising the graphics API without GPU hardware.
//! Every allocation and submission is recorded, so tests can assert on the
//! exact command stream and submission order the engine produced.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::graph::{BufferAccessMode, TextureAccessMode};
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, QueueKind, RenderPipelineDescriptor,
    SamplerDescriptor, ShaderDescriptor, TextureDescriptor,
};

use super::{
    CommandSink, GpuBackend, GpuBuffer, GpuPipeline, GpuSampler, GpuSemaphore, GpuShader,
    GpuTexture, RenderPassBinding,
};

/// A command captured by [`DummyCommandSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    /// Render pass opened.
    BeginRenderPass {
        /// Pass label.
        label: String,
        /// Backend ids of the color attachments.
        color_ids: Vec<u64>,
        /// Backend id of the depth attachment, if any.
        depth_id: Option<u64>,
    },
    /// Render pass closed.
    EndRenderPass,
    /// Compute pass opened.
    BeginComputePass {
        /// Pass label.
        label: String,
    },
    /// Compute pass closed.
    EndComputePass,
    /// Render pipeline bound.
    SetRenderPipeline {
        /// Backend id of the pipeline.
        id: u64,
    },
    /// Compute pipeline bound.
    SetComputePipeline {
        /// Backend id of the pipeline.
        id: u64,
    },
    /// Vertex buffer bound.
    SetVertexBuffer {
        /// Binding slot.
        slot: u32,
        /// Backend id of the buffer.
        id: u64,
        /// Byte offset.
        offset: u64,
    },
    /// Index buffer bound.
    SetIndexBuffer {
        /// Backend id of the buffer.
        id: u64,
        /// Byte offset.
        offset: u64,
    },
    /// Non-indexed draw.
    Draw {
        /// Vertex range.
        vertices: Range<u32>,
        /// Instance range.
        instances: Range<u32>,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Index range.
        indices: Range<u32>,
        /// Base vertex.
        base_vertex: i32,
        /// Instance range.
        instances: Range<u32>,
    },
    /// Compute dispatch.
    Dispatch {
        /// Workgroups in X.
        x: u32,
        /// Workgroups in Y.
        y: u32,
        /// Workgroups in Z.
        z: u32,
    },
    /// Buffer copy.
    CopyBuffer {
        /// Source buffer id.
        src: u64,
        /// Destination buffer id.
        dst: u64,
        /// Byte count.
        size: u64,
    },
    /// Texture copy.
    CopyTexture {
        /// Source texture id.
        src: u64,
        /// Destination texture id.
        dst: u64,
    },
    /// Texture transition barrier.
    TextureBarrier {
        /// Texture id.
        id: u64,
        /// Access before the barrier.
        before: TextureAccessMode,
        /// Access after the barrier.
        after: TextureAccessMode,
    },
    /// Buffer memory barrier.
    BufferBarrier {
        /// Buffer id.
        id: u64,
        /// Access before the barrier.
        before: BufferAccessMode,
        /// Access after the barrier.
        after: BufferAccessMode,
    },
}

/// One submission captured by [`DummyBackend::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    /// Queue the sink was submitted to.
    pub queue: QueueKind,
    /// Commands in recording order.
    pub commands: Vec<RecordedCommand>,
    /// Semaphore ids waited on.
    pub waits: Vec<u64>,
    /// Semaphore ids signaled.
    pub signals: Vec<u64>,
}

impl SubmissionRecord {
    /// Label of the first pass opened in this submission, if any.
    pub fn pass_label(&self) -> Option<&str> {
        self.commands.iter().find_map(|command| match command {
            RecordedCommand::BeginRenderPass { label, .. } => Some(label.as_str()),
            RecordedCommand::BeginComputePass { label } => Some(label.as_str()),
            _ => None,
        })
    }
}

/// Command sink that records commands instead of encoding them.
#[derive(Debug, Default)]
pub struct DummyCommandSink {
    commands: Vec<RecordedCommand>,
}

impl DummyCommandSink {
    /// Commands recorded so far.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }
}

impl CommandSink for DummyCommandSink {
    fn begin_render_pass(&mut self, binding: &RenderPassBinding<'_>) {
        self.commands.push(RecordedCommand::BeginRenderPass {
            label: binding.label.to_string(),
            color_ids: binding
                .colors
                .iter()
                .map(|color| color.texture.raw_id())
                .collect(),
            depth_id: binding
                .depth_stencil
                .as_ref()
                .map(|depth| depth.texture.raw_id()),
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn begin_compute_pass(&mut self, label: &str) {
        self.commands.push(RecordedCommand::BeginComputePass {
            label: label.to_string(),
        });
    }

    fn end_compute_pass(&mut self) {
        self.commands.push(RecordedCommand::EndComputePass);
    }

    fn set_render_pipeline(&mut self, pipeline: &GpuPipeline) {
        self.commands.push(RecordedCommand::SetRenderPipeline {
            id: pipeline.raw_id(),
        });
    }

    fn set_compute_pipeline(&mut self, pipeline: &GpuPipeline) {
        self.commands.push(RecordedCommand::SetComputePipeline {
            id: pipeline.raw_id(),
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64) {
        self.commands.push(RecordedCommand::SetVertexBuffer {
            slot,
            id: buffer.raw_id(),
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: &GpuBuffer, offset: u64) {
        self.commands.push(RecordedCommand::SetIndexBuffer {
            id: buffer.raw_id(),
            offset,
        });
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.commands.push(RecordedCommand::Draw {
            vertices,
            instances,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.commands.push(RecordedCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn copy_buffer(
        &mut self,
        src: &GpuBuffer,
        _src_offset: u64,
        dst: &GpuBuffer,
        _dst_offset: u64,
        size: u64,
    ) {
        self.commands.push(RecordedCommand::CopyBuffer {
            src: src.raw_id(),
            dst: dst.raw_id(),
            size,
        });
    }

    fn copy_texture(&mut self, src: &GpuTexture, dst: &GpuTexture) {
        self.commands.push(RecordedCommand::CopyTexture {
            src: src.raw_id(),
            dst: dst.raw_id(),
        });
    }

    fn texture_barrier(
        &mut self,
        texture: &GpuTexture,
        before: TextureAccessMode,
        after: TextureAccessMode,
    ) {
        self.commands.push(RecordedCommand::TextureBarrier {
            id: texture.raw_id(),
            before,
            after,
        });
    }

    fn buffer_barrier(
        &mut self,
        buffer: &GpuBuffer,
        before: BufferAccessMode,
        after: BufferAccessMode,
    ) {
        self.commands.push(RecordedCommand::BufferBarrier {
            id: buffer.raw_id(),
            before,
            after,
        });
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

/// Dummy GPU backend.
///
/// Allocations hand out monotonically increasing ids; submissions are
/// appended to an inspectable log in the exact order [`GpuBackend::submit`]
/// is called.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_id: AtomicU64,
    live_allocations: AtomicUsize,
    submissions: Mutex<Vec<SubmissionRecord>>,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.live_allocations.fetch_add(1, Ordering::Relaxed);
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of live (created and not destroyed) resources.
    pub fn live_allocations(&self) -> usize {
        self.live_allocations.load(Ordering::Relaxed)
    }

    /// Snapshot of all submissions so far, in submission order.
    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.submissions.lock().clone()
    }

    /// Labels of submitted passes, in submission order.
    pub fn submitted_pass_labels(&self) -> Vec<String> {
        self.submissions
            .lock()
            .iter()
            .filter_map(|submission| submission.pass_label().map(str::to_string))
            .collect()
    }

    /// Clear the submission log.
    pub fn reset_submissions(&self) {
        self.submissions.lock().clear();
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        Ok(GpuBuffer::Dummy {
            id: self.allocate_id(),
        })
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuTexture, GraphicsError> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );
        Ok(GpuTexture::Dummy {
            id: self.allocate_id(),
        })
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError> {
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(GpuSampler::Dummy {
            id: self.allocate_id(),
        })
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<GpuShader, GraphicsError> {
        log::trace!(
            "DummyBackend: creating shader {:?} ({:?})",
            descriptor.label,
            descriptor.stage
        );
        Ok(GpuShader::Dummy {
            id: self.allocate_id(),
        })
    }

    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<GpuPipeline, GraphicsError> {
        log::trace!(
            "DummyBackend: creating render pipeline {:?}",
            descriptor.label
        );
        Ok(GpuPipeline::Dummy {
            id: self.allocate_id(),
        })
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<GpuPipeline, GraphicsError> {
        log::trace!(
            "DummyBackend: creating compute pipeline {:?}",
            descriptor.label
        );
        Ok(GpuPipeline::Dummy {
            id: self.allocate_id(),
        })
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let GpuBuffer::Dummy { id } = buffer;
        log::trace!("DummyBackend: destroying buffer {id}");
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    fn destroy_texture(&self, texture: GpuTexture) {
        let GpuTexture::Dummy { id } = texture;
        log::trace!("DummyBackend: destroying texture {id}");
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    fn destroy_sampler(&self, sampler: GpuSampler) {
        let GpuSampler::Dummy { id } = sampler;
        log::trace!("DummyBackend: destroying sampler {id}");
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    fn destroy_shader(&self, shader: GpuShader) {
        let GpuShader::Dummy { id } = shader;
        log::trace!("DummyBackend: destroying shader {id}");
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    fn destroy_pipeline(&self, pipeline: GpuPipeline) {
        let GpuPipeline::Dummy { id } = pipeline;
        log::trace!("DummyBackend: destroying pipeline {id}");
        self.live_allocations.fetch_sub(1, Ordering::Relaxed);
    }

    fn create_semaphore(&self) -> GpuSemaphore {
        GpuSemaphore::Dummy {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn create_command_sink(&self, queue: QueueKind) -> Box<dyn CommandSink> {
        log::trace!("DummyBackend: opening command sink on {queue:?} queue");
        Box::new(DummyCommandSink::default())
    }

    fn submit(
        &self,
        sink: Box<dyn CommandSink>,
        queue: QueueKind,
        waits: &[GpuSemaphore],
        signals: &[GpuSemaphore],
    ) {
        let sink = sink
            .into_any()
            .downcast::<DummyCommandSink>()
            .expect("dummy backend submitted a foreign command sink");

        let semaphore_id = |semaphore: &GpuSemaphore| {
            let GpuSemaphore::Dummy { id } = semaphore;
            *id
        };

        self.submissions.lock().push(SubmissionRecord {
            queue,
            commands: sink.commands,
            waits: waits.iter().map(semaphore_id).collect(),
            signals: signals.iter().map(semaphore_id).collect(),
        });
    }
}

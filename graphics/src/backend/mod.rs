//! GPU backend abstraction layer.
//!
//! This module provides a trait-based abstraction for GPU backends,
//! allowing the graphics crate to work with different GPU APIs.
//!
//! # Available Backends
//!
//! - `dummy` (default): No-op backend that records every allocation and
//!   submission, used for testing and development without GPU hardware.
//!
//! Real backends live outside this crate and implement [`GpuBackend`] and
//! [`CommandSink`]; nothing in the graph, compiler, or executor assumes a
//! particular native graphics API.

pub mod dummy;

pub use dummy::{DummyBackend, RecordedCommand, SubmissionRecord};

use std::ops::Range;

use crate::error::GraphicsError;
use crate::graph::{BufferAccessMode, LoadOp, StoreOp, TextureAccessMode};
use crate::types::{
    BufferDescriptor, ClearValue, ComputePipelineDescriptor, QueueKind,
    RenderPipelineDescriptor, SamplerDescriptor, ShaderDescriptor, TextureDescriptor,
};

/// Handle to a GPU buffer resource.
#[derive(Debug)]
pub enum GpuBuffer {
    /// Dummy backend (no GPU allocation).
    Dummy {
        /// Backend-local identifier.
        id: u64,
    },
}

impl GpuBuffer {
    /// Backend-local identifier of this buffer.
    pub fn raw_id(&self) -> u64 {
        match self {
            Self::Dummy { id } => *id,
        }
    }
}

/// Handle to a GPU texture resource.
#[derive(Debug)]
pub enum GpuTexture {
    /// Dummy backend (no GPU allocation).
    Dummy {
        /// Backend-local identifier.
        id: u64,
    },
}

impl GpuTexture {
    /// Backend-local identifier of this texture.
    pub fn raw_id(&self) -> u64 {
        match self {
            Self::Dummy { id } => *id,
        }
    }
}

/// Handle to a GPU sampler resource.
#[derive(Debug)]
pub enum GpuSampler {
    /// Dummy backend.
    Dummy {
        /// Backend-local identifier.
        id: u64,
    },
}

/// Handle to a GPU shader module.
#[derive(Debug)]
pub enum GpuShader {
    /// Dummy backend.
    Dummy {
        /// Backend-local identifier.
        id: u64,
    },
}

/// Handle to a GPU pipeline object (render or compute).
#[derive(Debug)]
pub enum GpuPipeline {
    /// Dummy backend.
    Dummy {
        /// Backend-local identifier.
        id: u64,
    },
}

impl GpuPipeline {
    /// Backend-local identifier of this pipeline.
    pub fn raw_id(&self) -> u64 {
        match self {
            Self::Dummy { id } => *id,
        }
    }
}

/// Handle to a GPU semaphore for cross-queue ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuSemaphore {
    /// Dummy backend.
    Dummy {
        /// Backend-local identifier.
        id: u64,
    },
}

/// A color attachment resolved for recording.
pub struct ColorAttachmentBinding<'a> {
    /// The backing texture.
    pub texture: &'a GpuTexture,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
    /// Clear value when `load` is [`LoadOp::Clear`].
    pub clear: Option<ClearValue>,
}

/// A depth/stencil attachment resolved for recording.
pub struct DepthStencilBinding<'a> {
    /// The backing texture.
    pub texture: &'a GpuTexture,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
    /// Clear value when `load` is [`LoadOp::Clear`].
    pub clear: Option<ClearValue>,
}

/// Everything needed to open a render pass on a command sink.
pub struct RenderPassBinding<'a> {
    /// Pass name, for debugging and capture tools.
    pub label: &'a str,
    /// Color attachments in declaration order.
    pub colors: Vec<ColorAttachmentBinding<'a>>,
    /// Optional depth/stencil attachment.
    pub depth_stencil: Option<DepthStencilBinding<'a>>,
}

/// Command recording interface.
///
/// One sink records the commands of one pass. Sinks are recorded
/// independently (possibly on worker threads) and later submitted in
/// compiled order through [`GpuBackend::submit`].
pub trait CommandSink: Send {
    /// Begin a render pass with the given attachments.
    fn begin_render_pass(&mut self, binding: &RenderPassBinding<'_>);

    /// End the current render pass.
    fn end_render_pass(&mut self);

    /// Begin a compute pass.
    fn begin_compute_pass(&mut self, label: &str);

    /// End the current compute pass.
    fn end_compute_pass(&mut self);

    /// Bind a render pipeline.
    fn set_render_pipeline(&mut self, pipeline: &GpuPipeline);

    /// Bind a compute pipeline.
    fn set_compute_pipeline(&mut self, pipeline: &GpuPipeline);

    /// Bind a vertex buffer to a slot.
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer, offset: u64);

    /// Bind the index buffer.
    fn set_index_buffer(&mut self, buffer: &GpuBuffer, offset: u64);

    /// Draw non-indexed geometry.
    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    /// Draw indexed geometry.
    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);

    /// Dispatch compute workgroups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Copy a buffer region.
    fn copy_buffer(
        &mut self,
        src: &GpuBuffer,
        src_offset: u64,
        dst: &GpuBuffer,
        dst_offset: u64,
        size: u64,
    );

    /// Copy a whole texture.
    fn copy_texture(&mut self, src: &GpuTexture, dst: &GpuTexture);

    /// Record a texture usage/layout transition.
    fn texture_barrier(
        &mut self,
        texture: &GpuTexture,
        before: TextureAccessMode,
        after: TextureAccessMode,
    );

    /// Record a buffer memory barrier.
    fn buffer_barrier(
        &mut self,
        buffer: &GpuBuffer,
        before: BufferAccessMode,
        after: BufferAccessMode,
    );

    /// Allow backends to downcast a finished sink at submission time.
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any>;
}

/// Trait for graphics backend implementations.
///
/// Provides resource allocation, command sink creation, and serial queue
/// submission. All methods take `&self`; backends use interior mutability
/// where required and must be safe to call from multiple threads.
pub trait GpuBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Create a buffer resource.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<GpuBuffer, GraphicsError>;

    /// Create a texture resource.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<GpuTexture, GraphicsError>;

    /// Create a sampler resource.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<GpuSampler, GraphicsError>;

    /// Create a shader module.
    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<GpuShader, GraphicsError>;

    /// Create a render pipeline.
    fn create_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<GpuPipeline, GraphicsError>;

    /// Create a compute pipeline.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<GpuPipeline, GraphicsError>;

    /// Destroy a buffer resource.
    fn destroy_buffer(&self, buffer: GpuBuffer);

    /// Destroy a texture resource.
    fn destroy_texture(&self, texture: GpuTexture);

    /// Destroy a sampler resource.
    fn destroy_sampler(&self, sampler: GpuSampler);

    /// Destroy a shader module.
    fn destroy_shader(&self, shader: GpuShader);

    /// Destroy a pipeline object.
    fn destroy_pipeline(&self, pipeline: GpuPipeline);

    /// Create a semaphore for cross-queue ordering.
    fn create_semaphore(&self) -> GpuSemaphore;

    /// Create a command sink for recording one pass on the given queue.
    fn create_command_sink(&self, queue: QueueKind) -> Box<dyn CommandSink>;

    /// Submit a recorded sink to a queue.
    ///
    /// Submissions on each queue execute in call order; `waits` gate the
    /// submission on semaphores signaled by earlier submissions on other
    /// queues, and `signals` are signaled when this submission completes.
    fn submit(
        &self,
        sink: Box<dyn CommandSink>,
        queue: QueueKind,
        waits: &[GpuSemaphore],
        signals: &[GpuSemaphore],
    );
}

/// Create the default backend for the enabled feature set.
#[cfg(feature = "dummy")]
pub fn create_backend() -> Result<std::sync::Arc<dyn GpuBackend>, GraphicsError> {
    Ok(std::sync::Arc::new(DummyBackend::new()))
}

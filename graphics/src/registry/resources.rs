//! Concrete GPU resource wrappers stored in the registry.
//!
//! Each wrapper pairs a descriptor with its backend object and releases the
//! backend object when the last reference drops, so a resource that is
//! destroyed in the registry while a recording thread still holds it stays
//! valid until that thread is done.

use std::sync::Arc;

use crate::backend::{GpuBuffer, GpuPipeline, GpuSampler, GpuShader, GpuTexture};
use crate::device::GraphicsDevice;
use crate::types::{BufferDescriptor, SamplerDescriptor, ShaderDescriptor, TextureDescriptor};

/// A GPU texture with its descriptor.
pub struct Texture {
    device: Arc<GraphicsDevice>,
    descriptor: TextureDescriptor,
    gpu: Option<GpuTexture>,
}

impl Texture {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: TextureDescriptor,
        gpu: GpuTexture,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu: Some(gpu),
        }
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the backend texture object.
    pub fn gpu(&self) -> &GpuTexture {
        // Only None during drop, which cannot race an access.
        self.gpu.as_ref().expect("texture already released")
    }

    /// Texture width in texels.
    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    /// Texture height in texels.
    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            self.device.backend().destroy_texture(gpu);
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label())
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .finish()
    }
}

/// A GPU buffer with its descriptor.
pub struct Buffer {
    device: Arc<GraphicsDevice>,
    descriptor: BufferDescriptor,
    gpu: Option<GpuBuffer>,
}

impl Buffer {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: BufferDescriptor,
        gpu: GpuBuffer,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu: Some(gpu),
        }
    }

    /// Get the buffer descriptor.
    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the backend buffer object.
    pub fn gpu(&self) -> &GpuBuffer {
        self.gpu.as_ref().expect("buffer already released")
    }

    /// Buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor.size
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            self.device.backend().destroy_buffer(gpu);
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("label", &self.label())
            .field("size", &self.descriptor.size)
            .finish()
    }
}

/// A sampler with its descriptor.
pub struct Sampler {
    device: Arc<GraphicsDevice>,
    descriptor: SamplerDescriptor,
    gpu: Option<GpuSampler>,
}

impl Sampler {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: SamplerDescriptor,
        gpu: GpuSampler,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu: Some(gpu),
        }
    }

    /// Get the sampler descriptor.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            self.device.backend().destroy_sampler(gpu);
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler").field("label", &self.label()).finish()
    }
}

/// A shader module with its descriptor.
pub struct Shader {
    device: Arc<GraphicsDevice>,
    descriptor: ShaderDescriptor,
    gpu: Option<GpuShader>,
}

impl Shader {
    pub(crate) fn new(
        device: Arc<GraphicsDevice>,
        descriptor: ShaderDescriptor,
        gpu: GpuShader,
    ) -> Self {
        Self {
            device,
            descriptor,
            gpu: Some(gpu),
        }
    }

    /// Get the shader descriptor.
    pub fn descriptor(&self) -> &ShaderDescriptor {
        &self.descriptor
    }

    /// Debug label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            self.device.backend().destroy_shader(gpu);
        }
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label())
            .field("stage", &self.descriptor.stage)
            .finish()
    }
}

/// Whether a pipeline targets the raster or compute path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Render (raster) pipeline.
    Render,
    /// Compute pipeline.
    Compute,
}

/// A pipeline state object.
pub struct Pipeline {
    device: Arc<GraphicsDevice>,
    kind: PipelineKind,
    gpu: Option<GpuPipeline>,
}

impl Pipeline {
    pub(crate) fn new(device: Arc<GraphicsDevice>, kind: PipelineKind, gpu: GpuPipeline) -> Self {
        Self {
            device,
            kind,
            gpu: Some(gpu),
        }
    }

    /// Get the pipeline kind.
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    /// Get the backend pipeline object.
    pub fn gpu(&self) -> &GpuPipeline {
        self.gpu.as_ref().expect("pipeline already released")
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            self.device.backend().destroy_pipeline(gpu);
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("kind", &self.kind).finish()
    }
}

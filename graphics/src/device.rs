//! Graphics device.
//!
//! The [`GraphicsDevice`] validates resource descriptors against device
//! capabilities and forwards allocation to the backend. It is created by
//! [`GraphicsInstance::create_device`](crate::instance::GraphicsInstance::create_device)
//! and threaded explicitly through the registry and executor.

use std::sync::Arc;

use crate::backend::{
    GpuBackend, GpuBuffer, GpuPipeline, GpuSampler, GpuSemaphore, GpuShader, GpuTexture,
};
use crate::error::GraphicsError;
use crate::instance::GraphicsInstance;
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, RenderPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, TextureDescriptor,
};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
    /// Whether compute shaders are supported.
    pub compute_shaders: bool,
    /// Whether a dedicated transfer queue is available.
    pub transfer_queue: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
            compute_shaders: true,
            transfer_queue: true,
        }
    }
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be safely shared across
/// threads; allocation goes straight to the backend, which uses interior
/// mutability where needed.
pub struct GraphicsDevice {
    instance: Arc<GraphicsInstance>,
    name: String,
    capabilities: DeviceCapabilities,
}

impl GraphicsDevice {
    /// Create a new graphics device (called by GraphicsInstance).
    pub(crate) fn new(instance: Arc<GraphicsInstance>, name: String) -> Self {
        Self {
            instance,
            name,
            capabilities: DeviceCapabilities::default(),
        }
    }

    /// Get the parent instance.
    pub fn instance(&self) -> &Arc<GraphicsInstance> {
        &self.instance
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the backend name.
    pub fn backend_name(&self) -> &str {
        self.instance.backend().name()
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Get the GPU backend (internal use only).
    pub(crate) fn backend(&self) -> &Arc<dyn GpuBackend> {
        self.instance.backend()
    }

    /// Allocate a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or exceeds device limits, or if
    /// backend allocation fails.
    pub(crate) fn allocate_buffer(
        &self,
        descriptor: &BufferDescriptor,
    ) -> Result<GpuBuffer, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        log::trace!(
            "GraphicsDevice: creating buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );
        self.backend().create_buffer(descriptor)
    }

    /// Allocate a GPU texture.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero or exceeds device limits, or
    /// if backend allocation fails.
    pub(crate) fn allocate_texture(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<GpuTexture, GraphicsError> {
        let max_dim = self.capabilities.max_texture_dimension;
        if descriptor.size.width > max_dim
            || descriptor.size.height > max_dim
            || descriptor.size.depth > max_dim
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension exceeds maximum {max_dim}"
            )));
        }
        if descriptor.size.width == 0 || descriptor.size.height == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }

        log::trace!(
            "GraphicsDevice: creating texture {:?}, size={}x{}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height
        );
        self.backend().create_texture(descriptor)
    }

    /// Allocate a sampler.
    pub(crate) fn allocate_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<GpuSampler, GraphicsError> {
        log::trace!("GraphicsDevice: creating sampler {:?}", descriptor.label);
        self.backend().create_sampler(descriptor)
    }

    /// Allocate a shader module.
    pub(crate) fn allocate_shader(
        &self,
        descriptor: &ShaderDescriptor,
    ) -> Result<GpuShader, GraphicsError> {
        if descriptor.entry_point.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "shader entry point cannot be empty".to_string(),
            ));
        }

        log::trace!("GraphicsDevice: creating shader {:?}", descriptor.label);
        self.backend().create_shader(descriptor)
    }

    /// Allocate a render pipeline.
    pub(crate) fn allocate_render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<GpuPipeline, GraphicsError> {
        if descriptor.color_targets.is_empty() && descriptor.depth_stencil.is_none() {
            return Err(GraphicsError::InvalidParameter(
                "render pipeline needs at least one color target or a depth attachment"
                    .to_string(),
            ));
        }

        log::trace!(
            "GraphicsDevice: creating render pipeline {:?}",
            descriptor.label
        );
        self.backend().create_render_pipeline(descriptor)
    }

    /// Allocate a compute pipeline.
    pub(crate) fn allocate_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<GpuPipeline, GraphicsError> {
        if !self.capabilities.compute_shaders {
            return Err(GraphicsError::InvalidParameter(
                "device does not support compute shaders".to_string(),
            ));
        }

        log::trace!(
            "GraphicsDevice: creating compute pipeline {:?}",
            descriptor.label
        );
        self.backend().create_compute_pipeline(descriptor)
    }

    /// Create a semaphore for cross-queue ordering.
    pub(crate) fn create_semaphore(&self) -> GpuSemaphore {
        self.backend().create_semaphore()
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// Ensure GraphicsDevice is Send + Sync
static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    fn create_test_device() -> Arc<GraphicsDevice> {
        let instance = GraphicsInstance::new().unwrap();
        instance.create_device().unwrap()
    }

    #[test]
    fn test_device_name() {
        let device = create_test_device();
        assert_eq!(device.name(), "Dummy Device");
    }

    #[test]
    fn test_allocate_buffer_zero_size() {
        let device = create_test_device();
        let result = device.allocate_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX));
        assert!(result.is_err());
    }

    #[test]
    fn test_allocate_buffer_exceeds_limit() {
        let device = create_test_device();
        let result = device.allocate_buffer(&BufferDescriptor::new(
            device.capabilities().max_buffer_size + 1,
            BufferUsage::VERTEX,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_allocate_texture_zero_size() {
        let device = create_test_device();
        let result = device.allocate_texture(&TextureDescriptor::new_2d(
            0,
            512,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_allocate_texture() {
        let device = create_test_device();
        let texture = device.allocate_texture(&TextureDescriptor::new_2d(
            512,
            512,
            TextureFormat::Rgba8Unorm,
            TextureUsage::TEXTURE_BINDING,
        ));
        assert!(texture.is_ok());
    }

    #[test]
    fn test_shader_empty_entry_point() {
        let device = create_test_device();
        let result = device.allocate_shader(&crate::types::ShaderDescriptor::vertex(
            b"vs".to_vec(),
            "",
        ));
        assert!(result.is_err());
    }
}

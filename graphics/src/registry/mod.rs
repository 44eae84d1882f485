//! Generational resource registry.
//!
//! The [`ResourceRegistry`] is the stable-handle pool for long-lived GPU
//! objects: textures, buffers, samplers, shaders, and pipelines. It is the
//! only state shared across frames and worker threads; the per-frame graph
//! references its contents through generational ids and resolves them at
//! execution time.
//!
//! # Handles
//!
//! Every `create_*` returns a typed id wrapping an `{index, generation}`
//! pair. Destroying a resource bumps its slot generation, so every
//! outstanding copy of the id becomes stale and is rejected; a stale id can
//! never silently resolve to whatever resource reused the slot.
//!
//! # Locking
//!
//! Each pool is guarded by a single `parking_lot::Mutex`. This is a
//! deliberately coarse policy: create, destroy, liveness checks, and
//! resolution all take the pool lock, and no handle can be dereferenced
//! after its generation has advanced. Resolution returns `Arc` clones, so
//! locks are never held across command recording.

mod resources;

pub use resources::{Buffer, Pipeline, PipelineKind, Sampler, Shader, Texture};

use std::collections::HashMap;
use std::sync::Arc;

use nightshade_core::pool::{PoolHandle, SlotPool};
use parking_lot::Mutex;

use crate::device::GraphicsDevice;
use crate::error::GraphicsError;
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, RenderPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, TextureDescriptor,
};

/// Identifier of a persistent texture in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(PoolHandle);

/// Identifier of a persistent buffer in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(PoolHandle);

/// Identifier of a sampler in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(PoolHandle);

/// Identifier of a shader module in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(PoolHandle);

/// Identifier of a pipeline object in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(PoolHandle);

macro_rules! id_accessors {
    ($name:ident) => {
        impl $name {
            /// Slot index of this id.
            pub fn index(self) -> u32 {
                self.0.index()
            }

            /// Generation of this id.
            pub fn generation(self) -> u32 {
                self.0.generation()
            }
        }
    };
}

id_accessors!(TextureId);
id_accessors!(BufferId);
id_accessors!(SamplerId);
id_accessors!(ShaderId);
id_accessors!(PipelineId);

/// Stable-handle pool for long-lived GPU objects.
///
/// Created once per device and shared (`Arc`) with every frame graph and
/// executor that targets that device.
pub struct ResourceRegistry {
    device: Arc<GraphicsDevice>,
    textures: Mutex<SlotPool<Arc<Texture>>>,
    buffers: Mutex<SlotPool<Arc<Buffer>>>,
    samplers: Mutex<SlotPool<Arc<Sampler>>>,
    shaders: Mutex<SlotPool<Arc<Shader>>>,
    pipelines: Mutex<SlotPool<Arc<Pipeline>>>,
    // Derived-object caches, memoized by descriptor content.
    sampler_cache: Mutex<HashMap<SamplerDescriptor, SamplerId>>,
    render_pipeline_cache: Mutex<HashMap<RenderPipelineDescriptor, PipelineId>>,
    compute_pipeline_cache: Mutex<HashMap<ComputePipelineDescriptor, PipelineId>>,
}

impl ResourceRegistry {
    /// Create a registry for the given device.
    pub fn new(device: Arc<GraphicsDevice>) -> Arc<Self> {
        Arc::new(Self {
            device,
            textures: Mutex::new(SlotPool::new()),
            buffers: Mutex::new(SlotPool::new()),
            samplers: Mutex::new(SlotPool::new()),
            shaders: Mutex::new(SlotPool::new()),
            pipelines: Mutex::new(SlotPool::new()),
            sampler_cache: Mutex::new(HashMap::new()),
            render_pipeline_cache: Mutex::new(HashMap::new()),
            compute_pipeline_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Get the device this registry allocates through.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Create a persistent texture.
    ///
    /// # Errors
    ///
    /// Propagates validation and allocation failures synchronously.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureId, GraphicsError> {
        let gpu = self.device.allocate_texture(descriptor)?;
        let texture = Arc::new(Texture::new(
            Arc::clone(&self.device),
            descriptor.clone(),
            gpu,
        ));
        Ok(TextureId(self.textures.lock().insert(texture)))
    }

    /// Destroy a texture, invalidating all copies of its id.
    ///
    /// The backend object is released once the last outstanding reference
    /// drops.
    pub fn destroy_texture(&self, id: TextureId) -> Result<(), GraphicsError> {
        self.textures
            .lock()
            .remove(id.0)
            .map(|_| ())
            .map_err(|_| stale("texture", id.0))
    }

    /// Check whether a texture id is alive.
    pub fn is_texture_alive(&self, id: TextureId) -> bool {
        self.textures.lock().is_alive(id.0)
    }

    /// Resolve a texture id.
    ///
    /// # Panics
    ///
    /// Panics on a stale id. Use [`try_texture`](Self::try_texture) for the
    /// non-panicking variant.
    pub fn texture(&self, id: TextureId) -> Arc<Texture> {
        self.try_texture(id)
            .unwrap_or_else(|| panic!("{}", stale("texture", id.0)))
    }

    /// Resolve a texture id, returning `None` if it is stale.
    pub fn try_texture(&self, id: TextureId) -> Option<Arc<Texture>> {
        self.textures.lock().get(id.0).cloned()
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.lock().len()
    }

    // ------------------------------------------------------------------
    // Buffers
    // ------------------------------------------------------------------

    /// Create a persistent buffer.
    ///
    /// # Errors
    ///
    /// Propagates validation and allocation failures synchronously.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, GraphicsError> {
        let gpu = self.device.allocate_buffer(descriptor)?;
        let buffer = Arc::new(Buffer::new(
            Arc::clone(&self.device),
            descriptor.clone(),
            gpu,
        ));
        Ok(BufferId(self.buffers.lock().insert(buffer)))
    }

    /// Destroy a buffer, invalidating all copies of its id.
    pub fn destroy_buffer(&self, id: BufferId) -> Result<(), GraphicsError> {
        self.buffers
            .lock()
            .remove(id.0)
            .map(|_| ())
            .map_err(|_| stale("buffer", id.0))
    }

    /// Check whether a buffer id is alive.
    pub fn is_buffer_alive(&self, id: BufferId) -> bool {
        self.buffers.lock().is_alive(id.0)
    }

    /// Resolve a buffer id.
    ///
    /// # Panics
    ///
    /// Panics on a stale id. Use [`try_buffer`](Self::try_buffer) for the
    /// non-panicking variant.
    pub fn buffer(&self, id: BufferId) -> Arc<Buffer> {
        self.try_buffer(id)
            .unwrap_or_else(|| panic!("{}", stale("buffer", id.0)))
    }

    /// Resolve a buffer id, returning `None` if it is stale.
    pub fn try_buffer(&self, id: BufferId) -> Option<Arc<Buffer>> {
        self.buffers.lock().get(id.0).cloned()
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    // ------------------------------------------------------------------
    // Samplers
    // ------------------------------------------------------------------

    /// Get or create a sampler for the descriptor.
    ///
    /// Samplers are memoized by descriptor content: requesting the same
    /// configuration twice returns the same id.
    pub fn sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, GraphicsError> {
        if let Some(&id) = self.sampler_cache.lock().get(descriptor) {
            return Ok(id);
        }

        let gpu = self.device.allocate_sampler(descriptor)?;
        let sampler = Arc::new(Sampler::new(
            Arc::clone(&self.device),
            descriptor.clone(),
            gpu,
        ));
        let id = SamplerId(self.samplers.lock().insert(sampler));
        self.sampler_cache.lock().insert(descriptor.clone(), id);
        Ok(id)
    }

    /// Resolve a sampler id, returning `None` if it is stale.
    pub fn try_sampler(&self, id: SamplerId) -> Option<Arc<Sampler>> {
        self.samplers.lock().get(id.0).cloned()
    }

    /// Number of live samplers.
    pub fn sampler_count(&self) -> usize {
        self.samplers.lock().len()
    }

    // ------------------------------------------------------------------
    // Shaders
    // ------------------------------------------------------------------

    /// Create a shader module.
    pub fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderId, GraphicsError> {
        let gpu = self.device.allocate_shader(descriptor)?;
        let shader = Arc::new(Shader::new(
            Arc::clone(&self.device),
            descriptor.clone(),
            gpu,
        ));
        Ok(ShaderId(self.shaders.lock().insert(shader)))
    }

    /// Destroy a shader module, invalidating all copies of its id.
    pub fn destroy_shader(&self, id: ShaderId) -> Result<(), GraphicsError> {
        self.shaders
            .lock()
            .remove(id.0)
            .map(|_| ())
            .map_err(|_| stale("shader", id.0))
    }

    /// Check whether a shader id is alive.
    pub fn is_shader_alive(&self, id: ShaderId) -> bool {
        self.shaders.lock().is_alive(id.0)
    }

    /// Resolve a shader id, returning `None` if it is stale.
    pub fn try_shader(&self, id: ShaderId) -> Option<Arc<Shader>> {
        self.shaders.lock().get(id.0).cloned()
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    /// Get or create a render pipeline for the descriptor.
    ///
    /// Pipelines are memoized by descriptor content.
    pub fn render_pipeline(
        &self,
        descriptor: &RenderPipelineDescriptor,
    ) -> Result<PipelineId, GraphicsError> {
        if let Some(&id) = self.render_pipeline_cache.lock().get(descriptor) {
            return Ok(id);
        }

        let gpu = self.device.allocate_render_pipeline(descriptor)?;
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&self.device),
            PipelineKind::Render,
            gpu,
        ));
        let id = PipelineId(self.pipelines.lock().insert(pipeline));
        self.render_pipeline_cache
            .lock()
            .insert(descriptor.clone(), id);
        Ok(id)
    }

    /// Get or create a compute pipeline for the descriptor.
    ///
    /// Pipelines are memoized by descriptor content.
    pub fn compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<PipelineId, GraphicsError> {
        if let Some(&id) = self.compute_pipeline_cache.lock().get(descriptor) {
            return Ok(id);
        }

        let gpu = self.device.allocate_compute_pipeline(descriptor)?;
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&self.device),
            PipelineKind::Compute,
            gpu,
        ));
        let id = PipelineId(self.pipelines.lock().insert(pipeline));
        self.compute_pipeline_cache
            .lock()
            .insert(descriptor.clone(), id);
        Ok(id)
    }

    /// Resolve a pipeline id.
    ///
    /// # Panics
    ///
    /// Panics on a stale id.
    pub fn pipeline(&self, id: PipelineId) -> Arc<Pipeline> {
        self.try_pipeline(id)
            .unwrap_or_else(|| panic!("{}", stale("pipeline", id.0)))
    }

    /// Resolve a pipeline id, returning `None` if it is stale.
    pub fn try_pipeline(&self, id: PipelineId) -> Option<Arc<Pipeline>> {
        self.pipelines.lock().get(id.0).cloned()
    }

    /// Number of live pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.lock().len()
    }
}

fn stale(kind: &'static str, handle: PoolHandle) -> GraphicsError {
    GraphicsError::StaleHandle {
        kind,
        index: handle.index(),
        generation: handle.generation(),
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("textures", &self.texture_count())
            .field("buffers", &self.buffer_count())
            .field("samplers", &self.sampler_count())
            .field("pipelines", &self.pipeline_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(ResourceRegistry: Send, Sync);

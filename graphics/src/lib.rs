//! # Nightshade Graphics
//!
//! Render graph and GPU resource scheduling for the Nightshade engine.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameGraph`] - Declarative description of one frame's passes and
//!   their versioned resource dependencies
//! - [`ResourceRegistry`] - Generational-handle pool for persistent GPU
//!   objects
//! - [`CompiledGraph`] - Culled, ordered, scheduled, and synchronized
//!   execution plan
//! - [`FrameExecutor`] - Parallel command recording with serial submission
//! - [`GpuBackend`] / [`CommandSink`] - Backend abstraction, with a
//!   recording [`DummyBackend`] for tests and development
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use nightshade_core::task::TaskPool;
//! use nightshade_graphics::{
//!     ColorAttachment, FrameExecutor, FrameGraph, GraphicsInstance, ResourceRegistry,
//!     TextureDescriptor, TextureFormat, TextureNodeId, TextureUsage,
//! };
//!
//! let instance = GraphicsInstance::new().unwrap();
//! let registry = ResourceRegistry::new(instance.create_device().unwrap());
//!
//! #[derive(Clone)]
//! struct SceneParams {
//!     color: TextureNodeId,
//! }
//!
//! let mut graph = FrameGraph::new(Arc::clone(&registry));
//! let scene = graph.add_graphics_pass(
//!     "scene",
//!     |builder| {
//!         let color = builder.create_texture(
//!             "scene_color",
//!             TextureDescriptor::new_2d(
//!                 1920,
//!                 1080,
//!                 TextureFormat::Rgba16Float,
//!                 TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
//!             ),
//!         );
//!         SceneParams {
//!             color: builder.add_color_attachment(ColorAttachment::new(color)),
//!         }
//!     },
//!     |_ctx, _params, _sink| {
//!         // record draws
//!     },
//! );
//! graph.mark_output_texture(scene.color);
//!
//! let compiled = graph.compile().unwrap();
//! let executor = FrameExecutor::new(Arc::clone(&registry), TaskPool::new(2));
//! executor.execute(&graph, &compiled).unwrap();
//! ```

pub mod backend;
pub mod compiler;
pub mod device;
pub mod error;
pub mod executor;
pub mod graph;
pub mod instance;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use backend::{CommandSink, DummyBackend, GpuBackend};
pub use compiler::{BarrierOp, CompileError, CompilePhase, CompiledGraph, Lifetime};
pub use device::{DeviceCapabilities, GraphicsDevice};
pub use error::GraphicsError;
pub use executor::{ExecuteContext, FrameExecutor};
pub use graph::{
    BufferAccess, BufferAccessMode, BufferNodeId, ColorAttachment, ComputePass,
    DepthStencilAttachment, FrameGraph, GraphicsPass, LoadOp, Pass, PassBuilder, PassHandle,
    RenderTargetConfig, StoreOp, TextureAccess, TextureAccessMode, TextureNodeId,
};
pub use instance::GraphicsInstance;
pub use registry::{
    Buffer, BufferId, Pipeline, PipelineId, PipelineKind, ResourceRegistry, Sampler, SamplerId,
    Shader, ShaderId, Texture, TextureId,
};
pub use types::{
    BlendState, BufferDescriptor, BufferUsage, ClearValue, CompareFunction,
    ComputePipelineDescriptor, Extent3d, QueueKind, RenderPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, ShaderStage, ShaderStages, TextureDescriptor, TextureFormat, TextureUsage,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Nightshade Graphics v{} initialized", VERSION);
}

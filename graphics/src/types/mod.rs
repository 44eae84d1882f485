//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod buffer;
mod common;
mod pipeline;
mod sampler;
mod shader;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearValue, Extent3d, QueueKind};
pub use pipeline::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, ColorTargetState, ColorWrites,
    CompareFunction, ComputePipelineDescriptor, CullMode, DepthStencilState, FrontFace,
    PrimitiveTopology, RenderPipelineDescriptor,
};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor};
pub use shader::{ShaderDescriptor, ShaderStage, ShaderStages};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};

//! Render pass types.
//!
//! A pass is one unit of GPU work: a synchronous setup step already ran when
//! the pass was added (recording its accesses and configuration), and the
//! execute step stored here runs later, possibly on a worker thread. All
//! data the execute step needs was copied into its params during setup;
//! nothing is captured by live reference.

use crate::backend::CommandSink;
use crate::executor::ExecuteContext;
use crate::types::{
    ComputePipelineDescriptor, QueueKind, RenderPipelineDescriptor, ShaderStages,
};

use super::node::{BufferNodeId, TextureNodeId};
use super::target::RenderTargetConfig;
use super::usage::{BufferAccessMode, TextureAccessMode};

/// Stored execute callback of a pass.
pub(crate) type ExecuteFn = Box<dyn Fn(&ExecuteContext<'_>, &mut dyn CommandSink) + Send + Sync>;

/// One recorded texture access of a pass.
#[derive(Debug, Clone, Copy)]
pub struct TextureAccess {
    /// The node version accessed. For writes this is the minted version.
    pub node: TextureNodeId,
    /// Shader stages that perform the access.
    pub stages: ShaderStages,
    /// How the texture is accessed.
    pub mode: TextureAccessMode,
}

/// One recorded buffer access of a pass.
#[derive(Debug, Clone, Copy)]
pub struct BufferAccess {
    /// The node version accessed. For writes this is the minted version.
    pub node: BufferNodeId,
    /// Shader stages that perform the access.
    pub stages: ShaderStages,
    /// How the buffer is accessed.
    pub mode: BufferAccessMode,
}

/// A pass in the render graph.
///
/// Passes describe units of GPU work with their resource dependencies.
/// Each variant has its own configuration specific to that pass type.
pub enum Pass {
    /// Graphics pass (vertex/fragment shaders, rasterization).
    Graphics(GraphicsPass),
    /// Compute pass (compute shaders or transfer work).
    Compute(ComputePass),
}

impl Pass {
    /// Get the pass name.
    pub fn name(&self) -> &str {
        match self {
            Pass::Graphics(p) => &p.name,
            Pass::Compute(p) => &p.name,
        }
    }

    /// Get the queue this pass was declared on.
    pub fn queue(&self) -> QueueKind {
        match self {
            Pass::Graphics(p) => p.queue,
            Pass::Compute(p) => p.queue,
        }
    }

    /// Get the recorded texture accesses.
    pub fn texture_accesses(&self) -> &[TextureAccess] {
        match self {
            Pass::Graphics(p) => &p.texture_accesses,
            Pass::Compute(p) => &p.texture_accesses,
        }
    }

    /// Get the recorded buffer accesses.
    pub fn buffer_accesses(&self) -> &[BufferAccess] {
        match self {
            Pass::Graphics(p) => &p.buffer_accesses,
            Pass::Compute(p) => &p.buffer_accesses,
        }
    }

    /// Check if this is a graphics pass.
    pub fn is_graphics(&self) -> bool {
        matches!(self, Pass::Graphics(_))
    }

    /// Check if this is a compute pass.
    pub fn is_compute(&self) -> bool {
        matches!(self, Pass::Compute(_))
    }

    /// Get this pass as a graphics pass, if it is one.
    pub fn as_graphics(&self) -> Option<&GraphicsPass> {
        if let Pass::Graphics(p) = self {
            Some(p)
        } else {
            None
        }
    }

    /// Get this pass as a compute pass, if it is one.
    pub fn as_compute(&self) -> Option<&ComputePass> {
        if let Pass::Compute(p) = self {
            Some(p)
        } else {
            None
        }
    }

    /// Run the stored execute callback.
    pub(crate) fn execute(&self, context: &ExecuteContext<'_>, sink: &mut dyn CommandSink) {
        let callback = match self {
            Pass::Graphics(p) => p.execute.as_ref(),
            Pass::Compute(p) => p.execute.as_ref(),
        };
        if let Some(callback) = callback {
            callback(context, sink);
        }
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(if self.is_graphics() {
            "GraphicsPass"
        } else {
            "ComputePass"
        })
        .field("name", &self.name())
        .field("queue", &self.queue())
        .field("texture_accesses", &self.texture_accesses().len())
        .field("buffer_accesses", &self.buffer_accesses().len())
        .finish()
    }
}

/// A rasterization pass.
pub struct GraphicsPass {
    pub(crate) name: String,
    pub(crate) queue: QueueKind,
    pub(crate) texture_accesses: Vec<TextureAccess>,
    pub(crate) buffer_accesses: Vec<BufferAccess>,
    pub(crate) render_targets: RenderTargetConfig,
    pub(crate) pipeline: Option<RenderPipelineDescriptor>,
    pub(crate) execute: Option<ExecuteFn>,
}

impl GraphicsPass {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            queue: QueueKind::Graphics,
            texture_accesses: Vec::new(),
            buffer_accesses: Vec::new(),
            render_targets: RenderTargetConfig::default(),
            pipeline: None,
            execute: None,
        }
    }

    /// Get the render target configuration.
    pub fn render_targets(&self) -> &RenderTargetConfig {
        &self.render_targets
    }

    /// Check if render targets are configured.
    pub fn has_render_targets(&self) -> bool {
        !self.render_targets.is_empty()
    }

    /// Get the pipeline configuration, if set.
    pub fn pipeline(&self) -> Option<&RenderPipelineDescriptor> {
        self.pipeline.as_ref()
    }
}

/// A compute (or copy-only) pass.
pub struct ComputePass {
    pub(crate) name: String,
    pub(crate) queue: QueueKind,
    pub(crate) texture_accesses: Vec<TextureAccess>,
    pub(crate) buffer_accesses: Vec<BufferAccess>,
    pub(crate) pipeline: Option<ComputePipelineDescriptor>,
    pub(crate) execute: Option<ExecuteFn>,
}

impl ComputePass {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            queue: QueueKind::Compute,
            texture_accesses: Vec::new(),
            buffer_accesses: Vec::new(),
            pipeline: None,
            execute: None,
        }
    }

    /// Get the pipeline configuration, if set.
    pub fn pipeline(&self) -> Option<&ComputePipelineDescriptor> {
        self.pipeline.as_ref()
    }
}

static_assertions::assert_impl_all!(Pass: Send, Sync);

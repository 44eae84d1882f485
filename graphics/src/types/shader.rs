//! Shader types and descriptors.

use bitflags::bitflags;

/// The pipeline stage a shader module targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
    /// Compute shader.
    Compute,
}

bitflags! {
    /// A set of shader stages, used to scope resource accesses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Fragment stage.
        const FRAGMENT = 1 << 1;
        /// Compute stage.
        const COMPUTE = 1 << 2;
        /// Transfer operations (copies).
        const TRANSFER = 1 << 3;
        /// Vertex and fragment stages.
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl Default for ShaderStages {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a shader module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDescriptor {
    /// Debug label for the shader.
    pub label: Option<String>,
    /// Stage this module targets.
    pub stage: ShaderStage,
    /// Entry point function name.
    pub entry_point: String,
    /// Compiled shader bytecode (backend-defined encoding).
    pub source: Vec<u8>,
}

impl ShaderDescriptor {
    /// Create a shader descriptor for the given stage.
    pub fn new(stage: ShaderStage, source: Vec<u8>, entry_point: impl Into<String>) -> Self {
        Self {
            label: None,
            stage,
            entry_point: entry_point.into(),
            source,
        }
    }

    /// Create a vertex shader descriptor.
    pub fn vertex(source: Vec<u8>, entry_point: impl Into<String>) -> Self {
        Self::new(ShaderStage::Vertex, source, entry_point)
    }

    /// Create a fragment shader descriptor.
    pub fn fragment(source: Vec<u8>, entry_point: impl Into<String>) -> Self {
        Self::new(ShaderStage::Fragment, source, entry_point)
    }

    /// Create a compute shader descriptor.
    pub fn compute(source: Vec<u8>, entry_point: impl Into<String>) -> Self {
        Self::new(ShaderStage::Compute, source, entry_point)
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

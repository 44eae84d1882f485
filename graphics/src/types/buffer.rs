//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 0;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 1;
        /// Buffer can be bound as an index buffer.
        const INDEX = 1 << 2;
        /// Buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 3;
        /// Buffer can be bound as a uniform buffer.
        const UNIFORM = 1 << 4;
        /// Buffer can be bound as a storage buffer.
        const STORAGE = 1 << 5;
        /// Buffer can hold indirect draw/dispatch arguments.
        const INDIRECT = 1 << 6;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Two descriptors are aliasing-compatible when they describe the same
    /// physical allocation, ignoring debug labels.
    pub fn is_aliasable_with(&self, other: &Self) -> bool {
        self.size == other.size && self.usage == other.usage
    }
}

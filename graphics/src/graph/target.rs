//! Render target attachment configuration.

use crate::types::{BlendState, ClearValue, CompareFunction};

use super::node::TextureNodeId;

/// What happens to attachment contents at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    /// Preserve the existing contents.
    Load,
    /// Clear to the attachment's clear value.
    #[default]
    Clear,
    /// Contents are undefined; the pass overwrites everything.
    DontCare,
}

/// What happens to attachment contents at the end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    /// Write results back to memory.
    #[default]
    Store,
    /// Discard results (e.g. depth that is never sampled later).
    Discard,
}

/// A color attachment binding for a graphics pass.
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    /// The texture node this attachment writes.
    pub texture: TextureNodeId,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
    /// Clear value used when `load` is [`LoadOp::Clear`].
    pub clear: Option<ClearValue>,
    /// Blend state for this target, `None` for opaque writes.
    pub blend: Option<BlendState>,
}

impl ColorAttachment {
    /// Create an attachment over a texture node, cleared to black.
    pub fn new(texture: TextureNodeId) -> Self {
        Self {
            texture,
            load: LoadOp::Clear,
            store: StoreOp::Store,
            clear: Some(ClearValue::BLACK),
            blend: None,
        }
    }

    /// Set the clear color.
    pub fn with_clear_color(mut self, r: f64, g: f64, b: f64, a: f64) -> Self {
        self.load = LoadOp::Clear;
        self.clear = Some(ClearValue::Color([r, g, b, a]));
        self
    }

    /// Preserve previous contents instead of clearing.
    pub fn with_load(mut self) -> Self {
        self.load = LoadOp::Load;
        self.clear = None;
        self
    }

    /// Set the store operation.
    pub fn with_store(mut self, store: StoreOp) -> Self {
        self.store = store;
        self
    }

    /// Set the blend state.
    pub fn with_blend(mut self, blend: BlendState) -> Self {
        self.blend = Some(blend);
        self
    }
}

/// A depth/stencil attachment binding for a graphics pass.
#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    /// The texture node this attachment writes.
    pub texture: TextureNodeId,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
    /// Clear value used when `load` is [`LoadOp::Clear`].
    pub clear: Option<ClearValue>,
    /// Depth comparison function.
    pub depth_compare: CompareFunction,
}

impl DepthStencilAttachment {
    /// Create a depth attachment cleared to the far plane.
    pub fn new(texture: TextureNodeId) -> Self {
        Self {
            texture,
            load: LoadOp::Clear,
            store: StoreOp::Store,
            clear: Some(ClearValue::DEPTH_ONE),
            depth_compare: CompareFunction::Less,
        }
    }

    /// Preserve previous contents instead of clearing.
    pub fn with_load(mut self) -> Self {
        self.load = LoadOp::Load;
        self.clear = None;
        self
    }

    /// Set the store operation.
    pub fn with_store(mut self, store: StoreOp) -> Self {
        self.store = store;
        self
    }

    /// Set the depth comparison function.
    pub fn with_depth_compare(mut self, compare: CompareFunction) -> Self {
        self.depth_compare = compare;
        self
    }
}

/// Render target configuration for a graphics pass.
///
/// Holds the attachments in declaration order. Attachment nodes stored here
/// are the post-write versions minted by the builder.
#[derive(Debug, Clone, Default)]
pub struct RenderTargetConfig {
    /// Color attachments.
    pub colors: Vec<ColorAttachment>,
    /// Optional depth/stencil attachment.
    pub depth_stencil: Option<DepthStencilAttachment>,
}

impl RenderTargetConfig {
    /// Check whether any attachment is configured.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.depth_stencil.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> TextureNodeId {
        TextureNodeId::for_tests(0, 0)
    }

    #[test]
    fn test_color_attachment_defaults_to_clear() {
        let attachment = ColorAttachment::new(test_node());
        assert_eq!(attachment.load, LoadOp::Clear);
        assert_eq!(attachment.store, StoreOp::Store);
        assert!(attachment.clear.is_some());
    }

    #[test]
    fn test_with_load_drops_clear_value() {
        let attachment = ColorAttachment::new(test_node()).with_load();
        assert_eq!(attachment.load, LoadOp::Load);
        assert!(attachment.clear.is_none());
    }

    #[test]
    fn test_depth_attachment_defaults() {
        let attachment = DepthStencilAttachment::new(test_node());
        assert_eq!(attachment.clear, Some(ClearValue::DEPTH_ONE));
        assert_eq!(attachment.depth_compare, CompareFunction::Less);
    }
}

//! Pipeline state configuration records.
//!
//! All state is expressed as explicit enums and structs with a stable
//! numeric mapping; nothing relies on bit-field layout. Descriptors derive
//! `Eq + Hash` so the registry can memoize pipeline objects by content.

use bitflags::bitflags;

use crate::registry::ShaderId;

/// Primitive assembly topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Point list.
    PointList,
    /// Line list.
    LineList,
    /// Triangle list.
    #[default]
    TriangleList,
    /// Triangle strip.
    TriangleStrip,
}

/// Winding order considered front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise winding is front-facing.
    #[default]
    Ccw,
    /// Clockwise winding is front-facing.
    Cw,
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    #[default]
    Back,
}

/// Depth/stencil comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if incoming < stored.
    #[default]
    Less,
    /// Passes if incoming == stored.
    Equal,
    /// Passes if incoming <= stored.
    LessEqual,
    /// Passes if incoming > stored.
    Greater,
    /// Passes if incoming != stored.
    NotEqual,
    /// Passes if incoming >= stored.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Blend factor applied to a source or destination component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    /// Factor 0.
    Zero,
    /// Factor 1.
    #[default]
    One,
    /// Source color.
    Src,
    /// 1 - source color.
    OneMinusSrc,
    /// Source alpha.
    SrcAlpha,
    /// 1 - source alpha.
    OneMinusSrcAlpha,
    /// Destination color.
    Dst,
    /// 1 - destination color.
    OneMinusDst,
    /// Destination alpha.
    DstAlpha,
    /// 1 - destination alpha.
    OneMinusDstAlpha,
}

/// Operation combining blended source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// src + dst.
    #[default]
    Add,
    /// src - dst.
    Subtract,
    /// dst - src.
    ReverseSubtract,
    /// min(src, dst).
    Min,
    /// max(src, dst).
    Max,
}

/// Blend configuration for one component (color or alpha).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendComponent {
    /// Factor applied to the source.
    pub src_factor: BlendFactor,
    /// Factor applied to the destination.
    pub dst_factor: BlendFactor,
    /// Combining operation.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// Source replaces destination.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    /// Standard alpha blending.
    pub const ALPHA_BLENDING: Self = Self {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
}

/// Full blend state for a color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Color component blending.
    pub color: BlendComponent,
    /// Alpha component blending.
    pub alpha: BlendComponent,
}

impl BlendState {
    /// Opaque replacement (no blending).
    pub const REPLACE: Self = Self {
        color: BlendComponent::REPLACE,
        alpha: BlendComponent::REPLACE,
    };

    /// Standard premultiplied-style alpha blending.
    pub const ALPHA_BLENDING: Self = Self {
        color: BlendComponent::ALPHA_BLENDING,
        alpha: BlendComponent::ALPHA_BLENDING,
    };
}

bitflags! {
    /// Which color channels a render target writes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u32 {
        /// Red channel.
        const RED = 1 << 0;
        /// Green channel.
        const GREEN = 1 << 1;
        /// Blue channel.
        const BLUE = 1 << 2;
        /// Alpha channel.
        const ALPHA = 1 << 3;
        /// All channels.
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWrites {
    fn default() -> Self {
        Self::ALL
    }
}

/// Color target configuration for a render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorTargetState {
    /// Format of the attachment this target renders into.
    pub format: super::TextureFormat,
    /// Blend state, or `None` for opaque writes.
    pub blend: Option<BlendState>,
    /// Channel write mask.
    pub write_mask: ColorWrites,
}

impl ColorTargetState {
    /// Opaque target with all channels written.
    pub fn opaque(format: super::TextureFormat) -> Self {
        Self {
            format,
            blend: None,
            write_mask: ColorWrites::ALL,
        }
    }
}

/// Depth/stencil configuration for a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    /// Format of the depth/stencil attachment.
    pub format: super::TextureFormat,
    /// Whether depth writes are enabled.
    pub depth_write_enabled: bool,
    /// Depth comparison function.
    pub depth_compare: CompareFunction,
}

/// Descriptor for creating a render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPipelineDescriptor {
    /// Debug label for the pipeline.
    pub label: Option<String>,
    /// Vertex shader module.
    pub vertex_shader: ShaderId,
    /// Fragment shader module, if any.
    pub fragment_shader: Option<ShaderId>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Front-face winding.
    pub front_face: FrontFace,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Depth/stencil state, if the pipeline uses a depth attachment.
    pub depth_stencil: Option<DepthStencilState>,
    /// Color targets, in attachment order.
    pub color_targets: Vec<ColorTargetState>,
}

/// Descriptor for creating a compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputePipelineDescriptor {
    /// Debug label for the pipeline.
    pub label: Option<String>,
    /// Compute shader module.
    pub shader: ShaderId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextureFormat;

    #[test]
    fn test_blend_constants() {
        assert_eq!(BlendState::REPLACE.color.src_factor, BlendFactor::One);
        assert_eq!(
            BlendState::ALPHA_BLENDING.color.dst_factor,
            BlendFactor::OneMinusSrcAlpha
        );
    }

    #[test]
    fn test_color_writes_default_is_all() {
        assert_eq!(ColorWrites::default(), ColorWrites::ALL);
    }

    #[test]
    fn test_opaque_target() {
        let target = ColorTargetState::opaque(TextureFormat::Bgra8Unorm);
        assert!(target.blend.is_none());
        assert_eq!(target.write_mask, ColorWrites::ALL);
    }
}

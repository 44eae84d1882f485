//! Pass setup builder.
//!
//! A [`PassBuilder`] is handed to a pass's setup step, which runs
//! immediately and synchronously while the graph is being built. Every call
//! records one (node, stage set, usage) edge against the current pass;
//! write usages mint and return the next node version.
//!
//! Node misuse (a superseded version, a version someone already wrote, an
//! unknown node) is reported against the pass by name and poisons the
//! graph: compilation fails before anything is recorded or submitted.

use crate::compiler::CompileError;
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, QueueKind, RenderPipelineDescriptor,
    ShaderStages, TextureDescriptor,
};

use super::node::{BufferNodeId, NodeAccessError, NodeTable, TextureNodeId};
use super::pass::{BufferAccess, Pass, TextureAccess};
use super::target::{ColorAttachment, DepthStencilAttachment};
use super::usage::{BufferAccessMode, TextureAccessMode};
use super::PassHandle;

/// Builder for declaring one pass's resource accesses and configuration.
pub struct PassBuilder<'a> {
    pub(crate) nodes: &'a mut NodeTable,
    pub(crate) pass: &'a mut Pass,
    pub(crate) handle: PassHandle,
    pub(crate) errors: &'a mut Vec<CompileError>,
}

impl<'a> PassBuilder<'a> {
    fn fail(&mut self, error: NodeAccessError) {
        let error = CompileError::from_access(self.pass.name(), error);
        log::error!("graph construction error: {error}");
        self.errors.push(error);
    }

    fn push_texture_access(&mut self, access: TextureAccess) {
        match self.pass {
            Pass::Graphics(p) => p.texture_accesses.push(access),
            Pass::Compute(p) => p.texture_accesses.push(access),
        }
    }

    fn push_buffer_access(&mut self, access: BufferAccess) {
        match self.pass {
            Pass::Graphics(p) => p.buffer_accesses.push(access),
            Pass::Compute(p) => p.buffer_accesses.push(access),
        }
    }

    fn read_texture(&mut self, node: TextureNodeId, stages: ShaderStages, mode: TextureAccessMode) {
        match self.nodes.check_texture_read(node) {
            Ok(()) => self.push_texture_access(TextureAccess { node, stages, mode }),
            Err(error) => self.fail(error),
        }
    }

    fn write_texture(
        &mut self,
        node: TextureNodeId,
        stages: ShaderStages,
        mode: TextureAccessMode,
    ) -> TextureNodeId {
        match self.nodes.write_texture(node, self.handle) {
            Ok(minted) => {
                self.push_texture_access(TextureAccess {
                    node: minted,
                    stages,
                    mode,
                });
                minted
            }
            Err(error) => {
                self.fail(error);
                node
            }
        }
    }

    fn read_buffer(&mut self, node: BufferNodeId, stages: ShaderStages, mode: BufferAccessMode) {
        match self.nodes.check_buffer_read(node) {
            Ok(()) => self.push_buffer_access(BufferAccess { node, stages, mode }),
            Err(error) => self.fail(error),
        }
    }

    fn write_buffer(
        &mut self,
        node: BufferNodeId,
        stages: ShaderStages,
        mode: BufferAccessMode,
    ) -> BufferNodeId {
        match self.nodes.write_buffer(node, self.handle) {
            Ok(minted) => {
                self.push_buffer_access(BufferAccess {
                    node: minted,
                    stages,
                    mode,
                });
                minted
            }
            Err(error) => {
                self.fail(error);
                node
            }
        }
    }

    // ------------------------------------------------------------------
    // Transient declarations
    // ------------------------------------------------------------------

    /// Declare a transient texture.
    ///
    /// No backing resource is allocated yet; the compiler assigns one from
    /// the aliased transient pool.
    pub fn create_texture(
        &mut self,
        name: impl Into<String>,
        descriptor: TextureDescriptor,
    ) -> TextureNodeId {
        self.nodes.create_texture(name.into(), descriptor)
    }

    /// Declare a transient buffer.
    pub fn create_buffer(
        &mut self,
        name: impl Into<String>,
        descriptor: BufferDescriptor,
    ) -> BufferNodeId {
        self.nodes.create_buffer(name.into(), descriptor)
    }

    // ------------------------------------------------------------------
    // Texture accesses
    // ------------------------------------------------------------------

    /// Declare a sampled-texture read in the given stages.
    pub fn add_shader_texture(&mut self, node: TextureNodeId, stages: ShaderStages) {
        self.read_texture(node, stages, TextureAccessMode::ShaderRead);
    }

    /// Declare a read-only depth/stencil use (sampling + depth test).
    pub fn add_depth_stencil_read(&mut self, node: TextureNodeId, stages: ShaderStages) {
        self.read_texture(node, stages, TextureAccessMode::DepthStencilReadOnly);
    }

    /// Declare a storage-texture read/write, minting the next version.
    pub fn add_storage_texture(
        &mut self,
        node: TextureNodeId,
        stages: ShaderStages,
    ) -> TextureNodeId {
        self.write_texture(node, stages, TextureAccessMode::StorageReadWrite)
    }

    /// Declare a texture as a copy source.
    pub fn add_transfer_src_texture(&mut self, node: TextureNodeId) {
        self.read_texture(node, ShaderStages::TRANSFER, TextureAccessMode::TransferRead);
    }

    /// Declare a texture as a copy destination, minting the next version.
    pub fn add_transfer_dst_texture(&mut self, node: TextureNodeId) -> TextureNodeId {
        self.write_texture(node, ShaderStages::TRANSFER, TextureAccessMode::TransferWrite)
    }

    /// Attach a color render target, minting the next version of its node.
    ///
    /// The returned node is also written into the stored attachment, so the
    /// executor binds the version this pass produced.
    pub fn add_color_attachment(&mut self, attachment: ColorAttachment) -> TextureNodeId {
        let minted = self.write_texture(
            attachment.texture,
            ShaderStages::FRAGMENT,
            TextureAccessMode::RenderTargetWrite,
        );

        match self.pass {
            Pass::Graphics(p) => {
                p.render_targets.colors.push(ColorAttachment {
                    texture: minted,
                    ..attachment
                });
            }
            Pass::Compute(_) => {
                debug_assert!(false, "color attachments are only valid on graphics passes");
                log::warn!(
                    "pass '{}': ignoring color attachment on a compute pass",
                    self.pass.name()
                );
            }
        }
        minted
    }

    /// Set the depth/stencil attachment, minting the next version of its
    /// node.
    pub fn set_depth_stencil_attachment(
        &mut self,
        attachment: DepthStencilAttachment,
    ) -> TextureNodeId {
        let minted = self.write_texture(
            attachment.texture,
            ShaderStages::FRAGMENT,
            TextureAccessMode::DepthStencilWrite,
        );

        match self.pass {
            Pass::Graphics(p) => {
                p.render_targets.depth_stencil = Some(DepthStencilAttachment {
                    texture: minted,
                    ..attachment
                });
            }
            Pass::Compute(_) => {
                debug_assert!(false, "depth attachments are only valid on graphics passes");
                log::warn!(
                    "pass '{}': ignoring depth attachment on a compute pass",
                    self.pass.name()
                );
            }
        }
        minted
    }

    // ------------------------------------------------------------------
    // Buffer accesses
    // ------------------------------------------------------------------

    /// Declare a storage-buffer read in the given stages.
    pub fn add_shader_buffer(&mut self, node: BufferNodeId, stages: ShaderStages) {
        self.read_buffer(node, stages, BufferAccessMode::StorageRead);
    }

    /// Declare a uniform-buffer read in the given stages.
    pub fn add_uniform_buffer(&mut self, node: BufferNodeId, stages: ShaderStages) {
        self.read_buffer(node, stages, BufferAccessMode::UniformRead);
    }

    /// Declare a storage-buffer read/write, minting the next version.
    pub fn add_storage_buffer(
        &mut self,
        node: BufferNodeId,
        stages: ShaderStages,
    ) -> BufferNodeId {
        self.write_buffer(node, stages, BufferAccessMode::StorageReadWrite)
    }

    /// Declare a vertex-buffer read.
    pub fn add_vertex_buffer(&mut self, node: BufferNodeId) {
        self.read_buffer(node, ShaderStages::VERTEX, BufferAccessMode::VertexBuffer);
    }

    /// Declare an index-buffer read.
    pub fn add_index_buffer(&mut self, node: BufferNodeId) {
        self.read_buffer(node, ShaderStages::VERTEX, BufferAccessMode::IndexBuffer);
    }

    /// Declare an indirect-argument read.
    pub fn add_indirect_buffer(&mut self, node: BufferNodeId) {
        self.read_buffer(node, ShaderStages::VERTEX, BufferAccessMode::IndirectRead);
    }

    /// Declare a buffer as a copy source.
    pub fn add_transfer_src_buffer(&mut self, node: BufferNodeId) {
        self.read_buffer(node, ShaderStages::TRANSFER, BufferAccessMode::TransferRead);
    }

    /// Declare a buffer as a copy destination, minting the next version.
    pub fn add_transfer_dst_buffer(&mut self, node: BufferNodeId) -> BufferNodeId {
        self.write_buffer(node, ShaderStages::TRANSFER, BufferAccessMode::TransferWrite)
    }

    // ------------------------------------------------------------------
    // Pass configuration
    // ------------------------------------------------------------------

    /// Set the render pipeline configuration for a graphics pass.
    pub fn set_render_pipeline(&mut self, descriptor: RenderPipelineDescriptor) {
        match self.pass {
            Pass::Graphics(p) => p.pipeline = Some(descriptor),
            Pass::Compute(_) => {
                debug_assert!(false, "render pipelines are only valid on graphics passes");
                log::warn!(
                    "pass '{}': ignoring render pipeline on a compute pass",
                    self.pass.name()
                );
            }
        }
    }

    /// Set the compute pipeline configuration for a compute pass.
    pub fn set_compute_pipeline(&mut self, descriptor: ComputePipelineDescriptor) {
        match self.pass {
            Pass::Compute(p) => p.pipeline = Some(descriptor),
            Pass::Graphics(_) => {
                debug_assert!(false, "compute pipelines are only valid on compute passes");
                log::warn!(
                    "pass '{}': ignoring compute pipeline on a graphics pass",
                    self.pass.name()
                );
            }
        }
    }

    /// Move a compute pass to a different queue.
    ///
    /// Copy-only passes typically declare [`QueueKind::Transfer`]; graphics
    /// passes always stay on the graphics queue.
    pub fn set_queue(&mut self, queue: QueueKind) {
        match self.pass {
            Pass::Compute(p) => p.queue = queue,
            Pass::Graphics(_) => {
                debug_assert!(
                    queue == QueueKind::Graphics,
                    "graphics passes run on the graphics queue"
                );
                log::warn!(
                    "pass '{}': graphics passes cannot change queue",
                    self.pass.name()
                );
            }
        }
    }
}

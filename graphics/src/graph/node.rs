//! Versioned resource nodes.
//!
//! A node is a logical reference to a texture or buffer within one frame's
//! graph. Nodes are versioned: reading a node never changes its version,
//! while every write mints a new version whose producer is the writing pass.
//! Each version therefore has exactly one producer, which is what lets the
//! compiler derive dependencies without explicit edges.
//!
//! Handing a superseded version back into a builder call is detected here
//! and reported as a stale-node error, so the author is told immediately that
//! they would be reading data that has already been overwritten.

use crate::registry::{BufferId, TextureId};
use crate::types::{BufferDescriptor, TextureDescriptor};

use super::PassHandle;

/// A versioned reference to a texture within one frame's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureNodeId {
    pub(crate) index: u32,
    pub(crate) version: u32,
}

impl TextureNodeId {
    /// Index of the underlying texture node (shared by all versions).
    pub fn index(self) -> u32 {
        self.index
    }

    /// Version of this reference.
    pub fn version(self) -> u32 {
        self.version
    }

    #[cfg(test)]
    pub(crate) fn for_tests(index: u32, version: u32) -> Self {
        Self { index, version }
    }
}

/// A versioned reference to a buffer within one frame's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferNodeId {
    pub(crate) index: u32,
    pub(crate) version: u32,
}

impl BufferNodeId {
    /// Index of the underlying buffer node (shared by all versions).
    pub fn index(self) -> u32 {
        self.index
    }

    /// Version of this reference.
    pub fn version(self) -> u32 {
        self.version
    }
}

/// Where a texture node's backing storage comes from.
#[derive(Debug, Clone)]
pub(crate) enum TextureNodeSource {
    /// Imported persistent resource from the registry.
    Imported(TextureId),
    /// Frame-transient; backing allocated by the compiler's aliasing plan.
    Transient,
}

/// Where a buffer node's backing storage comes from.
#[derive(Debug, Clone)]
pub(crate) enum BufferNodeSource {
    /// Imported persistent resource from the registry.
    Imported(BufferId),
    /// Frame-transient; backing allocated by the compiler's aliasing plan.
    Transient,
}

#[derive(Debug)]
pub(crate) struct TextureNode {
    pub(crate) name: String,
    pub(crate) source: TextureNodeSource,
    pub(crate) descriptor: TextureDescriptor,
    /// Producer of each version. Version 0 (import/create) has none.
    pub(crate) producers: Vec<Option<PassHandle>>,
}

#[derive(Debug)]
pub(crate) struct BufferNode {
    pub(crate) name: String,
    pub(crate) source: BufferNodeSource,
    pub(crate) descriptor: BufferDescriptor,
    pub(crate) producers: Vec<Option<PassHandle>>,
}

/// Why a node access was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeAccessError {
    /// The version has been superseded by a later write.
    Stale {
        name: String,
        version: u32,
        current: u32,
    },
    /// The version was already written by another pass.
    DoubleWrite { name: String, version: u32 },
    /// The node index is not registered in this frame's table.
    Unknown { index: u32 },
    /// Export was attempted on a node that is not rooted at an import.
    NotImported { name: String },
}

/// Per-frame table of versioned texture and buffer nodes.
///
/// Created empty at the start of each frame and fully rebuilt; nothing in
/// here survives the frame.
#[derive(Debug, Default)]
pub(crate) struct NodeTable {
    textures: Vec<TextureNode>,
    buffers: Vec<BufferNode>,
    /// Dedupe map so importing the same persistent resource twice yields
    /// the same node. Two nodes silently sharing one backing resource
    /// would bypass dependency tracking entirely.
    imported_textures: std::collections::HashMap<TextureId, u32>,
    imported_buffers: std::collections::HashMap<BufferId, u32>,
}

impl NodeTable {
    pub(crate) fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub(crate) fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub(crate) fn textures(&self) -> &[TextureNode] {
        &self.textures
    }

    pub(crate) fn buffers(&self) -> &[BufferNode] {
        &self.buffers
    }

    fn texture_node(&self, index: u32) -> Result<&TextureNode, NodeAccessError> {
        self.textures
            .get(index as usize)
            .ok_or(NodeAccessError::Unknown { index })
    }

    fn buffer_node(&self, index: u32) -> Result<&BufferNode, NodeAccessError> {
        self.buffers
            .get(index as usize)
            .ok_or(NodeAccessError::Unknown { index })
    }

    /// Register an imported persistent texture as a fresh version-0 node.
    ///
    /// Importing the same id again returns the existing node at its
    /// current version instead of a second node over the same backing.
    pub(crate) fn import_texture(
        &mut self,
        name: String,
        id: TextureId,
        descriptor: TextureDescriptor,
    ) -> TextureNodeId {
        if let Some(&index) = self.imported_textures.get(&id) {
            let version = self.textures[index as usize].producers.len() as u32 - 1;
            return TextureNodeId { index, version };
        }

        let index = self.textures.len() as u32;
        self.textures.push(TextureNode {
            name,
            source: TextureNodeSource::Imported(id),
            descriptor,
            producers: vec![None],
        });
        self.imported_textures.insert(id, index);
        TextureNodeId { index, version: 0 }
    }

    /// Register a transient texture as a fresh version-0 node.
    ///
    /// No backing resource is allocated here; that is deferred to the
    /// compiler's aliasing plan.
    pub(crate) fn create_texture(
        &mut self,
        name: String,
        descriptor: TextureDescriptor,
    ) -> TextureNodeId {
        let index = self.textures.len() as u32;
        self.textures.push(TextureNode {
            name,
            source: TextureNodeSource::Transient,
            descriptor,
            producers: vec![None],
        });
        TextureNodeId { index, version: 0 }
    }

    /// Register an imported persistent buffer as a fresh version-0 node.
    ///
    /// Importing the same id again returns the existing node at its
    /// current version.
    pub(crate) fn import_buffer(
        &mut self,
        name: String,
        id: BufferId,
        descriptor: BufferDescriptor,
    ) -> BufferNodeId {
        if let Some(&index) = self.imported_buffers.get(&id) {
            let version = self.buffers[index as usize].producers.len() as u32 - 1;
            return BufferNodeId { index, version };
        }

        let index = self.buffers.len() as u32;
        self.buffers.push(BufferNode {
            name,
            source: BufferNodeSource::Imported(id),
            descriptor,
            producers: vec![None],
        });
        self.imported_buffers.insert(id, index);
        BufferNodeId { index, version: 0 }
    }

    /// Register a transient buffer as a fresh version-0 node.
    pub(crate) fn create_buffer(
        &mut self,
        name: String,
        descriptor: BufferDescriptor,
    ) -> BufferNodeId {
        let index = self.buffers.len() as u32;
        self.buffers.push(BufferNode {
            name,
            source: BufferNodeSource::Transient,
            descriptor,
            producers: vec![None],
        });
        BufferNodeId { index, version: 0 }
    }

    /// Validate a read of `node` (must be the most recent version).
    pub(crate) fn check_texture_read(&self, node: TextureNodeId) -> Result<(), NodeAccessError> {
        let entry = self.texture_node(node.index)?;
        let current = entry.producers.len() as u32 - 1;
        if node.version != current {
            return Err(NodeAccessError::Stale {
                name: entry.name.clone(),
                version: node.version,
                current,
            });
        }
        Ok(())
    }

    /// Validate a read of `node` (must be the most recent version).
    pub(crate) fn check_buffer_read(&self, node: BufferNodeId) -> Result<(), NodeAccessError> {
        let entry = self.buffer_node(node.index)?;
        let current = entry.producers.len() as u32 - 1;
        if node.version != current {
            return Err(NodeAccessError::Stale {
                name: entry.name.clone(),
                version: node.version,
                current,
            });
        }
        Ok(())
    }

    /// Record a write of `node` by `producer`, minting the next version.
    pub(crate) fn write_texture(
        &mut self,
        node: TextureNodeId,
        producer: PassHandle,
    ) -> Result<TextureNodeId, NodeAccessError> {
        let entry = self
            .textures
            .get_mut(node.index as usize)
            .ok_or(NodeAccessError::Unknown { index: node.index })?;
        let current = entry.producers.len() as u32 - 1;
        if node.version != current {
            // The version the caller holds was already superseded: some
            // other pass wrote it first.
            return Err(NodeAccessError::DoubleWrite {
                name: entry.name.clone(),
                version: node.version,
            });
        }

        entry.producers.push(Some(producer));
        Ok(TextureNodeId {
            index: node.index,
            version: current + 1,
        })
    }

    /// Record a write of `node` by `producer`, minting the next version.
    pub(crate) fn write_buffer(
        &mut self,
        node: BufferNodeId,
        producer: PassHandle,
    ) -> Result<BufferNodeId, NodeAccessError> {
        let entry = self
            .buffers
            .get_mut(node.index as usize)
            .ok_or(NodeAccessError::Unknown { index: node.index })?;
        let current = entry.producers.len() as u32 - 1;
        if node.version != current {
            return Err(NodeAccessError::DoubleWrite {
                name: entry.name.clone(),
                version: node.version,
            });
        }

        entry.producers.push(Some(producer));
        Ok(BufferNodeId {
            index: node.index,
            version: current + 1,
        })
    }

    /// Producer of a specific texture node version.
    pub(crate) fn texture_producer(&self, node: TextureNodeId) -> Option<PassHandle> {
        self.textures
            .get(node.index as usize)
            .and_then(|entry| entry.producers.get(node.version as usize).copied())
            .flatten()
    }

    /// Producer of a specific buffer node version.
    pub(crate) fn buffer_producer(&self, node: BufferNodeId) -> Option<PassHandle> {
        self.buffers
            .get(node.index as usize)
            .and_then(|entry| entry.producers.get(node.version as usize).copied())
            .flatten()
    }

    /// Resolve a texture node back to its persistent id.
    ///
    /// Valid only on the most recent version of a node that was imported.
    pub(crate) fn export_texture(&self, node: TextureNodeId) -> Result<TextureId, NodeAccessError> {
        self.check_texture_read(node)?;
        let entry = self.texture_node(node.index)?;
        match entry.source {
            TextureNodeSource::Imported(id) => Ok(id),
            TextureNodeSource::Transient => Err(NodeAccessError::NotImported {
                name: entry.name.clone(),
            }),
        }
    }

    /// Resolve a buffer node back to its persistent id.
    pub(crate) fn export_buffer(&self, node: BufferNodeId) -> Result<BufferId, NodeAccessError> {
        self.check_buffer_read(node)?;
        let entry = self.buffer_node(node.index)?;
        match entry.source {
            BufferNodeSource::Imported(id) => Ok(id),
            BufferNodeSource::Transient => Err(NodeAccessError::NotImported {
                name: entry.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextureFormat, TextureUsage};

    fn test_desc() -> TextureDescriptor {
        TextureDescriptor::new_2d(
            64,
            64,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_ATTACHMENT,
        )
    }

    #[test]
    fn test_create_starts_at_version_zero() {
        let mut table = NodeTable::default();
        let node = table.create_texture("color".into(), test_desc());
        assert_eq!(node.version(), 0);
        assert!(table.texture_producer(node).is_none());
    }

    #[test]
    fn test_write_mints_new_version() {
        let mut table = NodeTable::default();
        let node = table.create_texture("color".into(), test_desc());
        let pass = PassHandle::new(0);

        let written = table.write_texture(node, pass).unwrap();
        assert_eq!(written.index(), node.index());
        assert_eq!(written.version(), 1);
        assert_eq!(table.texture_producer(written), Some(pass));
    }

    #[test]
    fn test_read_of_superseded_version_is_stale() {
        let mut table = NodeTable::default();
        let node = table.create_texture("color".into(), test_desc());
        table.write_texture(node, PassHandle::new(0)).unwrap();

        let err = table.check_texture_read(node).unwrap_err();
        assert!(matches!(err, NodeAccessError::Stale { version: 0, current: 1, .. }));
    }

    #[test]
    fn test_second_write_to_same_version_is_double_write() {
        let mut table = NodeTable::default();
        let node = table.create_texture("color".into(), test_desc());
        table.write_texture(node, PassHandle::new(0)).unwrap();

        let err = table.write_texture(node, PassHandle::new(1)).unwrap_err();
        assert!(matches!(err, NodeAccessError::DoubleWrite { version: 0, .. }));
    }

    #[test]
    fn test_unknown_node_rejected() {
        let table = NodeTable::default();
        let err = table
            .check_texture_read(TextureNodeId { index: 7, version: 0 })
            .unwrap_err();
        assert_eq!(err, NodeAccessError::Unknown { index: 7 });
    }
}

//! Resource lifetime analysis and transient aliasing.
//!
//! A transient resource lives from its first producing pass to its last
//! consumer, measured in compiled-order positions. Two transients whose
//! lifetimes are disjoint and whose descriptors match may share one backing
//! allocation; the greedy assignment below walks resources in order of
//! first use and reuses the first compatible slot that is already free.

use crate::graph::{FrameGraph, TextureNodeSource};
use crate::types::{BufferDescriptor, TextureDescriptor};

use super::GraphMeta;

/// Inclusive interval of compiled-order positions a resource is alive for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    /// Position of the first pass touching the resource.
    pub first: usize,
    /// Position of the last pass touching the resource.
    pub last: usize,
}

impl Lifetime {
    /// Check whether two lifetimes overlap.
    pub fn overlaps(&self, other: &Lifetime) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// Physical backing plan for transient textures.
#[derive(Debug, Default)]
pub(crate) struct TransientTexturePlan {
    /// One descriptor per physical allocation slot.
    pub slots: Vec<TextureDescriptor>,
    /// Slot assigned to each texture node index (`None` for imported or
    /// unused nodes).
    pub slot_of_node: Vec<Option<u32>>,
}

/// Physical backing plan for transient buffers.
#[derive(Debug, Default)]
pub(crate) struct TransientBufferPlan {
    /// One descriptor per physical allocation slot.
    pub slots: Vec<BufferDescriptor>,
    /// Slot assigned to each buffer node index.
    pub slot_of_node: Vec<Option<u32>>,
}

/// Compute lifetimes for every node index from the ordered live passes.
///
/// Returns `(texture_lifetimes, buffer_lifetimes)` indexed by node index;
/// entries are `None` for nodes no live pass touches.
pub(crate) fn compute_lifetimes(
    graph: &FrameGraph,
    meta: &GraphMeta,
) -> (Vec<Option<Lifetime>>, Vec<Option<Lifetime>>) {
    let mut textures: Vec<Option<Lifetime>> = vec![None; graph.texture_node_count()];
    let mut buffers: Vec<Option<Lifetime>> = vec![None; graph.buffer_node_count()];

    let extend = |lifetime: &mut Option<Lifetime>, position: usize| match lifetime {
        Some(interval) => {
            interval.first = interval.first.min(position);
            interval.last = interval.last.max(position);
        }
        None => {
            *lifetime = Some(Lifetime {
                first: position,
                last: position,
            });
        }
    };

    for (position, &handle) in meta.pass_order.iter().enumerate() {
        let pass = &graph.passes()[handle.index()];
        for access in pass.texture_accesses() {
            extend(&mut textures[access.node.index() as usize], position);
        }
        for access in pass.buffer_accesses() {
            extend(&mut buffers[access.node.index() as usize], position);
        }
    }

    (textures, buffers)
}

/// Greedily assign transient textures to aliased physical slots.
pub(crate) fn assign_texture_slots(
    graph: &FrameGraph,
    lifetimes: &[Option<Lifetime>],
) -> TransientTexturePlan {
    let node_table = graph.nodes();
    let mut plan = TransientTexturePlan {
        slots: Vec::new(),
        slot_of_node: vec![None; lifetimes.len()],
    };
    // Free-at position per slot (last position currently occupied).
    let mut slot_last_use: Vec<usize> = Vec::new();

    // Walk transient nodes in order of first use so reuse decisions always
    // look backwards in the compiled order.
    let mut candidates: Vec<(usize, Lifetime)> = node_table
        .textures()
        .iter()
        .enumerate()
        .filter(|(_, node)| matches!(node.source, TextureNodeSource::Transient))
        .filter_map(|(index, _)| lifetimes[index].map(|lifetime| (index, lifetime)))
        .collect();
    candidates.sort_by_key(|(index, lifetime)| (lifetime.first, *index));

    for (index, lifetime) in candidates {
        let descriptor = &node_table.textures()[index].descriptor;

        let reusable = plan.slots.iter().enumerate().position(|(slot, slot_desc)| {
            slot_last_use[slot] < lifetime.first && slot_desc.is_aliasable_with(descriptor)
        });

        match reusable {
            Some(slot) => {
                log::debug!(
                    "aliasing transient texture '{}' into slot {slot}",
                    node_table.textures()[index].name
                );
                plan.slot_of_node[index] = Some(slot as u32);
                slot_last_use[slot] = lifetime.last;
            }
            None => {
                let slot = plan.slots.len() as u32;
                plan.slots.push(descriptor.clone());
                slot_last_use.push(lifetime.last);
                plan.slot_of_node[index] = Some(slot);
            }
        }
    }

    plan
}

/// Greedily assign transient buffers to aliased physical slots.
pub(crate) fn assign_buffer_slots(
    graph: &FrameGraph,
    lifetimes: &[Option<Lifetime>],
) -> TransientBufferPlan {
    let node_table = graph.nodes();
    let mut plan = TransientBufferPlan {
        slots: Vec::new(),
        slot_of_node: vec![None; lifetimes.len()],
    };
    let mut slot_last_use: Vec<usize> = Vec::new();

    let mut candidates: Vec<(usize, Lifetime)> = node_table
        .buffers()
        .iter()
        .enumerate()
        .filter(|(_, node)| {
            matches!(node.source, crate::graph::BufferNodeSource::Transient)
        })
        .filter_map(|(index, _)| lifetimes[index].map(|lifetime| (index, lifetime)))
        .collect();
    candidates.sort_by_key(|(index, lifetime)| (lifetime.first, *index));

    for (index, lifetime) in candidates {
        let descriptor = &node_table.buffers()[index].descriptor;

        let reusable = plan.slots.iter().enumerate().position(|(slot, slot_desc)| {
            slot_last_use[slot] < lifetime.first && slot_desc.is_aliasable_with(descriptor)
        });

        match reusable {
            Some(slot) => {
                log::debug!(
                    "aliasing transient buffer '{}' into slot {slot}",
                    node_table.buffers()[index].name
                );
                plan.slot_of_node[index] = Some(slot as u32);
                slot_last_use[slot] = lifetime.last;
            }
            None => {
                let slot = plan.slots.len() as u32;
                plan.slots.push(descriptor.clone());
                slot_last_use.push(lifetime.last);
                plan.slot_of_node[index] = Some(slot);
            }
        }
    }

    plan
}

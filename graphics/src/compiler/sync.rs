//! Barrier and cross-queue semaphore synthesis.
//!
//! The synthesis walks the compiled order once, tracking the last access of
//! every physical resource. A usage transition on the same queue becomes a
//! barrier recorded at the head of the consuming pass; an edge that crosses
//! queues becomes a semaphore signal/wait pair. Aliased transients share a
//! physical key, so the first use of a slot's next occupant automatically
//! gets a transition barrier against the previous occupant's last access.

use std::collections::HashMap;

use crate::graph::{
    BufferAccessMode, BufferNodeSource, FrameGraph, TextureAccessMode, TextureNodeSource,
};
use crate::types::QueueKind;

use super::lifetime::{TransientBufferPlan, TransientTexturePlan};
use super::GraphMeta;

/// A barrier recorded immediately before a pass executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOp {
    /// Texture usage/layout transition.
    Texture {
        /// Node index whose backing resource transitions.
        node: u32,
        /// Access before the barrier.
        before: TextureAccessMode,
        /// Access after the barrier.
        after: TextureAccessMode,
    },
    /// Buffer memory barrier.
    Buffer {
        /// Node index whose backing resource transitions.
        node: u32,
        /// Access before the barrier.
        before: BufferAccessMode,
        /// Access after the barrier.
        after: BufferAccessMode,
    },
}

/// Synthesized synchronization for a compiled graph.
#[derive(Debug, Default)]
pub(crate) struct SyncPlan {
    /// Barriers recorded before each position's pass.
    pub barriers: Vec<Vec<BarrierOp>>,
    /// Semaphore indices each position waits on.
    pub waits: Vec<Vec<u32>>,
    /// Semaphore indices each position signals.
    pub signals: Vec<Vec<u32>>,
    /// Total number of semaphores synthesized.
    pub semaphore_count: u32,
}

/// Physical identity of a texture's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextureKey {
    Imported { node: u32 },
    Transient { slot: u32 },
}

/// Physical identity of a buffer's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BufferKey {
    Imported { node: u32 },
    Transient { slot: u32 },
}

#[derive(Debug, Clone, Copy)]
struct LastAccess<M> {
    mode: M,
    queue: QueueKind,
    position: usize,
}

pub(crate) fn synthesize(
    graph: &FrameGraph,
    meta: &GraphMeta,
    texture_plan: &TransientTexturePlan,
    buffer_plan: &TransientBufferPlan,
) -> SyncPlan {
    let n = meta.pass_order.len();
    let mut plan = SyncPlan {
        barriers: vec![Vec::new(); n],
        waits: vec![Vec::new(); n],
        signals: vec![Vec::new(); n],
        semaphore_count: 0,
    };

    let mut texture_state: HashMap<TextureKey, LastAccess<TextureAccessMode>> = HashMap::new();
    let mut buffer_state: HashMap<BufferKey, LastAccess<BufferAccessMode>> = HashMap::new();
    // One semaphore per (producer position, consumer position) pair.
    let mut semaphores: HashMap<(usize, usize), u32> = HashMap::new();

    let node_table = graph.nodes();

    for (position, &handle) in meta.pass_order.iter().enumerate() {
        let pass = &graph.passes()[handle.index()];
        let queue = pass.queue();

        for access in pass.texture_accesses() {
            let index = access.node.index();
            let key = match node_table.textures()[index as usize].source {
                TextureNodeSource::Imported(_) => TextureKey::Imported { node: index },
                TextureNodeSource::Transient => match texture_plan.slot_of_node[index as usize] {
                    Some(slot) => TextureKey::Transient { slot },
                    // Unscheduled node (culled consumer-less create).
                    None => continue,
                },
            };

            if let Some(previous) = texture_state.get(&key).copied() {
                if previous.position != position {
                    if previous.queue != queue {
                        cross_queue(&mut plan, &mut semaphores, previous.position, position);
                    }
                    if previous.mode != access.mode
                        || previous.mode.is_write()
                        || access.mode.is_write()
                    {
                        plan.barriers[position].push(BarrierOp::Texture {
                            node: index,
                            before: previous.mode,
                            after: access.mode,
                        });
                    }
                }
            }

            texture_state.insert(
                key,
                LastAccess {
                    mode: access.mode,
                    queue,
                    position,
                },
            );
        }

        for access in pass.buffer_accesses() {
            let index = access.node.index();
            let key = match node_table.buffers()[index as usize].source {
                BufferNodeSource::Imported(_) => BufferKey::Imported { node: index },
                BufferNodeSource::Transient => match buffer_plan.slot_of_node[index as usize] {
                    Some(slot) => BufferKey::Transient { slot },
                    None => continue,
                },
            };

            if let Some(previous) = buffer_state.get(&key).copied() {
                if previous.position != position {
                    if previous.queue != queue {
                        cross_queue(&mut plan, &mut semaphores, previous.position, position);
                    }
                    // Buffers have no layouts; only write hazards need a
                    // barrier.
                    if previous.mode.is_write() || access.mode.is_write() {
                        plan.barriers[position].push(BarrierOp::Buffer {
                            node: index,
                            before: previous.mode,
                            after: access.mode,
                        });
                    }
                }
            }

            buffer_state.insert(
                key,
                LastAccess {
                    mode: access.mode,
                    queue,
                    position,
                },
            );
        }
    }

    plan
}

fn cross_queue(
    plan: &mut SyncPlan,
    semaphores: &mut HashMap<(usize, usize), u32>,
    producer: usize,
    consumer: usize,
) {
    if semaphores.contains_key(&(producer, consumer)) {
        return;
    }

    let semaphore = plan.semaphore_count;
    plan.semaphore_count += 1;
    semaphores.insert((producer, consumer), semaphore);
    plan.signals[producer].push(semaphore);
    plan.waits[consumer].push(semaphore);
    log::debug!("semaphore {semaphore}: position {producer} -> {consumer}");
}

//! Generational slot pool for stable, stale-detecting handles.
//!
//! This module provides [`SlotPool<T>`], a pooled store that hands out
//! [`PoolHandle`]s: `{index, generation}` pairs. A handle stays valid until
//! its slot is removed; once the slot is reused, the old handle's generation
//! no longer matches and every access through it is rejected.
//!
//! # Motivation
//!
//! Long-lived GPU objects are referenced from many places (graphs, caches,
//! recorded passes). Raw indices silently point at the wrong object after a
//! slot is recycled; `Arc` alone cannot tell "still the object I meant" from
//! "a new object that happens to live there". Generational handles detect
//! exactly that.
//!
//! Storage grows by fixed-size chunks. A chunk is never reallocated or moved,
//! so growing the pool does not invalidate any existing handle.
//!
//! # Example
//!
//! ```
//! use nightshade_core::pool::SlotPool;
//!
//! let mut pool = SlotPool::new();
//! let a = pool.insert("alpha");
//! assert!(pool.is_alive(a));
//! assert_eq!(pool.get(a), Some(&"alpha"));
//!
//! pool.remove(a).unwrap();
//! assert!(!pool.is_alive(a));
//!
//! // The slot is reused with a bumped generation; the old handle stays dead.
//! let b = pool.insert("beta");
//! assert_eq!(b.index(), a.index());
//! assert_ne!(b.generation(), a.generation());
//! assert_eq!(pool.get(a), None);
//! ```

/// Number of slots per storage chunk.
///
/// Chunks are allocated whole and never moved, keeping slot addresses stable
/// across growth.
const CHUNK_SIZE: usize = 64;

/// A generational handle into a [`SlotPool`].
///
/// `PoolHandle` is `Copy` and cheap to pass around. It is only meaningful
/// for the pool that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    /// Get the slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Get the generation this handle was issued with.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// One slot of pool storage.
#[derive(Debug)]
struct Slot<T> {
    /// Current generation. Bumped on every `remove`.
    generation: u32,
    /// The stored value, `None` while the slot is on the free list.
    value: Option<T>,
}

/// Error returned when an operation is given a dead or foreign handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleHandle {
    /// Slot index of the offending handle.
    pub index: u32,
    /// Generation of the offending handle.
    pub generation: u32,
}

impl std::fmt::Display for StaleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stale pool handle {{index: {}, generation: {}}}",
            self.index, self.generation
        )
    }
}

impl std::error::Error for StaleHandle {}

/// A pooled store with generational stale-handle detection.
///
/// Values are kept in fixed-size chunks; freed slots are recycled through a
/// free list with their generation bumped, so outstanding handles to the old
/// occupant can never resolve again.
///
/// The pool itself is a plain data structure. Callers that share a pool
/// across threads wrap it in a single lock; every mutating and
/// bounds-sensitive operation goes through that lock.
#[derive(Debug)]
pub struct SlotPool<T> {
    /// Storage chunks. Growth appends a chunk; existing chunks never move.
    chunks: Vec<Vec<Slot<T>>>,
    /// Indices of slots available for reuse.
    free: Vec<u32>,
    /// Number of live values.
    len: usize,
}

impl<T> SlotPool<T> {
    /// Create a new empty pool.
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of live values in the pool.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the pool holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots (live + free).
    pub fn capacity(&self) -> usize {
        self.chunks.len() * CHUNK_SIZE
    }

    fn slot(&self, index: u32) -> Option<&Slot<T>> {
        let index = index as usize;
        self.chunks
            .get(index / CHUNK_SIZE)
            .and_then(|chunk| chunk.get(index % CHUNK_SIZE))
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut Slot<T>> {
        let index = index as usize;
        self.chunks
            .get_mut(index / CHUNK_SIZE)
            .and_then(|chunk| chunk.get_mut(index % CHUNK_SIZE))
    }

    /// Insert a value, returning its handle.
    ///
    /// Reuses a freed slot if one is available; otherwise appends to the
    /// newest chunk, growing storage by one chunk when full. Growth never
    /// invalidates existing handles.
    pub fn insert(&mut self, value: T) -> PoolHandle {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = self.slot_mut(index).unwrap();
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return PoolHandle {
                index,
                generation: slot.generation,
            };
        }

        // No free slot; append to the last chunk, adding one if needed.
        let needs_chunk = self
            .chunks
            .last()
            .map(|chunk| chunk.len() == CHUNK_SIZE)
            .unwrap_or(true);
        if needs_chunk {
            self.chunks.push(Vec::with_capacity(CHUNK_SIZE));
        }

        let chunk_index = self.chunks.len() - 1;
        let chunk = &mut self.chunks[chunk_index];
        let index = (chunk_index * CHUNK_SIZE + chunk.len()) as u32;
        chunk.push(Slot {
            generation: 0,
            value: Some(value),
        });

        PoolHandle {
            index,
            generation: 0,
        }
    }

    /// Check whether `handle` refers to a live value.
    ///
    /// Bounds check plus generation comparison; never touches freed storage.
    pub fn is_alive(&self, handle: PoolHandle) -> bool {
        self.slot(handle.index)
            .map(|slot| slot.generation == handle.generation && slot.value.is_some())
            .unwrap_or(false)
    }

    /// Remove the value behind `handle`, invalidating all copies of it.
    ///
    /// The slot's generation is bumped and the slot returns to the free
    /// list. Fails if the handle is already dead.
    pub fn remove(&mut self, handle: PoolHandle) -> Result<T, StaleHandle> {
        let stale = StaleHandle {
            index: handle.index,
            generation: handle.generation,
        };

        let slot = self.slot_mut(handle.index).ok_or(stale)?;
        if slot.generation != handle.generation || slot.value.is_none() {
            return Err(stale);
        }

        let value = slot.value.take().unwrap();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Ok(value)
    }

    /// Resolve `handle` to a reference, or `None` if it is stale.
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slot(handle.index).and_then(|slot| {
            if slot.generation == handle.generation {
                slot.value.as_ref()
            } else {
                None
            }
        })
    }

    /// Resolve `handle` to a mutable reference, or `None` if it is stale.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slot_mut(handle.index).and_then(|slot| {
            if slot.generation == handle.generation {
                slot.value.as_mut()
            } else {
                None
            }
        })
    }

    /// Iterate over all live values with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.chunks.iter().enumerate().flat_map(|(ci, chunk)| {
            chunk.iter().enumerate().filter_map(move |(si, slot)| {
                slot.value.as_ref().map(|value| {
                    (
                        PoolHandle {
                            index: (ci * CHUNK_SIZE + si) as u32,
                            generation: slot.generation,
                        },
                        value,
                    )
                })
            })
        })
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

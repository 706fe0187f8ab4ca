//! Entity handles and the generational allocator
//!
//! An [`Entity`] is a lightweight `{index, generation}` pair. The index selects a
//! slot in the allocator, the generation detects stale handles: every time a slot
//! is retired its generation is bumped, so handles minted for an earlier occupant
//! stop comparing as alive and never alias the entity that recycles the index.
//!
//! The generation is a wrapping `u32`. A slot has to be recycled 2^32 times before
//! an old handle could match again; the allocator logs when a slot wraps.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Index of an entity slot
pub type EntityIndex = u32;

/// Generation counter of an entity slot
pub type Generation = u32;

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: EntityIndex,
    generation: Generation,
}

impl Entity {
    /// Sentinel handle meaning "no entity"
    pub const INVALID: Self = Self {
        index: EntityIndex::MAX,
        generation: Generation::MAX,
    };

    pub(crate) const fn new(index: EntityIndex, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Slot index of this handle
    #[must_use]
    pub const fn index(self) -> EntityIndex {
        self.index
    }

    /// Generation this handle was minted with
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }

    /// Whether this is anything other than [`Entity::INVALID`].
    ///
    /// This is a structural check only; liveness is answered by the allocator.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !(self.index == Self::INVALID.index && self.generation == Self::INVALID.generation)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}v{}", self.index, self.generation)
        } else {
            f.write_str("invalid")
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EntitySlot {
    generation: Generation,
    alive: bool,
}

/// Owns the space of entity handles
#[derive(Debug, Default)]
pub struct EntityAllocator {
    slots: Vec<EntitySlot>,
    free_list: VecDeque<EntityIndex>,
    alive_count: u32,
}

impl EntityAllocator {
    /// Create an empty allocator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator with room for `capacity` slots before growing
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: VecDeque::with_capacity(capacity),
            alive_count: 0,
        }
    }

    /// Create a new entity, recycling the oldest free index first
    pub fn create(&mut self) -> Entity {
        let index = self.free_list.pop_front().unwrap_or_else(|| {
            let index = EntityIndex::try_from(self.slots.len())
                .unwrap_or_else(|_| panic!("entity index space exhausted"));
            self.slots.push(EntitySlot {
                generation: 0,
                alive: false,
            });
            index
        });

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        self.alive_count += 1;

        Entity::new(index, slot.generation)
    }

    /// Retire an entity.
    ///
    /// Returns `false` without touching anything when the handle is already dead,
    /// stale or out of range.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let slot = &mut self.slots[entity.index as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        if slot.generation == 0 {
            log::warn!(
                "Entity slot {} wrapped its generation counter; handles older than 2^32 recycles may alias",
                entity.index
            );
        }

        self.free_list.push_back(entity.index);
        self.alive_count -= 1;
        true
    }

    /// Whether the handle refers to the current occupant of a live slot
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation)
    }

    /// Number of currently alive entities
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.alive_count
    }

    /// Whether no entity is alive
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Number of slots ever allocated
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over every alive entity in slot order
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().enumerate().filter(|(_, slot)| slot.alive).map(|(index, slot)| {
            // slots.len() is bounded by EntityIndex::MAX in create()
            #[allow(clippy::cast_possible_truncation)]
            Entity::new(index as EntityIndex, slot.generation)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_constant() {
        assert!(!Entity::INVALID.is_valid());
        assert_eq!(Entity::default(), Entity::INVALID);
        assert!(Entity::new(0, 0).is_valid());
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(Entity::new(3, 1), Entity::new(3, 1));
        assert_ne!(Entity::new(3, 1), Entity::new(3, 2));
        assert_ne!(Entity::new(3, 1), Entity::new(4, 1));
    }

    #[test]
    fn test_create_and_destroy() {
        let mut allocator = EntityAllocator::new();
        let entity = allocator.create();

        assert!(allocator.is_alive(entity));
        assert_eq!(allocator.len(), 1);

        assert!(allocator.destroy(entity));
        assert!(!allocator.is_alive(entity));
        assert_eq!(allocator.len(), 0);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut allocator = EntityAllocator::new();
        let entity = allocator.create();

        assert!(allocator.destroy(entity));
        assert!(!allocator.destroy(entity));
        assert!(!allocator.destroy(Entity::INVALID));
        assert!(!allocator.destroy(Entity::new(42, 0)));
        assert_eq!(allocator.len(), 0);
    }

    #[test]
    fn test_recycled_index_gets_new_generation() {
        let mut allocator = EntityAllocator::new();
        let first = allocator.create();
        allocator.destroy(first);

        let second = allocator.create();
        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);

        // The stale handle must not alias the new occupant
        assert!(!allocator.is_alive(first));
        assert!(allocator.is_alive(second));
    }

    #[test]
    fn test_free_list_is_fifo() {
        let mut allocator = EntityAllocator::new();
        let a = allocator.create();
        let b = allocator.create();
        let _c = allocator.create();

        allocator.destroy(b);
        allocator.destroy(a);

        assert_eq!(allocator.create().index(), b.index());
        assert_eq!(allocator.create().index(), a.index());
        assert_eq!(allocator.create().index(), 3);
    }

    #[test]
    fn test_repeated_cycling_keeps_capacity() {
        let mut allocator = EntityAllocator::new();
        let mut handles = Vec::new();
        for _ in 0..100 {
            let entity = allocator.create();
            handles.push(entity);
            allocator.destroy(entity);
        }

        assert_eq!(allocator.capacity(), 1);
        assert!(handles.iter().all(|&e| !allocator.is_alive(e)));
    }

    #[test]
    fn test_iter_alive_skips_dead_slots() {
        let mut allocator = EntityAllocator::with_capacity(8);
        let a = allocator.create();
        let b = allocator.create();
        let c = allocator.create();
        allocator.destroy(b);

        let alive: Vec<_> = allocator.iter_alive().collect();
        assert_eq!(alive, vec![a, c]);
    }

    #[test]
    fn test_out_of_range_not_alive() {
        let allocator = EntityAllocator::new();
        assert!(!allocator.is_alive(Entity::new(1000, 0)));
        assert!(!allocator.is_alive(Entity::INVALID));
    }
}

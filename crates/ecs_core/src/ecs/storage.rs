//! Sparse-set component storage
//!
//! Each registered component type gets one [`ComponentStore`]. The sparse array
//! maps `entity.index` to a slot in three parallel dense arrays (owner entity,
//! value, version). Dense arrays never contain gaps: removal swaps the last slot
//! into the hole and patches the sparse entry of the moved entity, which means
//! dense order is not stable across removals.
//!
//! Versions come from a store-wide clock, so a slot's version changes on every
//! add, mutable access or explicit mark and is never reused for a later occupant.
//!
//! An iteration pass lends single values out of their slots. A lent slot keeps
//! its owner and version, so membership queries stay truthful while the value
//! itself is unreachable until it is given back.

use super::{Component, Entity, EntityIndex};
use std::any::{type_name, Any};
use std::ops::{Deref, DerefMut};

const EMPTY: u32 = u32::MAX;

/// Dense/sparse storage for one component type
#[derive(Debug)]
pub struct ComponentStore<T> {
    sparse: Vec<u32>,
    entities: Vec<Entity>,
    values: Vec<Option<T>>,
    versions: Vec<u32>,
    clock: u32,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
            versions: Vec::new(),
            clock: 0,
        }
    }
}

impl<T: Component> ComponentStore<T> {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with dense room for `capacity` components
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            versions: Vec::with_capacity(capacity),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u32 {
        self.clock = self.clock.wrapping_add(1);
        if self.clock == 0 {
            self.clock = 1;
        }
        self.clock
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let dense = *self.sparse.get(entity.index() as usize)?;
        if dense == EMPTY {
            return None;
        }
        let dense = dense as usize;
        // The sparse entry is keyed by index only; the owner check rejects stale handles.
        (self.entities[dense] == entity).then_some(dense)
    }

    fn assure_index(&mut self, index: EntityIndex) {
        if index as usize >= self.sparse.len() {
            self.sparse.resize(index as usize + 1, EMPTY);
        }
    }

    /// Attach `value` to `entity`.
    ///
    /// An existing value is overwritten in place and returned; the slot keeps its
    /// dense position and its version is bumped.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let version = self.tick();

        if let Some(dense) = self.dense_index(entity) {
            self.versions[dense] = version;
            return self.values[dense].replace(value);
        }

        self.assure_index(entity.index());
        if let Some(previous) = self.sparse.get(entity.index() as usize).copied() {
            if previous != EMPTY {
                // A stale occupant of this index was never cleaned up; drop it first.
                let stale = self.entities[previous as usize];
                self.remove(stale);
            }
        }

        let dense = u32::try_from(self.entities.len())
            .unwrap_or_else(|_| panic!("component store for {} is full", type_name::<T>()));
        self.entities.push(entity);
        self.values.push(Some(value));
        self.versions.push(version);
        self.sparse[entity.index() as usize] = dense;
        None
    }

    /// Detach the component from `entity`, returning it. No-op if absent.
    ///
    /// A lent slot is dropped as well; its value is not returned.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense = self.dense_index(entity)?;
        let last = self.entities.len() - 1;

        self.entities.swap(dense, last);
        self.values.swap(dense, last);
        self.versions.swap(dense, last);

        self.entities.pop();
        self.versions.pop();
        let value = self.values.pop().flatten();

        self.sparse[entity.index() as usize] = EMPTY;
        if dense != last {
            let moved = self.entities[dense];
            // dense < len <= u32::MAX, checked on insert
            #[allow(clippy::cast_possible_truncation)]
            {
                self.sparse[moved.index() as usize] = dense as u32;
            }
        }

        value
    }

    /// Whether `entity` carries this component, lent or not
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Whether `entity`'s value is currently lent to an iteration pass
    #[must_use]
    pub fn is_lent(&self, entity: Entity) -> bool {
        self.dense_index(entity)
            .is_some_and(|dense| self.values[dense].is_none())
    }

    /// Shared access to the component of `entity`; `None` while it is lent
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity)
            .and_then(|dense| self.values[dense].as_ref())
    }

    /// Mutable access to the component of `entity`.
    ///
    /// The version is bumped unconditionally; the caller is assumed to write.
    /// Lent values are not reachable.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let dense = self.dense_index(entity)?;
        if self.values[dense].is_none() {
            return None;
        }
        self.versions[dense] = self.tick();
        self.values[dense].as_mut()
    }

    /// Move `entity`'s value out of its slot, leaving the slot lent.
    ///
    /// `None` if the component is absent or already lent.
    pub fn lend(&mut self, entity: Entity) -> Option<T> {
        let dense = self.dense_index(entity)?;
        self.values[dense].take()
    }

    /// Put a lent value back; `changed` bumps the version.
    ///
    /// Hands the value back to the caller when the slot no longer exists or
    /// is not lent.
    pub fn give_back(&mut self, entity: Entity, value: T, changed: bool) -> Result<(), T> {
        let Some(dense) = self.dense_index(entity) else {
            return Err(value);
        };
        if self.values[dense].is_some() {
            return Err(value);
        }
        self.values[dense] = Some(value);
        if changed {
            self.versions[dense] = self.tick();
        }
        Ok(())
    }

    /// Bump the version of `entity`'s component without touching the value.
    ///
    /// Returns `false` if the component is absent.
    pub fn mark_dirty(&mut self, entity: Entity) -> bool {
        match self.dense_index(entity) {
            Some(dense) => {
                self.versions[dense] = self.tick();
                true
            }
            None => false,
        }
    }

    /// Current version of `entity`'s component
    #[must_use]
    pub fn version(&self, entity: Entity) -> Option<u32> {
        self.dense_index(entity).map(|dense| self.versions[dense])
    }

    /// Number of stored components
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store holds no components
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Owner of the dense slot `dense_index`
    #[must_use]
    pub fn entity_at(&self, dense_index: usize) -> Option<Entity> {
        self.entities.get(dense_index).copied()
    }

    /// Owners in dense order
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate `(owner, value)` pairs in dense order, skipping lent values
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities
            .iter()
            .copied()
            .zip(self.values.iter())
            .filter_map(|(entity, value)| value.as_ref().map(|value| (entity, value)))
    }

    /// Drop every component
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.entities.clear();
        self.values.clear();
        self.versions.clear();
    }
}

/// Write guard handed out by iteration
///
/// Reading through the guard leaves the version alone; a mutable dereference
/// records a change, which bumps the version once the value is given back.
pub struct ComponentMut<'a, T> {
    value: &'a mut T,
    changed: &'a mut bool,
}

impl<'a, T> ComponentMut<'a, T> {
    /// Wrap a lent value together with its change flag
    pub fn new(value: &'a mut T, changed: &'a mut bool) -> Self {
        Self { value, changed }
    }

    /// Whether this guard has been written through
    #[must_use]
    pub fn is_changed(&self) -> bool {
        *self.changed
    }

    /// Record a change without writing
    pub fn set_changed(&mut self) {
        *self.changed = true;
    }
}

impl<T> Deref for ComponentMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.value
    }
}

impl<T> DerefMut for ComponentMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.set_changed();
        &mut *self.value
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ComponentMut<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ComponentMut").field(&self.value).finish()
    }
}

/// Type-erased view of a component store
pub trait ErasedStore: Any {
    /// Name of the stored component type
    fn type_name(&self) -> &'static str;

    /// Whether `entity` carries this component, lent or not
    fn contains(&self, entity: Entity) -> bool;

    /// Drop `entity`'s component if present
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Number of stored components
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owners in dense order
    fn entities(&self) -> &[Entity];

    /// Drop every component
    fn clear(&mut self);

    /// Upcast for downcasting to the concrete store
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owned upcast for downcasting to the concrete store
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn contains(&self, entity: Entity) -> bool {
        Self::contains(self, entity)
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        let present = Self::contains(self, entity);
        self.remove(entity);
        present
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn entities(&self) -> &[Entity] {
        Self::entities(self)
    }

    fn clear(&mut self) {
        Self::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

//! Coordinator - the single entry point into the entity/component core
//!
//! Owns the entity allocator, the component registry and the hierarchy index.
//! Every other subsystem goes through this type.
//!
//! # Iteration
//!
//! The `for_each` family snapshots the matching entities up front. For each
//! visit it borrows the entity's queried values out of their stores and hands
//! the callback a [`ComponentMut`] guard per component; everything else,
//! including the same component types on other entities, stays reachable
//! through the coordinator. Structural changes requested from inside a pass
//! (adding or removing components, destroying entities) are queued and
//! applied once the outermost pass returns, so a pass always visits exactly
//! its snapshot.
//!
//! A panicking callback still gets its values given back and its pass closed
//! before the panic continues. Operations it queued stay pending until the
//! next flush.
//!
//! The `safe_for_each` family additionally raises an iteration guard in debug
//! builds: any structural change attempted under the guard panics with
//! [`EcsError::IterationGuardViolation`]. Release builds compile the guard out.

use super::{
    Component, ComponentMut, ComponentRegistry, ComponentSet, ComponentStore, ComponentType,
    EcsError, Entity, EntityAllocator, FrameContext, HierarchyIndex, System,
};
use crate::config::EcsConfig;
use std::any::type_name;
use std::panic::{self, AssertUnwindSafe};

type DeferredOp = Box<dyn FnOnce(&mut Coordinator) -> Result<(), EcsError>>;

/// Facade over entities, components and the hierarchy
pub struct Coordinator {
    entities: EntityAllocator,
    registry: ComponentRegistry,
    hierarchy: HierarchyIndex,
    systems: Vec<Box<dyn System>>,
    deferred: Vec<(&'static str, DeferredOp)>,
    iteration_depth: u32,
    #[cfg(debug_assertions)]
    guard_depth: u32,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("entities", &self.entities.len())
            .field("registry", &self.registry)
            .field("hierarchy_edges", &self.hierarchy.edge_count())
            .field("systems", &self.systems.len())
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

macro_rules! impl_for_each {
    ($(#[$meta:meta])* $name:ident, $guarded:literal, $(($ty:ident, $changed:ident, $item:ident)),+) => {
        $(#[$meta])*
        pub fn $name<$($ty: Component,)+ F>(&mut self, mut callback: F) -> Result<usize, EcsError>
        where
            F: FnMut(&mut Self, Entity, $(ComponentMut<'_, $ty>),+),
        {
            let types = [$(ComponentType::of::<$ty>()),+];
            self.registry.ensure_distinct(&types)?;
            let snapshot = self.registry.matching_entities(&types)?;

            self.begin_iteration($guarded);
            let mut visited = 0;
            for entity in snapshot {
                if !self.entities.is_alive(entity) {
                    continue;
                }
                // Values already held by an enclosing pass are skipped
                let ($(mut $item,)+) = match ($(self.registry.lend::<$ty>(entity),)+) {
                    ($(Some($item),)+) => ($($item,)+),
                    ($($item,)+) => {
                        $(if let Some(value) = $item {
                            self.registry.give_back::<$ty>(entity, value, false);
                        })+
                        continue;
                    }
                };

                $(let mut $changed = false;)+
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    callback(&mut *self, entity, $(ComponentMut::new(&mut $item, &mut $changed)),+);
                }));
                $(self.registry.give_back::<$ty>(entity, $item, $changed);)+

                if let Err(payload) = outcome {
                    self.abort_iteration($guarded);
                    panic::resume_unwind(payload);
                }
                visited += 1;
            }

            self.end_iteration($guarded);
            Ok(visited)
        }
    };
}

impl Coordinator {
    /// Create a coordinator with default sizing
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&EcsConfig::default())
    }

    /// Create a coordinator sized from `config`
    #[must_use]
    pub fn with_config(config: &EcsConfig) -> Self {
        log::debug!(
            "Creating coordinator: {} entities, {} components per store",
            config.entity_capacity,
            config.component_capacity
        );
        Self {
            entities: EntityAllocator::with_capacity(config.entity_capacity),
            registry: ComponentRegistry::with_capacity(config.component_capacity),
            hierarchy: HierarchyIndex::new(),
            systems: Vec::new(),
            deferred: Vec::with_capacity(config.deferred_capacity),
            iteration_depth: 0,
            #[cfg(debug_assertions)]
            guard_depth: 0,
        }
    }

    // Entities

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.create();
        log::trace!("Created entity {entity}");
        entity
    }

    /// Destroy an entity together with all of its components.
    ///
    /// Its children become roots. Dead or stale handles are ignored. Inside an
    /// iteration pass the destruction is queued.
    pub fn destroy_entity(&mut self, entity: Entity) {
        self.assert_unguarded("destroy_entity");
        if self.is_iterating() {
            self.defer("destroy_entity", move |coordinator| {
                coordinator.destroy_entity(entity);
                Ok(())
            });
            return;
        }

        if !self.entities.destroy(entity) {
            return;
        }
        self.registry.on_entity_destroyed(entity);
        self.hierarchy.on_entity_destroyed(entity);
        log::trace!("Destroyed entity {entity}");
    }

    /// Destroy `root` and every descendant, deepest first
    ///
    /// Inside a pass the subtree is captured when the call is made, so queued
    /// operations that detach or destroy part of it first cannot shrink it.
    /// Children attached later in the same pass are picked up at flush.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if `root` is not alive.
    pub fn destroy_subtree(&mut self, root: Entity) -> Result<(), EcsError> {
        self.assert_unguarded("destroy_subtree");
        self.ensure_alive(root)?;
        let mut doomed = self.hierarchy.descendants(root);
        if self.is_iterating() {
            self.defer("destroy_subtree", move |coordinator| {
                let attached: Vec<Entity> = doomed
                    .iter()
                    .filter(|&&entity| coordinator.is_entity_alive(entity))
                    .flat_map(|&entity| coordinator.hierarchy.descendants(entity))
                    .collect();
                doomed.extend(attached);
                coordinator.destroy_deepest_first(root, doomed);
                Ok(())
            });
            return Ok(());
        }

        self.destroy_deepest_first(root, doomed);
        Ok(())
    }

    fn destroy_deepest_first(&mut self, root: Entity, doomed: Vec<Entity>) {
        log::trace!("Destroying subtree of {root} ({} entities)", doomed.len());
        // Repeated or already dead handles are ignored by destroy_entity
        for entity in doomed.into_iter().rev() {
            self.destroy_entity(entity);
        }
    }

    /// Whether `entity` refers to a live entity
    #[must_use]
    pub fn is_entity_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities
    #[must_use]
    pub const fn get_entity_count(&self) -> u32 {
        self.entities.len()
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidHandle(entity))
        }
    }

    // Components

    /// Register component type `T`. Registering twice is a no-op.
    pub fn register_component<T: Component>(&mut self) {
        self.registry.register::<T>();
    }

    /// Attach `component` to `entity`, replacing any existing value of that type
    ///
    /// # Errors
    ///
    /// `InvalidHandle` for dead handles, `UnknownComponentType` when `T` is not
    /// registered. Inside a pass the addition is queued after these checks.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        self.assert_unguarded("add_component");
        self.ensure_alive(entity)?;
        if !self.registry.is_registered::<T>() {
            return Err(EcsError::UnknownComponentType(type_name::<T>()));
        }

        if self.is_iterating() {
            self.defer("add_component", move |coordinator| {
                coordinator.add_component(entity, component)
            });
            return Ok(());
        }

        self.registry.store_mut::<T>()?.insert(entity, component);
        Ok(())
    }

    /// Detach the `T` component from `entity`. No-op if it has none.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` for dead handles, `UnknownComponentType` when `T` is not
    /// registered.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.assert_unguarded("remove_component");
        self.ensure_alive(entity)?;
        if !self.registry.is_registered::<T>() {
            return Err(EcsError::UnknownComponentType(type_name::<T>()));
        }

        if self.is_iterating() {
            self.defer("remove_component", move |coordinator| {
                coordinator.remove_component::<T>(entity)
            });
            return Ok(());
        }

        self.registry.store_mut::<T>()?.remove(entity);
        Ok(())
    }

    /// Shared access to the `T` component of `entity`
    ///
    /// # Errors
    ///
    /// `InvalidHandle`, `UnknownComponentType`, `ComponentBorrowed` while the
    /// value is handed to a running callback, or `ComponentNotFound`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.ensure_alive(entity)?;
        let store = self.registry.store::<T>()?;
        store.get(entity).ok_or_else(|| missing_component(store, entity))
    }

    /// Mutable access to the `T` component of `entity`; bumps its version
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.ensure_alive(entity)?;
        let store = self.registry.store_mut::<T>()?;
        if store.is_lent(entity) {
            return Err(missing_component(store, entity));
        }
        store.get_mut(entity).ok_or(EcsError::ComponentNotFound {
            entity,
            component: type_name::<T>(),
        })
    }

    /// Whether `entity` is alive and carries a `T`.
    ///
    /// Unregistered types answer `false`. Values handed to a running callback
    /// still count.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity) && self.registry.contains(ComponentType::of::<T>(), entity)
    }

    /// Version of the `T` component of `entity`, for change detection
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::get_component`].
    pub fn get_component_version<T: Component>(&self, entity: Entity) -> Result<u32, EcsError> {
        self.ensure_alive(entity)?;
        self.registry
            .store::<T>()?
            .version(entity)
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: type_name::<T>(),
            })
    }

    /// Bump the version of the `T` component of `entity` without writing it
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::get_component`].
    pub fn mark_component_dirty<T: Component>(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        if self.registry.store_mut::<T>()?.mark_dirty(entity) {
            Ok(())
        } else {
            Err(EcsError::ComponentNotFound {
                entity,
                component: type_name::<T>(),
            })
        }
    }

    // Queries

    /// Entities carrying every component in `Q`, in the dense order of its first type
    ///
    /// # Errors
    ///
    /// `UnknownComponentType` for any type in `Q`.
    pub fn query_entities<Q: ComponentSet>(&self) -> Result<Vec<Entity>, EcsError> {
        self.registry.matching_entities(&Q::component_types())
    }

    impl_for_each!(
        /// Visit every entity carrying an `A`; returns the number of visits
        ///
        /// Inside a nested pass, entities whose values the enclosing pass holds
        /// are skipped.
        ///
        /// # Errors
        ///
        /// `UnknownComponentType` for unregistered types.
        for_each, false, (A, changed_a, a)
    );
    impl_for_each!(
        /// Two-component [`Coordinator::for_each`]
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each`], plus `DuplicateComponent` when a
        /// type is listed twice.
        for_each2, false, (A, changed_a, a), (B, changed_b, b)
    );
    impl_for_each!(
        /// Three-component [`Coordinator::for_each`]
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each2`].
        for_each3, false, (A, changed_a, a), (B, changed_b, b), (C, changed_c, c)
    );
    impl_for_each!(
        /// Four-component [`Coordinator::for_each`]
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each2`].
        for_each4, false, (A, changed_a, a), (B, changed_b, b), (C, changed_c, c), (D, changed_d, d)
    );
    impl_for_each!(
        /// [`Coordinator::for_each`] under the debug iteration guard
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each`].
        ///
        /// # Panics
        ///
        /// In debug builds, when the callback adds or removes a component or
        /// destroys an entity.
        safe_for_each, true, (A, changed_a, a)
    );
    impl_for_each!(
        /// Two-component [`Coordinator::safe_for_each`]
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each2`].
        ///
        /// # Panics
        ///
        /// As for [`Coordinator::safe_for_each`].
        safe_for_each2, true, (A, changed_a, a), (B, changed_b, b)
    );
    impl_for_each!(
        /// Three-component [`Coordinator::safe_for_each`]
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each2`].
        ///
        /// # Panics
        ///
        /// As for [`Coordinator::safe_for_each`].
        safe_for_each3, true, (A, changed_a, a), (B, changed_b, b), (C, changed_c, c)
    );
    impl_for_each!(
        /// Four-component [`Coordinator::safe_for_each`]
        ///
        /// # Errors
        ///
        /// As for [`Coordinator::for_each2`].
        ///
        /// # Panics
        ///
        /// As for [`Coordinator::safe_for_each`].
        safe_for_each4, true, (A, changed_a, a), (B, changed_b, b), (C, changed_c, c), (D, changed_d, d)
    );

    /// Whether an iteration pass is running
    #[must_use]
    pub const fn is_iterating(&self) -> bool {
        self.iteration_depth > 0
    }

    /// Number of operations waiting for the outermost pass to end
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.deferred.len()
    }

    /// Apply queued operations now; returns how many were applied.
    ///
    /// Failed operations are logged and dropped.
    ///
    /// # Errors
    ///
    /// `IterationActive` when called from inside a pass.
    pub fn flush_deferred(&mut self) -> Result<usize, EcsError> {
        if self.is_iterating() {
            return Err(EcsError::IterationActive("flush_deferred"));
        }
        Ok(self.apply_deferred())
    }

    fn defer(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut Self) -> Result<(), EcsError> + 'static,
    ) {
        log::trace!("Deferring {operation} until the iteration pass ends");
        self.deferred.push((operation, Box::new(op)));
    }

    fn apply_deferred(&mut self) -> usize {
        let pending = std::mem::take(&mut self.deferred);
        if pending.is_empty() {
            return 0;
        }

        log::debug!("Applying {} deferred operations", pending.len());
        let count = pending.len();
        for (operation, op) in pending {
            if let Err(error) = op(self) {
                log::warn!("Deferred {operation} failed: {error}");
            }
        }
        count
    }

    fn begin_iteration(&mut self, guarded: bool) {
        self.iteration_depth += 1;
        #[cfg(debug_assertions)]
        {
            self.guard_depth += u32::from(guarded);
        }
        #[cfg(not(debug_assertions))]
        let _ = guarded;
    }

    fn leave_iteration(&mut self, guarded: bool) {
        self.iteration_depth -= 1;
        #[cfg(debug_assertions)]
        {
            self.guard_depth -= u32::from(guarded);
        }
        #[cfg(not(debug_assertions))]
        let _ = guarded;
    }

    fn end_iteration(&mut self, guarded: bool) {
        self.leave_iteration(guarded);
        if self.iteration_depth == 0 {
            self.apply_deferred();
        }
    }

    fn abort_iteration(&mut self, guarded: bool) {
        self.leave_iteration(guarded);
        if self.iteration_depth == 0 && !self.deferred.is_empty() {
            log::warn!(
                "Iteration pass panicked; {} deferred operations stay queued",
                self.deferred.len()
            );
        }
    }

    #[cfg(debug_assertions)]
    fn assert_unguarded(&self, operation: &'static str) {
        if self.guard_depth > 0 {
            let violation = EcsError::IterationGuardViolation { operation };
            log::error!("{violation}");
            panic!("{violation}");
        }
    }

    #[cfg(not(debug_assertions))]
    #[allow(clippy::unused_self)]
    const fn assert_unguarded(&self, _operation: &'static str) {}

    // Hierarchy

    /// Make `parent` the parent of `child`
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if either end is dead, `CycleDetected` if `parent` is
    /// `child` or one of its descendants.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), EcsError> {
        self.ensure_alive(child)?;
        self.ensure_alive(parent)?;
        self.hierarchy.set_parent(child, parent)?;
        log::trace!("Parented {child} under {parent}");
        Ok(())
    }

    /// Detach `child` from its parent. No-op for roots.
    pub fn remove_parent(&mut self, child: Entity) {
        self.hierarchy.remove_parent(child);
    }

    /// Parent of `entity`, or [`Entity::INVALID`]
    #[must_use]
    pub fn get_parent(&self, entity: Entity) -> Entity {
        self.hierarchy.get_parent(entity)
    }

    /// Children of `entity` in insertion order
    #[must_use]
    pub fn get_children(&self, entity: Entity) -> &[Entity] {
        self.hierarchy.get_children(entity)
    }

    /// Whether `entity` has children
    #[must_use]
    pub fn has_children(&self, entity: Entity) -> bool {
        self.hierarchy.has_children(entity)
    }

    /// Entities with children and no parent
    #[must_use]
    pub fn get_root_entities(&self) -> Vec<Entity> {
        self.hierarchy.get_root_entities()
    }

    /// Visit `root` and its descendants in pre-order
    pub fn traverse_depth_first(&self, root: Entity, visit: impl FnMut(Entity)) {
        self.hierarchy.traverse_depth_first(root, visit);
    }

    // Systems

    /// Append a system; systems run in registration order
    pub fn register_system(&mut self, system: impl System + 'static) {
        log::debug!("Registering system {}", system.name());
        self.systems.push(Box::new(system));
    }

    /// Number of registered systems
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Run every registered system once
    ///
    /// # Errors
    ///
    /// The first error returned by a system; later systems are skipped.
    pub fn update(&mut self, context: &FrameContext) -> Result<(), EcsError> {
        let mut systems = std::mem::take(&mut self.systems);
        let mut result = Ok(());

        for system in &mut systems {
            if let Err(error) = system.run(self, context) {
                log::error!("System {} failed on frame {}: {error}", system.name(), context.frame);
                result = Err(error);
                break;
            }
        }

        // Systems registered while updating go after the existing ones
        systems.append(&mut self.systems);
        self.systems = systems;
        result
    }

    // Accessors

    /// The entity allocator
    #[must_use]
    pub const fn entities(&self) -> &EntityAllocator {
        &self.entities
    }

    /// The component registry
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The hierarchy index
    #[must_use]
    pub const fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }
}

fn missing_component<T: Component>(store: &ComponentStore<T>, entity: Entity) -> EcsError {
    let component = type_name::<T>();
    if store.is_lent(entity) {
        EcsError::ComponentBorrowed { entity, component }
    } else {
        EcsError::ComponentNotFound { entity, component }
    }
}

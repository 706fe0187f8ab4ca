//! Component registry
//!
//! Holds one type-erased [`ComponentStore`] per registered component type,
//! keyed by [`TypeId`]. Stores never leave the registry; an iteration pass
//! borrows single values out of them and gives them back after each visit.

use super::storage::{ComponentStore, ErasedStore};
use super::{Component, ComponentType, EcsError, Entity};
use std::any::TypeId;
use std::collections::HashMap;

/// Registry of per-type component stores
pub struct ComponentRegistry {
    stores: HashMap<TypeId, Box<dyn ErasedStore>>,
    component_capacity: usize,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.stores.values().map(|store| store.type_name()).collect();
        names.sort_unstable();
        f.debug_struct("ComponentRegistry").field("types", &names).finish()
    }
}

impl ComponentRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a registry whose stores preallocate `component_capacity` slots
    #[must_use]
    pub fn with_capacity(component_capacity: usize) -> Self {
        Self {
            stores: HashMap::new(),
            component_capacity,
        }
    }

    /// Register component type `T`. Registering twice keeps the existing store.
    pub fn register<T: Component>(&mut self) {
        let component = ComponentType::of::<T>();
        if self.stores.contains_key(&component.id()) {
            log::debug!("Component type {component} already registered");
            return;
        }

        log::debug!("Registering component type {component}");
        self.stores.insert(
            component.id(),
            Box::new(ComponentStore::<T>::with_capacity(self.component_capacity)),
        );
    }

    /// Whether `T` has been registered
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.stores.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered component types
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.stores.len()
    }

    fn erased(&self, component: ComponentType) -> Result<&dyn ErasedStore, EcsError> {
        self.stores
            .get(&component.id())
            .map(Box::as_ref)
            .ok_or(EcsError::UnknownComponentType(component.name()))
    }

    /// Typed shared access to the store of `T`
    ///
    /// # Errors
    ///
    /// `UnknownComponentType` if `T` is not registered.
    pub fn store<T: Component>(&self) -> Result<&ComponentStore<T>, EcsError> {
        let component = ComponentType::of::<T>();
        self.erased(component)?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .ok_or(EcsError::UnknownComponentType(component.name()))
    }

    /// Typed mutable access to the store of `T`
    ///
    /// # Errors
    ///
    /// Same as [`ComponentRegistry::store`].
    pub fn store_mut<T: Component>(&mut self) -> Result<&mut ComponentStore<T>, EcsError> {
        let component = ComponentType::of::<T>();
        self.stores
            .get_mut(&component.id())
            .ok_or(EcsError::UnknownComponentType(component.name()))?
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::UnknownComponentType(component.name()))
    }

    /// Check that every listed type is registered and listed once
    pub(crate) fn ensure_distinct(&self, components: &[ComponentType]) -> Result<(), EcsError> {
        for (position, component) in components.iter().enumerate() {
            self.erased(*component)?;
            if components[..position].contains(component) {
                return Err(EcsError::DuplicateComponent(component.name()));
            }
        }
        Ok(())
    }

    /// Borrow `entity`'s `T` out of its store for one visit
    pub(crate) fn lend<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.store_mut::<T>().ok()?.lend(entity)
    }

    /// Return a value borrowed with [`ComponentRegistry::lend`]
    pub(crate) fn give_back<T: Component>(&mut self, entity: Entity, value: T, changed: bool) {
        let returned = match self.store_mut::<T>() {
            Ok(store) => store.give_back(entity, value, changed).is_ok(),
            Err(_) => false,
        };
        if !returned {
            log::error!(
                "Dropping lent {} of {entity}: its slot is gone",
                std::any::type_name::<T>()
            );
        }
    }

    /// Whether `entity` carries the component identified by `component`.
    ///
    /// Unregistered types answer `false`; values lent to a pass still count.
    #[must_use]
    pub fn contains(&self, component: ComponentType, entity: Entity) -> bool {
        self.erased(component).is_ok_and(|store| store.contains(entity))
    }

    /// Entities carrying every listed component, in the first type's dense order
    ///
    /// # Errors
    ///
    /// `UnknownComponentType` for any listed type.
    pub fn matching_entities(&self, components: &[ComponentType]) -> Result<Vec<Entity>, EcsError> {
        let Some((lead, rest)) = components.split_first() else {
            return Ok(Vec::new());
        };

        let lead = self.erased(*lead)?;
        let rest = rest
            .iter()
            .map(|component| self.erased(*component))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(lead
            .entities()
            .iter()
            .copied()
            .filter(|&entity| rest.iter().all(|store| store.contains(entity)))
            .collect())
    }

    /// Drop `entity` from every store
    pub(crate) fn on_entity_destroyed(&mut self, entity: Entity) {
        for store in self.stores.values_mut() {
            store.remove_entity(entity);
        }
    }

    /// Drop every component of every type, keeping registrations
    pub fn clear(&mut self) {
        for store in self.stores.values_mut() {
            store.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(f32);
    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity(f32);
    impl Component for Velocity {}

    #[test]
    fn test_register_and_access() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();

        assert!(registry.is_registered::<Position>());
        assert!(!registry.is_registered::<Velocity>());
        assert_eq!(registry.type_count(), 1);

        registry.store_mut::<Position>().unwrap().insert(Entity::new(0, 0), Position(1.0));
        assert_eq!(
            registry.store::<Position>().unwrap().get(Entity::new(0, 0)),
            Some(&Position(1.0))
        );
    }

    #[test]
    fn test_double_registration_keeps_data() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        registry.store_mut::<Position>().unwrap().insert(Entity::new(0, 0), Position(1.0));
        registry.register::<Position>();

        assert_eq!(registry.store::<Position>().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_type() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.store::<Position>(),
            Err(EcsError::UnknownComponentType(_))
        ));
    }

    #[test]
    fn test_destroy_removes_from_every_store() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        registry.register::<Velocity>();
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);

        registry.store_mut::<Position>().unwrap().insert(a, Position(0.0));
        registry.store_mut::<Velocity>().unwrap().insert(a, Velocity(0.0));
        registry.store_mut::<Position>().unwrap().insert(b, Position(1.0));

        registry.on_entity_destroyed(a);

        assert!(!registry.contains(ComponentType::of::<Position>(), a));
        assert!(!registry.contains(ComponentType::of::<Velocity>(), a));
        assert!(registry.contains(ComponentType::of::<Position>(), b));
    }

    #[test]
    fn test_lent_value_keeps_membership() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        let entity = Entity::new(0, 0);
        registry.store_mut::<Position>().unwrap().insert(entity, Position(4.0));

        let value = registry.lend::<Position>(entity).unwrap();
        assert!(registry.contains(ComponentType::of::<Position>(), entity));
        assert!(registry.store::<Position>().unwrap().is_lent(entity));
        assert_eq!(registry.lend::<Position>(entity), None);
        assert_eq!(registry.lend::<Velocity>(entity), None);

        registry.give_back(entity, value, true);
        assert_eq!(registry.store::<Position>().unwrap().get(entity), Some(&Position(4.0)));
    }

    #[test]
    fn test_ensure_distinct_rejects_duplicates() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        let position = ComponentType::of::<Position>();

        assert!(registry.ensure_distinct(&[position]).is_ok());
        assert_eq!(
            registry.ensure_distinct(&[position, position]),
            Err(EcsError::DuplicateComponent(position.name()))
        );
        assert!(matches!(
            registry.ensure_distinct(&[ComponentType::of::<Velocity>()]),
            Err(EcsError::UnknownComponentType(_))
        ));
    }

    #[test]
    fn test_matching_entities_uses_lead_order() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>();
        registry.register::<Velocity>();

        for i in [3, 1, 2] {
            registry.store_mut::<Position>().unwrap().insert(Entity::new(i, 0), Position(0.0));
        }
        for i in [2, 3, 9] {
            registry.store_mut::<Velocity>().unwrap().insert(Entity::new(i, 0), Velocity(0.0));
        }

        let matched = registry
            .matching_entities(&[ComponentType::of::<Position>(), ComponentType::of::<Velocity>()])
            .unwrap();
        assert_eq!(matched, vec![Entity::new(3, 0), Entity::new(2, 0)]);
    }
}

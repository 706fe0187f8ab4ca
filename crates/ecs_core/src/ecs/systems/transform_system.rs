//! World matrix propagation
//!
//! Walks the hierarchy from every transform root and recomputes world matrices
//! for subtrees whose transform changed since the previous run. A transform is
//! a root when its entity has no parent, or when the parent carries no
//! transform of its own.

use crate::ecs::{Coordinator, EcsError, Entity, FrameContext, System, TransformComponent};
use crate::foundation::math::Mat4;
use std::collections::HashMap;

struct PendingNode {
    entity: Entity,
    parent: Entity,
    parent_world: Mat4,
    parent_dirty: bool,
}

/// Keeps cached parents and world matrices of [`TransformComponent`]s current
#[derive(Debug, Default)]
pub struct TransformSystem {
    /// Component version observed after the last refresh, per entity
    seen_versions: HashMap<Entity, u32>,
}

impl TransformSystem {
    /// Creates a transform system that treats every transform as changed
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh every changed transform; returns how many were recomputed
    ///
    /// # Errors
    ///
    /// `UnknownComponentType` if [`TransformComponent`] is not registered,
    /// `ComponentBorrowed` when called from inside a pass that holds a transform.
    pub fn propagate(&mut self, coordinator: &mut Coordinator) -> Result<usize, EcsError> {
        let transforms = coordinator.query_entities::<TransformComponent>()?;

        let mut stack: Vec<PendingNode> = transforms
            .iter()
            .rev()
            .filter_map(|&entity| {
                let parent = coordinator.get_parent(entity);
                let is_root = !coordinator.has_component::<TransformComponent>(parent);
                is_root.then(|| PendingNode {
                    entity,
                    parent,
                    parent_world: Mat4::identity(),
                    parent_dirty: false,
                })
            })
            .collect();

        let mut recomputed = 0;
        while let Some(node) = stack.pop() {
            let version = coordinator.get_component_version::<TransformComponent>(node.entity)?;
            let cached_parent = coordinator.get_component::<TransformComponent>(node.entity)?.parent();
            let dirty = node.parent_dirty
                || cached_parent != node.parent
                || self.seen_versions.get(&node.entity) != Some(&version);

            if dirty {
                coordinator
                    .get_component_mut::<TransformComponent>(node.entity)?
                    .refresh(node.parent, &node.parent_world);
                let refreshed = coordinator.get_component_version::<TransformComponent>(node.entity)?;
                self.seen_versions.insert(node.entity, refreshed);
                recomputed += 1;
            }

            let world = *coordinator
                .get_component::<TransformComponent>(node.entity)?
                .world_matrix();
            for &child in coordinator.get_children(node.entity).iter().rev() {
                if coordinator.has_component::<TransformComponent>(child) {
                    stack.push(PendingNode {
                        entity: child,
                        parent: node.entity,
                        parent_world: world,
                        parent_dirty: dirty,
                    });
                }
            }
        }

        self.seen_versions
            .retain(|&entity, _| coordinator.has_component::<TransformComponent>(entity));

        log::trace!("Transform propagation recomputed {recomputed} of {} transforms", transforms.len());
        Ok(recomputed)
    }
}

impl System for TransformSystem {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn run(&mut self, coordinator: &mut Coordinator, _context: &FrameContext) -> Result<(), EcsError> {
        self.propagate(coordinator)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn setup() -> (Coordinator, Entity, Entity) {
        let mut coordinator = Coordinator::new();
        coordinator.register_component::<TransformComponent>();

        let parent = coordinator.create_entity();
        let child = coordinator.create_entity();
        coordinator
            .add_component(parent, TransformComponent::from_position(Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        coordinator
            .add_component(child, TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        coordinator.set_parent(child, parent).unwrap();
        (coordinator, parent, child)
    }

    fn world_position(coordinator: &Coordinator, entity: Entity) -> Vec3 {
        coordinator.get_component::<TransformComponent>(entity).unwrap().world_position()
    }

    #[test]
    fn test_propagates_parent_offset() {
        let (mut coordinator, parent, child) = setup();
        let mut system = TransformSystem::new();

        assert_eq!(system.propagate(&mut coordinator).unwrap(), 2);
        assert_relative_eq!(world_position(&coordinator, child), Vec3::new(11.0, 0.0, 0.0));
        assert_eq!(
            coordinator.get_component::<TransformComponent>(child).unwrap().parent(),
            parent
        );
    }

    #[test]
    fn test_unchanged_transforms_are_skipped() {
        let (mut coordinator, _, _) = setup();
        let mut system = TransformSystem::new();

        system.propagate(&mut coordinator).unwrap();
        assert_eq!(system.propagate(&mut coordinator).unwrap(), 0);
    }

    #[test]
    fn test_parent_change_reaches_children() {
        let (mut coordinator, parent, child) = setup();
        let mut system = TransformSystem::new();
        system.propagate(&mut coordinator).unwrap();

        coordinator
            .get_component_mut::<TransformComponent>(parent)
            .unwrap()
            .local_position = Vec3::new(20.0, 0.0, 0.0);

        assert_eq!(system.propagate(&mut coordinator).unwrap(), 2);
        assert_relative_eq!(world_position(&coordinator, child), Vec3::new(21.0, 0.0, 0.0));
    }

    #[test]
    fn test_child_change_leaves_parent_alone() {
        let (mut coordinator, _, child) = setup();
        let mut system = TransformSystem::new();
        system.propagate(&mut coordinator).unwrap();

        coordinator.mark_component_dirty::<TransformComponent>(child).unwrap();
        assert_eq!(system.propagate(&mut coordinator).unwrap(), 1);
    }

    #[test]
    fn test_detached_child_becomes_root() {
        let (mut coordinator, _, child) = setup();
        let mut system = TransformSystem::new();
        system.propagate(&mut coordinator).unwrap();

        coordinator.remove_parent(child);
        assert_eq!(system.propagate(&mut coordinator).unwrap(), 1);

        let transform = coordinator.get_component::<TransformComponent>(child).unwrap();
        assert_eq!(transform.parent(), Entity::INVALID);
        assert_relative_eq!(transform.world_position(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_runs_as_registered_system() {
        let (mut coordinator, _, child) = setup();
        coordinator.register_system(TransformSystem::new());

        coordinator.update(&FrameContext::first(0.016)).unwrap();
        assert_relative_eq!(world_position(&coordinator, child), Vec3::new(11.0, 0.0, 0.0));
    }
}

//! Hierarchy edits interleaved with entity destruction

use crate::ecs::{Coordinator, EcsError, Entity, TransformComponent, TransformSystem};
use crate::foundation::math::Vec3;
use approx::assert_relative_eq;

fn spawn(coordinator: &mut Coordinator, count: usize) -> Vec<Entity> {
    (0..count).map(|_| coordinator.create_entity()).collect()
}

#[test]
fn test_set_and_remove_parent_are_symmetric() {
    let mut coordinator = Coordinator::new();
    let entities = spawn(&mut coordinator, 2);
    let (parent, child) = (entities[0], entities[1]);

    coordinator.set_parent(child, parent).unwrap();
    assert_eq!(coordinator.get_parent(child), parent);
    assert_eq!(coordinator.get_children(parent), &[child]);

    coordinator.remove_parent(child);
    assert_eq!(coordinator.get_parent(child), Entity::INVALID);
    assert!(coordinator.get_children(parent).is_empty());
    assert!(coordinator.get_root_entities().is_empty());
}

#[test]
fn test_cycle_rejected_through_coordinator() {
    let mut coordinator = Coordinator::new();
    let chain = spawn(&mut coordinator, 4);
    for pair in chain.windows(2) {
        coordinator.set_parent(pair[1], pair[0]).unwrap();
    }

    assert_eq!(
        coordinator.set_parent(chain[0], chain[3]),
        Err(EcsError::CycleDetected {
            child: chain[0],
            parent: chain[3],
        })
    );
    assert_eq!(coordinator.get_root_entities(), vec![chain[0]]);

    let mut order = Vec::new();
    coordinator.traverse_depth_first(chain[0], |entity| order.push(entity));
    assert_eq!(order, chain);
}

#[test]
fn test_destroyed_parent_promotes_children_to_roots() {
    let mut coordinator = Coordinator::new();
    let family = spawn(&mut coordinator, 5);
    let (grandparent, parent) = (family[0], family[1]);
    coordinator.set_parent(parent, grandparent).unwrap();
    for &child in &family[2..] {
        coordinator.set_parent(child, parent).unwrap();
    }
    // Give one child its own child so it stays a root after promotion
    let nested = coordinator.create_entity();
    coordinator.set_parent(nested, family[2]).unwrap();

    coordinator.destroy_entity(parent);

    assert!(!coordinator.has_children(grandparent));
    for &child in &family[2..] {
        assert_eq!(coordinator.get_parent(child), Entity::INVALID);
        assert!(coordinator.is_entity_alive(child));
    }
    assert_eq!(coordinator.get_parent(nested), family[2]);
    assert_eq!(coordinator.get_root_entities(), vec![family[2]]);
}

#[test]
fn test_destroy_subtree_inside_pass_is_deferred() {
    let mut coordinator = Coordinator::new();
    coordinator.register_component::<TransformComponent>();
    let root = coordinator.create_entity();
    let leaf = coordinator.create_entity();
    coordinator.add_component(root, TransformComponent::default()).unwrap();
    coordinator.set_parent(leaf, root).unwrap();

    coordinator
        .for_each::<TransformComponent, _>(|coordinator, entity, _| {
            coordinator.destroy_subtree(entity).unwrap();
            assert!(coordinator.is_entity_alive(leaf));
        })
        .unwrap();

    assert!(!coordinator.is_entity_alive(root));
    assert!(!coordinator.is_entity_alive(leaf));
    assert_eq!(coordinator.get_entity_count(), 0);
}

#[test]
fn test_reparenting_moves_world_position() {
    let mut coordinator = Coordinator::new();
    coordinator.register_component::<TransformComponent>();
    let entities = spawn(&mut coordinator, 3);
    let (left, right, item) = (entities[0], entities[1], entities[2]);
    coordinator
        .add_component(left, TransformComponent::from_position(Vec3::new(-5.0, 0.0, 0.0)))
        .unwrap();
    coordinator
        .add_component(right, TransformComponent::from_position(Vec3::new(5.0, 0.0, 0.0)))
        .unwrap();
    coordinator
        .add_component(item, TransformComponent::from_position(Vec3::new(0.0, 1.0, 0.0)))
        .unwrap();

    let mut system = TransformSystem::new();
    coordinator.set_parent(item, left).unwrap();
    system.propagate(&mut coordinator).unwrap();
    let world = coordinator.get_component::<TransformComponent>(item).unwrap().world_position();
    assert_relative_eq!(world, Vec3::new(-5.0, 1.0, 0.0));

    coordinator.set_parent(item, right).unwrap();
    assert_eq!(system.propagate(&mut coordinator).unwrap(), 1);
    let transform = coordinator.get_component::<TransformComponent>(item).unwrap();
    assert_eq!(transform.parent(), right);
    assert_relative_eq!(transform.world_position(), Vec3::new(5.0, 1.0, 0.0));
}

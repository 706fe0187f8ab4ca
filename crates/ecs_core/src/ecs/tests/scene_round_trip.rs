//! Save, destroy, load

use crate::ecs::{Coordinator, TransformComponent, TransformSystem};
use crate::foundation::math::{Quat, Vec3};
use crate::scene::{SceneSerializer, SCENE_FORMAT_VERSION};
use approx::assert_relative_eq;

#[test]
fn test_round_trip_preserves_values_and_edges() {
    let mut coordinator = Coordinator::new();
    coordinator.register_component::<TransformComponent>();

    let parent = coordinator.create_entity();
    let child = coordinator.create_entity();
    coordinator
        .add_component(parent, TransformComponent::from_position(Vec3::new(10.0, 5.0, 0.0)))
        .unwrap();
    coordinator
        .add_component(child, TransformComponent::from_position(Vec3::new(2.0, 0.0, 0.0)))
        .unwrap();
    coordinator.set_parent(child, parent).unwrap();

    let serializer = SceneSerializer::new();
    let text = serializer.save_to_string(&coordinator).unwrap();

    coordinator.destroy_entity(child);
    coordinator.destroy_entity(parent);
    assert_eq!(coordinator.get_entity_count(), 0);

    let remap = serializer.load_from_str(&mut coordinator, &text).unwrap();
    assert_eq!(coordinator.get_entity_count(), 2);

    let new_parent = remap[&parent.index()];
    let new_child = remap[&child.index()];
    // Fresh handles: the recycled slots carry a newer generation
    assert_ne!(new_parent, parent);
    assert_ne!(new_child, child);
    assert!(!coordinator.is_entity_alive(parent));

    assert_eq!(coordinator.get_parent(new_child), new_parent);
    assert_eq!(coordinator.get_children(new_parent), &[new_child]);
    assert_relative_eq!(
        coordinator
            .get_component::<TransformComponent>(new_parent)
            .unwrap()
            .local_position,
        Vec3::new(10.0, 5.0, 0.0)
    );
    assert_relative_eq!(
        coordinator
            .get_component::<TransformComponent>(new_child)
            .unwrap()
            .local_position,
        Vec3::new(2.0, 0.0, 0.0)
    );

    TransformSystem::new().propagate(&mut coordinator).unwrap();
    let world = coordinator
        .get_component::<TransformComponent>(new_child)
        .unwrap()
        .world_position();
    assert_relative_eq!(world, Vec3::new(12.0, 5.0, 0.0));
}

#[test]
fn test_round_trip_through_file() {
    let mut coordinator = Coordinator::new();
    coordinator.register_component::<TransformComponent>();

    let rotation = Quat::from_axis_angle(&Vec3::y_axis(), 0.5);
    let entity = coordinator.create_entity();
    coordinator
        .add_component(
            entity,
            TransformComponent::from_trs(Vec3::new(1.0, 2.0, 3.0), rotation, Vec3::new(2.0, 2.0, 2.0)),
        )
        .unwrap();

    let path = std::env::temp_dir().join(format!("ecs_core_scene_{}.ron", std::process::id()));
    let serializer = SceneSerializer::new();
    serializer.save_to_file(&coordinator, &path).unwrap();

    let mut restored = Coordinator::new();
    let remap = serializer.load_from_file(&mut restored, &path).unwrap();
    std::fs::remove_file(&path).ok();

    let loaded = restored
        .get_component::<TransformComponent>(remap[&entity.index()])
        .unwrap();
    assert_relative_eq!(loaded.local_position, Vec3::new(1.0, 2.0, 3.0));
    assert_relative_eq!(loaded.local_scale, Vec3::new(2.0, 2.0, 2.0));
    assert_relative_eq!(loaded.local_rotation.angle(), 0.5, epsilon = 1e-6);
}

#[test]
fn test_saved_text_records_version_and_parent() {
    let mut coordinator = Coordinator::new();
    coordinator.register_component::<TransformComponent>();
    let parent = coordinator.create_entity();
    let child = coordinator.create_entity();
    coordinator.add_component(parent, TransformComponent::default()).unwrap();
    coordinator.add_component(child, TransformComponent::default()).unwrap();
    coordinator.set_parent(child, parent).unwrap();

    let snapshot = SceneSerializer::new().snapshot(&coordinator).unwrap();
    assert_eq!(snapshot.version, SCENE_FORMAT_VERSION);
    assert_eq!(snapshot.entities.len(), 2);
    assert_eq!(snapshot.entities[0].parent, None);
    assert_eq!(snapshot.entities[1].parent, Some(parent.index()));
    assert_eq!(snapshot.entities[1].generation, child.generation());
}

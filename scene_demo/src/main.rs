//! Scene demo
//!
//! Builds a small orbiting hierarchy, animates it for a few frames, writes the
//! scene to RON and reads it back into a fresh coordinator.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use ecs_core::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
enum DemoError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Round trip mismatch: saved {saved} entities, loaded {loaded}")]
    RoundTrip { saved: usize, loaded: usize },
}

/// Spins an entity around its local Y axis
#[derive(Debug, Clone, Copy)]
struct Orbit {
    radians_per_second: f32,
}

impl Component for Orbit {}

struct OrbitSystem;

impl System for OrbitSystem {
    fn name(&self) -> &'static str {
        "orbit"
    }

    fn run(&mut self, coordinator: &mut Coordinator, context: &FrameContext) -> Result<(), EcsError> {
        coordinator.for_each2::<TransformComponent, Orbit, _>(|_, _, mut transform, orbit| {
            let step = Quat::from_axis_angle(&Vec3::y_axis(), orbit.radians_per_second * context.delta_time);
            transform.local_rotation = step * transform.local_rotation;
        })?;
        Ok(())
    }
}

struct Body {
    name: &'static str,
    entity: Entity,
}

fn spawn_body(
    coordinator: &mut Coordinator,
    name: &'static str,
    offset: Vec3,
    orbit: Option<f32>,
    parent: Option<Entity>,
) -> Result<Body, EcsError> {
    let entity = coordinator.create_entity();
    coordinator.add_component(entity, TransformComponent::from_position(offset))?;
    if let Some(radians_per_second) = orbit {
        coordinator.add_component(entity, Orbit { radians_per_second })?;
    }
    if let Some(parent) = parent {
        coordinator.set_parent(entity, parent)?;
    }
    log::debug!("Spawned {name} as {entity}");
    Ok(Body { name, entity })
}

fn build_scene(coordinator: &mut Coordinator) -> Result<Vec<Body>, EcsError> {
    coordinator.register_component::<TransformComponent>();
    coordinator.register_component::<Orbit>();

    let sun = spawn_body(coordinator, "sun", Vec3::zeros(), Some(0.2), None)?;
    let planet = spawn_body(coordinator, "planet", Vec3::new(10.0, 0.0, 0.0), Some(1.0), Some(sun.entity))?;
    let moon = spawn_body(coordinator, "moon", Vec3::new(2.0, 0.0, 0.0), None, Some(planet.entity))?;
    let comet = spawn_body(coordinator, "comet", Vec3::new(-30.0, 4.0, 0.0), None, None)?;

    Ok(vec![sun, planet, moon, comet])
}

fn run() -> Result<(), DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {path}");
            EcsConfig::load_from_file(path)?
        }
        None => EcsConfig::default(),
    };

    let mut coordinator = Coordinator::with_config(&config);
    let bodies = build_scene(&mut coordinator)?;
    coordinator.register_system(OrbitSystem);
    coordinator.register_system(TransformSystem::new());

    let mut context = FrameContext::first(1.0 / 60.0);
    for _ in 0..120 {
        coordinator.update(&context)?;
        context = context.next(1.0 / 60.0);
    }
    log::info!("Simulated {} frames ({:.2}s)", context.frame, context.elapsed);

    for body in &bodies {
        let transform = coordinator.get_component::<TransformComponent>(body.entity)?;
        let world = transform.world_position();
        log::info!(
            "{:>6} {}: world ({:.3}, {:.3}, {:.3})",
            body.name,
            body.entity,
            world.x,
            world.y,
            world.z
        );
    }
    log::info!("Hierarchy roots: {:?}", coordinator.get_root_entities());

    let path = std::env::temp_dir().join("scene_demo.ron");
    let serializer = SceneSerializer::new();
    serializer.save_to_file(&coordinator, &path)?;

    let mut restored = Coordinator::with_config(&config);
    let remap = serializer.load_from_file(&mut restored, &path)?;
    restored.register_system(TransformSystem::new());
    restored.update(&FrameContext::first(0.0))?;

    if remap.len() != bodies.len() {
        return Err(DemoError::RoundTrip {
            saved: bodies.len(),
            loaded: remap.len(),
        });
    }

    for body in &bodies {
        let Some(&loaded) = remap.get(&body.entity.index()) else {
            continue;
        };
        let before = coordinator.get_component::<TransformComponent>(body.entity)?.world_position();
        let after = restored.get_component::<TransformComponent>(loaded)?.world_position();
        log::info!(
            "{:>6} {} -> {}: drift {:.6}",
            body.name,
            body.entity,
            loaded,
            (after - before).norm()
        );
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting scene demo");
    match run() {
        Ok(()) => log::info!("Scene demo finished successfully"),
        Err(error) => {
            log::error!("Scene demo failed: {error}");
            std::process::exit(1);
        }
    }
}

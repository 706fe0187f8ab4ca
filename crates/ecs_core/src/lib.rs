//! # ECS Core
//!
//! Entity/component storage and scene hierarchy for a real-time 3D engine.
//!
//! ## Features
//!
//! - **Generational handles**: stale entity handles never alias recycled slots
//! - **Sparse-set stores**: dense per-type component arrays with change versions
//! - **Hierarchy**: acyclic parent/child index independent of any component
//! - **Safe iteration**: deferred structural changes and a debug iteration guard
//! - **Scenes**: RON snapshots of transform hierarchies
//!
//! ## Quick Start
//!
//! ```rust
//! use ecs_core::prelude::*;
//!
//! let mut coordinator = Coordinator::new();
//! coordinator.register_component::<TransformComponent>();
//!
//! let parent = coordinator.create_entity();
//! let child = coordinator.create_entity();
//! coordinator.add_component(parent, TransformComponent::from_position(Vec3::new(10.0, 0.0, 0.0)))?;
//! coordinator.add_component(child, TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0)))?;
//! coordinator.set_parent(child, parent)?;
//!
//! coordinator.register_system(TransformSystem::new());
//! coordinator.update(&FrameContext::first(1.0 / 60.0))?;
//!
//! let world = coordinator.get_component::<TransformComponent>(child)?.world_position();
//! assert!((world.x - 11.0).abs() < 1e-5);
//! # Ok::<(), EcsError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod foundation;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EcsConfig},
        ecs::{
            Component, ComponentMut, Coordinator, EcsError, Entity, FrameContext, System,
            TransformComponent, TransformSystem,
        },
        foundation::math::{Mat4, Quat, Vec3},
        scene::{SceneError, SceneSerializer},
    };
}

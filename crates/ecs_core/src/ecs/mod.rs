//! Entity-Component-System core
//!
//! Generational entity handles, sparse-set component stores, a parent/child
//! hierarchy and the [`Coordinator`] facade tying them together.

pub mod component;
pub mod components;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod hierarchy;
pub mod registry;
pub mod storage;
pub mod system;
pub mod systems;

pub use component::{Component, ComponentSet, ComponentType};
pub use components::TransformComponent;
pub use coordinator::Coordinator;
pub use entity::{Entity, EntityAllocator, EntityIndex, Generation};
pub use error::EcsError;
pub use hierarchy::HierarchyIndex;
pub use registry::ComponentRegistry;
pub use storage::{ComponentMut, ComponentStore};
pub use system::{FrameContext, System};
pub use systems::TransformSystem;

#[cfg(test)]
mod tests;

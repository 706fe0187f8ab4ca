//! ECS Systems module

pub mod transform_system;

pub use transform_system::TransformSystem;

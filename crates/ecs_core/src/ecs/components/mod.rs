//! Engine components built on the core

pub mod transform;

pub use transform::TransformComponent;

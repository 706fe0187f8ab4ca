//! Scene persistence
//!
//! An external reader/writer over the coordinator's enumeration API.

pub mod serializer;

pub use serializer::{EntityRecord, SceneError, SceneSerializer, SceneSnapshot, SCENE_FORMAT_VERSION};

//! Transform component
//!
//! Local TRS data plus two cached values maintained by the transform system:
//! the parent as last seen in the hierarchy index, and the world matrix.

use crate::ecs::{Component, Entity};
use crate::foundation::math::{compose_trs, translation_of, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Spatial transform relative to the parent entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformComponent {
    /// Position relative to the parent
    pub local_position: Vec3,

    /// Rotation relative to the parent
    pub local_rotation: Quat,

    /// Scale relative to the parent
    pub local_scale: Vec3,

    /// Cached projection of the hierarchy parent; the hierarchy index is authoritative
    #[serde(skip, default)]
    parent: Entity,

    #[serde(skip, default = "Mat4::identity")]
    world_matrix: Mat4,
}

impl Component for TransformComponent {}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            local_position: Vec3::zeros(),
            local_rotation: Quat::identity(),
            local_scale: Vec3::new(1.0, 1.0, 1.0),
            parent: Entity::INVALID,
            world_matrix: Mat4::identity(),
        }
    }
}

impl TransformComponent {
    /// Create identity transform
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position only
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            local_position: position,
            ..Default::default()
        }
    }

    /// Create from full transform specification
    #[must_use]
    pub fn from_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            local_position: position,
            local_rotation: rotation,
            local_scale: scale,
            ..Default::default()
        }
    }

    /// Builder pattern: Set rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.local_rotation = rotation;
        self
    }

    /// Builder pattern: Set scale (uniform)
    #[must_use]
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.local_scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Local matrix (TRS order)
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        compose_trs(&self.local_position, &self.local_rotation, &self.local_scale)
    }

    /// World matrix as of the last transform system run
    #[must_use]
    pub const fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// World position as of the last transform system run
    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        translation_of(&self.world_matrix)
    }

    /// Parent as of the last transform system run
    #[must_use]
    pub const fn parent(&self) -> Entity {
        self.parent
    }

    pub(crate) fn refresh(&mut self, parent: Entity, parent_world: &Mat4) {
        self.parent = parent;
        self.world_matrix = parent_world * self.local_matrix();
    }
}

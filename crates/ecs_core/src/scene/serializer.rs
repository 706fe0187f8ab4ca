//! RON scene reader/writer
//!
//! Saves every entity carrying a [`TransformComponent`] together with its
//! parent link. Loading creates fresh entities; saved ids are only used to
//! rebuild the parent links and never survive into the live coordinator.

use crate::ecs::{Coordinator, EcsError, Entity, EntityIndex, Generation, TransformComponent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Scene format version written by this serializer
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Scene I/O errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// The coordinator rejected an operation
    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed scene text
    #[error("Scene parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization error
    #[error("Scene serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Scene written by an incompatible serializer
    #[error("Unsupported scene version {found}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
    },

    /// Two records share the same saved id
    #[error("Duplicate entity id {0} in scene")]
    DuplicateId(EntityIndex),

    /// A record names a parent that is not part of the scene
    #[error("Entity {child} references unknown parent {parent}")]
    UnknownParent {
        /// Saved id of the child
        child: EntityIndex,
        /// Saved id of the missing parent
        parent: EntityIndex,
    },
}

/// One saved entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Index of the entity when it was saved
    pub id: EntityIndex,
    /// Generation of the entity when it was saved
    pub generation: Generation,
    /// Local transform
    pub transform: TransformComponent,
    /// Saved id of the parent, if the entity had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityIndex>,
}

/// Serializable image of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Format version
    pub version: u32,
    /// Saved entities in transform store order
    pub entities: Vec<EntityRecord>,
}

/// Reads and writes scenes through the public coordinator surface
#[derive(Debug, Clone, Copy)]
pub struct SceneSerializer {
    pretty: bool,
}

impl Default for SceneSerializer {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl SceneSerializer {
    /// Serializer producing indented output
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer producing single-line output
    #[must_use]
    pub const fn compact() -> Self {
        Self { pretty: false }
    }

    /// Capture every transform-carrying entity
    ///
    /// # Errors
    ///
    /// `UnknownComponentType` if transforms were never registered,
    /// `ComponentBorrowed` when a transform is held by a running pass.
    pub fn snapshot(&self, coordinator: &Coordinator) -> Result<SceneSnapshot, SceneError> {
        let store = coordinator.registry().store::<TransformComponent>()?;
        let mut entities = Vec::with_capacity(store.len());

        for dense in 0..store.len() {
            let Some(entity) = store.entity_at(dense) else {
                continue;
            };
            let transform = coordinator.get_component::<TransformComponent>(entity)?;

            // Parents without a transform are not part of the scene
            let parent = coordinator.get_parent(entity);
            let parent = store.contains(parent).then(|| parent.index());

            entities.push(EntityRecord {
                id: entity.index(),
                generation: entity.generation(),
                transform: transform.clone(),
                parent,
            });
        }

        Ok(SceneSnapshot {
            version: SCENE_FORMAT_VERSION,
            entities,
        })
    }

    /// Recreate a snapshot as new entities; returns the saved-id to entity map.
    ///
    /// The snapshot is validated before anything is created, and entities
    /// created by a failed restore are destroyed again.
    ///
    /// # Errors
    ///
    /// `UnsupportedVersion`, `DuplicateId`, `UnknownParent`, or an
    /// [`EcsError`] such as a cyclic parent chain.
    pub fn restore(
        &self,
        coordinator: &mut Coordinator,
        snapshot: &SceneSnapshot,
    ) -> Result<HashMap<EntityIndex, Entity>, SceneError> {
        Self::validate(snapshot)?;
        if coordinator.is_iterating() {
            return Err(EcsError::IterationActive("scene restore").into());
        }

        coordinator.register_component::<TransformComponent>();
        let mut remap = HashMap::with_capacity(snapshot.entities.len());

        let result = Self::populate(coordinator, snapshot, &mut remap);
        if let Err(error) = result {
            log::warn!("Scene restore failed, rolling back {} entities: {error}", remap.len());
            for entity in remap.into_values() {
                coordinator.destroy_entity(entity);
            }
            return Err(error.into());
        }

        log::debug!("Restored scene with {} entities", remap.len());
        Ok(remap)
    }

    fn validate(snapshot: &SceneSnapshot) -> Result<(), SceneError> {
        if snapshot.version != SCENE_FORMAT_VERSION {
            return Err(SceneError::UnsupportedVersion {
                found: snapshot.version,
            });
        }

        let mut ids = std::collections::HashSet::with_capacity(snapshot.entities.len());
        for record in &snapshot.entities {
            if !ids.insert(record.id) {
                return Err(SceneError::DuplicateId(record.id));
            }
        }

        for record in &snapshot.entities {
            if let Some(parent) = record.parent {
                if !ids.contains(&parent) {
                    return Err(SceneError::UnknownParent {
                        child: record.id,
                        parent,
                    });
                }
            }
        }
        Ok(())
    }

    fn populate(
        coordinator: &mut Coordinator,
        snapshot: &SceneSnapshot,
        remap: &mut HashMap<EntityIndex, Entity>,
    ) -> Result<(), EcsError> {
        for record in &snapshot.entities {
            let entity = coordinator.create_entity();
            remap.insert(record.id, entity);
            coordinator.add_component(entity, record.transform.clone())?;
        }

        for record in &snapshot.entities {
            let Some(parent) = record.parent else {
                continue;
            };
            if let (Some(&child), Some(&parent)) = (remap.get(&record.id), remap.get(&parent)) {
                coordinator.set_parent(child, parent)?;
            }
        }
        Ok(())
    }

    /// Serialize the scene to RON text
    ///
    /// # Errors
    ///
    /// As for [`SceneSerializer::snapshot`], plus serialization failures.
    pub fn save_to_string(&self, coordinator: &Coordinator) -> Result<String, SceneError> {
        let snapshot = self.snapshot(coordinator)?;
        let text = if self.pretty {
            ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::default())?
        } else {
            ron::ser::to_string(&snapshot)?
        };
        Ok(text)
    }

    /// Parse RON text and restore it
    ///
    /// # Errors
    ///
    /// Parse failures, plus everything [`SceneSerializer::restore`] reports.
    pub fn load_from_str(
        &self,
        coordinator: &mut Coordinator,
        text: &str,
    ) -> Result<HashMap<EntityIndex, Entity>, SceneError> {
        let snapshot: SceneSnapshot = ron::from_str(text)?;
        self.restore(coordinator, &snapshot)
    }

    /// Write the scene to a RON file
    ///
    /// # Errors
    ///
    /// As for [`SceneSerializer::save_to_string`], plus I/O failures.
    pub fn save_to_file(&self, coordinator: &Coordinator, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let text = self.save_to_string(coordinator)?;
        std::fs::write(path, text)?;
        log::info!("Scene saved to: {}", path.display());
        Ok(())
    }

    /// Read a RON scene file and restore it
    ///
    /// # Errors
    ///
    /// As for [`SceneSerializer::load_from_str`], plus I/O failures.
    pub fn load_from_file(
        &self,
        coordinator: &mut Coordinator,
        path: impl AsRef<Path>,
    ) -> Result<HashMap<EntityIndex, Entity>, SceneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let remap = self.load_from_str(coordinator, &text)?;
        log::info!("Scene loaded from: {}", path.display());
        Ok(remap)
    }
}

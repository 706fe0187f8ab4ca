//! Parent/child hierarchy index
//!
//! Stores the scene forest independently of any component type. Each child has
//! exactly one parent, children keep insertion order, and every `set_parent`
//! walks the ancestors of the requested parent so a cycle can never be formed.
//! Component data that mirrors the parent (such as a transform's cached parent)
//! is a projection of this index, never its source.

use super::{EcsError, Entity};
use std::collections::{BTreeMap, HashMap};

/// Parent/child adjacency over entities
#[derive(Debug, Default)]
pub struct HierarchyIndex {
    parents: HashMap<Entity, Entity>,
    children: BTreeMap<Entity, Vec<Entity>>,
}

impl HierarchyIndex {
    /// Create an empty hierarchy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `child` under `parent`, detaching it from its current parent first.
    ///
    /// Re-parenting under the current parent is a no-op and keeps sibling order.
    ///
    /// # Errors
    ///
    /// `CycleDetected` if `parent` is `child` or one of its descendants.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), EcsError> {
        if self.is_ancestor_or_self(child, parent) {
            return Err(EcsError::CycleDetected { child, parent });
        }

        if self.parents.get(&child) == Some(&parent) {
            return Ok(());
        }

        self.detach(child);
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
        Ok(())
    }

    /// Detach `child`, promoting it to a root. No-op for roots.
    pub fn remove_parent(&mut self, child: Entity) {
        self.detach(child);
    }

    fn detach(&mut self, child: Entity) {
        let Some(parent) = self.parents.remove(&child) else {
            return;
        };

        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|&sibling| sibling != child);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Walks up from `entity`; true if `ancestor` is met, including `entity` itself
    fn is_ancestor_or_self(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = entity;
        loop {
            if current == ancestor {
                return true;
            }
            match self.parents.get(&current) {
                Some(&parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` is a strict ancestor of `entity`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        ancestor != entity && self.is_ancestor_or_self(ancestor, entity)
    }

    /// Parent of `entity`, or [`Entity::INVALID`] for roots
    #[must_use]
    pub fn get_parent(&self, entity: Entity) -> Entity {
        self.parents.get(&entity).copied().unwrap_or(Entity::INVALID)
    }

    /// Children of `entity` in insertion order
    #[must_use]
    pub fn get_children(&self, entity: Entity) -> &[Entity] {
        self.children.get(&entity).map_or(&[][..], Vec::as_slice)
    }

    /// Whether `entity` has at least one child
    #[must_use]
    pub fn has_children(&self, entity: Entity) -> bool {
        self.children.contains_key(&entity)
    }

    /// Entities that head a tree: they have children but no parent.
    ///
    /// Ordered by entity index.
    #[must_use]
    pub fn get_root_entities(&self) -> Vec<Entity> {
        self.children
            .keys()
            .copied()
            .filter(|entity| !self.parents.contains_key(entity))
            .collect()
    }

    /// Visit `root` and its descendants in pre-order
    pub fn traverse_depth_first(&self, root: Entity, mut visit: impl FnMut(Entity)) {
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            visit(entity);
            stack.extend(self.get_children(entity).iter().rev().copied());
        }
    }

    /// `root` and its descendants in pre-order
    #[must_use]
    pub fn descendants(&self, root: Entity) -> Vec<Entity> {
        let mut visited = Vec::new();
        self.traverse_depth_first(root, |entity| visited.push(entity));
        visited
    }

    /// Cleanup after `entity` was destroyed: it leaves its parent and its
    /// children become roots.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        self.detach(entity);
        if let Some(orphans) = self.children.remove(&entity) {
            for orphan in orphans {
                self.parents.remove(&orphan);
            }
        }
    }

    /// Number of parent edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.parents.len()
    }

    /// Drop every edge
    pub fn clear(&mut self) {
        self.parents.clear();
        self.children.clear();
    }
}

//! ECS error types

use super::Entity;
use thiserror::Error;

/// Errors reported by the entity/component core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Stale generation, dead slot or out-of-range index
    #[error("Invalid entity handle: {0}")]
    InvalidHandle(Entity),

    /// Read of a component the entity does not carry
    #[error("Entity {entity} has no {component} component")]
    ComponentNotFound {
        /// Entity that was queried
        entity: Entity,
        /// Requested component type
        component: &'static str,
    },

    /// Access to a component type that was never registered
    #[error("Component type {0} is not registered")]
    UnknownComponentType(&'static str),

    /// Parenting would make an entity its own ancestor
    #[error("Parenting {child} under {parent} would create a cycle")]
    CycleDetected {
        /// Entity being re-parented
        child: Entity,
        /// Requested parent
        parent: Entity,
    },

    /// Structural change attempted inside a guarded iteration
    #[error("{operation} is not allowed during guarded iteration")]
    IterationGuardViolation {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Operation that must run outside every iteration pass
    #[error("{0} cannot run while an iteration pass is active")]
    IterationActive(&'static str),

    /// Component value currently handed to an iteration callback
    #[error("The {component} of {entity} is borrowed by an active iteration")]
    ComponentBorrowed {
        /// Entity whose value is lent
        entity: Entity,
        /// Lent component type
        component: &'static str,
    },

    /// The same component type listed twice in one pass
    #[error("Component type {0} is listed more than once")]
    DuplicateComponent(&'static str),
}

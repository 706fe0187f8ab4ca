//! Component trait and type identification

use std::any::{type_name, TypeId};
use std::fmt;

/// Marker trait for components
///
/// The core never interprets component data; any `'static` type can be stored
/// once it opts in with an empty impl.
pub trait Component: 'static + Send + Sync {}

/// Runtime identifier of a component type, used as the registry key
#[derive(Debug, Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// Identifier of component type `T`
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Underlying type id
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, for diagnostics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl std::hash::Hash for ComponentType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A set of component types named together in a query
///
/// Implemented for every [`Component`] and for tuples of up to eight components.
/// The first listed type drives the scan.
pub trait ComponentSet {
    /// The member types, in the order they were listed
    fn component_types() -> Vec<ComponentType>;
}

impl<T: Component> ComponentSet for T {
    fn component_types() -> Vec<ComponentType> {
        vec![ComponentType::of::<T>()]
    }
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn component_types() -> Vec<ComponentType> {
                vec![$(ComponentType::of::<$ty>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

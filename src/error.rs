//! Recoverable errors returned by component operations.
//!
//! Programming errors (such as destroying an entity that the context does not own)
//! are not represented here; they panic instead.

use crate::comp::ComponentType;

/// An error from a component operation on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The entity already has a component of this type.
    #[error("the entity already has a component of type {0}")]
    ComponentExists(ComponentType),
    /// The entity does not have a component of this type.
    #[error("the entity does not have a component of type {0}")]
    ComponentDoesNotExist(ComponentType),
}

/// The result type for component operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

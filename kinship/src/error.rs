//! Error taxonomy of the engine.
//!
//! Every rejection is local and leaves the current graph version untouched.
//! `code()` values are stable and surface unchanged in the browser binding.

use crate::algorithms::validate::Validation;
use crate::model::{Generation, PersonId, RelationshipId};
use std::fmt;
use thiserror::Error;

/// The entity a lookup failed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    Person(PersonId),
    Relationship(RelationshipId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Person(id) => id.fmt(f),
            Entity::Relationship(id) => id.fmt(f),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditError {
    #[error("relationship rejected: {0}")]
    Validation(Validation),
    #[error("no legal slot in generation {generation}: {reason}")]
    PlacementExhausted { generation: Generation, reason: String },
    #[error("generation {generation} already holds its maximum of {max} people")]
    CapacityReached { generation: Generation, max: u32 },
    #[error("the tree already holds its maximum of {ceiling} people")]
    TreeFull { ceiling: u32 },
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("the root person cannot be deleted")]
    RootProtected,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EditError {
    pub fn code(&self) -> &'static str {
        match self {
            EditError::Validation(_) => "validation",
            EditError::PlacementExhausted { .. } => "placement_exhausted",
            EditError::CapacityReached { .. } => "capacity_reached",
            EditError::TreeFull { .. } => "tree_full",
            EditError::NotFound(_) => "not_found",
            EditError::RootProtected => "root_protected",
            EditError::InvalidInput(_) => "invalid_input",
        }
    }
}

/// The slot search found no legal position within its bounds.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("no legal slot in generation {generation}: {reason}")]
pub struct PlacementError {
    pub generation: Generation,
    pub reason: String,
}

impl From<PlacementError> for EditError {
    fn from(e: PlacementError) -> Self {
        EditError::PlacementExhausted {
            generation: e.generation,
            reason: e.reason,
        }
    }
}

/// A save hook failed. The in-memory graph stays ahead of the remote copy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not save family {family_id}: {message}")]
pub struct PersistenceError {
    pub family_id: String,
    pub message: String,
}

/// Opening a tree session failed; nothing was created.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OpenError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] PersistenceError),
    #[error(transparent)]
    Document(#[from] LoadError),
}

impl OpenError {
    pub fn code(&self) -> &'static str {
        match self {
            OpenError::Config(_) => "invalid_config",
            OpenError::Store(_) => "persistence",
            OpenError::Document(e) => e.code,
        }
    }
}

/// A family document was rejected during ingestion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct LoadError {
    pub code: &'static str,
    pub message: String,
}

impl LoadError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        LoadError {
            code,
            message: message.into(),
        }
    }
}

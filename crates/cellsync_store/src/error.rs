//! Error types for store operations.

use crate::types::EntityRef;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed entity does not exist.
    #[error("entity not found: {entity} in network {network_id}")]
    NotFound {
        /// Network that was searched.
        network_id: String,
        /// The missing entity.
        entity: EntityRef,
    },

    /// The network does not exist.
    #[error("network not found: {network_id}")]
    NetworkNotFound {
        /// The missing network.
        network_id: String,
    },

    /// An entity or network with the same identity already exists.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// Description of the duplicate.
        what: String,
    },

    /// An association names an entity that does not exist.
    #[error("dangling association from {from} to {to}")]
    DanglingAssociation {
        /// Source of the association.
        from: EntityRef,
        /// Missing target of the association.
        to: EntityRef,
    },

    /// The store could not serve the request.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates an entity not found error.
    pub fn not_found(network_id: impl Into<String>, entity: EntityRef) -> Self {
        Self::NotFound {
            network_id: network_id.into(),
            entity,
        }
    }

    /// Creates a network not found error.
    pub fn network_not_found(network_id: impl Into<String>) -> Self {
        Self::NetworkNotFound {
            network_id: network_id.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists { what: what.into() }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

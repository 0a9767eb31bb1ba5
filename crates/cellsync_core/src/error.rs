//! Error types for cellsync core.

use crate::kinds::ConfigKind;
use cellsync_store::{EntityRef, StoreError};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while projecting, planning, or submitting
/// configuration changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("entity not found: {entity}")]
    NotFound {
        /// The missing entity.
        entity: EntityRef,
    },

    /// An entity an update depends on is absent from the loaded snapshot.
    #[error("parent not found: {}", join_refs(.missing))]
    ParentNotFound {
        /// Every missing parent.
        missing: Vec<EntityRef>,
    },

    /// The network does not exist.
    #[error("network not found: {network_id}")]
    NetworkNotFound {
        /// The missing network.
        network_id: String,
    },

    /// An owner exists but carries no config of the requested kind.
    #[error("no {kind} config found for {owner}")]
    ConfigNotFound {
        /// Network or entity that was read.
        owner: String,
        /// The missing config kind.
        kind: ConfigKind,
    },

    /// The entity or network being created already exists.
    #[error("already exists: {what}")]
    AlreadyExists {
        /// Description of the duplicate.
        what: String,
    },

    /// A config payload's tag does not match the expected kind.
    #[error("config kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        /// Expected tag.
        expected: String,
        /// Tag found on the payload.
        actual: String,
    },

    /// The store failed to serve a request.
    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),

    /// A write would leave an association pointing at a missing entity.
    #[error("dangling association from {from} to {to}")]
    DanglingAssociation {
        /// Source of the association.
        from: EntityRef,
        /// Missing target.
        to: EntityRef,
    },

    /// A computed plan violates an internal invariant.
    #[error("invalid delta: {message}")]
    InvalidDelta {
        /// Description of the violation.
        message: String,
    },

    /// The desired model is not acceptable.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// A config payload could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },
}

/// Coarse classification of a [`CoreError`] for callers that map errors to
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A referenced resource is absent.
    NotFound,
    /// The caller's input was rejected.
    Invalid,
    /// The store failed; the caller decides whether to retry.
    Unavailable,
    /// A data-model bug.
    Internal,
}

impl CoreError {
    /// Creates an entity not found error.
    pub fn not_found(entity: EntityRef) -> Self {
        Self::NotFound { entity }
    }

    /// Creates a parent not found error.
    pub fn parent_not_found(missing: impl IntoIterator<Item = EntityRef>) -> Self {
        Self::ParentNotFound {
            missing: missing.into_iter().collect(),
        }
    }

    /// Creates a config not found error.
    pub fn config_not_found(owner: impl Into<String>, kind: ConfigKind) -> Self {
        Self::ConfigNotFound {
            owner: owner.into(),
            kind,
        }
    }

    /// Creates a kind mismatch error.
    pub fn kind_mismatch(expected: ConfigKind, actual: impl Into<String>) -> Self {
        Self::KindMismatch {
            expected: expected.as_str().to_string(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid delta error.
    pub fn invalid_delta(message: impl Into<String>) -> Self {
        Self::InvalidDelta {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::NotFound { .. }
            | CoreError::ParentNotFound { .. }
            | CoreError::NetworkNotFound { .. }
            | CoreError::ConfigNotFound { .. } => ErrorClass::NotFound,
            CoreError::AlreadyExists { .. }
            | CoreError::DanglingAssociation { .. }
            | CoreError::Validation { .. } => ErrorClass::Invalid,
            CoreError::StoreUnavailable(_) => ErrorClass::Unavailable,
            CoreError::KindMismatch { .. }
            | CoreError::InvalidDelta { .. }
            | CoreError::Codec { .. } => ErrorClass::Internal,
        }
    }

    /// Returns true if this error means a referenced resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    /// Returns true if this error indicates a data-model bug.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.class() == ErrorClass::Internal
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => CoreError::NotFound { entity },
            StoreError::NetworkNotFound { network_id } => CoreError::NetworkNotFound { network_id },
            StoreError::AlreadyExists { what } => CoreError::AlreadyExists { what },
            StoreError::DanglingAssociation { from, to } => {
                CoreError::DanglingAssociation { from, to }
            }
            other @ StoreError::Unavailable { .. } => CoreError::StoreUnavailable(other),
        }
    }
}

fn join_refs(refs: &[EntityRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

use thiserror::Error;

use crate::store::PublishTarget;

/// Domain error taxonomy surfaced by every core operation.
///
/// Storage failures are wrapped transparently so callers can still
/// distinguish the recoverable domain cases from infrastructure trouble.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required field is missing or malformed. Carries the field name so
    /// callers can surface a field-level reason.
    #[error("validation failed on `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// The referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// State changed since the caller's view (stale approval, PROD edit, …).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A Pending publish request already exists for this QAID + environment.
    #[error("a pending publish request already exists for {qaid} -> {target}")]
    DuplicateRequest { qaid: String, target: PublishTarget },

    /// Role or brand-assignment check failed for the acting principal.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied(reason.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

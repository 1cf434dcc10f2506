use ulid::Ulid;

use crate::model::ResourceKind;

/// Validation and store failures. Conflicts are never errors; they live in `ConflictVerdict`.
#[derive(Debug)]
pub enum EngineError {
    InvalidInterval { from: String, to: String },
    InvalidBinding(String),
    UnknownResource { kind: ResourceKind, id: Ulid },
    ReferentialMismatch(String),
    InvalidTenant(String),
    NotFound(Ulid),
    LimitExceeded(&'static str),
    Store(String),
}

impl EngineError {
    /// Stable label for the wire and for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInterval { .. } => "invalid_interval",
            EngineError::InvalidBinding(_) => "invalid_binding",
            EngineError::UnknownResource { .. } => "unknown_resource",
            EngineError::ReferentialMismatch(_) => "referential_mismatch",
            EngineError::InvalidTenant(_) => "invalid_tenant",
            EngineError::NotFound(_) => "not_found",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::Store(_) => "store_error",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInterval { from, to } => {
                write!(f, "invalid interval: {from} is not before {to}")
            }
            EngineError::InvalidBinding(msg) => write!(f, "invalid binding: {msg}"),
            EngineError::UnknownResource { kind, id } => {
                write!(f, "unknown or inactive {kind}: {id}")
            }
            EngineError::ReferentialMismatch(msg) => write!(f, "referential mismatch: {msg}"),
            EngineError::InvalidTenant(name) => write!(f, "invalid tenant name: {name:?}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Store(e.to_string())
    }
}

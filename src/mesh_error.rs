//! MeshError: Unified error type for mesh-coupling public APIs
//!
//! Every fallible operation of the single-geometric-type meshes reports one of
//! five kinds of failure. The payload is a human-readable detail naming the
//! operation and the offending value.

use thiserror::Error;

/// Unified error type for mesh-coupling operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Caller-supplied data violates a documented precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A cell or node index lies outside the valid interval.
    #[error("index out of range: {0}")]
    OutOfRange(String),
    /// A derived invariant of the stored arrays is violated.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
    /// A structural precondition of an algorithm is not met.
    #[error("invalid mesh state: {0}")]
    InvalidMeshState(String),
    /// The operation is not available for this shape or mesh kind.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Fieldless view of [`MeshError`] for callers that branch on the kind only.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    OutOfRange,
    InconsistentState,
    InvalidMeshState,
    UnsupportedOperation,
}

impl MeshError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MeshError::OutOfRange(_) => ErrorKind::OutOfRange,
            MeshError::InconsistentState(_) => ErrorKind::InconsistentState,
            MeshError::InvalidMeshState(_) => ErrorKind::InvalidMeshState,
            MeshError::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
        }
    }

    /// Detail message without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            MeshError::InvalidArgument(s)
            | MeshError::OutOfRange(s)
            | MeshError::InconsistentState(s)
            | MeshError::InvalidMeshState(s)
            | MeshError::UnsupportedOperation(s) => s,
        }
    }
}

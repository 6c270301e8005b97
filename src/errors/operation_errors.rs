use http::StatusCode;
use thiserror::Error;

use crate::ops::OperationName;

/// Failures surfaced by the operation templates, the transport and the streaming path.
///
/// Variants that originate from the backend keep the backend's HTTP status and the
/// message verbatim, so the endpoint layer can report them without re-wording.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OperationError {
    // The backend rejected an argument (IllegalArgumentException).
    #[error("Invalid parameter: {message}")]
    InvalidParameter { status: StatusCode, message: String },

    // SecurityException or AccessControlException on the backend.
    #[error("Permission denied: {message}")]
    PermissionDenied { status: StatusCode, message: String },

    #[error("File does not exist: {message}")]
    FileNotExists { status: StatusCode, message: String },

    #[error("File already exists: {message}")]
    FileAlreadyExists { status: StatusCode, message: String },

    // Any other failure reported by the backend.
    #[error("Operation failed (status={status}): {message}")]
    OperationFailed { status: StatusCode, message: String },

    // Connection refused, DNS failure, timeout or pool exhaustion.
    #[error("Backend is unreachable: {0}")]
    Unreachable(String),

    #[error("The operation [{0}] requires parameters")]
    MissingParameters(OperationName),

    #[error("The operation [{0}] requires a request body")]
    MissingBody(OperationName),

    #[error("The parameters cannot be encoded: {0}")]
    EncodingError(String),

    #[error("The operation [{0}] does not support this call")]
    UnsupportedOperation(OperationName),

    // Local validation of a path or a parameter value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("The operation [{operation}] does not accept content of type {content_type}")]
    UnsupportedContentType {
        operation: OperationName,
        content_type: String,
    },

    #[error("Cannot decode the backend response: {0}")]
    Decode(String),
}

impl OperationError {
    /// The backend status carried by backend-originated failures.
    pub fn backend_status(&self) -> Option<StatusCode> {
        use OperationError::*;
        match self {
            InvalidParameter { status, .. }
            | PermissionDenied { status, .. }
            | FileNotExists { status, .. }
            | FileAlreadyExists { status, .. }
            | OperationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The HTTP status the public endpoints answer with for this failure.
    pub fn status_code(&self) -> StatusCode {
        use OperationError::*;
        match self {
            InvalidParameter { .. }
            | InvalidArgument(_)
            | MissingParameters(_)
            | MissingBody(_)
            | UnsupportedContentType { .. } => StatusCode::BAD_REQUEST,
            PermissionDenied { .. } => StatusCode::FORBIDDEN,
            FileNotExists { .. } => StatusCode::NOT_FOUND,
            FileAlreadyExists { .. } => StatusCode::CONFLICT,
            OperationFailed { status, .. } => {
                if status.is_client_error() || status.is_server_error() {
                    *status
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            Unreachable(_) => StatusCode::BAD_GATEWAY,
            EncodingError(_) | UnsupportedOperation(_) | Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, OperationError::Unreachable(_))
    }
}

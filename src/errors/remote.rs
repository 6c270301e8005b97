use http::StatusCode;
use serde::Deserialize;

use super::OperationError;

/// The `RemoteException` object of a backend error body.
///
/// Refer: https://hadoop.apache.org/docs/r2.9.2/hadoop-project-dist/hadoop-hdfs/WebHDFS.html#RemoteException_JSON_Schema
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoteExceptionInfo {
    #[serde(rename = "exception")]
    pub exception: String,
    #[serde(rename = "message", default)]
    pub message: String,
    #[serde(rename = "javaClassName", default)]
    pub java_class_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteExceptionInfo,
}

/// A decoded backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub http_status: StatusCode,
    pub remote_exception_kind: String,
    pub message: String,
}

impl BackendError {
    /// Decodes an error-shaped body, returns `None` if the body is not one.
    pub fn from_body(http_status: StatusCode, body: &[u8]) -> Option<BackendError> {
        let res: RemoteExceptionResponse = serde_json::from_slice(body).ok()?;
        let info = res.remote_exception;
        if info.exception.is_empty() {
            return None;
        }
        Some(BackendError {
            http_status,
            remote_exception_kind: info.exception,
            message: info.message,
        })
    }
}

impl From<BackendError> for OperationError {
    fn from(err: BackendError) -> Self {
        let status = err.http_status;
        let message = err.message;
        let kind = err.remote_exception_kind.as_str();
        if kind.eq_ignore_ascii_case("IllegalArgumentException") {
            OperationError::InvalidParameter { status, message }
        } else if kind.eq_ignore_ascii_case("SecurityException")
            || kind.eq_ignore_ascii_case("AccessControlException")
        {
            OperationError::PermissionDenied { status, message }
        } else if kind.eq_ignore_ascii_case("FileNotFoundException") {
            OperationError::FileNotExists { status, message }
        } else if kind.eq_ignore_ascii_case("FileAlreadyExistsException") {
            OperationError::FileAlreadyExists { status, message }
        } else {
            OperationError::OperationFailed { status, message }
        }
    }
}

fn generic_message(status: StatusCode) -> String {
    format!(
        "The request has failed: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

/// Turns a non-successful backend status and the decoded error body (if any) into a failure.
pub fn from_backend_response(status: StatusCode, err: Option<BackendError>) -> OperationError {
    match err {
        Some(err) => err.into(),
        None => OperationError::OperationFailed {
            status,
            message: generic_message(status),
        },
    }
}

/// Checks `status` against the expected success status of an operation.
///
/// `body` is only inspected on failure; it may hold a `RemoteException` payload.
pub fn fail_for_status(
    expected: StatusCode,
    status: StatusCode,
    body: &[u8],
) -> Result<(), OperationError> {
    if status == expected {
        return Ok(());
    }
    Err(from_backend_response(
        status,
        BackendError::from_body(status, body),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_exception(kind: &str, message: &str) -> Vec<u8> {
        serde_json::json!({
            "RemoteException": {
                "exception": kind,
                "javaClassName": format!("java.io.{}", kind),
                "message": message,
            }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_success_status_passes() {
        assert!(fail_for_status(StatusCode::CREATED, StatusCode::CREATED, b"").is_ok());
        assert!(fail_for_status(StatusCode::OK, StatusCode::OK, b"garbage").is_ok());
    }

    #[test]
    fn test_file_not_found_any_case() {
        for kind in &[
            "FileNotFoundException",
            "filenotfoundexception",
            "FILENOTFOUNDEXCEPTION",
            "fileNotFoundException",
        ] {
            let body = remote_exception(kind, "File /user/svc/a does not exist.");
            let err = fail_for_status(StatusCode::OK, StatusCode::NOT_FOUND, &body).unwrap_err();
            match err {
                OperationError::FileNotExists { status, message } => {
                    assert_eq!(status, StatusCode::NOT_FOUND);
                    assert_eq!(message, "File /user/svc/a does not exist.");
                }
                err => panic!("unexpected error for {}: {:?}", kind, err),
            }
        }
    }

    #[test]
    fn test_exception_kinds() {
        let status = StatusCode::BAD_REQUEST;
        let err = fail_for_status(
            StatusCode::OK,
            status,
            &remote_exception("IllegalArgumentException", "bad"),
        )
        .unwrap_err();
        assert!(matches!(err, OperationError::InvalidParameter { .. }));

        let err = fail_for_status(
            StatusCode::OK,
            StatusCode::FORBIDDEN,
            &remote_exception("AccessControlException", "denied"),
        )
        .unwrap_err();
        assert!(matches!(err, OperationError::PermissionDenied { .. }));

        let err = fail_for_status(
            StatusCode::OK,
            StatusCode::UNAUTHORIZED,
            &remote_exception("SecurityException", "denied"),
        )
        .unwrap_err();
        assert!(matches!(err, OperationError::PermissionDenied { .. }));

        let err = fail_for_status(
            StatusCode::CREATED,
            StatusCode::FORBIDDEN,
            &remote_exception("FileAlreadyExistsException", "exists"),
        )
        .unwrap_err();
        assert!(matches!(err, OperationError::FileAlreadyExists { .. }));

        let err = fail_for_status(
            StatusCode::OK,
            StatusCode::INTERNAL_SERVER_ERROR,
            &remote_exception("IOException", "disk on fire"),
        )
        .unwrap_err();
        match err {
            OperationError::OperationFailed { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "disk on fire");
            }
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn test_non_error_body_is_generic() {
        for body in &[&b""[..], b"<html>oops</html>", b"{\"boolean\":false}"] {
            let err = fail_for_status(StatusCode::OK, StatusCode::BAD_GATEWAY, body).unwrap_err();
            match err {
                OperationError::OperationFailed { status, message } => {
                    assert_eq!(status, StatusCode::BAD_GATEWAY);
                    assert!(message.contains("502"));
                }
                err => panic!("unexpected error: {:?}", err),
            }
        }
    }
}

use http::{Method, StatusCode};

use super::OperationName;

pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
pub const CONTENT_TYPE_JSON: &str = "application/json";

const UPLOAD_CONTENT_TYPES: &[&str] = &[CONTENT_TYPE_OCTET_STREAM];

// The shape of a successful backend response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
    // No body is expected (or it is ignored).
    Empty,
    // `{"boolean": true}`
    Boolean,
    // `{"Path": "/user/.."}`
    HomeDirectory,
    // `{"FileStatus": {..}}`
    FileStatus,
    // `{"FileStatuses": {"FileStatus": [..]}}`
    Listing,
    // `{"FileChecksum": {..}}`
    Checksum,
    // `{"ContentSummary": {..}}`
    ContentSummary,
    // Raw file bytes, only consumable through a streaming transfer.
    Stream,
}

/// Static description of one backend operation.
#[derive(Clone, Debug)]
pub struct OperationDescriptor {
    pub operation: OperationName,
    pub method: Method,
    pub requires_parameters: bool,
    pub requires_body: bool,
    pub success_status: StatusCode,
    // An empty set accepts any content type.
    pub allowed_content_types: &'static [&'static str],
    pub response: ResponseShape,
}

impl OperationDescriptor {
    pub fn new(operation: OperationName) -> Self {
        use OperationName::*;

        let method = match operation {
            GetHomeDirectory | ListStatus | GetFileStatus | GetFileChecksum
            | GetContentSummary | Open => Method::GET,
            Create | Mkdirs | CreateSymlink | Rename | SetPermission | SetOwner
            | SetReplication => Method::PUT,
            Append | Concat | Truncate => Method::POST,
            Delete => Method::DELETE,
        };

        let requires_parameters = matches!(
            operation,
            Create
                | Concat
                | Truncate
                | Rename
                | SetPermission
                | SetOwner
                | SetReplication
                | CreateSymlink
        );

        let requires_body = matches!(operation, Create | Append);

        let success_status = match operation {
            Create => StatusCode::CREATED,
            _ => StatusCode::OK,
        };

        let allowed_content_types = if requires_body {
            UPLOAD_CONTENT_TYPES
        } else {
            &[]
        };

        let response = match operation {
            GetHomeDirectory => ResponseShape::HomeDirectory,
            ListStatus => ResponseShape::Listing,
            GetFileStatus => ResponseShape::FileStatus,
            GetFileChecksum => ResponseShape::Checksum,
            GetContentSummary => ResponseShape::ContentSummary,
            Open => ResponseShape::Stream,
            Mkdirs | Rename | Delete | Truncate | SetReplication => ResponseShape::Boolean,
            Create | Append | Concat | SetPermission | SetOwner | CreateSymlink => {
                ResponseShape::Empty
            }
        };

        OperationDescriptor {
            operation,
            method,
            requires_parameters,
            requires_body,
            success_status,
            allowed_content_types,
            response,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.response == ResponseShape::Stream
    }

    /// Returns true if `essence` (a mime type without parameters) may be used as request body type.
    pub fn accepts_content_type(&self, essence: &str) -> bool {
        self.allowed_content_types.is_empty()
            || self
                .allowed_content_types
                .iter()
                .any(|ct| ct.eq_ignore_ascii_case(essence))
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_descriptor_table() {
        let create = OperationDescriptor::new(OperationName::Create);
        assert_eq!(create.method, Method::PUT);
        assert_eq!(create.success_status, StatusCode::CREATED);
        assert!(create.requires_parameters);
        assert!(create.requires_body);
        assert!(create.accepts_content_type("application/octet-stream"));
        assert!(!create.accepts_content_type("text/plain"));

        let append = OperationDescriptor::new(OperationName::Append);
        assert_eq!(append.method, Method::POST);
        assert!(!append.requires_parameters);
        assert!(append.requires_body);

        let open = OperationDescriptor::new(OperationName::Open);
        assert_eq!(open.method, Method::GET);
        assert!(open.is_streaming());
        assert!(open.accepts_content_type("text/plain"));

        assert_eq!(
            OperationDescriptor::new(OperationName::Delete).method,
            Method::DELETE
        );
        assert_eq!(
            OperationDescriptor::new(OperationName::Mkdirs).response,
            ResponseShape::Boolean
        );
    }

    #[test]
    fn test_only_create_expects_created() {
        for op in OperationName::iter() {
            let desc = OperationDescriptor::new(op);
            assert_eq!(desc.operation, op);
            if op == OperationName::Create {
                assert_eq!(desc.success_status, StatusCode::CREATED);
            } else {
                assert_eq!(desc.success_status, StatusCode::OK, "{}", op);
            }
        }
    }
}

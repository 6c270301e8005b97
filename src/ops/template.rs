use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use strum::IntoEnumIterator;

use super::response::{
    BooleanResponse, ContentSummaryResponse, FileChecksumResponse, FileStatusResponse,
    ListStatusResponse, PathResponse,
};
use super::*;
use crate::backend::{BackendEndpoint, BackendSelector};
use crate::errors::{self, OperationError};
use crate::transport::{BodySource, OutboundRequest};

const PARAM_OPERATION: &str = "op";
const PARAM_USER_NAME: &str = "user.name";

/// Builds backend requests and decodes backend responses for one operation.
///
/// No I/O happens here; the caller sends the request through a transport.
pub struct OperationTemplate {
    descriptor: OperationDescriptor,
    selector: Arc<BackendSelector>,
}

impl OperationTemplate {
    pub fn new(operation: OperationName, selector: Arc<BackendSelector>) -> Self {
        OperationTemplate {
            descriptor: OperationDescriptor::new(operation),
            selector,
        }
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    pub fn operation(&self) -> OperationName {
        self.descriptor.operation
    }

    /// Builds a request toward a backend picked by the selector.
    pub fn build_request(
        &self,
        user: &str,
        path: &str,
        params: Option<RequestParameters>,
        body: Option<BodySource>,
        content_type: Option<&str>,
    ) -> Result<OutboundRequest, OperationError> {
        let endpoint = self.selector.pick().clone();
        self.build_request_for(endpoint, user, path, params, body, content_type)
    }

    /// Builds a request toward the given backend.
    pub fn build_request_for(
        &self,
        endpoint: BackendEndpoint,
        user: &str,
        path: &str,
        params: Option<RequestParameters>,
        body: Option<BodySource>,
        content_type: Option<&str>,
    ) -> Result<OutboundRequest, OperationError> {
        let desc = &self.descriptor;

        let params = params.or_else(|| RequestParameters::default_for(desc.operation));
        if params.is_none() && desc.requires_parameters {
            return Err(OperationError::MissingParameters(desc.operation));
        }
        if let Some(p) = &params {
            if p.operation() != desc.operation {
                return Err(OperationError::InvalidArgument(format!(
                    "parameters of [{}] given to [{}]",
                    p.operation(),
                    desc.operation
                )));
            }
        }

        if desc.requires_body {
            if body.is_none() {
                return Err(OperationError::MissingBody(desc.operation));
            }
        } else if body.is_some() {
            return Err(OperationError::InvalidArgument(format!(
                "the operation [{}] takes no request body",
                desc.operation
            )));
        }

        let content_type = if body.is_some() {
            let content_type = content_type.unwrap_or(CONTENT_TYPE_OCTET_STREAM);
            let mime: mime::Mime = content_type.parse().map_err(|_| {
                OperationError::UnsupportedContentType {
                    operation: desc.operation,
                    content_type: content_type.to_owned(),
                }
            })?;
            if !desc.accepts_content_type(mime.essence_str()) {
                return Err(OperationError::UnsupportedContentType {
                    operation: desc.operation,
                    content_type: content_type.to_owned(),
                });
            }
            Some(content_type.to_owned())
        } else {
            None
        };

        if user.is_empty() {
            return Err(OperationError::InvalidArgument(
                "expected a non-empty user name".to_owned(),
            ));
        }
        let path = resolve(user, path);

        let mut url = endpoint.url_for_path(&path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(PARAM_OPERATION, &desc.operation.to_string());
            query.append_pair(PARAM_USER_NAME, user);
            if let Some(p) = &params {
                for (k, v) in p.encode()? {
                    query.append_pair(k, &v);
                }
            }
        }

        Ok(OutboundRequest {
            operation: desc.operation,
            endpoint,
            method: desc.method.clone(),
            url,
            content_type,
            body,
        })
    }

    /// Checks the status and decodes the body of a fully-read backend response.
    pub fn decode_response(
        &self,
        status: StatusCode,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<DecodedResult, OperationError> {
        let desc = &self.descriptor;
        errors::fail_for_status(desc.success_status, status, body)?;

        if desc.response == ResponseShape::Stream {
            return Err(OperationError::UnsupportedOperation(desc.operation));
        }
        if desc.response == ResponseShape::Empty {
            return Ok(DecodedResult::Empty);
        }

        let is_json = content_type
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .map_or(false, |m| m.essence_str() == CONTENT_TYPE_JSON);
        if !is_json {
            return Err(OperationError::Decode(format!(
                "expected content encoded as JSON ({}), got {}",
                CONTENT_TYPE_JSON,
                content_type.unwrap_or("nothing")
            )));
        }

        let result = match desc.response {
            ResponseShape::Boolean => {
                DecodedResult::Boolean(from_json::<BooleanResponse>(body)?.boolean)
            }
            ResponseShape::HomeDirectory => {
                DecodedResult::HomeDirectory(from_json::<PathResponse>(body)?.path)
            }
            ResponseShape::FileStatus => {
                DecodedResult::FileStatus(from_json::<FileStatusResponse>(body)?.file_status)
            }
            ResponseShape::Listing => {
                DecodedResult::Listing(from_json::<ListStatusResponse>(body)?.into_statuses())
            }
            ResponseShape::Checksum => {
                DecodedResult::Checksum(from_json::<FileChecksumResponse>(body)?.into_checksum()?)
            }
            ResponseShape::ContentSummary => DecodedResult::ContentSummary(
                from_json::<ContentSummaryResponse>(body)?.content_summary,
            ),
            ResponseShape::Empty | ResponseShape::Stream => unreachable!(),
        };
        Ok(result)
    }
}

fn from_json<'a, T: serde::Deserialize<'a>>(body: &'a [u8]) -> Result<T, OperationError> {
    serde_json::from_slice(body).map_err(|e| OperationError::Decode(e.to_string()))
}

/// One template per supported operation, sharing a backend selector.
pub struct OperationTemplates {
    templates: HashMap<OperationName, OperationTemplate>,
    selector: Arc<BackendSelector>,
}

impl OperationTemplates {
    pub fn new(selector: Arc<BackendSelector>) -> Self {
        let templates = OperationName::iter()
            .map(|op| (op, OperationTemplate::new(op, selector.clone())))
            .collect();
        OperationTemplates {
            templates,
            selector,
        }
    }

    pub fn get(&self, operation: OperationName) -> &OperationTemplate {
        // Every variant is inserted by `new`.
        &self.templates[&operation]
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }
}

use std::sync::Arc;

use crate::backend::BackendSelector;
use crate::errors::OperationError;
use crate::ops::*;
use crate::transfer::StreamingTransfer;
use crate::transport::{BodySource, Transport};

// Upper bound for JSON responses of control operations.
const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024;

/// Runs filesystem operations on behalf of a backend user.
///
/// Parameters and paths are validated before any request is built; the request goes
/// through the shared transport and the response is decoded by the operation template.
pub struct ProxyService {
    templates: OperationTemplates,
    transport: Arc<dyn Transport>,
    limits: ParameterLimits,
}

impl ProxyService {
    pub fn new(
        selector: Arc<BackendSelector>,
        transport: Arc<dyn Transport>,
        limits: ParameterLimits,
    ) -> Self {
        ProxyService {
            templates: OperationTemplates::new(selector),
            transport,
            limits,
        }
    }

    /// Executes a control operation (anything but a read) and decodes its result.
    pub async fn execute(
        &self,
        operation: OperationName,
        user: &str,
        path: &str,
        params: Option<RequestParameters>,
        body: Option<BodySource>,
        content_type: Option<&str>,
    ) -> Result<DecodedResult, OperationError> {
        let template = self.templates.get(operation);
        if template.descriptor().is_streaming() {
            return Err(OperationError::UnsupportedOperation(operation));
        }

        check_file_path(path, true)?;
        if let Some(params) = &params {
            params.validate(&self.limits)?;
        }

        let req = template.build_request(user, path, params, body, content_type)?;
        let res = self.transport.execute(req).await?;
        let (status, content_type, body) = res.read_to_end(MAX_RESPONSE_SIZE).await?;
        template.decode_response(status, content_type.as_deref(), &body)
    }

    /// Opens a file for reading; the caller streams the returned transfer.
    pub async fn open(
        &self,
        user: &str,
        path: &str,
        params: Option<ReadParams>,
    ) -> Result<StreamingTransfer, OperationError> {
        check_file_path(path, false)?;
        let params = params.map(RequestParameters::Read);
        if let Some(params) = &params {
            params.validate(&self.limits)?;
        }

        let template = self.templates.get(OperationName::Open);
        let req = template.build_request(user, path, params, None, None)?;
        let res = self.transport.execute(req).await?;
        StreamingTransfer::open(res, template.descriptor()).await
    }

    pub async fn home_directory(&self, user: &str) -> Result<String, OperationError> {
        match self
            .execute(OperationName::GetHomeDirectory, user, "", None, None, None)
            .await?
        {
            DecodedResult::HomeDirectory(path) => Ok(path),
            res => Err(OperationError::Decode(format!(
                "unexpected result for {}: {:?}",
                OperationName::GetHomeDirectory,
                res
            ))),
        }
    }
}

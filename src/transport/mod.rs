use std::fmt;
use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use http::{Method, StatusCode};
use url::Url;

use crate::backend::BackendEndpoint;
use crate::errors::OperationError;
use crate::ops::OperationName;

#[cfg(test)]
pub mod fake;
mod http_transport;

pub use http_transport::*;

pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync + 'static>>;

/// Body of an outbound request: an in-memory buffer or a live stream forwarded as-is.
pub enum BodySource {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl fmt::Debug for BodySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            BodySource::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for BodySource {
    fn from(b: Bytes) -> Self {
        BodySource::Bytes(b)
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(b: Vec<u8>) -> Self {
        BodySource::Bytes(Bytes::from(b))
    }
}

/// A fully-shaped backend request, ready to be sent.
#[derive(Debug)]
pub struct OutboundRequest {
    pub operation: OperationName,
    pub endpoint: BackendEndpoint,
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Option<BodySource>,
}

impl OutboundRequest {
    /// Value of a query parameter, if present.
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// The entity of a backend response, consumed chunk by chunk.
#[async_trait]
pub trait ResponseBody: Send {
    /// Next chunk, `None` at the end of the entity.
    async fn chunk(&mut self) -> io::Result<Option<Bytes>>;

    /// Releases the underlying connection. Further calls have no effect.
    fn close(&mut self);
}

pub struct BackendResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Box<dyn ResponseBody>,
}

impl fmt::Debug for BackendResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl BackendResponse {
    /// Reads the whole entity, up to `limit` bytes, then closes the body.
    pub async fn read_to_end(
        mut self,
        limit: usize,
    ) -> Result<(StatusCode, Option<String>, Bytes), OperationError> {
        let mut buf = BytesMut::new();
        let res = loop {
            match self.body.chunk().await {
                Ok(Some(chunk)) => {
                    if buf.len() + chunk.len() > limit {
                        break Err(OperationError::Decode(format!(
                            "the response exceeds {} bytes",
                            limit
                        )));
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(OperationError::Unreachable(err.to_string())),
            }
        };
        self.body.close();
        res?;
        Ok((self.status, self.content_type, buf.freeze()))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: OutboundRequest) -> Result<BackendResponse, OperationError>;
}

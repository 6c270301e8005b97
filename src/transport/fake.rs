use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};

use super::*;

/// A canned backend response.
pub struct FakeResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub chunks: Vec<Bytes>,
    // Fail with an I/O error after this many chunks.
    pub fail_after: Option<usize>,
    // Never produce more than this many chunks.
    pub stall_after: Option<usize>,
}

impl FakeResponse {
    pub fn json(status: StatusCode, body: serde_json::Value) -> Self {
        FakeResponse {
            status,
            content_type: Some("application/json".to_owned()),
            chunks: vec![Bytes::from(body.to_string())],
            fail_after: None,
            stall_after: None,
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        FakeResponse {
            status,
            content_type: None,
            chunks: vec![],
            fail_after: None,
            stall_after: None,
        }
    }

    pub fn bytes(status: StatusCode, chunks: Vec<Bytes>) -> Self {
        FakeResponse {
            status,
            content_type: Some("application/octet-stream".to_owned()),
            chunks,
            fail_after: None,
            stall_after: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub operation: OperationName,
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
    pub has_body: bool,
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<FakeResponse, OperationError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    closed: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, res: FakeResponse) {
        self.responses.lock().unwrap().push_back(Ok(res));
    }

    pub fn push_err(&self, err: OperationError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of response bodies closed so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, req: OutboundRequest) -> Result<BackendResponse, OperationError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            operation: req.operation,
            method: req.method.clone(),
            url: req.url.clone(),
            content_type: req.content_type.clone(),
            has_body: req.body.is_some(),
        });
        let res = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OperationError::Unreachable("no response queued".to_owned())))?;
        Ok(BackendResponse {
            status: res.status,
            content_type: res.content_type,
            body: Box::new(FakeBody {
                stall_after: res.stall_after,
                ..FakeBody::new(res.chunks, res.fail_after, self.closed.clone())
            }),
        })
    }
}

pub struct FakeBody {
    chunks: VecDeque<Bytes>,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
    served: usize,
    closed: Arc<AtomicUsize>,
    is_closed: bool,
}

impl FakeBody {
    pub fn new(chunks: Vec<Bytes>, fail_after: Option<usize>, closed: Arc<AtomicUsize>) -> Self {
        FakeBody {
            chunks: chunks.into(),
            fail_after,
            stall_after: None,
            served: 0,
            closed,
            is_closed: false,
        }
    }
}

#[async_trait]
impl ResponseBody for FakeBody {
    async fn chunk(&mut self) -> io::Result<Option<Bytes>> {
        assert!(!self.is_closed, "read after close");
        if self.fail_after == Some(self.served) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
        }
        if self.stall_after == Some(self.served) {
            futures_util::future::pending::<()>().await;
        }
        self.served += 1;
        Ok(self.chunks.pop_front())
    }

    fn close(&mut self) {
        // Count every call so double closes are visible to tests.
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.is_closed = true;
    }
}

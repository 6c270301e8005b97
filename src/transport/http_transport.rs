use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::StreamExt;
use http::header;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, timeout, timeout_at, Instant};

use super::*;
use crate::errors::AsError;

#[derive(Clone, Debug)]
pub struct HttpTransportOptions {
    pub connect_timeout: Duration,
    // Total deadline of control operations. Streamed uploads are bounded by inactivity
    // instead: no chunk nor response head within this duration.
    pub request_timeout: Duration,
    // Total deadline of streaming reads.
    pub download_deadline: Duration,
    pub max_connections: usize,
    pub max_connections_per_backend: usize,
}

impl Default for HttpTransportOptions {
    fn default() -> Self {
        HttpTransportOptions {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            download_deadline: Duration::from_secs(28),
            max_connections: 100,
            max_connections_per_backend: 40,
        }
    }
}

/// Shared HTTP transport toward the backends.
///
/// Requests are stateless (no cookie store). The number of in-flight requests is bounded
/// globally and per backend; waiting for a slot counts against the request deadline.
pub struct HttpTransport {
    client: reqwest::Client,
    opts: HttpTransportOptions,
    connections: Arc<Semaphore>,
    backend_connections: DashMap<String, Arc<Semaphore>>,
}

impl HttpTransport {
    pub fn new(opts: HttpTransportOptions) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(opts.connect_timeout)
            .pool_max_idle_per_host(opts.max_connections_per_backend)
            .build()?;
        Ok(HttpTransport {
            client,
            connections: Arc::new(Semaphore::new(opts.max_connections)),
            backend_connections: DashMap::new(),
            opts,
        })
    }

    fn deadline_for(&self, req: &OutboundRequest) -> Duration {
        if req.operation == OperationName::Open {
            self.opts.download_deadline
        } else {
            self.opts.request_timeout
        }
    }

    fn backend_semaphore(&self, endpoint: &BackendEndpoint) -> Arc<Semaphore> {
        self.backend_connections
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.opts.max_connections_per_backend)))
            .clone()
    }

    async fn acquire(
        &self,
        sem: Arc<Semaphore>,
        deadline: Instant,
        endpoint: &BackendEndpoint,
    ) -> Result<OwnedSemaphorePermit, OperationError> {
        match timeout_at(deadline, sem.acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(OperationError::Unreachable(format!(
                "connection pool for {} is closed",
                endpoint
            ))),
            Err(_) => Err(OperationError::Unreachable(format!(
                "timed out waiting for a connection to {}",
                endpoint
            ))),
        }
    }
}

// Resolves once `idle` elapses without a new upload chunk. After the last chunk the
// same bound applies to the wait for the response head.
async fn upload_stalled(mut progress: watch::Receiver<()>, idle: Duration) {
    loop {
        match timeout(idle, progress.changed()).await {
            Ok(Ok(())) => continue,
            Ok(Err(_)) => break,
            Err(_) => return,
        }
    }
    sleep(idle).await
}

fn transport_error(err: reqwest::Error) -> OperationError {
    match err.as_error::<io::Error>() {
        Some(io_err) => OperationError::Unreachable(format!("{}: {}", err, io_err)),
        None => OperationError::Unreachable(err.to_string()),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, req: OutboundRequest) -> Result<BackendResponse, OperationError> {
        let deadline = Instant::now() + self.deadline_for(&req);

        let global_permit = self
            .acquire(self.connections.clone(), deadline, &req.endpoint)
            .await?;
        let backend_permit = self
            .acquire(self.backend_semaphore(&req.endpoint), deadline, &req.endpoint)
            .await?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(OperationError::Unreachable(format!(
                "timed out waiting for a connection to {}",
                req.endpoint
            )));
        }

        let mut builder = self.client.request(req.method.clone(), req.url.clone());
        if let Some(content_type) = &req.content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type.as_str());
        }
        let mut progress = None;
        builder = match req.body {
            Some(BodySource::Stream(s)) => {
                let (tx, rx) = watch::channel(());
                progress = Some(rx);
                let s = s.inspect(move |_| {
                    let _ = tx.send(());
                });
                builder.body(reqwest::Body::wrap_stream(s))
            }
            Some(BodySource::Bytes(b)) => builder.body(b).timeout(remaining),
            None => builder.timeout(remaining),
        };

        log::debug!("{} {} {}", req.operation, req.method, req.url);
        let response = match progress {
            Some(progress) => {
                let idle = self.opts.request_timeout;
                tokio::select! {
                    res = builder.send() => res.map_err(transport_error)?,
                    _ = upload_stalled(progress, idle) => {
                        return Err(OperationError::Unreachable(format!(
                            "no progress for {:?} while uploading to {}",
                            idle, req.url
                        )))
                    }
                }
            }
            None => builder.send().await.map_err(transport_error)?,
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_owned());

        Ok(BackendResponse {
            status,
            content_type,
            body: Box::new(HttpResponseBody {
                response: Some(response),
                permits: Some((global_permit, backend_permit)),
            }),
        })
    }
}

struct HttpResponseBody {
    response: Option<reqwest::Response>,
    // Released together with the connection.
    permits: Option<(OwnedSemaphorePermit, OwnedSemaphorePermit)>,
}

#[async_trait]
impl ResponseBody for HttpResponseBody {
    async fn chunk(&mut self) -> io::Result<Option<Bytes>> {
        let response = match self.response.as_mut() {
            Some(response) => response,
            None => return Ok(None),
        };
        response
            .chunk()
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn close(&mut self) {
        self.response.take();
        self.permits.take();
    }
}

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio_util::io::ReaderStream;

use crate::errors::{self, BackendError, OperationError};
use crate::ops::OperationDescriptor;
use crate::transport::{BackendResponse, ResponseBody};

// Error bodies are small JSON documents; anything larger is cut.
const MAX_ERROR_BODY_SIZE: usize = 64 * 1024;
const DOWNLOAD_BUFFER_SIZE: usize = 64 * 1024;

/// Copies a backend entity to a client-facing sink without buffering it whole.
///
/// The backend body is closed exactly once: after the copy, on a copy error,
/// or when the transfer is dropped (e.g. the caller's deadline elapsed).
pub struct StreamingTransfer {
    content_type: Option<String>,
    body: Option<Box<dyn ResponseBody>>,
    copied: u64,
}

impl StreamingTransfer {
    /// Validates the status of an opened backend response.
    ///
    /// On a non-success status the error body is read, the response closed and the
    /// mapped failure returned; nothing has been written to any sink at that point.
    pub async fn open(
        response: BackendResponse,
        descriptor: &OperationDescriptor,
    ) -> Result<Self, OperationError> {
        if response.status != descriptor.success_status {
            let status = response.status;
            let body = match response.read_to_end(MAX_ERROR_BODY_SIZE).await {
                Ok((_, _, body)) => body,
                Err(err) => {
                    log::warn!("Cannot read the error body of {}: {}", descriptor.operation, err);
                    Bytes::new()
                }
            };
            return Err(errors::from_backend_response(
                status,
                BackendError::from_body(status, &body),
            ));
        }
        Ok(StreamingTransfer {
            content_type: response.content_type,
            body: Some(response.body),
            copied: 0,
        })
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Bytes copied so far.
    pub fn bytes_copied(&self) -> u64 {
        self.copied
    }

    /// Streams the entity into `sink`, returning the number of bytes copied.
    pub async fn copy_to<W>(&mut self, sink: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let body = match self.body.as_mut() {
            Some(body) => body,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "the transfer has already been consumed",
                ))
            }
        };

        let res = copy_chunks(&mut **body, sink, &mut self.copied).await;

        self.release();
        res.map(|_| self.copied)
    }

    fn release(&mut self) {
        if let Some(mut body) = self.body.take() {
            body.close();
        }
    }
}

async fn copy_chunks<W>(
    body: &mut dyn ResponseBody,
    sink: &mut W,
    copied: &mut u64,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    while let Some(chunk) = body.chunk().await? {
        sink.write_all(&chunk).await?;
        *copied += chunk.len() as u64;
    }
    sink.flush().await
}

impl Drop for StreamingTransfer {
    fn drop(&mut self) {
        self.release();
    }
}

/// Copies the transfer into an in-memory pipe on a background task, bounded by `deadline`.
///
/// The returned stream ends early (with an error) if the deadline elapses or the copy
/// fails; dropping the stream stops the copy and closes the backend response.
pub fn spawn_download(
    mut transfer: StreamingTransfer,
    deadline: Duration,
) -> ReaderStream<DuplexStream> {
    let (mut writer, reader) = tokio::io::duplex(DOWNLOAD_BUFFER_SIZE);
    tokio::spawn(async move {
        let res = tokio::time::timeout(deadline, transfer.copy_to(&mut writer)).await;
        match res {
            Ok(Ok(n)) => log::debug!("Streamed {} bytes", n),
            Ok(Err(err)) => log::warn!(
                "Download aborted after {} bytes: {}",
                transfer.bytes_copied(),
                err
            ),
            Err(_) => log::warn!(
                "Download exceeded the deadline of {:?} after {} bytes",
                deadline,
                transfer.bytes_copied()
            ),
        }
    });
    ReaderStream::with_capacity(reader, DOWNLOAD_BUFFER_SIZE)
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures_util::StreamExt;
    use http::StatusCode;

    use super::*;
    use crate::ops::{OperationDescriptor, OperationName};
    use crate::transport::fake::{FakeResponse, FakeTransport};
    use crate::transport::{OutboundRequest, Transport};

    async fn open_fake(transport: &FakeTransport) -> Result<StreamingTransfer, OperationError> {
        let ep = crate::backend::BackendEndpoint::parse("http://gw:14000").unwrap();
        let req = OutboundRequest {
            operation: OperationName::Open,
            url: ep.url_for_path("/f"),
            endpoint: ep,
            method: http::Method::GET,
            content_type: None,
            body: None,
        };
        let res = transport.execute(req).await?;
        StreamingTransfer::open(res, &OperationDescriptor::new(OperationName::Open)).await
    }

    fn chunks(k: usize, size: usize) -> Vec<Bytes> {
        (0..k).map(|i| Bytes::from(vec![i as u8; size])).collect()
    }

    // A sink failing once `limit` bytes have been accepted.
    struct FailingSink {
        written: usize,
        limit: usize,
    }

    impl AsyncWrite for FailingSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.written >= self.limit {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")));
            }
            self.written += buf.len();
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_copy_exact_bytes() {
        let transport = FakeTransport::new();
        transport.push(FakeResponse::bytes(StatusCode::OK, chunks(10, 1000)));

        let mut transfer = open_fake(&transport).await.unwrap();
        let mut sink = Vec::new();
        let n = transfer.copy_to(&mut sink).await.unwrap();
        assert_eq!(n, 10_000);
        assert_eq!(sink.len(), 10_000);
        assert_eq!(transfer.bytes_copied(), 10_000);
        assert_eq!(transport.closed(), 1);

        drop(transfer);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_sink_error_closes_once() {
        let transport = FakeTransport::new();
        transport.push(FakeResponse::bytes(StatusCode::OK, chunks(10, 100)));

        let mut transfer = open_fake(&transport).await.unwrap();
        let mut sink = FailingSink {
            written: 0,
            limit: 300,
        };
        let err = transfer.copy_to(&mut sink).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(transfer.bytes_copied(), 300);
        assert_eq!(transport.closed(), 1);

        // A consumed transfer cannot be copied again.
        assert!(transfer.copy_to(&mut Vec::<u8>::new()).await.is_err());
        drop(transfer);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_backend_read_error_closes_once() {
        let transport = FakeTransport::new();
        let mut res = FakeResponse::bytes(StatusCode::OK, chunks(4, 10));
        res.fail_after = Some(2);
        transport.push(res);

        let mut transfer = open_fake(&transport).await.unwrap();
        let mut sink = Vec::new();
        let err = transfer.copy_to(&mut sink).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(sink.len(), 20);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_failed_status_is_mapped_and_closed() {
        let transport = FakeTransport::new();
        transport.push(FakeResponse::json(
            StatusCode::NOT_FOUND,
            serde_json::json!({"RemoteException": {
                "exception": "FileNotFoundException",
                "message": "File does not exist: /f",
            }}),
        ));

        let err = open_fake(&transport).await.err().unwrap();
        assert!(matches!(err, OperationError::FileNotExists { .. }));
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transfer_is_closed() {
        let transport = FakeTransport::new();
        transport.push(FakeResponse::bytes(StatusCode::OK, chunks(2, 10)));

        let transfer = open_fake(&transport).await.unwrap();
        assert_eq!(transport.closed(), 0);
        drop(transfer);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_spawn_download() {
        let transport = FakeTransport::new();
        transport.push(FakeResponse::bytes(StatusCode::OK, chunks(5, 1024)));

        let transfer = open_fake(&transport).await.unwrap();
        let mut stream = spawn_download(transfer, Duration::from_secs(5));
        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 5 * 1024);
        assert_eq!(transport.closed(), 1);
    }

    #[tokio::test]
    async fn test_spawn_download_deadline_closes_backend() {
        let transport = FakeTransport::new();
        let mut res = FakeResponse::bytes(StatusCode::OK, chunks(10, 1024));
        res.stall_after = Some(3);
        transport.push(res);

        let transfer = open_fake(&transport).await.unwrap();
        let mut stream = spawn_download(transfer, Duration::from_millis(200));
        let mut total = 0;
        let read_all = async {
            while let Some(Ok(chunk)) = stream.next().await {
                total += chunk.len();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), read_all)
            .await
            .expect("the stream should end once the deadline elapses");
        assert_eq!(total, 3 * 1024);
        assert_eq!(transport.closed(), 1);
    }
}

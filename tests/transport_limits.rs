use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use tokio_stream::wrappers::ReceiverStream;
use webhdfs_proxy::backend::{BackendEndpoint, BackendSelector};
use webhdfs_proxy::errors::OperationError;
use webhdfs_proxy::ops::{OperationName, OperationTemplate, RequestParameters};
use webhdfs_proxy::transport::{BodySource, HttpTransport, HttpTransportOptions, Transport};

mod common;

fn transport(request_timeout: Duration, max_connections: usize) -> HttpTransport {
    HttpTransport::new(HttpTransportOptions {
        connect_timeout: Duration::from_secs(1),
        request_timeout,
        max_connections,
        ..Default::default()
    })
    .unwrap()
}

fn template(backend: std::net::SocketAddr, operation: OperationName) -> OperationTemplate {
    let endpoints = vec![BackendEndpoint::parse(&format!("http://{}", backend)).unwrap()];
    OperationTemplate::new(operation, Arc::new(BackendSelector::new(endpoints).unwrap()))
}

// A body sending `chunks` chunks of 1KiB, `gap` apart.
fn paced_body(chunks: usize, gap: Duration) -> BodySource {
    let (tx, rx) = tokio::sync::mpsc::channel::<io::Result<Bytes>>(1);
    actix_rt::spawn(async move {
        for i in 0..chunks {
            actix_rt::time::sleep(gap).await;
            if tx.send(Ok(Bytes::from(vec![i as u8; 1024]))).await.is_err() {
                return;
            }
        }
    });
    BodySource::Stream(Box::pin(ReceiverStream::new(rx)))
}

fn create_params() -> Option<RequestParameters> {
    Some(RequestParameters::decode::<&str, &str>(OperationName::Create, &[]).unwrap())
}

#[actix_rt::test]
async fn test_slow_upload_is_not_cut() {
    let store = common::new_store();
    let backend = common::start_backend(store.clone());
    let transport = transport(Duration::from_secs(1), 10);

    // Takes about 3s in total but never idles for more than 300ms.
    let req = template(backend, OperationName::Create)
        .build_request(
            "svc",
            "/tmp/slow.bin",
            create_params(),
            Some(paced_body(10, Duration::from_millis(300))),
            Some("application/octet-stream"),
        )
        .unwrap();
    let res = transport.execute(req).await.unwrap();
    assert_eq!(res.status, StatusCode::CREATED);
    drop(res);

    let files = store.lock().unwrap();
    assert_eq!(files["/tmp/slow.bin"].len(), 10 * 1024);
}

#[actix_rt::test]
async fn test_stalled_upload_times_out() {
    let backend = common::start_backend(common::new_store());
    let transport = transport(Duration::from_millis(500), 10);

    let req = template(backend, OperationName::Create)
        .build_request(
            "svc",
            "/tmp/stalled.bin",
            create_params(),
            Some(paced_body(2, Duration::from_secs(3))),
            Some("application/octet-stream"),
        )
        .unwrap();
    let err = transport.execute(req).await.unwrap_err();
    assert!(matches!(err, OperationError::Unreachable(_)), "{:?}", err);
}

#[actix_rt::test]
async fn test_exhausted_pool_times_out() {
    let backend = common::start_backend(common::new_store());
    let transport = transport(Duration::from_millis(500), 1);
    let status = template(backend, OperationName::GetFileStatus);
    let request = || status.build_request("svc", "/x", None, None, None).unwrap();

    // The only connection stays taken while the response is held.
    let held = transport.execute(request()).await.unwrap();
    let err = transport.execute(request()).await.unwrap_err();
    assert!(matches!(err, OperationError::Unreachable(_)), "{:?}", err);

    drop(held);
    let res = transport.execute(request()).await.unwrap();
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

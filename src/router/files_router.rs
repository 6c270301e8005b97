use std::io;

use actix_web::dev::Decompress;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use super::*;
use crate::auth::Principal;
use crate::errors::OperationError;
use crate::ops::{OperationName, RequestParameters, CONTENT_TYPE_OCTET_STREAM};
use crate::transfer;
use crate::transport::BodySource;

pub const FILES_PATH_PREFIX: &str = "/files";

const QUERY_PATH: &str = "path";
// Chunks buffered between the client payload and the backend upload.
const UPLOAD_CHANNEL_CAPACITY: usize = 16;

type QueryPairs = Vec<(String, String)>;

/// Registers the filesystem routes under `/files`.
pub fn configure_files_router(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(FILES_PATH_PREFIX)
            .route("", web::delete().to(delete))
            .route("/home", web::get().to(home))
            .route("/list", web::get().to(list))
            .route("/status", web::get().to(status))
            .route("/checksum", web::get().to(checksum))
            .route("/summary", web::get().to(summary))
            .route("/content", web::get().to(download))
            .route("/content", web::put().to(create))
            .route("/content", web::post().to(append))
            .route("/concat", web::post().to(concat))
            .route("/truncate", web::post().to(truncate))
            .route("/rename", web::post().to(rename))
            .route("/directory", web::put().to(mkdirs))
            .route("/permission", web::put().to(set_permission))
            .route("/owner", web::put().to(set_owner))
            .route("/replication", web::put().to(set_replication))
            .route("/symlink", web::put().to(create_symlink)),
    );
}

async fn home(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    let principal = match authenticate(&req, &state) {
        Ok(principal) => principal,
        Err(res) => return res,
    };
    match state
        .service
        .home_directory(&principal.backend_username)
        .await
    {
        Ok(path) => ApiResponse::success_json(&path),
        Err(err) => ApiResponse::operation_error(&err),
    }
}

async fn list(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::ListStatus, req, state, None).await
}

async fn status(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::GetFileStatus, req, state, None).await
}

async fn checksum(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::GetFileChecksum, req, state, None).await
}

async fn summary(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::GetContentSummary, req, state, None).await
}

async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> ApiResponse {
    control(OperationName::Create, req, state, Some(payload)).await
}

async fn append(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Payload,
) -> ApiResponse {
    control(OperationName::Append, req, state, Some(payload)).await
}

async fn concat(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::Concat, req, state, None).await
}

async fn truncate(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::Truncate, req, state, None).await
}

async fn delete(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::Delete, req, state, None).await
}

async fn rename(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::Rename, req, state, None).await
}

async fn mkdirs(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::Mkdirs, req, state, None).await
}

async fn set_permission(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::SetPermission, req, state, None).await
}

async fn set_owner(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::SetOwner, req, state, None).await
}

async fn set_replication(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::SetReplication, req, state, None).await
}

async fn create_symlink(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    control(OperationName::CreateSymlink, req, state, None).await
}

async fn download(req: HttpRequest, state: web::Data<AppState>) -> ApiResponse {
    let principal = match authenticate(&req, &state) {
        Ok(principal) => principal,
        Err(res) => return res,
    };
    let res = async {
        let (path, pairs) = parse_query(&req)?;
        let params = match RequestParameters::decode(OperationName::Open, &pairs)? {
            RequestParameters::Read(params) => params,
            params => {
                return Err(OperationError::InvalidArgument(format!(
                    "unexpected parameters: {:?}",
                    params
                )))
            }
        };
        state
            .service
            .open(&principal.backend_username, &path, Some(params))
            .await
    }
    .await;

    match res {
        Ok(transfer) => {
            let content_type = transfer
                .content_type()
                .unwrap_or(CONTENT_TYPE_OCTET_STREAM)
                .to_owned();
            let stream = transfer::spawn_download(transfer, state.download_deadline);
            ApiResponse::streaming(&content_type, stream)
        }
        Err(err) => ApiResponse::operation_error(&err),
    }
}

// Runs a control operation with the parameters found in the query string.
async fn control(
    operation: OperationName,
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Option<web::Payload>,
) -> ApiResponse {
    let principal = match authenticate(&req, &state) {
        Ok(principal) => principal,
        Err(res) => return res,
    };
    let (path, pairs) = match parse_query(&req) {
        Ok(query) => query,
        Err(err) => return ApiResponse::operation_error(&err),
    };

    let params = if takes_parameters(operation) {
        match RequestParameters::decode(operation, &pairs) {
            Ok(params) => Some(params),
            Err(err) => return ApiResponse::operation_error(&err),
        }
    } else {
        None
    };
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let body = payload.map(|payload| upload_body(payload, &req));

    match state
        .service
        .execute(
            operation,
            &principal.backend_username,
            &path,
            params,
            body,
            content_type,
        )
        .await
    {
        Ok(result) => ApiResponse::success_json(&result),
        Err(err) => ApiResponse::operation_error(&err),
    }
}

fn authenticate(req: &HttpRequest, state: &AppState) -> Result<Principal, ApiResponse> {
    state.auth.authenticate(req).map_err(|err| {
        log::debug!("Rejecting {} {}: {}", req.method(), req.path(), err);
        ApiResponse::unauthorized(&err)
    })
}

fn takes_parameters(operation: OperationName) -> bool {
    !matches!(
        operation,
        OperationName::GetHomeDirectory
            | OperationName::ListStatus
            | OperationName::GetFileStatus
            | OperationName::GetFileChecksum
            | OperationName::GetContentSummary
    )
}

// Splits the query string into the target path and the operation parameters.
fn parse_query(req: &HttpRequest) -> Result<(String, QueryPairs), OperationError> {
    let pairs = web::Query::<QueryPairs>::from_query(req.query_string())
        .map_err(|err| OperationError::InvalidArgument(err.to_string()))?
        .into_inner();
    let path = pairs
        .iter()
        .find(|(k, _)| k == QUERY_PATH)
        .map(|(_, v)| v.clone())
        .unwrap_or_default();
    Ok((path, pairs))
}

// Forwards the client payload to the backend as it arrives, decoded according to its
// `Content-Encoding`.
//
// The payload is bound to the worker thread, so it is pumped by a local task into a
// channel whose receiving end can be handed to the transport.
fn upload_body(payload: web::Payload, req: &HttpRequest) -> BodySource {
    let mut payload = Box::pin(Decompress::from_headers(payload, req.headers()));
    let (tx, rx) = tokio::sync::mpsc::channel::<io::Result<Bytes>>(UPLOAD_CHANNEL_CAPACITY);
    actix_web::rt::spawn(async move {
        while let Some(chunk) = payload.next().await {
            let chunk = chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()));
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });
    BodySource::Stream(Box::pin(ReceiverStream::new(rx)))
}

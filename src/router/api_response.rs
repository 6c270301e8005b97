use actix_web::body::{BoxBody, MessageBody};
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder};
use serde::Serialize;

use crate::auth::AuthError;
use crate::errors::OperationError;

const SERVER_NAME: &str = "webhdfs-proxy";

#[derive(Serialize)]
enum EnvelopeStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
}

// The public result envelope.
#[derive(Serialize)]
struct Envelope<'a, T: ?Sized + Serialize> {
    status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub struct ApiResponse {
    res: HttpResponse,
}

impl ApiResponse {
    pub fn new<B>(status: StatusCode, body: B, mime: Option<mime::Mime>) -> Self
    where
        B: MessageBody + 'static,
    {
        let mut res = HttpResponse::with_body(status, body).map_into_boxed_body();
        let headers = res.headers_mut();
        if let Some(mime) = mime {
            if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
        }
        let mut res = ApiResponse { res };
        res.set_common_headers();
        res
    }

    pub fn set_common_headers(&mut self) {
        let headers = self.res.headers_mut();
        headers.insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    pub fn success_json<T>(data: &T) -> Self
    where
        T: ?Sized + Serialize,
    {
        Self::json(
            StatusCode::OK,
            &Envelope {
                status: EnvelopeStatus::Success,
                result: Some(data),
                error: None,
            },
        )
    }

    pub fn error(status: StatusCode, message: String) -> Self {
        Self::json(
            status,
            &Envelope::<()> {
                status: EnvelopeStatus::Failure,
                result: None,
                error: Some(message),
            },
        )
    }

    pub fn operation_error(err: &OperationError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            log::error!("Operation failed: {}", err);
        } else {
            log::debug!("Operation rejected: {}", err);
        }
        Self::error(status, err.to_string())
    }

    pub fn unauthorized(err: &AuthError) -> Self {
        let mut res = Self::error(StatusCode::UNAUTHORIZED, err.to_string());
        res.res.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"webhdfs-proxy\""),
        );
        res
    }

    /// A download response whose body is produced by `stream`.
    pub fn streaming<S>(content_type: &str, stream: S) -> Self
    where
        S: futures_core::Stream<Item = std::io::Result<bytes::Bytes>> + 'static,
    {
        let mut res = HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, content_type))
            .streaming(stream);
        res.headers_mut()
            .insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
        ApiResponse { res }
    }

    pub fn status(&self) -> StatusCode {
        self.res.status()
    }

    pub fn into_response(self) -> HttpResponse {
        self.res
    }

    fn json<T: Serialize>(status: StatusCode, envelope: &T) -> Self {
        match serde_json::to_string(envelope) {
            Ok(body) => Self::new(status, body, Some(mime::APPLICATION_JSON)),
            Err(err) => {
                log::error!("Unable to serialize the response: {}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    r#"{"status":"FAILURE","error":"unable to serialize the response"}"#,
                    Some(mime::APPLICATION_JSON),
                )
            }
        }
    }
}

impl Responder for ApiResponse {
    type Body = BoxBody;

    #[inline]
    fn respond_to(self, _: &HttpRequest) -> HttpResponse {
        self.res
    }
}

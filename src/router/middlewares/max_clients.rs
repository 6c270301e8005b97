use std::future::{ready, Ready};
use std::sync::Arc;
use std::time::Duration;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::Error;
use actix_web::http::StatusCode;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::router::ApiResponse;

/// Bounds the number of public requests handled at once.
///
/// A request that cannot get a slot within `request_deadline` is answered with 503.
#[derive(Clone)]
pub struct MaxClients {
    requests_max_semaphore: Option<Arc<Semaphore>>,
    request_deadline: Duration,
}

impl MaxClients {
    pub fn new(requests_max: usize, request_deadline: Duration) -> Self {
        let semaphore = if requests_max > 0 {
            Some(Arc::new(Semaphore::new(requests_max)))
        } else {
            None
        };
        MaxClients {
            requests_max_semaphore: semaphore,
            request_deadline,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MaxClients
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = MaxClientsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MaxClientsMiddleware {
            service,
            requests_max_semaphore: self.requests_max_semaphore.clone(),
            request_deadline: self.request_deadline,
        }))
    }
}

pub struct MaxClientsMiddleware<S> {
    service: S,
    requests_max_semaphore: Option<Arc<Semaphore>>,
    request_deadline: Duration,
}

impl<S, B> Service<ServiceRequest> for MaxClientsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let sem = match self.requests_max_semaphore {
            Some(ref sem) => sem.clone(),
            None => {
                let fut = self.service.call(req);
                return async move { fut.await.map(ServiceResponse::map_into_left_body) }
                    .boxed_local();
            }
        };

        let deadline = self.request_deadline;
        let request = req.request().clone();
        // The handler does not run before the future is polled, i.e. before a slot is taken.
        let fut = self.service.call(req);
        async move {
            let _permit = match timeout(deadline, sem.acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                _ => {
                    log::warn!(
                        "Rejecting {} {}: too many requests",
                        request.method(),
                        request.path()
                    );
                    let res = ApiResponse::error(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Too many requests in flight, please retry later".to_owned(),
                    );
                    return Ok(ServiceResponse::new(request, res.into_response())
                        .map_into_right_body());
                }
            };
            fut.await.map(ServiceResponse::map_into_left_body)
        }
        .boxed_local()
    }
}

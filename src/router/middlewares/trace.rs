use std::future::{ready, Ready};

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::Error;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;

use crate::utils;

/// Logs one line per request once the response head is ready.
#[derive(Clone, Default)]
pub struct Trace;

impl Trace {
    pub fn new() -> Self {
        Trace
    }
}

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = TraceMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

pub struct TraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().clone();
        let path = req.path().to_owned();
        let start = utils::now();
        let fut = self.service.call(req);
        async move {
            let res = fut.await;
            let elapsed = utils::micros_between(&start, &utils::now()) as f64 / 1000.0;
            match &res {
                Ok(res) if res.status().is_server_error() => {
                    log::error!("{} {} {} {:.3}ms", method, path, res.status().as_u16(), elapsed)
                }
                Ok(res) => {
                    log::info!("{} {} {} {:.3}ms", method, path, res.status().as_u16(), elapsed)
                }
                Err(err) => log::error!("{} {} failed: {} {:.3}ms", method, path, err, elapsed),
            }
            res
        }
        .boxed_local()
    }
}

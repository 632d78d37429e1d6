//! Deadline replies for calls whose `grpc-timeout` runs out before the handler answers.
//!
//! The transport drops such calls itself and answers `CANCELLED`. [`DeadlineLayer`] is installed
//! directly inside the transport's timer and starts its own timer from the same header just
//! before it, so an expired call is answered with [`cancellation_status`] instead.

use crate::context::{parse_grpc_timeout, GRPC_TIMEOUT_HEADER};
use api_shared::status::cancellation_status;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tonic::body::BoxBody;
use tonic::codegen::http;
use tower::{Layer, Service};

const EXPIRED_MESSAGE: &str = "Deadline exceeded before the call completed.";

/// Tower layer producing [`Deadline`] services.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineLayer;

impl<S> Layer<S> for DeadlineLayer {
    type Service = Deadline<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Deadline { inner }
    }
}

#[derive(Debug, Clone)]
pub struct Deadline<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for Deadline<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        // Fixed before the inner call, so it never trails the transport's own timer.
        let deadline = request_deadline(req.headers());
        let path = req.uri().path().to_owned();
        let call = self.inner.call(req);

        Box::pin(async move {
            let Some(deadline) = deadline else {
                return call.await;
            };
            match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::info!("{}: deadline passed before the handler replied", path);
                    Ok(cancellation_status(EXPIRED_MESSAGE).into_http())
                }
            }
        })
    }
}

fn request_deadline(headers: &http::HeaderMap) -> Option<Instant> {
    headers
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_grpc_timeout)
        .and_then(|timeout| Instant::now().checked_add(timeout))
}

use std::{
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll},
    time::Instant,
};

use axum::http::{Method, Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

/// Emits one `tracing` event per request once its response is ready,
/// carrying the method, path, status and wall-clock time spent.
#[derive(Debug, Clone, Default)]
pub struct RequestTimingLayer {}

impl RequestTimingLayer {
    pub fn new() -> Self {
        RequestTimingLayer {}
    }
}

impl<S> Layer<S> for RequestTimingLayer {
    type Service = RequestTimingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RequestTimingService { service }
    }
}

#[derive(Clone)]
pub struct RequestTimingService<S> {
    service: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTimingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        ResponseFuture {
            inner: self.service.call(req),
            method,
            path,
            request_time: Instant::now(),
        }
    }
}

pin_project! {
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        method: Method,
        path: String,
        request_time: Instant,
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let response: Response<B> = ready!(this.inner.poll(cx))?;
        let elapsed_ms = this.request_time.elapsed().as_millis() as u64;
        tracing::info!(
            method = %this.method,
            path = %this.path,
            status = response.status().as_u16(),
            elapsed_ms,
            "request completed"
        );
        Poll::Ready(Ok(response))
    }
}

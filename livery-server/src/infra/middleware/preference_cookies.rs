//! Deferred preference cookies.
//!
//! Parses the request's `Cookie` header into a shared [`RequestCookies`]
//! placed in the request extensions. Handlers and the resolver queue
//! outgoing cookies on it; once the inner service has produced a response
//! this layer drains the pending map and appends one `Set-Cookie` header per
//! cookie name. Nothing else writes `Set-Cookie` for preferences.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, Response, header},
};
use livery_core::cookies::RequestCookies;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{trace, warn};

/// Layer for the deferred cookie middleware
#[derive(Clone, Debug, Default)]
pub struct PreferenceCookieLayer;

impl PreferenceCookieLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for PreferenceCookieLayer {
    type Service = PreferenceCookieMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PreferenceCookieMiddleware { inner }
    }
}

#[derive(Clone, Debug)]
pub struct PreferenceCookieMiddleware<S> {
    inner: S,
}

/// Joins every `Cookie` header; HTTP/2 clients may split them.
fn cookie_header(req: &Request<Body>) -> Option<String> {
    let values: Vec<&str> = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

impl<S> Service<Request<Body>> for PreferenceCookieMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>>
        + Send
        + Clone
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<
        Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let cookies = Arc::new(RequestCookies::from_header(
            cookie_header(&req).as_deref(),
        ));
        req.extensions_mut().insert(cookies.clone());

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;

            for cookie in cookies.drain() {
                match HeaderValue::from_str(&cookie.header_value()) {
                    Ok(value) => {
                        trace!(name = %cookie.name, "flushing deferred cookie");
                        response
                            .headers_mut()
                            .append(header::SET_COOKIE, value);
                    }
                    Err(err) => {
                        warn!(
                            name = %cookie.name,
                            error = %err,
                            "dropping unencodable cookie"
                        );
                    }
                }
            }

            Ok(response)
        })
    }
}

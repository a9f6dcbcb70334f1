//! Upstream forwarding.
//!
//! # Responsibilities
//! - Turn a `ProxyRequestDescriptor` into one outbound HTTP call (no retries)
//! - Bound the wait for the upstream response head, and each wait for body data
//! - Relay status, a safe subset of headers, and the body stream unchanged
//!
//! # Design Decisions
//! - One pooled hyper client shared by all calls
//! - The response body is streamed, never buffered
//! - Dropping the returned future (caller went away) drops the in-flight call

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower_http::timeout::TimeoutBody;

use crate::config::UpstreamSettings;
use crate::services::proxy::descriptor::{DescriptorError, ProxyRequestDescriptor, X_REQUEST_ID};
use crate::services::proxy::error::UpstreamError;

/// Response headers relayed back to the browser. Everything else (hop-by-hop,
/// `set-cookie`, server banners) stays behind.
const RELAYED_RESPONSE_HEADERS: [HeaderName; 6] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
    X_REQUEST_ID,
];

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[derive(Clone)]
pub struct ProxyForwarder {
    client: Client<HttpConnector, Body>,
    // scheme://authority[/prefix], no trailing slash
    base: String,
    api_token: Option<HeaderValue>,
    timeout: Duration,
}

impl std::fmt::Debug for ProxyForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyForwarder")
            .field("base", &self.base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProxyForwarder {
    pub fn new(settings: &UpstreamSettings) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(settings.timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            base: settings.base_url.as_str().trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            timeout: settings.timeout,
        }
    }

    pub async fn forward(
        &self,
        descriptor: ProxyRequestDescriptor,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let request = self.build_request(&descriptor)?;

        let response = match tokio::time::timeout(self.timeout, self.client.request(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                tracing::warn!(
                    error = %err,
                    connect = err.is_connect(),
                    method = %descriptor.method(),
                    path = %descriptor.path(),
                    "upstream request failed"
                );
                return Err(UpstreamError::Unavailable);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    method = %descriptor.method(),
                    path = %descriptor.path(),
                    "upstream request timed out"
                );
                return Err(UpstreamError::Timeout);
            }
        };

        let (parts, body) = response.into_parts();
        let relayed = UpstreamResponse {
            status: parts.status,
            headers: relay_headers(&parts.headers),
            // A stalled body errors out instead of holding both connections open.
            body: Body::new(TimeoutBody::new(self.timeout, body)),
        };

        tracing::debug!(
            status = %relayed.status,
            method = %descriptor.method(),
            path = %descriptor.path(),
            "upstream responded"
        );

        if relayed.status.is_success() {
            Ok(relayed)
        } else {
            Err(UpstreamError::Status(Box::new(relayed)))
        }
    }

    fn build_request(
        &self,
        descriptor: &ProxyRequestDescriptor,
    ) -> Result<Request<Body>, UpstreamError> {
        let uri = Uri::try_from(format!("{}{}", self.base, descriptor.target()))
            .map_err(|_| DescriptorError::InvalidTarget)?;

        let mut builder = Request::builder().method(descriptor.method().clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(
                descriptor
                    .headers()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            if let Some(token) = &self.api_token {
                headers.insert(header::AUTHORIZATION, token.clone());
            }
        }

        let body = match descriptor.body() {
            Some(json) => Body::from(json.as_bytes().clone()),
            None => Body::empty(),
        };

        builder
            .body(body)
            .map_err(|_| UpstreamError::InvalidRequest(DescriptorError::InvalidTarget))
    }
}

fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::new();
    for name in RELAYED_RESPONSE_HEADERS.iter() {
        for value in upstream.get_all(name) {
            relayed.append(name.clone(), value.clone());
        }
    }
    relayed
}

//! Outbound request description.
//!
//! A `ProxyRequestDescriptor` fully determines the upstream call and cannot be changed
//! once built. Bodies can only be attached as `JsonBody`, which only exists for bytes
//! that already parsed as JSON.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header, uri::PathAndQuery};

/// Every forwarded path lives under this prefix.
pub const UPSTREAM_API_PREFIX: &str = "/v1";

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_DASHBOARD_SUBJECT: HeaderName = HeaderName::from_static("x-dashboard-subject");

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("path must start with /v1/")]
    OutsidePrefix,
    #[error("path or query is not a valid request target")]
    InvalidTarget,
    #[error("{0} requests do not carry a body")]
    BodyNotAllowed(Method),
    #[error("header value for {0} is not valid")]
    InvalidHeader(HeaderName),
}

/// JSON text that is known to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBody(Bytes);

impl JsonBody {
    pub fn parse(raw: Bytes) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<serde::de::IgnoredAny>(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct ProxyRequestDescriptor {
    method: Method,
    target: PathAndQuery,
    body: Option<JsonBody>,
    headers: HeaderMap,
}

impl ProxyRequestDescriptor {
    /// `query` is appended verbatim (no re-encoding).
    pub fn new(method: Method, path: &str, query: Option<&str>) -> Result<Self, DescriptorError> {
        let under_prefix = path == UPSTREAM_API_PREFIX
            || path
                .strip_prefix(UPSTREAM_API_PREFIX)
                .is_some_and(|rest| rest.starts_with('/'));
        if !under_prefix || path.split('/').any(|seg| seg == "..") {
            return Err(DescriptorError::OutsidePrefix);
        }

        let raw = match query {
            Some(q) if !q.is_empty() => format!("{path}?{q}"),
            _ => path.to_string(),
        };
        let target = PathAndQuery::try_from(raw).map_err(|_| DescriptorError::InvalidTarget)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            method,
            target,
            body: None,
            headers,
        })
    }

    pub fn with_json_body(mut self, body: JsonBody) -> Result<Self, DescriptorError> {
        if self.method.is_safe() {
            return Err(DescriptorError::BodyNotAllowed(self.method));
        }
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(body);
        Ok(self)
    }

    /// Override the content type asked of the upstream (`text/plain` for metrics).
    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.headers
            .insert(header::ACCEPT, HeaderValue::from_static(accept));
        self
    }

    pub fn with_request_id(self, request_id: Option<&str>) -> Result<Self, DescriptorError> {
        match request_id {
            Some(id) => self.with_header(X_REQUEST_ID, id),
            None => Ok(self),
        }
    }

    pub fn with_subject(self, subject: &str) -> Result<Self, DescriptorError> {
        self.with_header(X_DASHBOARD_SUBJECT, subject)
    }

    fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, DescriptorError> {
        let value =
            HeaderValue::from_str(value).map_err(|_| DescriptorError::InvalidHeader(name.clone()))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &PathAndQuery {
        &self.target
    }

    pub fn path(&self) -> &str {
        self.target.path()
    }

    pub fn body(&self) -> Option<&JsonBody> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

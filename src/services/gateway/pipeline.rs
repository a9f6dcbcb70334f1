//! Request pipeline shared by every dashboard proxy route.
//!
//! # Responsibilities
//! - Run a route's stage plan in order, stopping at the first rejection
//! - Keep the inbound request immutable; stages only add what they produced
//! - Write exactly one audit entry per call that reached `Forward`, even if the
//!   handler future is dropped mid-call (client gone, global timeout)
//!
//! # Design Decisions
//! - Stages are data (`Stage`), not nested middleware, so the order is visible in one place
//! - The body is only read in `BodyValidation`, after origin, session and scope have passed
//! - Rejections before `Forward` are logged on the `security` target and not audited

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, header},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::config::Config;
use crate::error::GatewayError;
use crate::services::audit::{
    AuditEntry, AuditOutcome, AuditRecorder, AuditSink, FailureClass, PendingAudit,
};
use crate::services::auth::{Session, SessionResult, SessionValidator, scope};
use crate::services::gateway::route::RouteSpec;
use crate::services::origin::{GuardResult, OriginGuard};
use crate::services::proxy::{
    DescriptorError, JsonBody, ProxyForwarder, ProxyRequestDescriptor, UpstreamError,
    UpstreamResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OriginCheck,
    SessionCheck,
    ScopeCheck,
    BodyValidation,
    Forward,
    Audit,
    Respond,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::OriginCheck => "origin_check",
            Stage::SessionCheck => "session_check",
            Stage::ScopeCheck => "scope_check",
            Stage::BodyValidation => "body_validation",
            Stage::Forward => "forward",
            Stage::Audit => "audit",
            Stage::Respond => "respond",
        }
    }
}

/// What the pipeline knows about the inbound call. Built once, never mutated.
#[derive(Debug)]
struct RequestContext {
    method: Method,
    headers: HeaderMap,
    query: Option<String>,
    request_id: Option<String>,
}

impl RequestContext {
    fn from_request(request: Request<Body>) -> (Self, Body) {
        let (parts, body) = request.into_parts();
        let request_id = parts
            .headers
            .get(crate::services::proxy::descriptor::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let ctx = Self {
            method: parts.method,
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            request_id,
        };
        (ctx, body)
    }
}

/// Values produced by earlier stages for later ones.
#[derive(Default)]
struct Produced {
    body: Option<Body>,
    session: Option<Session>,
    payload: Option<JsonBody>,
    pending_audit: Option<PendingAudit>,
    upstream: Option<Result<UpstreamResponse, UpstreamError>>,
}

pub struct Gateway {
    origin: OriginGuard,
    sessions: Arc<dyn SessionValidator>,
    forwarder: ProxyForwarder,
    audit: AuditRecorder,
    max_body_bytes: usize,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("origin", &self.origin)
            .field("forwarder", &self.forwarder)
            .field("audit", &self.audit)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Gateway {
    pub fn new(
        config: &Config,
        sessions: Arc<dyn SessionValidator>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            origin: OriginGuard::new(&config.allowed_origins),
            sessions,
            forwarder: ProxyForwarder::new(&config.upstream),
            audit: AuditRecorder::new(sink),
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn sessions(&self) -> &dyn SessionValidator {
        self.sessions.as_ref()
    }

    pub async fn handle(&self, route: &RouteSpec, request: Request<Body>) -> Response {
        let (ctx, body) = RequestContext::from_request(request);
        let mut produced = Produced {
            body: Some(body),
            ..Produced::default()
        };

        for stage in route.plan() {
            match self.run_stage(stage, route, &ctx, &mut produced).await {
                Ok(Some(response)) => return response,
                Ok(None) => {}
                Err(err) => {
                    log_rejection(stage, route, &ctx, &err);
                    return err.into_response();
                }
            }
        }

        // Every plan ends with Respond.
        GatewayError::Internal.into_response()
    }

    async fn run_stage(
        &self,
        stage: Stage,
        route: &RouteSpec,
        ctx: &RequestContext,
        produced: &mut Produced,
    ) -> Result<Option<Response>, GatewayError> {
        match stage {
            Stage::OriginCheck => match self.origin.check(&ctx.method, &ctx.headers) {
                GuardResult::Pass => Ok(None),
                GuardResult::Reject(reason) => {
                    tracing::debug!(?reason, "origin rejected");
                    Err(GatewayError::ForbiddenCsrf)
                }
            },
            Stage::SessionCheck => match self.sessions.validate(&ctx.headers)? {
                SessionResult::Authenticated(session) => {
                    produced.session = Some(session);
                    Ok(None)
                }
                SessionResult::Unauthenticated => Err(GatewayError::Unauthorized),
            },
            Stage::ScopeCheck => {
                let session = produced.session.as_ref().ok_or(GatewayError::Internal)?;
                if scope::authorize(session, route.required_scopes) {
                    Ok(None)
                } else {
                    Err(GatewayError::ForbiddenScope)
                }
            }
            Stage::BodyValidation => {
                let body = produced.body.take().ok_or(GatewayError::Internal)?;
                let raw = read_body(&ctx.headers, body, self.max_body_bytes).await?;
                let payload = JsonBody::parse(raw).map_err(|_| GatewayError::InvalidJson)?;
                produced.payload = Some(payload);
                Ok(None)
            }
            Stage::Forward => {
                let session = produced.session.as_ref().ok_or(GatewayError::Internal)?;
                let cancelled = AuditOutcome::Failure {
                    class: FailureClass::Cancelled,
                    reason: "cancelled".to_string(),
                };
                produced.pending_audit = Some(
                    self.audit
                        .pending(base_entry(route, ctx, session, cancelled)),
                );

                let result = match describe(route, ctx, session, produced.payload.take()) {
                    Ok(descriptor) => self.forwarder.forward(descriptor).await,
                    Err(err) => {
                        tracing::error!(error = %err, action = route.action, "could not build upstream request");
                        Err(UpstreamError::from(err))
                    }
                };
                produced.upstream = Some(result);
                Ok(None)
            }
            Stage::Audit => {
                let session = produced.session.as_ref().ok_or(GatewayError::Internal)?;
                let result = produced.upstream.as_ref().ok_or(GatewayError::Internal)?;
                let pending = produced.pending_audit.take().ok_or(GatewayError::Internal)?;
                pending
                    .complete(audit_entry(route, ctx, session, result))
                    .await;
                Ok(None)
            }
            Stage::Respond => {
                let result = produced.upstream.take().ok_or(GatewayError::Internal)?;
                Ok(Some(match result {
                    Ok(response) => response.into_response(),
                    Err(err) => GatewayError::from(err).into_response(),
                }))
            }
        }
    }
}

fn describe(
    route: &RouteSpec,
    ctx: &RequestContext,
    session: &Session,
    payload: Option<JsonBody>,
) -> Result<ProxyRequestDescriptor, DescriptorError> {
    let mut descriptor =
        ProxyRequestDescriptor::new(ctx.method.clone(), route.upstream_path, ctx.query.as_deref())?
            .with_subject(&session.subject)?
            .with_request_id(ctx.request_id.as_deref())?;

    if let Some(accept) = route.accept {
        descriptor = descriptor.with_accept(accept);
    }
    if let Some(body) = payload {
        descriptor = descriptor.with_json_body(body)?;
    }
    Ok(descriptor)
}

/// Read at most `limit` bytes. A declared `content-length` over the limit is
/// refused without reading.
async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(GatewayError::BodyTooLarge);
    }

    let mut stream = body.into_data_stream();
    let mut raw = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            tracing::debug!(error = %err, "request body read failed");
            GatewayError::BodyUnreadable
        })?;
        if raw.len() + chunk.len() > limit {
            return Err(GatewayError::BodyTooLarge);
        }
        raw.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(raw))
}

fn audit_entry(
    route: &RouteSpec,
    ctx: &RequestContext,
    session: &Session,
    result: &Result<UpstreamResponse, UpstreamError>,
) -> AuditEntry {
    let (outcome, upstream_status) = match result {
        Ok(response) => (AuditOutcome::Success, Some(response.status.as_u16())),
        Err(err) => {
            let class = match err {
                UpstreamError::InvalidRequest(_) => FailureClass::Internal,
                _ => FailureClass::Upstream,
            };
            let outcome = AuditOutcome::Failure {
                class,
                reason: err.reason().to_string(),
            };
            (outcome, err.upstream_status().map(|s| s.as_u16()))
        }
    };

    let mut entry = base_entry(route, ctx, session, outcome);
    entry.upstream_status = upstream_status;
    entry
}

fn base_entry(
    route: &RouteSpec,
    ctx: &RequestContext,
    session: &Session,
    outcome: AuditOutcome,
) -> AuditEntry {
    let mut entry = AuditEntry::new(route.action, &session.subject, &session.fingerprint, outcome);
    entry.request_id = ctx.request_id.clone();
    entry.method = ctx.method.to_string();
    entry.path = route.upstream_path.to_string();
    entry
}

fn log_rejection(stage: Stage, route: &RouteSpec, ctx: &RequestContext, err: &GatewayError) {
    let request_id = ctx.request_id.as_deref().unwrap_or("-");
    match err {
        GatewayError::Configuration(_) | GatewayError::Internal => tracing::error!(
            stage = stage.name(),
            action = route.action,
            request_id,
            error = %err,
            "dashboard request failed"
        ),
        _ => tracing::warn!(
            target: "security",
            stage = stage.name(),
            action = route.action,
            method = %ctx.method,
            request_id,
            code = err.code(),
            "dashboard request rejected"
        ),
    }
}

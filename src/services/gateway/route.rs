/*
 * Responsibility
 * - Static per-endpoint configuration: action tag, method, upstream path, required scopes
 * - The ordered stage plan derived from it
 */
use axum::http::Method;

use crate::services::gateway::pipeline::Stage;
use crate::services::origin::OriginGuard;

#[derive(Debug)]
pub struct RouteSpec {
    /// Audit action tag.
    pub action: &'static str,
    pub method: Method,
    /// Path on the upstream, under `/v1`.
    pub upstream_path: &'static str,
    /// All of these must be granted (AND).
    pub required_scopes: &'static [&'static str],
    /// Overrides the `accept` header sent upstream.
    pub accept: Option<&'static str>,
}

impl RouteSpec {
    pub fn is_mutating(&self) -> bool {
        OriginGuard::applies_to(&self.method)
    }

    /// Stages in execution order. Origin and body checks only exist for mutating routes.
    pub fn plan(&self) -> Vec<Stage> {
        let mutating = self.is_mutating();
        let mut stages = Vec::with_capacity(7);

        if mutating {
            stages.push(Stage::OriginCheck);
        }
        stages.push(Stage::SessionCheck);
        stages.push(Stage::ScopeCheck);
        if mutating {
            stages.push(Stage::BodyValidation);
        }
        stages.extend([Stage::Forward, Stage::Audit, Stage::Respond]);

        stages
    }
}

pub static LIST_KEYS: RouteSpec = RouteSpec {
    action: "list_keys",
    method: Method::GET,
    upstream_path: "/v1/dashboard/keys",
    required_scopes: &["keys:read"],
    accept: None,
};

pub static CREATE_KEY: RouteSpec = RouteSpec {
    action: "create_key",
    method: Method::POST,
    upstream_path: "/v1/dashboard/keys",
    required_scopes: &["keys:write"],
    accept: None,
};

pub static METRICS: RouteSpec = RouteSpec {
    action: "metrics",
    method: Method::GET,
    upstream_path: "/v1/metrics",
    required_scopes: &["read"],
    accept: Some("text/plain"),
};

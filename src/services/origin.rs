//! Cross-site request protection for state-changing calls.
//!
//! Policy:
//! - Safe methods (GET, HEAD, OPTIONS, TRACE) are never checked.
//! - Any other method must carry an `Origin` header whose normalised value is on the
//!   allow-list. A missing, opaque (`null`) or unparsable origin is rejected; `Referer`
//!   is not consulted.
//! - An empty allow-list rejects every mutating request.
//!
//! The check looks only at the method and headers so it can run before the session
//! or the body is touched.

use std::collections::HashSet;

use axum::http::{HeaderMap, Method, header};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRejection {
    Missing,
    Malformed,
    NotAllowed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardResult {
    Pass,
    Reject(OriginRejection),
}

#[derive(Debug, Clone, Default)]
pub struct OriginGuard {
    allowed: HashSet<String>,
}

impl OriginGuard {
    /// Unparsable entries are dropped with a warning (they could never match anyway).
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = origins
            .into_iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                let normalized = normalize(raw);
                if normalized.is_none() {
                    tracing::warn!(origin = %raw, "ignoring invalid allowed origin");
                }
                normalized
            })
            .collect();

        Self { allowed }
    }

    pub fn applies_to(method: &Method) -> bool {
        !method.is_safe()
    }

    pub fn check(&self, method: &Method, headers: &HeaderMap) -> GuardResult {
        if !Self::applies_to(method) {
            return GuardResult::Pass;
        }

        let Some(raw) = headers.get(header::ORIGIN) else {
            return GuardResult::Reject(OriginRejection::Missing);
        };
        let Some(origin) = raw.to_str().ok().and_then(normalize) else {
            return GuardResult::Reject(OriginRejection::Malformed);
        };

        if self.allowed.contains(&origin) {
            GuardResult::Pass
        } else {
            GuardResult::Reject(OriginRejection::NotAllowed(origin))
        }
    }
}

// scheme://host[:port], lower-cased, default port elided.
fn normalize(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }

    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn guard() -> OriginGuard {
        OriginGuard::new(["https://dash.example.com", "http://localhost:3000"])
    }

    fn with_origin(origin: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        h
    }

    #[test]
    fn safe_methods_bypass_the_check() {
        let g = guard();
        assert_eq!(g.check(&Method::GET, &HeaderMap::new()), GuardResult::Pass);
        assert_eq!(
            g.check(&Method::HEAD, &with_origin("https://evil.example")),
            GuardResult::Pass
        );
    }

    #[test]
    fn allowed_origin_passes_after_normalisation() {
        let g = guard();
        assert_eq!(
            g.check(&Method::POST, &with_origin("https://dash.example.com")),
            GuardResult::Pass
        );
        assert_eq!(
            g.check(&Method::POST, &with_origin("HTTPS://Dash.Example.com:443")),
            GuardResult::Pass
        );
        assert_eq!(
            g.check(&Method::DELETE, &with_origin("http://localhost:3000")),
            GuardResult::Pass
        );
    }

    #[test]
    fn missing_origin_on_mutation_is_rejected() {
        assert_eq!(
            guard().check(&Method::POST, &HeaderMap::new()),
            GuardResult::Reject(OriginRejection::Missing)
        );
    }

    #[test]
    fn foreign_port_or_scheme_is_rejected() {
        let g = guard();
        assert_eq!(
            g.check(&Method::POST, &with_origin("http://dash.example.com")),
            GuardResult::Reject(OriginRejection::NotAllowed(
                "http://dash.example.com".to_string()
            ))
        );
        assert!(matches!(
            g.check(&Method::PUT, &with_origin("http://localhost:3001")),
            GuardResult::Reject(OriginRejection::NotAllowed(_))
        ));
    }

    #[test]
    fn opaque_and_garbage_origins_are_rejected() {
        let g = guard();
        assert_eq!(
            g.check(&Method::POST, &with_origin("null")),
            GuardResult::Reject(OriginRejection::Malformed)
        );
        assert_eq!(
            g.check(&Method::POST, &with_origin("dash.example.com")),
            GuardResult::Reject(OriginRejection::Malformed)
        );
    }

    #[test]
    fn empty_allow_list_rejects_everything_mutating() {
        let g = OriginGuard::new(Vec::<String>::new());
        assert!(matches!(
            g.check(&Method::PATCH, &with_origin("https://dash.example.com")),
            GuardResult::Reject(_)
        ));
    }
}

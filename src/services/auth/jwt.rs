use std::collections::BTreeSet;

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::SessionSettings;
use crate::services::auth::credentials::session_token;
use crate::services::auth::session::{
    Session, SessionConfigError, SessionResult, SessionValidator,
};

/// Session token claims.
///
/// `scope` (space-separated, OAuth style) and `scopes` (array) are both accepted;
/// the granted set is their union.
#[derive(Debug, Clone, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: u64,

    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
}

#[derive(Clone)]
struct Verifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

/// Verifies signed session tokens (HS256 with a shared secret, or EdDSA with a public key).
///
/// Key problems are captured at construction and reported on every `validate` call,
/// so a misconfigured deployment answers 500 instead of refusing to boot.
#[derive(Clone)]
pub struct JwtSessionValidator {
    verifier: Result<Verifier, SessionConfigError>,
    cookie_name: String,
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtSessionValidator")
            .field("configured", &self.verifier.is_ok())
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl JwtSessionValidator {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self {
            verifier: build_verifier(settings),
            cookie_name: settings.cookie_name.clone(),
        }
    }

    fn verify(&self, verifier: &Verifier, token: &str) -> Option<Session> {
        let data = match jsonwebtoken::decode::<SessionClaims>(
            token,
            &verifier.decoding_key,
            &verifier.validation,
        ) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(error = %err, "session token rejected");
                return None;
            }
        };
        let claims = data.claims;

        let subject = claims.sub.trim();
        if subject.is_empty() {
            tracing::debug!("session token has empty 'sub'");
            return None;
        }

        let expires_at = i64::try_from(claims.exp)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))?;

        let mut scopes: BTreeSet<String> = claims
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        scopes.extend(
            claims
                .scopes
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        );

        Some(Session {
            subject: subject.to_string(),
            scopes,
            expires_at,
            fingerprint: fingerprint(token),
        })
    }
}

impl SessionValidator for JwtSessionValidator {
    fn validate(&self, headers: &HeaderMap) -> Result<SessionResult, SessionConfigError> {
        let verifier = self.verifier.as_ref().map_err(Clone::clone)?;

        let Some(token) = session_token(headers, &self.cookie_name) else {
            return Ok(SessionResult::Unauthenticated);
        };

        Ok(match self.verify(verifier, &token) {
            Some(session) => SessionResult::Authenticated(session),
            None => SessionResult::Unauthenticated,
        })
    }
}

fn build_verifier(settings: &SessionSettings) -> Result<Verifier, SessionConfigError> {
    let (decoding_key, algorithm) = match (&settings.public_key_pem, &settings.signing_secret) {
        (Some(pem), _) => {
            let key = DecodingKey::from_ed_pem(pem.as_bytes()).map_err(|e| {
                tracing::error!(error = %e, "invalid session public key pem (expected Ed25519)");
                SessionConfigError::InvalidKey
            })?;
            (key, Algorithm::EdDSA)
        }
        (None, Some(secret)) => (
            DecodingKey::from_secret(secret.as_bytes()),
            Algorithm::HS256,
        ),
        (None, None) => return Err(SessionConfigError::MissingKey),
    };

    let mut validation = Validation::new(algorithm);
    validation.leeway = settings.leeway_seconds;
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_required_spec_claims(&["exp", "sub"]);

    if let Some(issuer) = &settings.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &settings.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    Ok(Verifier {
        decoding_key,
        validation,
    })
}

// base64url(SHA-256(token)), truncated.
fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(16);
    encoded
}

//! Capability scope checks.

use crate::services::auth::session::Session;

/// `true` iff every required scope was granted to the session.
///
/// AND semantics: one missing scope denies the whole call. No requirement means allowed.
pub fn authorize(session: &Session, required: &[&str]) -> bool {
    required.iter().all(|scope| session.has_scope(scope))
}

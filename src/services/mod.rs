/*
 * Responsibility
 * - Domain services used by the dashboard routes
 *   - auth: session validation + scope checks
 *   - origin: cross-site guard for mutating calls
 *   - proxy: outbound request description + forwarding
 *   - audit: privileged-action trail
 *   - gateway: the per-route stage pipeline composing the above
 */
pub mod audit;
pub mod auth;
pub mod gateway;
pub mod origin;
pub mod proxy;

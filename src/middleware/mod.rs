/*
 * Responsibility
 * - middleware の公開インターフェース
 * - http: request id / trace / body limit / timeout
 * - security_headers: browser-facing response headers
 */
pub mod http;
pub mod security_headers;

/*
 * Responsibility
 * - Browser-facing /dashboard surface (routes() の re-export)
 */
pub mod dto;
pub mod handlers;
mod routes;

pub use routes::routes;

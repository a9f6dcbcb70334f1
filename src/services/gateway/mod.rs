pub mod pipeline;
pub mod route;

pub use pipeline::{Gateway, Stage};
pub use route::{CREATE_KEY, LIST_KEYS, METRICS, RouteSpec};

pub mod keys;
pub mod metrics;
pub mod session;

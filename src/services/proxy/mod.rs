//! Request forwarding to the upstream API.
//!
//! ```text
//! handler → ProxyRequestDescriptor (validated, immutable)
//!         → ProxyForwarder::forward (one call, bounded wait)
//!         → UpstreamResponse (2xx) | UpstreamError (transport / non-2xx)
//! ```

pub mod descriptor;
pub mod error;
pub mod forwarder;

pub use descriptor::{DescriptorError, JsonBody, ProxyRequestDescriptor};
pub use error::UpstreamError;
pub use forwarder::{ProxyForwarder, UpstreamResponse};

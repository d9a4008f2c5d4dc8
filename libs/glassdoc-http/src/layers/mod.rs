//! Tower layers for the HTTP client stack
//!
//! - [`DefaultHeadersLayer`] - fills in `User-Agent` and `Accept` when absent
//! - [`RequestSpanLayer`] - wraps each outbound request in an `outgoing_http` span

mod default_headers;
mod span;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService};
pub use span::{RequestSpanLayer, RequestSpanService};

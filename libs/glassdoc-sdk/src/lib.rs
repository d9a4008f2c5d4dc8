#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Client SDK for the `GlassDoc` certification backend
//!
//! The crate is built around one [`Gateway`]:
//! - the backend base URL is resolved once from layered sources
//!   ([`EndpointSources`]): explicit server URL, production page origin,
//!   then the local development default
//! - successful JSON responses are unwrapped to the business envelope
//!   ([`types::ApiResponse`])
//! - every failure becomes one normalized [`ApiError`] with a stable
//!   [`ErrorCode`], logged once at the gateway boundary
//!
//! Resource wrappers under [`api`] borrow the gateway and map one method to
//! one endpoint.
//!
//! # Example
//!
//! ```ignore
//! use glassdoc_sdk::{Gateway, types::BaseQuery};
//!
//! let gateway = Gateway::from_env()?;
//! let page = gateway
//!     .applications()
//!     .list(&Default::default())
//!     .await?;
//!
//! match gateway.companies().get(42).await {
//!     Ok(resp) => println!("{:?}", resp.data),
//!     Err(e) => eprintln!("{}: {}", e.code(), e.message()),
//! }
//! ```

pub mod api;
mod endpoint;
mod error;
mod gateway;
pub mod types;

pub use endpoint::{
    ConfigError, DEFAULT_BACKEND_PORT, ENV_PREFIX, Endpoint, EndpointSource, EndpointSources,
};
pub use error::{ApiError, BusinessCode, ErrorCode, messages};
pub use gateway::{GATEWAY_USER_AGENT, Gateway, GatewayBuilder, GatewayConfig};
pub use glassdoc_http::ProgressCallback;

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP transport for the `GlassDoc` client
//!
//! This crate provides a hyper-based HTTP client with:
//! - TLS via rustls (HTTPS only unless insecure HTTP is explicitly allowed)
//! - Connection pooling
//! - Per-request timeout
//! - Default `User-Agent` / `Accept` headers
//! - Optional concurrency limiting with fail-fast load shedding
//! - Transparent response decompression (gzip, brotli, deflate)
//! - `multipart/form-data` bodies with upload progress reporting
//!
//! No retry layer: every failure reaches the caller on the first attempt.
//!
//! # Example
//!
//! ```ignore
//! use glassdoc_http::{HttpClient, multipart};
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .allow_insecure_http()
//!     .build()?;
//!
//! let form = multipart::Form::new()
//!     .text("category", "company")
//!     .part("file", multipart::Part::bytes(contents).file_name("logo.png"));
//!
//! let resp = client
//!     .post("http://localhost:5000/api/mvp/upload-file")
//!     .multipart(form)
//!     .on_upload_progress(|pct| eprintln!("{pct}%"))
//!     .send()
//!     .await?;
//! ```

mod body;
mod builder;
mod client;
mod config;
mod error;
mod layers;
pub mod multipart;
mod request;
mod response;

pub use body::{ProgressCallback, RequestBody};
pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    DEFAULT_ACCEPT, DEFAULT_USER_AGENT, HttpClientConfig, PoolConfig, TransportSecurity,
};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{DefaultHeadersLayer, DefaultHeadersService, RequestSpanLayer, RequestSpanService};
pub use request::RequestBuilder;
pub use response::{ERROR_BODY_PREVIEW_LIMIT, HttpResponse, ResponseBody};

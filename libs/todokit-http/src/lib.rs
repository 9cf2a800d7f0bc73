#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP transport for the todokit API client
//!
//! This crate provides a hyper-based HTTP client with:
//! - Automatic TLS via rustls (HTTPS only by default)
//! - Connection pooling
//! - Per-request timeout
//! - User-Agent header injection
//! - A per-client cookie jar (the session cookie the backend sets on sign-in
//!   is replayed on every later request to the same host)
//! - Transparent response decompression (gzip, brotli, deflate)
//! - One `tracing` span per outgoing request
//!
//! Requests are never retried and redirects are never followed: every call
//! to [`RequestBuilder::send`] results in exactly one request on the wire.
//!
//! # Example
//!
//! ```ignore
//! use todokit_http::HttpClient;
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .user_agent("my-app/1.0")
//!     .build()?;
//!
//! let todos: Vec<Todo> = client
//!     .get("https://todo.example.com/api/v1/todo/")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, HttpClientConfig, TransportSecurity};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{
    CookieJar, CookieJarLayer, CookieJarService, TraceLayer, TraceService, UserAgentLayer,
    UserAgentService,
};
pub use request::RequestBuilder;
pub use response::{ERROR_BODY_PREVIEW_LIMIT, HttpResponse, ResponseBody};

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Typed client for the todokit backend
//!
//! - [`registry`]: every backend operation as a zero-sized [`Endpoint`] type
//!   whose associated types fix its path parameters, payload and response
//! - [`ApiClient`]: builds and sends one call per [`execute`](ApiClient::execute),
//!   normalizing the outcome into `E::Response` or a [`ClientError`]
//! - [`session`]: sign-in state, bearer credential and its persistence
//!
//! ```no_run
//! use todokit_api::{ApiClient, RequestOptions, TodoCreate, TodoForm};
//!
//! # async fn demo() -> Result<(), todokit_api::ClientError> {
//! let client = ApiClient::new("http://localhost:8000/api/v1")?;
//! let todo = client
//!     .execute(RequestOptions::<TodoCreate>::new().body(TodoForm::new("buy milk")))
//!     .await?;
//! assert_eq!(todo.item, "buy milk");
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;
mod error;
pub mod registry;
pub mod session;

pub use config::ApiClientConfig;
pub use dispatcher::{ApiClient, DynamicOptions, RequestOptions};
pub use error::{ApiError, ClientError, ConfigurationError};
pub use registry::*;
pub use session::{AuthSession, FileSessionStore, MemorySessionStore, SessionError, SessionStore};

//! Tower layers for the transport stack
//!
//! - [`UserAgentLayer`] - Adds User-Agent header to requests that lack one
//! - [`CookieJarLayer`] - Stores `Set-Cookie` values and replays them per host
//! - [`TraceLayer`] - One `tracing` span per outgoing request

mod cookie;
mod trace;
mod user_agent;

pub use cookie::{CookieJar, CookieJarLayer, CookieJarService};
pub use trace::{TraceLayer, TraceService};
pub use user_agent::{UserAgentLayer, UserAgentService};

//! Blocking client for the Openfire REST API plugin.
//!
//! # Overview
//! Wraps the XMPP server's user, group and lockout administration endpoints
//! in typed operations: each method builds one HTTP request, runs it, and
//! turns the JSON that comes back into [`User`]/[`Group`] values.
//!
//! # Design
//! - [`OpenfireClient`] holds immutable [`Settings`] and a [`Transport`];
//!   every operation is a single blocking round trip with no retries and
//!   no caching.
//! - The plugin returns a bare object where a collection has one element
//!   and omits the field when it has none; the client normalizes both
//!   shapes, so collection-returning operations always yield a `Vec`.
//! - Errors are explicit: every operation returns `Result<_, ApiError>`,
//!   with 404 distinguished as [`ApiError::NotFound`] from other HTTP
//!   failures and from transport-level ones.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::OpenfireClient;
pub use config::Settings;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{Group, User};

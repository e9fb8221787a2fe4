//! Error types for the Openfire REST API client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the requested user or group does not exist" from "the server returned an
//! unexpected status." All other non-success responses land in `HttpError`
//! with the raw status code and body for debugging; failures below HTTP
//! (DNS, refused connections, timeouts) land in `TransportError`.

use std::fmt;

/// Errors returned by `OpenfireClient` operations.
#[derive(Debug)]
pub enum ApiError {
    /// The server returned 404 — the requested user or group does not exist.
    NotFound,

    /// The server returned a non-success status other than 404.
    HttpError { status: u16, body: String },

    /// The request never produced an HTTP response.
    TransportError(String),

    /// The response body could not be deserialized into the expected type.
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    SerializationError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "resource not found"),
            ApiError::HttpError { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            ApiError::TransportError(msg) => {
                write!(f, "transport failed: {msg}")
            }
            ApiError::DeserializationError(msg) => {
                write!(f, "deserialization failed: {msg}")
            }
            ApiError::SerializationError(msg) => {
                write!(f, "serialization failed: {msg}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

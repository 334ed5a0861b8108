//! Error types for the Jamf API client.
//!
//! Only failures that happen before any network I/O are surfaced as
//! `ApiError`; everything after a request leaves the client is captured in
//! the [`ApiResponse`](super::response::ApiResponse) envelope instead.

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("failed to retrieve API schema: {0}")]
    SchemaUnavailable(String),

    #[error("malformed API schema: {0}")]
    SchemaMalformed(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("authentication failed: {0}")]
    Auth(String),
}

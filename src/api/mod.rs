//! Jamf Pro API module.
//!
//! One client per API family, each synthesizing its callable operations from
//! the server's published schema at connect time. Calls resolve to a uniform
//! [`ApiResponse`] envelope; session credentials are acquired and renewed
//! behind the scenes.

pub mod client;
pub mod constants;
pub mod error;
pub mod naming;
pub mod registry;
pub mod response;
pub mod schema;
pub mod session;
pub mod transport;

pub use client::{
    AcceptFormat, ClassicClient, ClientConfig, ProClient, disable_warnings, with_client,
};
pub use error::ApiError;
pub use registry::{CallArgs, OperationEntry, OperationRegistry};
pub use response::ApiResponse;
pub use schema::{
    ApiFamily, Endpoint, EndpointParam, HttpMethod, LocalSchema, ParamLocation, ParsedSchema,
    RemoteSchema, SchemaSource, parse_classic, parse_pro,
};
pub use session::{Credential, SessionManager};
pub use transport::{
    HttpTransport, Payload, Transport, TransportError, TransportRequest, TransportResponse,
};

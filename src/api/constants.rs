//! Endpoint paths and shared header values for the Jamf Pro APIs

/// Schema document for the classic API, served as swagger YAML
pub const CLASSIC_SCHEMA_PATH: &str = "/classicapi/doc/swagger.yaml";

/// Schema document for the pro API, served as OpenAPI JSON
pub const PRO_SCHEMA_PATH: &str = "/api/schema/";

/// Token issue endpoint (basic auth in, bearer token out)
pub const AUTH_TOKEN_PATH: &str = "/api/v1/auth/token";

/// Token invalidation endpoint
pub const AUTH_INVALIDATE_PATH: &str = "/api/v1/auth/invalidate-token";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Token lifetime assumed when the login response carries no usable expiry
pub const TOKEN_LIFETIME_FALLBACK_SECS: u64 = 30 * 60;

/// User agent sent on every request
pub const USER_AGENT: &str = "jamf-cli/0.1";

/// Standard header names and values for Jamf requests
pub mod headers {
    pub const ACCEPT: &str = "Accept";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CONTENT_TYPE: &str = "Content-Type";

    pub const APPLICATION_JSON: &str = "application/json";
    pub const APPLICATION_XML: &str = "application/xml";
    pub const ACCEPT_ANY: &str = "*/*";
}

/// Normalize a server URL so bare hostnames and trailing slashes are tolerated
pub fn format_base_url(url: &str) -> String {
    let url = url.trim();
    let with_scheme = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

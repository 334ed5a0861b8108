//! Schema documents → endpoint descriptors.
//!
//! Both API families publish a path-keyed, verb-keyed operation catalog: the
//! classic API as swagger YAML, the pro API as OpenAPI JSON. Parsing yields a
//! flat, document-ordered list of [`Endpoint`]s; that order is load-bearing,
//! it drives name collision tie-breaking downstream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::constants::headers;
use super::error::ApiError;
use super::transport::{Transport, TransportRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    Classic,
    Pro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Lowercase verb, used for operation name qualification.
    pub fn verb(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
        }
    }

    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

#[derive(Debug, Clone)]
pub struct EndpointParam {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
}

/// One documented operation: verb + path template + declared parameters.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    /// Descriptive label from the schema, feeds name derivation.
    pub tag: String,
    pub params: Vec<EndpointParam>,
}

#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub base_path: String,
    pub endpoints: Vec<Endpoint>,
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_-]+)\}").unwrap());

/// Named placeholders of a path template, in template order.
pub fn placeholders(path: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(path)
        .map(|captures| captures.get(1).unwrap().as_str())
        .collect()
}

/// Parse the classic API's swagger YAML document.
pub fn parse_classic(text: &str) -> Result<ParsedSchema, ApiError> {
    let doc: Value = serde_yaml::from_str(text)
        .map_err(|e| ApiError::SchemaMalformed(format!("invalid YAML: {e}")))?;
    let base_path = doc
        .get("basePath")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::SchemaMalformed("missing basePath".into()))?
        .trim_end_matches('/')
        .to_string();
    let endpoints = collect_endpoints(&doc)?;
    Ok(ParsedSchema {
        base_path,
        endpoints,
    })
}

/// Parse the pro API's OpenAPI JSON document.
pub fn parse_pro(text: &str) -> Result<ParsedSchema, ApiError> {
    let doc: Value = serde_json::from_str(text)
        .map_err(|e| ApiError::SchemaMalformed(format!("invalid JSON: {e}")))?;
    let base_path = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::SchemaMalformed("missing servers[0].url".into()))?
        .trim_end_matches('/')
        .to_string();
    let endpoints = collect_endpoints(&doc)?;
    Ok(ParsedSchema {
        base_path,
        endpoints,
    })
}

fn collect_endpoints(doc: &Value) -> Result<Vec<Endpoint>, ApiError> {
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::SchemaMalformed("missing paths".into()))?;

    let mut endpoints = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            warn!("skipping malformed schema entry for {path}");
            continue;
        };
        for (key, details) in item {
            let Some(method) = HttpMethod::from_key(key) else {
                continue;
            };
            match parse_endpoint(path, method, details) {
                Some(endpoint) => endpoints.push(endpoint),
                None => warn!("skipping malformed {key} entry for {path}"),
            }
        }
    }
    debug!("parsed {} endpoints from schema", endpoints.len());
    Ok(endpoints)
}

fn parse_endpoint(path: &str, method: HttpMethod, details: &Value) -> Option<Endpoint> {
    let details = details.as_object()?;

    let tag = details
        .get("operationId")
        .and_then(Value::as_str)
        .or_else(|| details.get("summary").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", method.verb(), path));

    let mut params = Vec::new();
    if let Some(list) = details.get("parameters").and_then(Value::as_array) {
        for param in list {
            let name = param.get("name").and_then(Value::as_str)?;
            let location = match param.get("in").and_then(Value::as_str)? {
                "path" => ParamLocation::Path,
                "query" => ParamLocation::Query,
                _ => continue,
            };
            let required = param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(location == ParamLocation::Path);
            params.push(EndpointParam {
                name: name.to_string(),
                location,
                required,
            });
        }
    }

    // Placeholders the schema forgot to declare are still required.
    for name in placeholders(path) {
        let declared = params
            .iter()
            .any(|p| p.location == ParamLocation::Path && p.name == name);
        if !declared {
            params.push(EndpointParam {
                name: name.to_string(),
                location: ParamLocation::Path,
                required: true,
            });
        }
    }

    Some(Endpoint {
        method,
        path: path.to_string(),
        tag,
        params,
    })
}

/// Supplier of a raw schema document.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch(&self) -> Result<String, ApiError>;
}

/// Fetches the schema document from the server's discovery endpoint.
pub struct RemoteSchema {
    url: String,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    verify_tls: bool,
}

impl RemoteSchema {
    pub fn new(
        url: String,
        transport: Arc<dyn Transport>,
        timeout: Duration,
        verify_tls: bool,
    ) -> Self {
        Self {
            url,
            transport,
            timeout,
            verify_tls,
        }
    }
}

#[async_trait]
impl SchemaSource for RemoteSchema {
    async fn fetch(&self) -> Result<String, ApiError> {
        debug!("fetching API schema from {}", self.url);
        let request = TransportRequest {
            method: HttpMethod::Get,
            url: self.url.clone(),
            headers: vec![(headers::ACCEPT.to_string(), headers::ACCEPT_ANY.to_string())],
            body: None,
            timeout: self.timeout,
            verify_tls: self.verify_tls,
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ApiError::SchemaUnavailable(format!("{}: {e}", self.url)))?;
        if !(200..300).contains(&response.status) {
            return Err(ApiError::SchemaUnavailable(format!(
                "HTTP {} from {}",
                response.status, self.url
            )));
        }
        Ok(response.body)
    }
}

/// A schema document supplied up front, for offline construction and tests.
pub struct LocalSchema(pub String);

#[async_trait]
impl SchemaSource for LocalSchema {
    async fn fetch(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}

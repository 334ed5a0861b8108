//! Client façades for the two Jamf API families.
//!
//! [`ClassicClient`] speaks the `/JSSResource` API with a static basic
//! credential; [`ProClient`] speaks the `/api` family with a renewable
//! bearer token. Both synthesize their operation surface from the server's
//! schema document at connect time and route every call, named or raw,
//! through one dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use log::{debug, info, warn};
use serde_json::Value;

use super::constants::{
    self, AUTH_INVALIDATE_PATH, CLASSIC_SCHEMA_PATH, PRO_SCHEMA_PATH, format_base_url, headers,
};
use super::error::ApiError;
use super::registry::{CallArgs, OperationRegistry};
use super::response::ApiResponse;
use super::schema::{
    ApiFamily, HttpMethod, ParamLocation, RemoteSchema, SchemaSource, parse_classic, parse_pro,
};
use super::session::SessionManager;
use super::transport::{HttpTransport, Payload, Transport, TransportRequest};

/// Process-wide toggle, shared by every client instance.
static TLS_WARNINGS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Suppress the warning emitted when TLS verification is off. Idempotent and
/// process-wide, like the warning state it controls.
pub fn disable_warnings() {
    TLS_WARNINGS_DISABLED.store(true, Ordering::Relaxed);
}

fn warnings_disabled() -> bool {
    TLS_WARNINGS_DISABLED.load(Ordering::Relaxed)
}

/// `Accept` format for classic API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptFormat {
    #[default]
    Json,
    Xml,
}

/// Connection settings. The URL and credentials are fixed once a client is
/// built; timeout and TLS verification stay adjustable on the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
    pub verify_tls: bool,
    pub disable_warnings: bool,
    pub accept_format: AcceptFormat,
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            verify_tls: true,
            disable_warnings: false,
            accept_format: AcceptFormat::default(),
        }
    }
}

struct ClientCore {
    family: ApiFamily,
    base_url: String,
    accept_format: AcceptFormat,
    transport: Arc<dyn Transport>,
    schema_source: Arc<dyn SchemaSource>,
    session: SessionManager,
    registry: ArcSwap<OperationRegistry>,
    timeout_secs: AtomicU64,
    verify_tls: AtomicBool,
}

impl ClientCore {
    async fn connect(
        family: ApiFamily,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        schema_source: Arc<dyn SchemaSource>,
    ) -> Result<Self, ApiError> {
        let base_url = format_base_url(&config.base_url);
        if config.disable_warnings {
            disable_warnings();
        }

        let text = schema_source.fetch().await?;
        let parsed = match family {
            ApiFamily::Classic => parse_classic(&text)?,
            ApiFamily::Pro => parse_pro(&text)?,
        };
        let registry = OperationRegistry::build(parsed, family);
        info!(
            "synthesized {} operations from the {} schema",
            registry.len(),
            match family {
                ApiFamily::Classic => "classic",
                ApiFamily::Pro => "pro",
            }
        );

        let session = match family {
            ApiFamily::Classic => SessionManager::basic(&config.username, &config.password),
            ApiFamily::Pro => SessionManager::token(&config.username, &config.password, &base_url),
        };

        Ok(Self {
            family,
            base_url,
            accept_format: config.accept_format,
            transport,
            schema_source,
            session,
            registry: ArcSwap::from_pointee(registry),
            timeout_secs: AtomicU64::new(config.timeout_secs),
            verify_tls: AtomicBool::new(config.verify_tls),
        })
    }

    fn current_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.load(Ordering::Relaxed))
    }

    fn current_verify(&self) -> bool {
        self.verify_tls.load(Ordering::Relaxed)
    }

    fn request_headers(&self, auth: &str, body: Option<&Payload>) -> Vec<(String, String)> {
        let accept = match (self.family, self.accept_format) {
            (ApiFamily::Classic, AcceptFormat::Xml) => headers::APPLICATION_XML,
            _ => headers::APPLICATION_JSON,
        };
        let mut out = vec![
            (headers::ACCEPT.to_string(), accept.to_string()),
            (headers::AUTHORIZATION.to_string(), auth.to_string()),
        ];
        match body {
            Some(Payload::Xml(_)) => out.push((
                headers::CONTENT_TYPE.to_string(),
                headers::APPLICATION_XML.to_string(),
            )),
            Some(Payload::Json(_)) => out.push((
                headers::CONTENT_TYPE.to_string(),
                headers::APPLICATION_JSON.to_string(),
            )),
            None => {}
        }
        out
    }

    /// Send one request, classifying every outcome into an envelope. A 401
    /// from the pro API triggers a single renew-and-retry; a second auth
    /// failure is terminal for the call.
    async fn execute(&self, method: HttpMethod, url: String, body: Option<Payload>) -> ApiResponse {
        let timeout = self.current_timeout();
        let verify_tls = self.current_verify();
        if !verify_tls && !warnings_disabled() {
            warn!("TLS certificate verification is disabled for {url}");
        }

        let (auth, generation) = match self
            .session
            .authorization(self.transport.as_ref(), timeout, verify_tls)
            .await
        {
            Ok(pair) => pair,
            Err(message) => return ApiResponse::auth_failure(url, message),
        };

        let request = TransportRequest {
            method,
            url: url.clone(),
            headers: self.request_headers(&auth, body.as_ref()),
            body,
            timeout,
            verify_tls,
        };
        debug!("{} {}", method.as_str(), url);

        let response = match self.transport.send(request.clone()).await {
            Ok(response) => response,
            Err(error) => return ApiResponse::from_transport_error(url, &error),
        };

        if response.status == 401 && self.family == ApiFamily::Pro {
            info!("auth token rejected, renewing session");
            return match self
                .session
                .renew(self.transport.as_ref(), timeout, verify_tls, generation)
                .await
            {
                Ok((auth, _)) => {
                    let mut retry = request;
                    retry.headers = self.request_headers(&auth, retry.body.as_ref());
                    match self.transport.send(retry).await {
                        Ok(second) => ApiResponse::from_http(url, second.status, second.body),
                        Err(error) => ApiResponse::from_transport_error(url, &error),
                    }
                }
                Err(message) => ApiResponse::auth_failure(url, message),
            };
        }

        ApiResponse::from_http(url, response.status, response.body)
    }

    async fn invoke(&self, name: &str, args: CallArgs) -> Result<ApiResponse, ApiError> {
        let registry = self.registry.load_full();
        let entry = registry
            .get(name)
            .ok_or_else(|| ApiError::UnknownOperation(name.to_string()))?;
        let endpoint = &entry.endpoint;

        let path = substitute_path(&endpoint.path, &args)?;
        for param in &endpoint.params {
            if param.location == ParamLocation::Query
                && param.required
                && !args.has_query(&param.name)
            {
                return Err(ApiError::MissingParameter {
                    name: param.name.clone(),
                });
            }
        }
        let body = if endpoint.method.has_body() {
            Some(args.body().cloned().ok_or(ApiError::MissingParameter {
                name: "data".to_string(),
            })?)
        } else {
            None
        };

        let mut url = format!("{}{}{}", self.base_url, registry.base_path(), path);
        append_query(&mut url, args.query_pairs());
        Ok(self.execute(endpoint.method, url, body).await)
    }

    fn raw_url(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let registry = self.registry.load();
        let mut url = format!("{}{}", self.base_url, registry.base_path());
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        let pairs: Vec<(String, String)> = query
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        append_query(&mut url, &pairs);
        url
    }

    fn operation_names(&self) -> Vec<String> {
        self.registry
            .load()
            .names()
            .map(str::to_string)
            .collect()
    }

    /// Re-fetch the schema and swap the whole operation set in one step.
    async fn refresh_schema(&self) -> Result<usize, ApiError> {
        let text = self.schema_source.fetch().await?;
        let parsed = match self.family {
            ApiFamily::Classic => parse_classic(&text)?,
            ApiFamily::Pro => parse_pro(&text)?,
        };
        let registry = OperationRegistry::build(parsed, self.family);
        let count = registry.len();
        self.registry.store(Arc::new(registry));
        info!("refreshed schema, {count} operations");
        Ok(count)
    }
}

/// Substitute `{name}` placeholders from the call's path arguments,
/// percent-encoding the values. Fails before any I/O when a placeholder has
/// no supplied value.
fn substitute_path(template: &str, args: &CallArgs) -> Result<String, ApiError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &rest[start + 1..start + len];
        let value = args
            .path_value(name)
            .ok_or_else(|| ApiError::MissingParameter {
                name: name.to_string(),
            })?;
        out.push_str(&urlencoding::encode(value));
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn append_query(url: &mut String, pairs: &[(String, String)]) {
    for (i, (key, value)) in pairs.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(&urlencoding::encode(key));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
}

/// Client for the classic (`/JSSResource`) API.
pub struct ClassicClient {
    core: ClientCore,
}

impl ClassicClient {
    pub async fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
        let base_url = format_base_url(&config.base_url);
        let schema: Arc<dyn SchemaSource> = Arc::new(RemoteSchema::new(
            format!("{base_url}{CLASSIC_SCHEMA_PATH}"),
            Arc::clone(&transport),
            Duration::from_secs(config.timeout_secs),
            config.verify_tls,
        ));
        Self::connect_with(config, transport, schema).await
    }

    /// Construct against explicit transport and schema collaborators.
    pub async fn connect_with(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        schema_source: Arc<dyn SchemaSource>,
    ) -> Result<Self, ApiError> {
        let core = ClientCore::connect(ApiFamily::Classic, config, transport, schema_source).await?;
        Ok(Self { core })
    }

    /// Call a synthesized operation by name.
    pub async fn invoke(&self, name: &str, args: CallArgs) -> Result<ApiResponse, ApiError> {
        self.core.invoke(name, args).await
    }

    pub async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core.execute(HttpMethod::Get, url, None).await
    }

    pub async fn delete(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core.execute(HttpMethod::Delete, url, None).await
    }

    pub async fn post(
        &self,
        body: impl Into<String>,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core
            .execute(HttpMethod::Post, url, Some(Payload::Xml(body.into())))
            .await
    }

    pub async fn put(
        &self,
        body: impl Into<String>,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core
            .execute(HttpMethod::Put, url, Some(Payload::Xml(body.into())))
            .await
    }

    pub fn operation_names(&self) -> Vec<String> {
        self.core.operation_names()
    }

    pub async fn refresh_schema(&self) -> Result<usize, ApiError> {
        self.core.refresh_schema().await
    }

    pub fn timeout(&self) -> u64 {
        self.core.timeout_secs.load(Ordering::Relaxed)
    }

    pub fn set_timeout(&self, secs: u64) {
        self.core.timeout_secs.store(secs, Ordering::Relaxed);
    }

    pub fn verify_ssl(&self) -> bool {
        self.core.current_verify()
    }

    pub fn set_verify_ssl(&self, verify: bool) {
        self.core.verify_tls.store(verify, Ordering::Relaxed);
    }
}

/// Client for the pro (`/api`) API.
pub struct ProClient {
    core: ClientCore,
}

impl ProClient {
    pub async fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
        let base_url = format_base_url(&config.base_url);
        let schema: Arc<dyn SchemaSource> = Arc::new(RemoteSchema::new(
            format!("{base_url}{PRO_SCHEMA_PATH}"),
            Arc::clone(&transport),
            Duration::from_secs(config.timeout_secs),
            config.verify_tls,
        ));
        Self::connect_with(config, transport, schema).await
    }

    /// Construct against explicit transport and schema collaborators. Logs
    /// in eagerly; a failed login is fatal here rather than per-call.
    pub async fn connect_with(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        schema_source: Arc<dyn SchemaSource>,
    ) -> Result<Self, ApiError> {
        let core = ClientCore::connect(ApiFamily::Pro, config, transport, schema_source).await?;
        core.session
            .authorization(core.transport.as_ref(), core.current_timeout(), core.current_verify())
            .await
            .map_err(ApiError::Auth)?;
        Ok(Self { core })
    }

    /// Call a synthesized operation by name.
    pub async fn invoke(&self, name: &str, args: CallArgs) -> Result<ApiResponse, ApiError> {
        self.core.invoke(name, args).await
    }

    pub async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core.execute(HttpMethod::Get, url, None).await
    }

    pub async fn delete(&self, segments: &[&str], query: &[(&str, &str)]) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core.execute(HttpMethod::Delete, url, None).await
    }

    pub async fn post(
        &self,
        body: Value,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core
            .execute(HttpMethod::Post, url, Some(Payload::Json(body)))
            .await
    }

    pub async fn put(&self, body: Value, segments: &[&str], query: &[(&str, &str)]) -> ApiResponse {
        let url = self.core.raw_url(segments, query);
        self.core
            .execute(HttpMethod::Put, url, Some(Payload::Json(body)))
            .await
    }

    /// Invalidate the session token. Returns `None` when no token is held.
    pub async fn logout(&self) -> Option<ApiResponse> {
        let auth = self.core.session.take_credential().await?;
        let url = format!("{}{AUTH_INVALIDATE_PATH}", self.core.base_url);
        let request = TransportRequest {
            method: HttpMethod::Post,
            url: url.clone(),
            headers: vec![
                (headers::AUTHORIZATION.to_string(), auth),
                (headers::ACCEPT.to_string(), headers::ACCEPT_ANY.to_string()),
            ],
            body: None,
            timeout: self.core.current_timeout(),
            verify_tls: self.core.current_verify(),
        };
        info!("invalidating session token");
        Some(match self.core.transport.send(request).await {
            Ok(response) => ApiResponse::from_http(url, response.status, response.body),
            Err(error) => ApiResponse::from_transport_error(url, &error),
        })
    }

    pub fn operation_names(&self) -> Vec<String> {
        self.core.operation_names()
    }

    pub async fn refresh_schema(&self) -> Result<usize, ApiError> {
        self.core.refresh_schema().await
    }

    pub fn timeout(&self) -> u64 {
        self.core.timeout_secs.load(Ordering::Relaxed)
    }

    pub fn set_timeout(&self, secs: u64) {
        self.core.timeout_secs.store(secs, Ordering::Relaxed);
    }

    pub fn verify_ssl(&self) -> bool {
        self.core.current_verify()
    }

    pub fn set_verify_ssl(&self, verify: bool) {
        self.core.verify_tls.store(verify, Ordering::Relaxed);
    }
}

/// Run `f` against a pro client, invalidating the session token when the
/// scoped future completes, whatever its outcome was.
pub async fn with_client<T, F, Fut>(config: ClientConfig, f: F) -> Result<T, ApiError>
where
    F: FnOnce(Arc<ProClient>) -> Fut,
    Fut: Future<Output = T>,
{
    let client = Arc::new(ProClient::connect(config).await?);
    let result = f(Arc::clone(&client)).await;
    let _ = client.logout().await;
    Ok(result)
}

//! Credential and session lifecycle.
//!
//! The classic API authenticates every request with a static basic
//! credential computed once at construction. The pro API trades the same
//! username/password for a time-limited bearer token via
//! `POST /api/v1/auth/token`; the token is replaced wholesale on renewal,
//! never mutated. All token state transitions happen under one async mutex,
//! with a generation counter so concurrent callers observing the same stale
//! token trigger at most one renewal between them.

use std::time::{Duration, SystemTime};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info};
use serde_json::Value;
use tokio::sync::Mutex;

use super::constants::{self, headers};
use super::schema::HttpMethod;
use super::transport::{Transport, TransportRequest};

/// An auth credential. Renewal replaces the whole value.
#[derive(Debug, Clone)]
pub enum Credential {
    Basic(String),
    Bearer {
        token: String,
        expires_at: SystemTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionMode {
    Basic,
    Token,
}

#[derive(Debug, Default)]
struct TokenState {
    credential: Option<Credential>,
    generation: u64,
}

pub struct SessionManager {
    mode: SessionMode,
    username: String,
    password: String,
    login_url: String,
    inner: Mutex<TokenState>,
}

impl SessionManager {
    /// Static basic-auth session for the classic API. Never expires, never
    /// renews.
    pub fn basic(username: &str, password: &str) -> Self {
        let header = basic_header(username, password);
        Self {
            mode: SessionMode::Basic,
            username: username.to_string(),
            password: password.to_string(),
            login_url: String::new(),
            inner: Mutex::new(TokenState {
                credential: Some(Credential::Basic(header)),
                generation: 0,
            }),
        }
    }

    /// Bearer-token session for the pro API. Logs in on first use.
    pub fn token(username: &str, password: &str, base_url: &str) -> Self {
        Self {
            mode: SessionMode::Token,
            username: username.to_string(),
            password: password.to_string(),
            login_url: format!("{base_url}{}", constants::AUTH_TOKEN_PATH),
            inner: Mutex::new(TokenState::default()),
        }
    }

    /// Current `Authorization` header value plus the credential generation it
    /// belongs to. Logs in when no usable token is held.
    pub async fn authorization(
        &self,
        transport: &dyn Transport,
        timeout: Duration,
        verify_tls: bool,
    ) -> Result<(String, u64), String> {
        let mut state = self.inner.lock().await;
        match &state.credential {
            Some(Credential::Basic(header)) => return Ok((header.clone(), state.generation)),
            Some(Credential::Bearer { token, expires_at })
                if SystemTime::now() < *expires_at =>
            {
                return Ok((format!("Bearer {token}"), state.generation));
            }
            _ => {}
        }
        if self.mode != SessionMode::Token {
            return Err("session has been closed".to_string());
        }
        let header = self.login(&mut state, transport, timeout, verify_tls).await?;
        Ok((header, state.generation))
    }

    /// Renew after an observed auth failure. If another caller already
    /// renewed past `observed_generation`, the fresh token is returned
    /// without a second login.
    pub async fn renew(
        &self,
        transport: &dyn Transport,
        timeout: Duration,
        verify_tls: bool,
        observed_generation: u64,
    ) -> Result<(String, u64), String> {
        if self.mode == SessionMode::Basic {
            return Err("basic credentials cannot be renewed".to_string());
        }
        let mut state = self.inner.lock().await;
        if state.generation != observed_generation {
            if let Some(Credential::Bearer { token, .. }) = &state.credential {
                debug!("token already renewed by a concurrent call");
                return Ok((format!("Bearer {token}"), state.generation));
            }
        }
        state.credential = None;
        info!("renewing expired session token");
        let header = self.login(&mut state, transport, timeout, verify_tls).await?;
        Ok((header, state.generation))
    }

    /// Take the bearer credential out of the session, leaving it closed.
    /// Basic credentials are not taken; the classic API has no logout.
    pub async fn take_credential(&self) -> Option<String> {
        let mut state = self.inner.lock().await;
        match state.credential.take() {
            Some(Credential::Bearer { token, .. }) => Some(format!("Bearer {token}")),
            Some(basic @ Credential::Basic(_)) => {
                state.credential = Some(basic);
                None
            }
            None => None,
        }
    }

    async fn login(
        &self,
        state: &mut TokenState,
        transport: &dyn Transport,
        timeout: Duration,
        verify_tls: bool,
    ) -> Result<String, String> {
        debug!("authenticating to {}", self.login_url);
        let request = TransportRequest {
            method: HttpMethod::Post,
            url: self.login_url.clone(),
            headers: vec![
                (
                    headers::AUTHORIZATION.to_string(),
                    basic_header(&self.username, &self.password),
                ),
                (headers::ACCEPT.to_string(), headers::APPLICATION_JSON.to_string()),
            ],
            body: None,
            timeout,
            verify_tls,
        };

        let response = transport
            .send(request)
            .await
            .map_err(|e| format!("authentication request failed: {e}"))?;
        if !(200..300).contains(&response.status) {
            return Err(format!(
                "authentication failed: HTTP {} {}",
                response.status, response.body
            ));
        }

        let (token, expires_at) = parse_login_response(&response.body)?;
        state.credential = Some(Credential::Bearer {
            token: token.clone(),
            expires_at,
        });
        state.generation += 1;
        debug!("session token acquired, generation {}", state.generation);
        Ok(format!("Bearer {token}"))
    }
}

fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
}

/// Extract `{token, expires}` from a login response. A missing or
/// unparseable expiry falls back to a fixed lifetime from now.
fn parse_login_response(body: &str) -> Result<(String, SystemTime), String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| format!("malformed authentication response: {e}"))?;
    let token = value
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| "no token in authentication response".to_string())?
        .to_string();
    let expires_at = value
        .get("expires")
        .and_then(Value::as_str)
        .and_then(|text| chrono::DateTime::parse_from_rfc3339(text).ok())
        .map(SystemTime::from)
        .unwrap_or_else(|| {
            SystemTime::now() + Duration::from_secs(constants::TOKEN_LIFETIME_FALLBACK_SECS)
        });
    Ok((token, expires_at))
}

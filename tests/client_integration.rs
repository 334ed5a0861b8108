//! End-to-end client behavior against a mock HTTP server and an in-memory
//! transport.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jamf_cli::api::{
    ApiError, CallArgs, ClassicClient, ClientConfig, LocalSchema, ProClient, SchemaSource,
    Transport, TransportError, TransportRequest, TransportResponse,
};

const CLASSIC_SCHEMA: &str = r#"
swagger: "2.0"
basePath: /JSSResource
paths:
  /computers:
    get:
      operationId: findComputers
    post:
      operationId: createComputer
  /computers/id/{id}:
    get:
      operationId: findComputersById
      parameters:
        - name: id
          in: path
          required: true
        - name: subset
          in: query
          required: false
"#;

const PRO_SCHEMA: &str = r#"{
    "servers": [{"url": "/api"}],
    "paths": {
        "/v1/scripts": {
            "get": {"operationId": "getScripts"}
        },
        "/v1/scripts/{id}": {
            "get": {"operationId": "getScriptById"}
        }
    }
}"#;

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri(), "admin", "secret")
}

fn token_body(token: &str) -> serde_json::Value {
    json!({"token": token, "expires": "2099-01-01T00:00:00Z"})
}

/// In-memory transport that records every request and plays back queued
/// responses, defaulting to an empty 200.
#[derive(Default)]
struct RecordingTransport {
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
}

impl RecordingTransport {
    fn push_response(&self, response: Result<TransportResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TransportResponse {
                    status: 200,
                    body: "{}".to_string(),
                    headers: Vec::new(),
                })
            })
    }
}

async fn classic_with_recorder() -> (ClassicClient, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let client = ClassicClient::connect_with(
        ClientConfig::new("https://jss.example.com", "admin", "secret"),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::new(LocalSchema(CLASSIC_SCHEMA.to_string())),
    )
    .await
    .unwrap();
    (client, transport)
}

#[tokio::test]
async fn classic_invoke_builds_url_and_sends_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/classicapi/doc/swagger.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CLASSIC_SCHEMA))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/JSSResource/computers/id/100"))
        .and(query_param("subset", "general"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<computer><id>100</id><name>kiosk</name></computer>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ClassicClient::connect(config_for(&server)).await.unwrap();
    let envelope = client
        .invoke(
            "get_find_computers_by_id",
            CallArgs::new().path("id", 100).query("subset", "general"),
        )
        .await
        .unwrap();

    assert!(envelope.success());
    assert_eq!(envelope.http_code(), 200);
    assert_eq!(
        envelope.url(),
        Some(format!("{}/JSSResource/computers/id/100?subset=general", server.uri()).as_str())
    );
    assert!(envelope.is_structured());
    assert_eq!(envelope.data().unwrap()["computer"]["id"], "100");
}

#[tokio::test]
async fn classic_raw_get_resolves_to_expected_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/classicapi/doc/swagger.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CLASSIC_SCHEMA))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/JSSResource/computers/id/100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"computer": {"id": 100}}"#))
        .mount(&server)
        .await;

    let client = ClassicClient::connect(config_for(&server)).await.unwrap();
    let envelope = client.get(&["computers", "id", "100"], &[]).await;

    assert!(envelope.success());
    assert_eq!(
        envelope.url(),
        Some(format!("{}/JSSResource/computers/id/100", server.uri()).as_str())
    );
}

#[tokio::test]
async fn pro_renews_once_on_auth_failure_and_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRO_SCHEMA))
        .mount(&server)
        .await;
    // First login at connect, second on renewal; no third
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/scripts/7"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"httpStatus": 401}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/scripts/7"))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "7"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProClient::connect(config_for(&server)).await.unwrap();
    let envelope = client
        .invoke("get_script_by_id_v1", CallArgs::new().path("id", 7))
        .await
        .unwrap();

    assert!(envelope.success());
    assert_eq!(envelope.data().unwrap()["id"], "7");
}

#[tokio::test]
async fn pro_second_auth_failure_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRO_SCHEMA))
        .mount(&server)
        .await;
    // Exactly two logins: connect plus one renewal
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/scripts/7"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"httpStatus": 401}"#))
        .expect(2)
        .mount(&server)
        .await;

    let client = ProClient::connect(config_for(&server)).await.unwrap();
    let envelope = client
        .invoke("get_script_by_id_v1", CallArgs::new().path("id", 7))
        .await
        .unwrap();

    assert!(!envelope.success());
    assert_eq!(envelope.http_code(), 401);
}

#[tokio::test]
async fn pro_renewal_failure_surfaces_in_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRO_SCHEMA))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("login exploded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/scripts/7"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"httpStatus": 401}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProClient::connect(config_for(&server)).await.unwrap();
    let envelope = client
        .invoke("get_script_by_id_v1", CallArgs::new().path("id", 7))
        .await
        .unwrap();

    assert!(!envelope.success());
    assert_eq!(envelope.http_code(), 401);
    assert!(envelope.error().unwrap().contains("authentication failed"));
}

#[tokio::test]
async fn pro_logout_invalidates_token_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRO_SCHEMA))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/invalidate-token"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProClient::connect(config_for(&server)).await.unwrap();
    let envelope = client.logout().await.unwrap();
    assert!(envelope.success());

    // Token already gone, nothing left to invalidate
    assert!(client.logout().await.is_none());
}

#[tokio::test]
async fn missing_required_path_parameter_makes_no_network_call() {
    let (client, transport) = classic_with_recorder().await;

    let err = client
        .invoke("get_find_computers_by_id", CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MissingParameter { name } if name == "id"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn missing_body_on_post_makes_no_network_call() {
    let (client, transport) = classic_with_recorder().await;

    let err = client
        .invoke("post_create_computer", CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MissingParameter { name } if name == "data"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn unknown_operation_is_rejected_before_io() {
    let (client, transport) = classic_with_recorder().await;

    let err = client
        .invoke("no_such_operation", CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::UnknownOperation(_)));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn transport_failure_yields_code_zero_envelope() {
    let (client, transport) = classic_with_recorder().await;
    transport.push_response(Err(TransportError::Connection("connection refused".into())));

    let envelope = client.get(&["computers"], &[]).await;

    assert!(!envelope.success());
    assert_eq!(envelope.http_code(), 0);
    assert!(envelope.error().unwrap().contains("connection refused"));
    assert_eq!(
        envelope.url(),
        Some("https://jss.example.com/JSSResource/computers")
    );
}

#[tokio::test]
async fn timeout_and_verify_settings_apply_to_later_requests() {
    let (client, transport) = classic_with_recorder().await;

    assert_eq!(client.timeout(), 180);
    assert!(client.verify_ssl());

    client.set_timeout(30);
    client.set_verify_ssl(false);
    assert_eq!(client.timeout(), 30);
    assert!(!client.verify_ssl());

    let _ = client.get(&["computers"], &[]).await;
    let request = transport.last_request().unwrap();
    assert_eq!(request.timeout.as_secs(), 30);
    assert!(!request.verify_tls);
}

/// Schema source that serves a different document on each fetch.
struct RotatingSchema {
    documents: Mutex<VecDeque<String>>,
}

#[async_trait]
impl SchemaSource for RotatingSchema {
    async fn fetch(&self) -> Result<String, ApiError> {
        self.documents
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::SchemaUnavailable("no more documents".into()))
    }
}

#[tokio::test]
async fn refresh_replaces_the_operation_set_atomically() {
    let narrower = r#"
swagger: "2.0"
basePath: /JSSResource
paths:
  /computers:
    get:
      operationId: findComputers
"#;
    let schema = RotatingSchema {
        documents: Mutex::new(VecDeque::from([
            CLASSIC_SCHEMA.to_string(),
            narrower.to_string(),
        ])),
    };
    let transport = Arc::new(RecordingTransport::default());
    let client = ClassicClient::connect_with(
        ClientConfig::new("https://jss.example.com", "admin", "secret"),
        transport as Arc<dyn Transport>,
        Arc::new(schema),
    )
    .await
    .unwrap();

    assert_eq!(client.operation_names().len(), 3);

    let count = client.refresh_schema().await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(client.operation_names(), vec!["get_find_computers"]);

    // Source exhausted: refresh fails, the old set stays intact
    assert!(client.refresh_schema().await.is_err());
    assert_eq!(client.operation_names(), vec!["get_find_computers"]);
}

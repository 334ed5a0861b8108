//! Schema parsing and operation synthesis properties.

use jamf_cli::api::{ApiError, ApiFamily, OperationRegistry, parse_classic, parse_pro};

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
    put:
      operationId: updateComputerById
      parameters:
        - name: id
          in: path
          required: true
    delete:
      operationId: deleteComputerById
      parameters:
        - name: id
          in: path
          required: true
  /mobiledevices:
    get:
      operationId: findMobileDevices
"#;

const PRO_SCHEMA: &str = r#"{
    "servers": [{"url": "/api"}],
    "paths": {
        "/v1/scripts": {
            "get": {"operationId": "getScripts"},
            "post": {"operationId": "createScript"}
        },
        "/v1/scripts/{id}": {
            "get": {"operationId": "getScriptById"}
        },
        "/v2/scripts/{id}": {
            "get": {"operationId": "getScriptById"}
        }
    }
}"#;

#[test]
fn every_well_formed_entry_synthesizes_one_operation() {
    let schema = parse_classic(CLASSIC_SCHEMA).unwrap();
    assert_eq!(schema.endpoints.len(), 6);

    let registry = OperationRegistry::build(schema, ApiFamily::Classic);
    assert_eq!(registry.len(), 6);

    let names: Vec<_> = registry.names().collect();
    let mut deduped = names.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), names.len(), "names must be unique: {names:?}");
}

#[test]
fn synthesis_is_deterministic_across_parses() {
    let first: Vec<String> = OperationRegistry::build(
        parse_classic(CLASSIC_SCHEMA).unwrap(),
        ApiFamily::Classic,
    )
    .names()
    .map(str::to_string)
    .collect();
    let second: Vec<String> = OperationRegistry::build(
        parse_classic(CLASSIC_SCHEMA).unwrap(),
        ApiFamily::Classic,
    )
    .names()
    .map(str::to_string)
    .collect();
    assert_eq!(first, second);
}

#[test]
fn pro_versions_synthesize_distinct_names() {
    let registry =
        OperationRegistry::build(parse_pro(PRO_SCHEMA).unwrap(), ApiFamily::Pro);
    let names: Vec<_> = registry.names().collect();
    assert!(names.contains(&"get_script_by_id_v1"));
    assert!(names.contains(&"get_script_by_id_v2"));

    let v1 = registry.get("get_script_by_id_v1").unwrap();
    assert_eq!(v1.endpoint.path, "/v1/scripts/{id}");
    let v2 = registry.get("get_script_by_id_v2").unwrap();
    assert_eq!(v2.endpoint.path, "/v2/scripts/{id}");
}

#[test]
fn malformed_entries_are_skipped_but_parse_succeeds() {
    let text = r#"
swagger: "2.0"
basePath: /JSSResource
paths:
  /computers:
    get:
      operationId: findComputers
  /broken: 17
  /printers:
    get:
      operationId: findPrinters
      parameters:
        - in: query
"#;
    let schema = parse_classic(text).unwrap();
    let tags: Vec<_> = schema.endpoints.iter().map(|e| e.tag.as_str()).collect();
    assert_eq!(tags, vec!["findComputers"]);
}

#[test]
fn structurally_malformed_documents_are_fatal() {
    assert!(matches!(
        parse_classic("basePath: /JSSResource"),
        Err(ApiError::SchemaMalformed(_))
    ));
    assert!(matches!(
        parse_pro(r#"{"paths": {}}"#),
        Err(ApiError::SchemaMalformed(_))
    ));
    assert!(matches!(
        parse_pro("not json at all"),
        Err(ApiError::SchemaMalformed(_))
    ));
}

#[test]
fn collisions_resolve_in_document_order() {
    let text = r#"{
        "servers": [{"url": "/api"}],
        "paths": {
            "/v1/alpha": {
                "get": {"operationId": "status"}
            },
            "/v1/beta": {
                "get": {"operationId": "status"}
            },
            "/v1/gamma": {
                "get": {"operationId": "status"}
            }
        }
    }"#;
    let registry = OperationRegistry::build(parse_pro(text).unwrap(), ApiFamily::Pro);
    let names: Vec<_> = registry.names().collect();
    assert_eq!(
        names,
        vec!["get_status_v1", "get_status_v1_2", "get_status_v1_3"]
    );
    assert_eq!(registry.get("get_status_v1").unwrap().endpoint.path, "/v1/alpha");
}

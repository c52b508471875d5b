//! Request validation through the full registration path
//!
//! Each case registers a route (function handler or view), runs
//! `setup_swagger` with a swagger file merged with the generated operations
//! and validation on, then drives the resulting `AppService` in-process.
//! Error responses carry an `error` object; accepted requests reach the
//! handler, which answers `OK` or echoes the validated data.

use http::Method;
use swagger_gate::app::{App, RouteOptions, SwaggerConfig};
use swagger_gate::runtime_config::RuntimeConfig;
use swagger_gate::{DocumentProvider, Handler, HandlerRequest, HandlerResponse, MethodOptions, ViewTable};

mod common;
use common::client::TestClient;
use common::fixtures::fixture;
use common::test_server::setup_may_runtime;

const GET_DOC: &str = r"
description: Get resources
tags:
- Function View
produces:
- application/json
consumes:
- application/json
parameters:
- in: path
  name: user_id
  description: User ID
  required: true
  type: string
  minLength: 1
  pattern: '^\d+$'
- in: query
  name: user_name
  description: User Name
  required: false
  type: string
  minLength: 1
  pattern: '^[a-d]+$'
- in: query
  name: user_login
  description: User Login
  required: false
  type: string
  minLength: 5
- in: query
  name: user_sex
  description: User Sex
  required: false
  type: string
  minLength: 1
  enum:
    - male
    - female
- in: body
  name: body
  description: Created user object
  required: false
  schema:
    type: object
    properties:
      id:
        type: integer
        format: int64
      username:
        type: string
    required:
      - id
      - username
responses:
  '200':
    description: successful operation.
  '405':
    description: invalid HTTP Method
";

const POST_DOC: &str = r"
description: Post resources
tags:
- Function View
produces:
- application/json
consumes:
- application/x-www-form-urlencoded
parameters:
- in: header
  name: user_id
  description: User ID
  required: false
  type: string
  minLength: 1
  pattern: '^\d+$'
- in: path
  name: user_id
  description: User ID
  required: true
  type: string
  minLength: 1
  pattern: '^\d+$'
- in: query
  name: user_name
  description: User Name
  required: false
  type: string
  minLength: 1
  pattern: '^[a-d]+$'
- in: query
  name: user_login
  description: User Login
  required: false
  type: string
  minLength: 5
- in: formData
  name: id
  type: string
  pattern: '^\d+'
  minLength: 1
- in: formData
  name: username
  type: string
  minLength: 2
responses:
  '200':
    description: successful operation.
";

const PATH_ONLY_DOC: &str = r"
description: Test validation
produces:
- application/json
consumes:
- application/json
parameters:
- in: path
  name: user_id
  required: true
  type: string
  minLength: 1
  pattern: '^\d+$'
responses:
  '200':
    description: successful operation.
";

const BODY_OBJECT_DOC: &str = r"
description: Post resources
consumes:
- application/json
parameters:
- in: body
  name: body
  required: true
  schema:
    type: object
    properties:
      test:
        type: string
        default: default
        minLength: 2
      test1:
        type: string
        default: default1
        minLength: 2
responses:
  '200':
    description: successful operation.
";

const BODY_TEXT_DOC: &str = r"
description: Post resources
produces:
- text/plain
consumes:
- text/plain
parameters:
- in: body
  name: body
  required: true
  schema:
    type: string
    default: default
    minLength: 2
responses:
  '200':
    description: successful operation.
";

const QUERY_DEFAULTS_DOC: &str = r"
description: Post User data
consumes:
- application/json
parameters:
- in: query
  name: test
  type: string
  minLength: 3
  required: true
  default: test
- in: query
  name: test1
  type: string
  minLength: 3
  required: true
  default: test1
responses:
  '200':
    description: successful operation.
";

const REF_BODY_DOC: &str = r"
description: Post User data
consumes:
- application/json
parameters:
- in: body
  name: body
  description: Created user object
  required: false
  schema:
    $ref: '#/definitions/UserData'
responses:
  '200':
    description: successful operation.
";

const CYCLIC_REF_DOC: &str = r"
description: Post a tree
consumes:
- application/json
parameters:
- in: body
  name: body
  required: true
  schema:
    $ref: '#/definitions/Node'
responses:
  '200':
    description: successful operation.
";

const JSON: &[(&str, &str)] = &[("Content-Type", "application/json")];
const FORM: &[(&str, &str)] = &[("Content-Type", "application/x-www-form-urlencoded")];

fn ok(_req: &mut HandlerRequest) -> HandlerResponse {
    HandlerResponse::text(200, "text/plain", "OK")
}

fn echo_validated(req: &mut HandlerRequest) -> HandlerResponse {
    let data = req.validated().map(|v| v.to_value()).unwrap_or_default();
    HandlerResponse::ok_json(data)
}

fn echo_body(req: &mut HandlerRequest) -> HandlerResponse {
    let body = req.validated().and_then(|v| v.body.clone()).unwrap_or_default();
    HandlerResponse::ok_json(body)
}

fn echo_text_body(req: &mut HandlerRequest) -> HandlerResponse {
    let body = req
        .validated()
        .and_then(|v| v.body.as_ref())
        .and_then(|b| b.as_str())
        .unwrap_or_default()
        .to_string();
    HandlerResponse::text(200, "text/plain", body)
}

fn yaml(doc: &str) -> DocumentProvider {
    DocumentProvider::Yaml(doc.to_string())
}

fn swagger(file: &str) -> SwaggerConfig {
    SwaggerConfig::new()
        .from_file(fixture(file))
        .merge_with_file(true)
        .validate(true)
}

fn client_for(app: App, file: &str) -> TestClient {
    setup_may_runtime();
    let mut app = app;
    app.setup_swagger(swagger(file)).unwrap();
    TestClient::new(unsafe { app.into_service() }.unwrap())
}

fn new_app() -> App {
    App::with_runtime_config(RuntimeConfig::default())
}

fn function_client<H: Handler>(method: Method, path: &str, handler: H, doc: &str, validate: bool, file: &str) -> TestClient {
    let mut app = new_app();
    app.add_route(method, path, handler, RouteOptions::doc(yaml(doc)).validate(validate));
    client_for(app, file)
}

struct UserView;

impl UserView {
    fn get(&self, req: &mut HandlerRequest) -> HandlerResponse {
        ok(req)
    }

    fn post(&self, req: &mut HandlerRequest) -> HandlerResponse {
        ok(req)
    }
}

fn view_client() -> TestClient {
    let mut app = new_app();
    let table = ViewTable::new(UserView)
        .validate(true)
        .method(Method::GET, UserView::get, MethodOptions::doc(yaml(GET_DOC)))
        .method(Method::POST, UserView::post, MethodOptions::doc(yaml(POST_DOC)));
    app.add_view("/example2/{user_id}", table);
    client_for(app, "example_swagger.yaml")
}

/// `(url, json body, expected status)`; `None` sends the literal `null`.
fn get_cases() -> Vec<(&'static str, Option<serde_json::Value>, u16)> {
    use serde_json::json;
    vec![
        ("/example2/test12", Some(json!({"id": 1, "username": "test"})), 400),
        ("/example2/test12", Some(json!({"id": 1})), 400),
        ("/example2/122212?user_name=123", Some(json!({"id": 1, "username": "test"})), 400),
        ("/example2/122212", Some(json!({})), 400),
        ("/example2/122212", Some(json!({"id": 2})), 400),
        ("/example2/122212", None, 200),
        ("/example2/122212", Some(json!({"id": 1, "username": "test"})), 200),
        ("/example2/122212?user_login=1", Some(json!({"id": 1, "username": "test"})), 400),
        ("/example2/122212?user_login=12232323a", Some(json!({"id": 1, "username": "test"})), 200),
        ("/example2/122212?user_sex=aaa", Some(json!({"id": 1, "username": "test"})), 400),
        ("/example2/122212?user_sex=male", Some(json!({"id": 1, "username": "test"})), 200),
    ]
}

/// `(body, headers, expected status)` for `POST /example2/122212?user_login=12232323a`.
fn post_cases() -> Vec<(&'static str, Vec<(&'static str, &'static str)>, u16)> {
    let form = "application/x-www-form-urlencoded";
    vec![
        ("id=2&username=12", vec![("Content-Type", form)], 200),
        ("id=2", vec![("Content-Type", form)], 200),
        ("id=2&username=1", vec![("Content-Type", form)], 400),
        ("id=2&username=12", vec![("Content-Type", form), ("user_id", "aaa")], 400),
        ("id=2&username=12", vec![("Content-Type", form), ("user_id", "123")], 200),
        ("id=2&username=12", vec![("Content-Type", "application11"), ("user_id", "123")], 400),
    ]
}

const POST_URL: &str = "/example2/122212?user_login=12232323a";

fn assert_outcome(status: u16, text: &str, expected: u16, case: &str) {
    assert_eq!(status, expected, "{case}: {text}");
    if expected == 200 {
        assert!(!text.contains("error"), "{case}: {text}");
    } else {
        assert!(text.contains("error"), "{case}: {text}");
    }
}

fn json_body(body: &Option<serde_json::Value>) -> Vec<u8> {
    serde_json::to_vec(body.as_ref().unwrap_or(&serde_json::Value::Null)).unwrap()
}

#[test]
fn test_class_view_get_validation() {
    let client = view_client();
    for (url, body, expected) in get_cases() {
        let (status, text) = client.call(Method::GET, url, JSON, &json_body(&body));
        assert_outcome(status, &text, expected, &format!("GET {url} {body:?}"));
    }
}

#[test]
fn test_class_view_post_validation() {
    let client = view_client();
    for (body, headers, expected) in post_cases() {
        let (status, text) = client.call(Method::POST, POST_URL, &headers, body.as_bytes());
        assert_outcome(status, &text, expected, &format!("POST {body} {headers:?}"));
    }
}

#[test]
fn test_function_get_validation() {
    let client = function_client(Method::GET, "/example2/{user_id}", ok, GET_DOC, true, "example_swagger.yaml");
    for (url, body, expected) in get_cases() {
        let (status, text) = client.call(Method::GET, url, JSON, &json_body(&body));
        assert_outcome(status, &text, expected, &format!("GET {url} {body:?}"));
    }
}

#[test]
fn test_function_post_validation() {
    let client = function_client(Method::POST, "/example2/{user_id}", ok, POST_DOC, true, "example_swagger.yaml");
    for (body, headers, expected) in post_cases() {
        let (status, text) = client.call(Method::POST, POST_URL, &headers, body.as_bytes());
        assert_outcome(status, &text, expected, &format!("POST {body} {headers:?}"));
    }
}

#[test]
fn test_turn_on_validation() {
    let client = function_client(Method::GET, "/example2/{user_id}", ok, PATH_ONLY_DOC, true, "example_swagger.yaml");
    let cases = [
        ("/example2/test12", "application/json", 400),
        ("/example2/123123", "application/json", 200),
        ("/example2/123123", "application/oops", 400),
    ];
    for (url, content_type, expected) in cases {
        let (status, text) = client.call(Method::GET, url, &[("Content-Type", content_type)], b"");
        assert_outcome(status, &text, expected, &format!("GET {url} {content_type}"));
    }
}

#[test]
fn test_turn_off_validation() {
    let client = function_client(Method::GET, "/example2/{user_id}", ok, PATH_ONLY_DOC, false, "example_swagger.yaml");
    let cases = [
        ("/example2/test12", "application/json"),
        ("/example2/123123", "application/json"),
        ("/example2/123123", "application/oops"),
    ];
    for (url, content_type) in cases {
        let (status, text) = client.call(Method::GET, url, &[("Content-Type", content_type)], b"");
        assert_outcome(status, &text, 200, &format!("GET {url} {content_type}"));
    }
}

#[test]
fn test_body_object_defaults_are_filled_in() {
    let client = function_client(Method::POST, "/example12", echo_body, BODY_OBJECT_DOC, true, "example_swagger.yaml");

    for body in [r#"{"test": "default"}"#, "{}"] {
        let resp = client.send(Method::POST, "/example12", JSON, body.as_bytes());
        assert_eq!(resp.status, 200, "{body}");
        let data = resp.body_json().unwrap();
        assert_eq!(data["test"], "default");
        assert_eq!(data["test1"], "default1");
        assert!(data.get("error").is_none());
    }

    let (status, text) = client.call(Method::POST, "/example12", JSON, b"null");
    assert_outcome(status, &text, 400, "null body");
}

#[test]
fn test_text_body_validation() {
    let client = function_client(Method::POST, "/example12", echo_text_body, BODY_TEXT_DOC, true, "example_swagger.yaml");
    let text_plain = &[("Content-Type", "text/plain")];

    let (status, text) = client.call(Method::POST, "/example12", text_plain, b"1234");
    assert_eq!(status, 200);
    assert_eq!(text, "1234");

    let (status, text) = client.call(Method::POST, "/example12", text_plain, b"");
    assert_outcome(status, &text, 400, "empty text body");
}

#[test]
fn test_query_defaults() {
    let client = function_client(Method::POST, "/example2", echo_validated, QUERY_DEFAULTS_DOC, true, "example_swagger_with_ref.yaml");

    let (status, text) = client.call(Method::POST, "/example2?test=1", JSON, b"");
    assert_outcome(status, &text, 400, "short query value");

    let resp = client.send(Method::POST, "/example2", JSON, b"");
    assert_eq!(resp.status, 200);
    let data = resp.body_json().unwrap();
    assert_eq!(data["query"]["test"], "test");
    assert_eq!(data["query"]["test1"], "test1");
    assert!(data.get("error").is_none());
}

#[test]
fn test_body_reference_to_definitions() {
    let client = function_client(Method::POST, "/example2", ok, REF_BODY_DOC, true, "example_swagger_with_ref.yaml");

    let (status, text) = client.call(Method::POST, "/example2", JSON, br#"{"user_id": "123", "gender": "aaa"}"#);
    assert_outcome(status, &text, 400, "wrong gender");

    let (status, text) = client.call(Method::POST, "/example2", JSON, br#"{"user_id": "123", "gender": "male"}"#);
    assert_outcome(status, &text, 200, "known gender");
}

#[test]
fn test_reference_cycle_rejects_requests() {
    let client = function_client(Method::POST, "/tree", ok, CYCLIC_REF_DOC, true, "example_swagger_with_ref.yaml");
    let resp = client.send(Method::POST, "/tree", JSON, br#"{"name": "root"}"#);
    assert_eq!(resp.status, 400);
    let body = resp.body_json().unwrap();
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("#/definitions/Node"));
}

#[test]
fn test_error_body_shape() {
    let client = function_client(Method::GET, "/example2/{user_id}", ok, PATH_ONLY_DOC, true, "example_swagger.yaml");
    let resp = client.send(Method::GET, "/example2/abc", JSON, b"");
    assert_eq!(resp.status, 400);
    assert_eq!(resp.get_header("content-type"), Some("application/json"));
    let error = &resp.body_json().unwrap()["error"];
    assert_eq!(error["code"], 400);
    assert_eq!(error["description"]["validator"], "pattern");
    assert_eq!(error["description"]["value"], "abc");
    assert!(error["message"].is_string());
}

#[test]
fn test_form_post_rejects_json_content_type() {
    let client = function_client(Method::POST, "/example2/{user_id}", ok, POST_DOC, true, "example_swagger.yaml");
    let (status, text) = client.call(Method::POST, "/example2/1", JSON, b"{}");
    assert_outcome(status, &text, 400, "json to form endpoint");
    let (status, text) = client.call(Method::POST, "/example2/1", FORM, b"id=7");
    assert_outcome(status, &text, 200, "form to form endpoint");
}

//! # swagger-gate
//!
//! **swagger-gate** generates a [Swagger 2.0](https://swagger.io/specification/v2/) document from
//! the routes registered on a coroutine-powered HTTP service, serves that document together with
//! the Swagger UI, and can enforce request validation derived from the same document.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Document model, YAML/JSON loading, merging, assembly from routes
//! - **[`validator`]** - `$ref` resolution, per-location schemas, compiled validators, request validation
//! - **[`validator_cache`]** - Compiled validators shared across routes and setups
//! - **[`router`]** - Path matching using regex-based matchers
//! - **[`dispatcher`]** - Coroutine-based handler dispatch
//! - **[`handlers`]** - The [`Handler`](handlers::Handler) trait, view tables and the validation gate
//! - **[`app`]** - Route registration and [`App::setup_swagger`](app::App::setup_swagger)
//! - **[`server`]** - HTTP service on `may_minihttp` and the documentation endpoints
//! - **[`static_files`]** - Swagger UI rendering and static assets
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Docs as DocsEndpoints
//!     participant Router as Router
//!     participant Dispatcher as Dispatcher
//!     participant Gate as ValidationGate
//!     participant Handler as Handler<br/>(Coroutine)
//!
//!     Client->>Server: GET /example2/12?user_sex=male
//!     Server->>Server: Parse method, path, headers, query, body
//!     Server->>Docs: {url}, {url}/swagger.json, {url}/swagger_static/*
//!     alt Documentation endpoint
//!         Docs-->>Client: UI page / document / asset
//!     end
//!     Server->>Router: route(method, path)
//!     alt No route
//!         Router-->>Client: 404 (405 with Allow when only the method differs)
//!     end
//!     Server->>Dispatcher: dispatch(HandlerRequest)
//!     Dispatcher->>Gate: handler coroutine
//!     Gate->>Gate: content type, then headers/query/formData/body/path
//!     alt Invalid
//!         Gate-->>Client: 400 {"error": {...}}
//!     end
//!     Gate->>Handler: request with validated data attached
//!     Handler-->>Client: response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http::Method;
//! use serde_json::json;
//! use swagger_gate::app::{App, RouteOptions, SwaggerConfig};
//! use swagger_gate::dispatcher::{HandlerRequest, HandlerResponse};
//! use swagger_gate::server::HttpServer;
//! use swagger_gate::spec::DocumentProvider;
//!
//! const GET_USER: &str = r#"
//! parameters:
//!   - name: user_id
//!     in: path
//!     type: string
//!     required: true
//!     pattern: "^\\d+$"
//! responses:
//!   "200":
//!     description: the user
//! "#;
//!
//! fn get_user(req: &mut HandlerRequest) -> HandlerResponse {
//!     HandlerResponse::ok_json(json!({ "id": req.get_path_param("user_id") }))
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut app = App::new();
//!     may::config().set_stack_size(app.runtime_config().stack_size);
//!     app.add_route(
//!         Method::GET,
//!         "/users/{user_id}",
//!         get_user,
//!         RouteOptions::doc(DocumentProvider::Yaml(GET_USER.into())).validate(true),
//!     );
//!     app.setup_swagger(SwaggerConfig::new().validate(true))?;
//!     let service = unsafe { app.into_service()? };
//!     let _ = HttpServer(service).start("127.0.0.1:8080")?.join();
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime Considerations
//!
//! Validation runs inside the handler coroutine, so the default coroutine stack is 128 KiB
//! (`SWAGGER_GATE_STACK_SIZE`). Configure `may` before calling
//! [`App::into_service`](app::App::into_service).

pub mod app;
pub mod cli;
pub mod dispatcher;
pub mod handlers;
pub mod ids;
pub mod otel;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;
pub mod static_files;
pub mod validator;
pub mod validator_cache;

pub use app::{App, RouteOptions, SwaggerConfig};
pub use dispatcher::{HandlerRequest, HandlerResponse};
pub use handlers::{Handler, MethodOptions, ViewTable};
pub use spec::{load_document, ApiDocument, DocumentProvider, SwaggerInfo};
pub use validator::{compile, CompiledValidator, ConfigError, ValidatedRequest, ValidationError};

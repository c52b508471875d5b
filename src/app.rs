//! Registration surface: routes, views and the Swagger setup.
//!
//! An [`App`] collects function handlers and view tables together with the
//! operation document of each route. [`App::setup_swagger`] assembles the API
//! description, compiles validators for the routes that opted in and prepares
//! the documentation endpoints. [`App::into_service`] then spawns the handler
//! coroutines and returns the [`AppService`] to hand to the HTTP server.

use crate::dispatcher::Dispatcher;
use crate::handlers::{Handler, Validated, ValidationGate, ViewTable};
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, DocsEndpoints};
use crate::spec::{
    build_document, load_document, merge_documents, ApiDocument, DocumentProvider, RouteDoc,
    RouteMeta, SwaggerInfo,
};
use crate::validator::CompiledValidator;
use crate::validator_cache::ValidatorCache;
use anyhow::Context;
use http::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default mount point of the documentation endpoints.
pub const DEFAULT_SWAGGER_URL: &str = "/api/doc";

/// Options for a function route.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub doc: DocumentProvider,
    /// Validate requests against the route's operation once swagger is set up
    /// with validation enabled.
    pub validate: bool,
}

impl RouteOptions {
    #[must_use]
    pub fn doc(doc: DocumentProvider) -> Self {
        Self { doc, validate: false }
    }

    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }
}

/// Options for [`App::setup_swagger`].
///
/// ```rust
/// use swagger_gate::app::SwaggerConfig;
///
/// let config = SwaggerConfig::new()
///     .url("docs")
///     .validate(true)
///     .validator_url("//online.swagger.io/validator");
/// assert_eq!(config.swagger_url(), "/docs");
/// ```
#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    swagger_url: String,
    info: SwaggerInfo,
    from_file: Option<PathBuf>,
    merge_with_file: bool,
    prebuilt: Option<Value>,
    validate: bool,
    validator_url: Option<String>,
    static_dir: Option<PathBuf>,
}

impl Default for SwaggerConfig {
    fn default() -> Self {
        Self {
            swagger_url: DEFAULT_SWAGGER_URL.to_string(),
            info: SwaggerInfo::default(),
            from_file: None,
            merge_with_file: false,
            prebuilt: None,
            validate: false,
            validator_url: None,
            static_dir: None,
        }
    }
}

impl SwaggerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount point; a leading `/` is added and a trailing one dropped.
    #[must_use]
    pub fn url(mut self, url: &str) -> Self {
        self.swagger_url = normalize_url(url);
        self
    }

    #[must_use]
    pub fn info(mut self, info: SwaggerInfo) -> Self {
        self.info = info;
        self
    }

    /// Serve the document from a YAML or JSON file instead of generating it.
    #[must_use]
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.from_file = Some(path.into());
        self
    }

    /// With [`from_file`](Self::from_file): add the generated operations the
    /// file does not define.
    #[must_use]
    pub fn merge_with_file(mut self, enabled: bool) -> Self {
        self.merge_with_file = enabled;
        self
    }

    /// Use a ready document; it takes precedence over files and generation.
    #[must_use]
    pub fn document(mut self, document: Value) -> Self {
        self.prebuilt = Some(document);
        self
    }

    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Validator badge URL embedded in the UI page.
    #[must_use]
    pub fn validator_url(mut self, url: impl Into<String>) -> Self {
        self.validator_url = Some(url.into());
        self
    }

    /// Directory served under `{url}/swagger_static`.
    #[must_use]
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn swagger_url(&self) -> &str {
        &self.swagger_url
    }

    /// Resolve the document this configuration describes.
    ///
    /// # Errors
    ///
    /// Fails when the configured file cannot be loaded.
    pub fn resolve_document(&self, generated: ApiDocument) -> anyhow::Result<ApiDocument> {
        if let Some(value) = &self.prebuilt {
            return Ok(ApiDocument::new(value.clone()));
        }
        let Some(path) = &self.from_file else {
            return Ok(generated);
        };
        let file = load_document(path)
            .with_context(|| format!("loading swagger file {}", path.display()))?;
        if self.merge_with_file {
            Ok(merge_documents(file, &generated))
        } else {
            Ok(file)
        }
    }
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

type HandlerFactory = Box<dyn FnOnce(Option<ValidationGate>) -> Arc<dyn Handler> + Send>;

struct RouteEntry {
    meta: RouteMeta,
    doc: DocumentProvider,
    validate: bool,
    factory: HandlerFactory,
    validator: Option<Arc<CompiledValidator>>,
}

/// Route registry and Swagger setup.
pub struct App {
    routes: Vec<RouteEntry>,
    document: Option<ApiDocument>,
    docs: Option<DocsEndpoints>,
    runtime: RuntimeConfig,
    cache: ValidatorCache,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// App configured from the environment (see [`RuntimeConfig::from_env`]).
    #[must_use]
    pub fn new() -> Self {
        Self::with_runtime_config(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_runtime_config(runtime: RuntimeConfig) -> Self {
        let cache = ValidatorCache::new(runtime.schema_cache);
        Self {
            routes: Vec::new(),
            document: None,
            docs: None,
            runtime,
            cache,
        }
    }

    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime
    }

    #[must_use]
    pub fn validator_cache(&self) -> &ValidatorCache {
        &self.cache
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Register a function handler for `method path`.
    ///
    /// The handler is named `"{METHOD} {path}"`. Registering the same method
    /// and path again replaces the earlier route.
    pub fn add_route<H: Handler>(&mut self, method: Method, path: &str, handler: H, options: RouteOptions) {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        let factory: HandlerFactory = Box::new(move |gate: Option<ValidationGate>| -> Arc<dyn Handler> {
            match gate {
                Some(gate) => Arc::new(Validated::new(handler, gate)),
                None => handler,
            }
        });
        self.push_route(method, path, options.doc, options.validate, factory);
    }

    /// Register every method of `table` under `path`.
    pub fn add_view<V: Send + Sync + 'static>(&mut self, path: &str, table: ViewTable<V>) {
        for route in table.into_routes() {
            let (method, doc, validate) = (route.method.clone(), route.doc.clone(), route.validate);
            let factory: HandlerFactory = Box::new(move |gate| route.bind(gate));
            self.push_route(method, path, doc, validate, factory);
        }
    }

    fn push_route(
        &mut self,
        method: Method,
        path: &str,
        doc: DocumentProvider,
        validate: bool,
        factory: HandlerFactory,
    ) {
        let handler_name = format!("{} {}", method.as_str(), path);
        debug!(handler_name = %handler_name, validate, documented = doc.is_documented(), "Route added");
        let entry = RouteEntry {
            meta: RouteMeta::new(method, path, &handler_name),
            doc,
            validate,
            factory,
            validator: None,
        };
        // A re-registered route keeps its slot so match priority is unchanged.
        match self.routes.iter().position(|r| {
            r.meta.method == entry.meta.method && *r.meta.path_pattern == *entry.meta.path_pattern
        }) {
            Some(pos) => {
                warn!(handler_name = %handler_name, "Route registered twice, replacing the earlier handler");
                self.routes[pos] = entry;
            }
            None => self.routes.push(entry),
        }
    }

    /// Documentation inputs of every registered route, in registration order.
    #[must_use]
    pub fn route_docs(&self) -> Vec<RouteDoc> {
        self.routes
            .iter()
            .map(|r| RouteDoc {
                path: r.meta.path_pattern.to_string(),
                method: r.meta.method.clone(),
                provider: r.doc.clone(),
            })
            .collect()
    }

    /// The document built by the last [`setup_swagger`](Self::setup_swagger).
    #[must_use]
    pub fn document(&self) -> Option<&ApiDocument> {
        self.document.as_ref()
    }

    /// Whether `method path` will be served through a validator.
    #[must_use]
    pub fn is_validated(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|r| r.meta.method == *method && &*r.meta.path_pattern == path && r.validator.is_some())
    }

    /// Build the API description, compile validators and prepare the
    /// documentation endpoints.
    ///
    /// With `validate` set, every route registered with validation is compiled
    /// against the operation the final document holds for it. Routes the
    /// document does not describe are served unvalidated.
    ///
    /// # Errors
    ///
    /// Fails when the swagger file cannot be loaded, when an operation does
    /// not compile, or when the UI page cannot be rendered.
    pub fn setup_swagger(&mut self, config: SwaggerConfig) -> anyhow::Result<()> {
        let generated = build_document(&config.info, &self.route_docs());
        let document = config.resolve_document(generated)?;

        for entry in &mut self.routes {
            entry.validator = None;
        }
        if config.validate {
            self.cache
                .update_spec_version(document.to_json_string().unwrap_or_default().as_bytes());
            let mut compiled = 0usize;
            for entry in self.routes.iter_mut().filter(|r| r.validate) {
                let Some(operation) = document.operation(&entry.meta.path_pattern, &entry.meta.method) else {
                    debug!(
                        handler_name = %entry.meta.handler_name,
                        "Route asks for validation but has no operation in the document"
                    );
                    continue;
                };
                let validator = self
                    .cache
                    .get_or_compile(&entry.meta.method, &entry.meta.path_pattern, &document, operation)
                    .with_context(|| format!("compiling validator for {}", entry.meta.handler_name))?;
                entry.validator = Some(validator);
                compiled += 1;
            }
            info!(compiled, "Request validators ready");
        }

        let docs = DocsEndpoints::new(
            config.swagger_url(),
            &document,
            config.validator_url.as_deref(),
            config.static_dir.clone(),
        )?;
        info!(
            swagger_url = %config.swagger_url(),
            paths_count = document.paths().map_or(0, |p| p.len()),
            "Swagger documentation configured"
        );
        self.docs = Some(docs);
        self.document = Some(document);
        Ok(())
    }

    /// Compile the route table and spawn one handler coroutine per route.
    ///
    /// # Safety
    ///
    /// Spawns `may` coroutines; configure the runtime (stack size, workers)
    /// before calling.
    ///
    /// # Errors
    ///
    /// Fails on an invalid route pattern or when a coroutine cannot be spawned.
    pub unsafe fn into_service(self) -> anyhow::Result<AppService> {
        let router = Router::new(self.routes.iter().map(|r| r.meta.clone()).collect())?;
        let mut dispatcher = Dispatcher::with_stack_size(self.runtime.stack_size);
        let traceback = self.runtime.error_traceback;
        for entry in self.routes {
            let gate = entry.validator.map(|v| ValidationGate::new(v, traceback));
            let handler = (entry.factory)(gate);
            // SAFETY: forwarded from this function's contract.
            unsafe { dispatcher.register_handler(&entry.meta.handler_name, handler)? };
        }
        Ok(AppService::new(
            Arc::new(router),
            Arc::new(dispatcher),
            self.docs.map(Arc::new),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{HandlerRequest, HandlerResponse};
    use crate::handlers::MethodOptions;
    use serde_json::json;

    fn ok(_req: &mut HandlerRequest) -> HandlerResponse {
        HandlerResponse::ok_json(json!({"ok": true}))
    }

    fn op_with_query() -> DocumentProvider {
        DocumentProvider::Operation(json!({
            "parameters": [{"name": "q", "in": "query", "type": "string", "minLength": 2}]
        }))
    }

    fn app() -> App {
        App::with_runtime_config(RuntimeConfig::default())
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("api/doc"), "/api/doc");
        assert_eq!(normalize_url("/docs/"), "/docs");
        assert_eq!(SwaggerConfig::default().swagger_url(), DEFAULT_SWAGGER_URL);
    }

    #[test]
    fn test_duplicate_route_is_replaced() {
        let mut app = app();
        app.add_route(Method::GET, "/a", ok, RouteOptions::default());
        app.add_route(Method::GET, "/a", ok, RouteOptions::doc(op_with_query()));
        app.add_route(Method::POST, "/a", ok, RouteOptions::default());
        assert_eq!(app.len(), 2);
        let docs = app.route_docs();
        assert_eq!(docs[0].method, Method::GET);
        assert_eq!(docs[1].method, Method::POST);
        assert!(docs[0].provider.is_documented());
        assert!(!docs[1].provider.is_documented());
    }

    #[test]
    fn test_undocumented_view_methods_are_left_out() {
        struct V;
        impl V {
            fn get(&self, req: &mut HandlerRequest) -> HandlerResponse {
                ok(req)
            }
        }
        let mut app = app();
        let table = ViewTable::new(V)
            .method(Method::GET, V::get, MethodOptions::doc(op_with_query()))
            .method(Method::DELETE, V::get, MethodOptions::default());
        app.add_view("/v", table);
        app.setup_swagger(SwaggerConfig::new()).unwrap();
        let doc = app.document().unwrap();
        assert!(doc.operation("/v", &Method::GET).is_some());
        assert!(doc.operation("/v", &Method::DELETE).is_none());
    }

    #[test]
    fn test_validation_needs_config_and_route_opt_in() {
        let mut app = app();
        app.add_route(Method::GET, "/on", ok, RouteOptions::doc(op_with_query()).validate(true));
        app.add_route(Method::GET, "/off", ok, RouteOptions::doc(op_with_query()));
        app.add_route(Method::GET, "/nodoc", ok, RouteOptions::default().validate(true));

        app.setup_swagger(SwaggerConfig::new()).unwrap();
        assert!(!app.is_validated(&Method::GET, "/on"));

        app.setup_swagger(SwaggerConfig::new().validate(true)).unwrap();
        assert!(app.is_validated(&Method::GET, "/on"));
        assert!(!app.is_validated(&Method::GET, "/off"));
        assert!(!app.is_validated(&Method::GET, "/nodoc"));
    }

    #[test]
    fn test_prebuilt_document_wins() {
        let mut app = app();
        app.add_route(Method::GET, "/a", ok, RouteOptions::doc(op_with_query()));
        let prebuilt = json!({"swagger": "2.0", "info": {"title": "fixed"}, "paths": {}});
        app.setup_swagger(SwaggerConfig::new().document(prebuilt.clone())).unwrap();
        assert_eq!(app.document().unwrap().as_value(), &prebuilt);
    }

    #[test]
    fn test_broken_operation_aborts_setup() {
        let mut app = app();
        let bad = DocumentProvider::Operation(json!({"parameters": [{"name": "x", "in": "cookie"}]}));
        app.add_route(Method::GET, "/bad", ok, RouteOptions::doc(bad).validate(true));
        assert!(app.setup_swagger(SwaggerConfig::new().validate(true)).is_err());
    }
}

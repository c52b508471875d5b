use super::wrap::{RequestCarrier, ValidationGate};
use super::Handler;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::spec::DocumentProvider;
use http::Method;
use std::sync::Arc;

/// A view method: receives the view value and the request.
pub type ViewMethod<V> = Arc<dyn Fn(&V, &mut HandlerRequest) -> HandlerResponse + Send + Sync>;

/// One invocation of a view method.
pub struct ViewCall<'a, V> {
    pub view: &'a V,
    pub request: &'a mut HandlerRequest,
}

impl<V> RequestCarrier for ViewCall<'_, V> {
    fn request_mut(&mut self) -> &mut HandlerRequest {
        &mut *self.request
    }
}

/// Per-method registration options.
#[derive(Debug, Clone, Default)]
pub struct MethodOptions {
    /// Operation document for this method; undocumented methods are left out
    /// of the API description.
    pub doc: DocumentProvider,
    /// Opts this method into validation even when the view has not.
    pub validate: bool,
}

impl MethodOptions {
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

struct MethodEntry<V> {
    method: Method,
    func: ViewMethod<V>,
    options: MethodOptions,
}

/// Verb → method table for one path.
///
/// ```rust,ignore
/// let table = ViewTable::new(UsersView::default())
///     .method(Method::GET, UsersView::get, MethodOptions::doc(DocumentProvider::Yaml(GET_DOC.into())))
///     .method(Method::POST, UsersView::post, MethodOptions::doc(post_doc).validate(true));
/// app.add_view("/users/{user_id}", table);
/// ```
pub struct ViewTable<V> {
    view: Arc<V>,
    validate: bool,
    methods: Vec<MethodEntry<V>>,
}

impl<V: Send + Sync + 'static> ViewTable<V> {
    #[must_use]
    pub fn new(view: V) -> Self {
        Self {
            view: Arc::new(view),
            validate: false,
            methods: Vec::new(),
        }
    }

    /// View-level validation flag.
    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Add (or replace) the handler for `method`.
    #[must_use]
    pub fn method<F>(mut self, method: Method, func: F, options: MethodOptions) -> Self
    where
        F: Fn(&V, &mut HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        self.methods.retain(|entry| entry.method != method);
        self.methods.push(MethodEntry {
            method,
            func: Arc::new(func),
            options,
        });
        self
    }

    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        self.methods.iter().map(|entry| entry.method.clone()).collect()
    }

    /// Whether `method` is validated: the view or the method opted in.
    #[must_use]
    pub fn validates(&self, method: &Method) -> bool {
        self.methods
            .iter()
            .find(|entry| entry.method == *method)
            .is_some_and(|entry| self.validate || entry.options.validate)
    }

    /// Split the table into one route per method.
    #[must_use]
    pub fn into_routes(self) -> Vec<ViewRoute> {
        let view_validate = self.validate;
        self.methods
            .into_iter()
            .map(|entry| {
                let view = Arc::clone(&self.view);
                let func = entry.func;
                ViewRoute {
                    method: entry.method,
                    validate: view_validate || entry.options.validate,
                    doc: entry.options.doc,
                    bind: Box::new(move |gate: Option<ValidationGate>| -> Arc<dyn Handler> {
                        Arc::new(ViewMethodHandler { view, func, gate })
                    }),
                }
            })
            .collect()
    }
}

type Binder = Box<dyn FnOnce(Option<ValidationGate>) -> Arc<dyn Handler> + Send>;

/// One method of a view, ready to be registered as a route.
pub struct ViewRoute {
    pub method: Method,
    pub doc: DocumentProvider,
    pub validate: bool,
    bind: Binder,
}

impl ViewRoute {
    /// Produce the handler, validating through `gate` when given.
    #[must_use]
    pub fn bind(self, gate: Option<ValidationGate>) -> Arc<dyn Handler> {
        (self.bind)(gate)
    }
}

struct ViewMethodHandler<V> {
    view: Arc<V>,
    func: ViewMethod<V>,
    gate: Option<ValidationGate>,
}

impl<V: Send + Sync + 'static> Handler for ViewMethodHandler<V> {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResponse {
        let mut call = ViewCall {
            view: self.view.as_ref(),
            request: req,
        };
        match &self.gate {
            Some(gate) => gate.run(&mut call, |call| (self.func)(call.view, &mut *call.request)),
            None => (self.func)(call.view, &mut *call.request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ApiDocument;
    use crate::validator::compile;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    impl Counter {
        fn get(&self, _req: &mut HandlerRequest) -> HandlerResponse {
            let hits = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
            HandlerResponse::ok_json(json!({ "hits": hits }))
        }

        fn post(&self, req: &mut HandlerRequest) -> HandlerResponse {
            HandlerResponse::ok_json(json!({ "validated": req.validated().is_some() }))
        }
    }

    fn table() -> ViewTable<Counter> {
        ViewTable::new(Counter::default())
            .method(Method::GET, Counter::get, MethodOptions::default())
            .method(Method::POST, Counter::post, MethodOptions::default().validate(true))
    }

    #[test]
    fn test_view_or_method_opts_in() {
        let t = table();
        assert!(!t.validates(&Method::GET));
        assert!(t.validates(&Method::POST));
        assert!(!t.validates(&Method::PUT));
        assert_eq!(t.methods(), vec![Method::GET, Method::POST]);

        let view_wide = table()
            .validate(true)
            .method(Method::PUT, Counter::get, MethodOptions::default().validate(false));
        assert!(view_wide.validates(&Method::GET));
        assert!(view_wide.validates(&Method::PUT));
        let flags: Vec<_> = view_wide.into_routes().into_iter().map(|r| r.validate).collect();
        assert_eq!(flags, vec![true, true, true]);
    }

    #[test]
    fn test_later_registration_replaces_method() {
        let t = table().method(Method::GET, Counter::post, MethodOptions::default());
        assert_eq!(t.methods(), vec![Method::POST, Method::GET]);
    }

    #[test]
    fn test_routes_share_the_view() {
        let routes = table().into_routes();
        assert_eq!(routes.len(), 2);
        let mut handlers: Vec<_> = routes.into_iter().map(|r| r.bind(None)).collect();
        let get = handlers.remove(0);
        let mut req = HandlerRequest::new(Method::GET, "/");
        get.handle(&mut req);
        let resp = get.handle(&mut req);
        assert_eq!(resp.body_json().unwrap()["hits"], 2);
    }

    #[test]
    fn test_gate_runs_before_view_method() {
        let doc = ApiDocument::new(json!({"swagger": "2.0", "paths": {}}));
        let op = json!({"parameters": [{"name": "q", "in": "query", "type": "string", "minLength": 3}]});
        let gate = ValidationGate::new(Arc::new(compile(&doc, &op).unwrap()), false);
        let post = table()
            .into_routes()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .unwrap()
            .bind(Some(gate));

        let mut bad = HandlerRequest::new(Method::POST, "/");
        bad.query_params.push((Arc::from("q"), "ab".to_string()));
        assert_eq!(post.handle(&mut bad).status, 400);

        let mut good = HandlerRequest::new(Method::POST, "/");
        good.query_params.push((Arc::from("q"), "abc".to_string()));
        let resp = post.handle(&mut good);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body_json().unwrap()["validated"], true);
    }
}

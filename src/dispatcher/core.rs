//! Dispatcher core: request/response types and handler coroutines.

use crate::handlers::Handler;
use crate::ids::RequestId;
use crate::router::ParamVec;
use crate::validator::{RequestSource, ValidatedRequest};
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header pairs; names are shared `Arc<str>`, values are per request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request data handed to a handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    /// Name of the route the request was matched to (`"GET /users/{id}"`).
    pub handler_name: Arc<str>,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    /// Headers with lower-cased names, duplicates preserved.
    pub headers: HeaderVec,
    pub body: Vec<u8>,
    /// Set by the validation wrapper before the handler runs.
    pub validation: Option<ValidatedRequest>,
}

impl HandlerRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            handler_name: Arc::from(""),
            path_params: ParamVec::new(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body: Vec::new(),
            validation: None,
        }
    }

    /// Last value of path parameter `name`.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Last value of query parameter `name`.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value of header `name`, case-insensitive.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Data accepted by the validator, when the route validates.
    #[must_use]
    pub fn validated(&self) -> Option<&ValidatedRequest> {
        self.validation.as_ref()
    }

    /// Body parsed as JSON, `None` when empty or not JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

impl RequestSource for HandlerRequest {
    fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    fn path_params(&self) -> &[(Arc<str>, String)] {
        &self.path_params
    }

    fn query_params(&self) -> &[(Arc<str>, String)] {
        &self.query_params
    }

    fn headers(&self) -> &[(Arc<str>, String)] {
        &self.headers
    }

    fn body(&mut self) -> io::Result<&[u8]> {
        Ok(&self.body)
    }
}

/// Response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Serialized as JSON, strings included.
    Json(Value),
    /// Sent as-is.
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// The payload as bytes on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ResponseBody::Json(value) => serde_json::to_vec(value).unwrap_or_default(),
            ResponseBody::Bytes(bytes) => bytes.clone(),
        }
    }
}

/// Response produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: ResponseBody,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Json(body),
        }
    }

    /// JSON response with a `content-type: application/json` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self::new(status, headers, body)
    }

    #[must_use]
    pub fn ok_json(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Raw bytes with the given content type.
    #[must_use]
    pub fn bytes(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), content_type.to_string()));
        Self {
            status,
            headers,
            body: ResponseBody::Bytes(body),
        }
    }

    #[must_use]
    pub fn text(status: u16, content_type: &str, body: impl Into<String>) -> Self {
        Self::bytes(status, content_type, body.into().into_bytes())
    }

    /// `{"error": message}` as JSON.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// JSON body, if the payload is JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Bytes(_) => None,
        }
    }
}

/// A request travelling to a handler coroutine with its reply channel.
pub struct Envelope {
    pub request: HandlerRequest,
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

/// Channel sender feeding one handler coroutine.
pub type HandlerSender = mpsc::Sender<Envelope>;

/// Routes requests to registered handler coroutines by name.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: HashMap<Arc<str>, HandlerSender>,
    stack_size: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("stack_size", &self.stack_size)
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher whose coroutines use the `may` runtime's configured stack size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_stack_size(may::config().get_stack_size())
    }

    #[must_use]
    pub fn with_stack_size(stack_size: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            stack_size,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Spawn a coroutine serving `handler` and register it under `name`.
    ///
    /// Registering a name twice replaces the earlier handler; dropping its
    /// sender ends the old coroutine. Handler panics are caught and answered
    /// with a 500.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn`, which is unsafe in the `may`
    /// runtime. The runtime must be configured before handlers are registered.
    ///
    /// # Errors
    ///
    /// Returns the spawn error when the coroutine cannot be created.
    pub unsafe fn register_handler(&mut self, name: &str, handler: Arc<dyn Handler>) -> io::Result<()> {
        let (tx, rx) = mpsc::channel::<Envelope>();
        let name: Arc<str> = Arc::from(name);
        let coroutine_name = Arc::clone(&name);
        let stack_size = self.stack_size;

        // SAFETY: the closure owns everything it touches (`Send + 'static`)
        // and is only spawned once the runtime is configured.
        let spawned = unsafe {
            coroutine::Builder::new()
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(handler_name = %coroutine_name, stack_size, "Handler coroutine start");
                    for Envelope { mut request, reply_tx } in rx.iter() {
                        let request_id = request.request_id;
                        let started = Instant::now();
                        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            handler.handle(&mut request)
                        }));
                        let response = match outcome {
                            Ok(response) => {
                                debug!(
                                    request_id = %request_id,
                                    handler_name = %coroutine_name,
                                    status = response.status,
                                    execution_time_us = started.elapsed().as_micros() as u64,
                                    "Handler execution complete"
                                );
                                response
                            }
                            Err(panic) => {
                                let panic_message = panic_text(panic.as_ref());
                                error!(
                                    request_id = %request_id,
                                    handler_name = %coroutine_name,
                                    panic_message = %panic_message,
                                    "Handler panicked"
                                );
                                HandlerResponse::error(500, &format!("Handler panicked: {panic_message}"))
                            }
                        };
                        if reply_tx.send(response).is_err() {
                            warn!(request_id = %request_id, "Requester went away before the reply");
                        }
                    }
                    debug!(handler_name = %coroutine_name, "Handler coroutine exit");
                })
        };
        if let Err(e) = spawned {
            error!(handler_name = %name, error = %e, stack_size, "Failed to spawn handler coroutine");
            return Err(e);
        }

        if self.handlers.insert(Arc::clone(&name), tx).is_some() {
            warn!(handler_name = %name, "Replaced existing handler - old coroutine will exit");
        }
        info!(handler_name = %name, total_handlers = self.handlers.len(), "Handler registered");
        Ok(())
    }

    /// Send `request` to the handler named by `request.handler_name` and wait
    /// for its response.
    ///
    /// Returns `None` when no handler is registered under that name, and a
    /// 503 when the handler coroutine is gone.
    #[must_use]
    pub fn dispatch(&self, request: HandlerRequest) -> Option<HandlerResponse> {
        let Some(tx) = self.handlers.get(&request.handler_name) else {
            error!(handler_name = %request.handler_name, "Handler not found");
            return None;
        };
        let handler_name = Arc::clone(&request.handler_name);
        let request_id = request.request_id;
        let (reply_tx, reply_rx) = mpsc::channel();
        let started = Instant::now();

        if tx.send(Envelope { request, reply_tx }).is_err() {
            error!(request_id = %request_id, handler_name = %handler_name, "Failed to send request to handler");
            return Some(HandlerResponse::error(503, &format!("Handler '{handler_name}' is not running")));
        }

        match reply_rx.recv() {
            Ok(response) => {
                info!(
                    request_id = %request_id,
                    handler_name = %handler_name,
                    status = response.status,
                    latency_us = started.elapsed().as_micros() as u64,
                    "Handler response received"
                );
                Some(response)
            }
            Err(e) => {
                error!(request_id = %request_id, handler_name = %handler_name, error = %e, "Handler channel closed");
                Some(HandlerResponse::error(
                    503,
                    &format!("Handler '{handler_name}' is not responding"),
                ))
            }
        }
    }
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

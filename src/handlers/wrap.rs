use super::Handler;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::validator::CompiledValidator;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything that can lend out the request being handled.
pub trait RequestCarrier {
    fn request_mut(&mut self) -> &mut HandlerRequest;
}

impl RequestCarrier for HandlerRequest {
    fn request_mut(&mut self) -> &mut HandlerRequest {
        self
    }
}

/// Runs a compiled validator in front of a handler call.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    validator: Arc<CompiledValidator>,
    traceback: bool,
}

impl ValidationGate {
    /// `traceback` adds the failing schema path to error bodies.
    #[must_use]
    pub fn new(validator: Arc<CompiledValidator>, traceback: bool) -> Self {
        Self { validator, traceback }
    }

    #[must_use]
    pub fn validator(&self) -> &CompiledValidator {
        &self.validator
    }

    /// Validate the carried request, then either answer with the error or
    /// store the result on the request and invoke `call`.
    pub fn run<C, F>(&self, carrier: &mut C, call: F) -> HandlerResponse
    where
        C: RequestCarrier + ?Sized,
        F: FnOnce(&mut C) -> HandlerResponse,
    {
        let request = carrier.request_mut();
        match self.validator.validate(&mut *request) {
            Ok(validated) => {
                debug!(
                    request_id = %request.request_id,
                    handler_name = %request.handler_name,
                    "Request validated"
                );
                request.validation = Some(validated);
                call(carrier)
            }
            Err(err) => {
                warn!(
                    request_id = %request.request_id,
                    handler_name = %request.handler_name,
                    validator = %err.description.validator,
                    field = %err.description.field,
                    message = %err.message,
                    "Request rejected by validation"
                );
                HandlerResponse::json(err.code, err.to_body(self.traceback))
            }
        }
    }
}

/// A function handler behind a [`ValidationGate`].
pub struct Validated {
    inner: Arc<dyn Handler>,
    gate: ValidationGate,
}

impl Validated {
    #[must_use]
    pub fn new(inner: Arc<dyn Handler>, gate: ValidationGate) -> Self {
        Self { inner, gate }
    }
}

impl Handler for Validated {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResponse {
        self.gate.run(req, |req| self.inner.handle(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ApiDocument;
    use crate::validator::compile;
    use http::Method;
    use serde_json::json;

    fn gate(traceback: bool) -> ValidationGate {
        let doc = ApiDocument::new(json!({"swagger": "2.0", "paths": {}}));
        let op = json!({
            "parameters": [{"name": "user_id", "in": "path", "type": "string", "required": true, "pattern": "^\\d+$"}]
        });
        ValidationGate::new(Arc::new(compile(&doc, &op).unwrap()), traceback)
    }

    fn request(user_id: &str) -> HandlerRequest {
        let mut req = HandlerRequest::new(Method::GET, format!("/example2/{user_id}"));
        req.path_params.push((Arc::from("user_id"), user_id.to_string()));
        req
    }

    fn echo(req: &mut HandlerRequest) -> HandlerResponse {
        let validated = req.validated().map(|v| v.to_value()).unwrap_or_default();
        HandlerResponse::ok_json(validated)
    }

    #[test]
    fn test_valid_request_reaches_handler_with_result() {
        let handler = Validated::new(Arc::new(echo), gate(false));
        let resp = handler.handle(&mut request("122212"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body_json().unwrap()["path"]["user_id"], "122212");
    }

    #[test]
    fn test_invalid_request_short_circuits() {
        let handler = Validated::new(
            Arc::new(|_: &mut HandlerRequest| -> HandlerResponse { panic!("must not run") }),
            gate(false),
        );
        let resp = handler.handle(&mut request("test12"));
        assert_eq!(resp.status, 400);
        let body = resp.body_json().unwrap();
        assert_eq!(body["error"]["code"], 400);
        assert_eq!(body["error"]["description"]["validator"], "pattern");
        assert_eq!(body["error"]["description"]["field"], "path.user_id");
        assert!(body["error"].get("traceback").is_none());
    }

    #[test]
    fn test_traceback_is_opt_in() {
        let handler = Validated::new(Arc::new(echo), gate(true));
        let resp = handler.handle(&mut request("nope"));
        let body = resp.body_json().unwrap();
        assert!(body["error"]["traceback"]
            .as_str()
            .unwrap()
            .contains("path/properties/user_id/pattern"));
    }
}

use super::docs::DocsEndpoints;
use super::request::{parse_request, ParsedRequest};
use super::response::write_handler_response;
use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::Router;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The HTTP service: documentation endpoints, then routed handlers.
#[derive(Clone, Debug)]
pub struct AppService {
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
    pub docs: Option<Arc<DocsEndpoints>>,
}

impl AppService {
    #[must_use]
    pub fn new(router: Arc<Router>, dispatcher: Arc<Dispatcher>, docs: Option<Arc<DocsEndpoints>>) -> Self {
        Self {
            router,
            dispatcher,
            docs,
        }
    }

    /// Produce the response for one parsed request.
    ///
    /// Unknown paths answer 404; a known path with another method answers 405
    /// with an `Allow` header.
    #[must_use]
    pub fn handle(&self, parsed: ParsedRequest) -> HandlerResponse {
        if let Some(docs) = &self.docs {
            if let Some(resp) = docs.respond(&parsed.method, &parsed.path) {
                debug!(path = %parsed.path, status = resp.status, "Documentation endpoint served");
                return resp;
            }
        }

        let Some(route_match) = self.router.route(&parsed.method, &parsed.path) else {
            let allowed = self.router.methods_for(&parsed.path);
            if allowed.is_empty() {
                debug!(method = %parsed.method, path = %parsed.path, "No route");
                return HandlerResponse::json(
                    404,
                    serde_json::json!({"error": "Not Found", "method": parsed.method.as_str(), "path": parsed.path}),
                );
            }
            let allow = allowed.iter().map(http::Method::as_str).collect::<Vec<_>>().join(", ");
            debug!(method = %parsed.method, path = %parsed.path, allow = %allow, "Method not allowed");
            let mut resp = HandlerResponse::error(405, "Method Not Allowed");
            resp.set_header("Allow", allow);
            return resp;
        };

        let request_id = RequestId::from_header_or_new(parsed.header(REQUEST_ID_HEADER));
        let request = HandlerRequest {
            request_id,
            method: parsed.method,
            path: parsed.path,
            handler_name: Arc::clone(&route_match.handler_name),
            path_params: route_match.path_params,
            query_params: parsed.query_params,
            headers: parsed.headers,
            body: parsed.body,
            validation: None,
        };
        match self.dispatcher.dispatch(request) {
            Some(mut resp) => {
                if resp.get_header(REQUEST_ID_HEADER).is_none() {
                    resp.set_header(REQUEST_ID_HEADER, request_id.to_string());
                }
                resp
            }
            None => {
                warn!(request_id = %request_id, handler_name = %route_match.handler_name, "Route has no running handler");
                HandlerResponse::error(500, "Handler failed or not registered")
            }
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let started = Instant::now();
        let parsed = parse_request(req);
        let method = parsed.method.clone();
        let path = parsed.path.clone();
        let response = self.handle(parsed);
        write_handler_response(res, &response);
        info!(
            method = %method,
            path = %path,
            status = response.status,
            latency_us = started.elapsed().as_micros() as u64,
            "Request complete"
        );
        Ok(())
    }
}

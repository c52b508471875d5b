use crate::dispatcher::HeaderVec;
use crate::router::ParamVec;
use http::Method;
use may_minihttp::Request;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};

/// Request data extracted from a `may_minihttp::Request`.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub method: Method,
    /// Path without the query string, as sent (not percent-decoded).
    pub path: String,
    /// Header pairs with lower-cased names, duplicates preserved.
    pub headers: HeaderVec,
    /// Query pairs in order, repeated keys preserved.
    pub query_params: ParamVec,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_params) = split_target(target);
        Self {
            method,
            path,
            headers: HeaderVec::new(),
            query_params,
            body: Vec::new(),
        }
    }

    /// First value of header `name` (lower-case).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the query string of `target` (everything after `?`).
///
/// Pairs are form-decoded (`+` becomes a space) and kept in order.
#[must_use]
pub fn parse_query_params(target: &str) -> ParamVec {
    let Some((_, query)) = target.split_once('?') else {
        return ParamVec::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

fn split_target(target: &str) -> (String, ParamVec) {
    let path = target.split('?').next().unwrap_or("/");
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), parse_query_params(target))
}

/// Read everything the handler pipeline needs from the raw request.
///
/// Extension methods are kept as-is; a method that is not a valid token is
/// read as `GET`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = Method::from_bytes(req.method().as_bytes()).unwrap_or(Method::GET);
    let (path, query_params) = split_target(req.path());

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase().as_str()),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let mut body = Vec::new();
    if let Err(e) = req.body().read_to_end(&mut body) {
        warn!(method = %method, path = %path, error = %e, "Failed to read request body");
        body.clear();
    }

    debug!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        query_count = query_params.len(),
        body_size_bytes = body.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}

use crate::dispatcher::HandlerResponse;
use crate::ids::REQUEST_ID_HEADER;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

// may_minihttp only takes `&'static str` header lines. Lines repeat across
// requests (content types, Allow lists), so each distinct line is leaked once.
static HEADER_LINES: Lazy<Mutex<HashSet<&'static str>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn intern_header(name: &str, value: &str) -> &'static str {
    let line = format!("{name}: {value}");
    let mut lines = HEADER_LINES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = lines.get(line.as_str()) {
        return existing;
    }
    let leaked: &'static str = Box::leak(line.into_boxed_str());
    lines.insert(leaked);
    leaked
}

/// Header lines for `response`, with `Content-Type` defaulting to JSON.
fn header_lines(response: &HandlerResponse) -> Vec<&'static str> {
    let mut lines = Vec::with_capacity(response.headers.len() + 1);
    if response.get_header("content-type").is_none() {
        lines.push("Content-Type: application/json");
    }
    for (name, value) in &response.headers {
        // may_minihttp writes Content-Length itself.
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            // Unique per request; not worth keeping in the set.
            lines.push(Box::leak(format!("{name}: {value}").into_boxed_str()));
            continue;
        }
        let name = if name.eq_ignore_ascii_case("content-type") { "Content-Type" } else { name.as_ref() };
        lines.push(intern_header(name, value));
    }
    lines
}

/// Write a handler response to the wire.
pub fn write_handler_response(res: &mut Response, response: &HandlerResponse) {
    res.status_code(usize::from(response.status), status_reason(response.status));
    for line in header_lines(response) {
        res.header(line);
    }
    res.body_vec(response.body.to_bytes());
}

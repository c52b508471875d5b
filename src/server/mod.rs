//! HTTP serving on `may_minihttp`.

mod docs;
mod http_server;
mod request;
mod response;
mod service;

pub use docs::DocsEndpoints;
pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_query_params, parse_request, ParsedRequest};
pub use response::write_handler_response;
pub use service::AppService;

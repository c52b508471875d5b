//! # Dispatcher Module
//!
//! Coroutine-based handler dispatch.
//!
//! Each registered handler runs in its own `may` coroutine and receives
//! requests over an MPSC channel together with a one-shot reply channel.
//! Validation happens inside that coroutine, in the handler's validation
//! wrapper, so a request is only answered through the reply channel and a
//! cancelled coroutine never leaves a partial response behind.
//!
//! ## Error Handling
//!
//! - Unknown handler names yield `None` (the server answers 500)
//! - Handler panics are caught and answered with 500
//! - A handler coroutine that has gone away is answered with 503
//!
//! ```rust,ignore
//! use swagger_gate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
//! use std::sync::Arc;
//!
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.register_handler("GET /pets/{id}", Arc::new(|req: &mut HandlerRequest| {
//!         HandlerResponse::ok_json(serde_json::json!({"id": req.get_path_param("id")}))
//!     }))?;
//! }
//! ```

mod core;

pub use core::{
    Dispatcher, Envelope, HandlerRequest, HandlerResponse, HandlerSender, HeaderVec, ResponseBody,
    MAX_INLINE_HEADERS,
};

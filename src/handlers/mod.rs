//! # Handlers Module
//!
//! Handler conventions and the request-validation wrapper.
//!
//! Two registration styles exist:
//!
//! - **Function handlers** implement [`Handler`] (any
//!   `Fn(&mut HandlerRequest) -> HandlerResponse` does) and opt into
//!   validation per route.
//! - **Views** group handlers for several HTTP methods on one path in a
//!   [`ViewTable`]. Each method receives the view value and the request; the
//!   view and each method can opt into validation, the method's flag winning.
//!
//! Validation is applied by [`ValidationGate`], which reaches the request
//! through [`RequestCarrier`] so the same code serves both conventions.

mod view;
mod wrap;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

pub use view::{MethodOptions, ViewCall, ViewMethod, ViewRoute, ViewTable};
pub use wrap::{RequestCarrier, Validated, ValidationGate};

/// A request handler run inside a dispatcher coroutine.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResponse;
}

impl<F> Handler for F
where
    F: Fn(&mut HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
{
    fn handle(&self, req: &mut HandlerRequest) -> HandlerResponse {
        self(req)
    }
}

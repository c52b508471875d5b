//! # Router Module
//!
//! Path matching for registered routes.
//!
//! Route patterns use Swagger path syntax (`/users/{id}`). At startup each
//! pattern is compiled into an anchored regex with one capture group per
//! parameter; static segments are escaped. For each request the table is
//! scanned in registration order and the first route whose method and regex
//! match wins. Captured values are percent-decoded.
//!
//! ```rust,ignore
//! use swagger_gate::router::Router;
//! use swagger_gate::spec::RouteMeta;
//! use http::Method;
//!
//! let router = Router::new(vec![RouteMeta::new(Method::GET, "/pets/{id}", "GET /pets/{id}")])?;
//! let m = router.route(&Method::GET, "/pets/123").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("123"));
//! ```

mod core;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};

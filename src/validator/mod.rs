//! # Validator Module
//!
//! Turns the Swagger description of an operation into an executable request
//! validator and runs it against live requests.
//!
//! ## Pipeline
//!
//! 1. **Dereference**: every internal `$ref` in the operation is expanded
//!    against the document's own definitions ([`dereference`]). Cycles are
//!    detected by tracking the chain of references being expanded, and nesting
//!    is capped at [`MAX_REF_DEPTH`].
//! 2. **Normalize**: parameters are grouped by their `in` location and each
//!    group becomes one JSON schema. `path`, `query`, `header` and `formData`
//!    groups become object schemas; the single `body` parameter keeps its own
//!    schema and also accepts `null` when it is optional.
//! 3. **Compile**: each schema is compiled as Draft 4 into a
//!    [`LocationValidator`]; together they form a [`CompiledValidator`], which
//!    is immutable and shared through `Arc`.
//! 4. **Validate**: for every request the content type is checked against
//!    `consumes`, then each location is extracted from the request
//!    ([`RequestSource`]), collapsed, defaulted and validated. The first
//!    violation becomes a [`ValidationError`]; success yields a
//!    [`ValidatedRequest`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use swagger_gate::validator::compile;
//!
//! let compiled = compile(&document, &operation)?;
//! match compiled.validate(&mut request) {
//!     Ok(validated) => println!("{}", validated.to_value()),
//!     Err(err) => println!("{}", err.to_body(false)),
//! }
//! ```
//!
//! Errors found while building a validator are [`ConfigError`]s and surface at
//! setup time, never while serving.

mod compile;
mod defaults;
mod error;
mod form;
mod reference;
mod request;
mod schema;

pub use compile::{compile, CompiledValidator, LocationValidator};
pub use defaults::inject_defaults;
pub use error::{ConfigError, ErrorDescription, ValidationError, DEFAULT_ERROR_CODE};
pub use form::{content_type_param, media_type, parse_form, FormBody, DEFAULT_MEDIA_TYPE};
pub use reference::{dereference, ReferenceError, MAX_REF_DEPTH};
pub use request::{collapse_pairs, decode_body, validate_request, RequestSource, ValidatedRequest};
pub use schema::{build_body_schema, build_group_schema, build_schema, group_parameters, ParameterGroup};

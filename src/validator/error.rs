use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// Status code used for every validation failure.
pub const DEFAULT_ERROR_CODE: u16 = 400;

/// Machine-readable part of a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDescription {
    /// Schema keyword that failed (`minLength`, `enum`, `required`, ...).
    pub validator: String,
    /// Schema fragment holding the failing keyword.
    pub schema: Value,
    /// Dotted path to the offending value, starting with the location key.
    pub field: String,
    /// The offending value.
    pub value: Value,
}

/// A request rejected by validation.
///
/// Only the first violation is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    pub code: u16,
    pub description: ErrorDescription,
    /// JSON pointer into the failing schema, exposed as `traceback` when enabled.
    pub schema_path: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>, description: ErrorDescription) -> Self {
        Self {
            message: message.into(),
            code: DEFAULT_ERROR_CODE,
            description,
            schema_path: String::new(),
        }
    }

    /// The request content type is not listed in the operation's `consumes`.
    #[must_use]
    pub fn unsupported_content_type(content_type: &str, consumes: &[String]) -> Self {
        Self::new(
            format!("Unsupported content type: {content_type}"),
            ErrorDescription {
                validator: "consumes".to_string(),
                schema: json!({ "consumes": consumes }),
                field: "Content-Type".to_string(),
                value: Value::String(content_type.to_string()),
            },
        )
    }

    /// A `$ref` chain re-entered a reference it was already expanding.
    #[must_use]
    pub fn reference_cycle(reference: &str) -> Self {
        Self::new(
            format!("Cycle swagger reference in schema: {reference}"),
            ErrorDescription {
                validator: "$ref".to_string(),
                schema: json!({ "$ref": reference }),
                field: String::new(),
                value: Value::Null,
            },
        )
    }

    /// Nested reference expansion went deeper than the resolver allows.
    #[must_use]
    pub fn reference_depth(reference: &str, depth: usize) -> Self {
        Self::new(
            format!("Swagger reference nesting deeper than {depth} levels at: {reference}"),
            ErrorDescription {
                validator: "$ref".to_string(),
                schema: json!({ "$ref": reference }),
                field: String::new(),
                value: Value::Null,
            },
        )
    }

    #[must_use]
    pub fn with_schema_path(mut self, schema_path: impl Into<String>) -> Self {
        self.schema_path = schema_path.into();
        self
    }

    /// Response body for this error:
    /// `{"error": {"message", "code", "description", "traceback"?}}`.
    #[must_use]
    pub fn to_body(&self, traceback: bool) -> Value {
        let mut inner = Map::new();
        inner.insert("message".to_string(), Value::String(self.message.clone()));
        inner.insert("code".to_string(), Value::from(self.code));
        inner.insert(
            "description".to_string(),
            serde_json::to_value(&self.description).unwrap_or(Value::Null),
        );
        if traceback {
            let trace = if self.schema_path.is_empty() {
                format!("{}: {}", self.description.validator, self.message)
            } else {
                format!("{} at {}: {}", self.description.validator, self.schema_path, self.message)
            };
            inner.insert("traceback".to_string(), Value::String(trace));
        }
        json!({ "error": Value::Object(inner) })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} (field `{}`)", self.message, self.description.field)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A Swagger operation that cannot be turned into a validator.
///
/// Raised at registration time, never while serving requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A generated per-location schema is not a valid Draft-4 schema.
    InvalidSchema { location: String, message: String },
    /// A parameter object is malformed.
    InvalidParameter { index: usize, message: String },
    /// The operation declares more than one `in: body` parameter.
    DuplicateBody,
    /// A parameter uses an `in` value Swagger 2.0 does not define.
    UnknownLocation(String),
    /// A `$ref` points at nothing in the document.
    UnresolvedReference(String),
    /// The operation or document has the wrong shape.
    Document(String),
    /// A route pattern cannot be compiled into a matcher.
    InvalidRoute { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSchema { location, message } => {
                write!(f, "Invalid schema for `{location}` parameters: {message}")
            }
            ConfigError::InvalidParameter { index, message } => {
                write!(f, "Invalid parameter #{index}: {message}")
            }
            ConfigError::DuplicateBody => {
                write!(f, "Operation declares more than one body parameter")
            }
            ConfigError::UnknownLocation(location) => {
                write!(f, "Unknown parameter location `{location}`")
            }
            ConfigError::UnresolvedReference(reference) => {
                write!(f, "Unresolvable swagger reference: {reference}")
            }
            ConfigError::Document(message) => write!(f, "Invalid swagger document: {message}"),
            ConfigError::InvalidRoute { path, message } => {
                write!(f, "Invalid route pattern `{path}`: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

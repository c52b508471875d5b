use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::validator::ConfigError;

/// HTTP verbs that may appear as operation keys under a Swagger path item.
pub const OPERATION_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Where a Swagger 2.0 parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    FormData,
    Body,
}

impl ParameterLocation {
    /// Parse the value of a parameter's `in` field.
    #[must_use]
    pub fn from_swagger(value: &str) -> Option<Self> {
        match value {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "formData" => Some(Self::FormData),
            "body" => Some(Self::Body),
            _ => None,
        }
    }

    /// The `in` spelling used by Swagger documents.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::FormData => "formData",
            Self::Body => "body",
        }
    }

    /// Key under which validated data for this location is exposed.
    ///
    /// Identical to [`as_str`](Self::as_str) except for headers, which are
    /// reported as `headers`.
    #[must_use]
    pub fn result_key(&self) -> &'static str {
        match self {
            Self::Header => "headers",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single Swagger parameter after reference resolution.
///
/// `fields` keeps every key of the parameter object except `required`, which
/// is exactly what a non-body parameter contributes as its constraint schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Value>,
    pub fields: Map<String, Value>,
}

impl Parameter {
    /// Build a parameter from a dereferenced parameter object.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the value is not an object, lacks a
    /// `name`, has an unknown `in`, or carries a non-boolean `required`.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ConfigError> {
        let obj = value.as_object().ok_or_else(|| ConfigError::InvalidParameter {
            index,
            message: "parameter must be an object".to_string(),
        })?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::InvalidParameter {
                index,
                message: "parameter has no string `name`".to_string(),
            })?
            .to_string();
        let raw_location = obj
            .get("in")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::InvalidParameter {
                index,
                message: format!("parameter `{name}` has no string `in`"),
            })?;
        let location = ParameterLocation::from_swagger(raw_location)
            .ok_or_else(|| ConfigError::UnknownLocation(raw_location.to_string()))?;
        let required = match obj.get("required") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(ConfigError::InvalidParameter {
                    index,
                    message: format!("parameter `{name}` has non-boolean `required`: {other}"),
                })
            }
        };
        let mut fields = obj.clone();
        fields.remove("required");
        Ok(Self {
            name,
            location,
            required,
            schema: obj.get("schema").cloned(),
            fields,
        })
    }

    /// Schema constraining this parameter's value inside its location object.
    #[must_use]
    pub fn constraint_schema(&self) -> Value {
        match &self.schema {
            Some(schema) => schema.clone(),
            None => Value::Object(self.fields.clone()),
        }
    }
}

/// A Swagger 2.0 document.
///
/// The document is open-ended JSON, so it is kept as a [`Value`]; this wrapper
/// offers the lookups the rest of the crate needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiDocument(Value);

impl ApiDocument {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `paths` object, if present.
    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.0.get("paths").and_then(Value::as_object)
    }

    /// Look up the operation object for a path pattern and method.
    #[must_use]
    pub fn operation(&self, path: &str, method: &Method) -> Option<&Value> {
        let key = method.as_str().to_ascii_lowercase();
        self.paths()?.get(path)?.get(key.as_str())
    }

    /// Every `(path, method, operation)` triple in document order.
    #[must_use]
    pub fn operations(&self) -> Vec<(&str, &str, &Value)> {
        let mut out = Vec::new();
        if let Some(paths) = self.paths() {
            for (path, item) in paths {
                let Some(item) = item.as_object() else { continue };
                for (method, op) in item {
                    if OPERATION_METHODS.contains(&method.as_str()) {
                        out.push((path.as_str(), method.as_str(), op));
                    }
                }
            }
        }
        out
    }

    /// Serialize the document as JSON text.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }
}

impl From<Value> for ApiDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A registered route as seen by the router.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    pub path_pattern: Arc<str>,
    pub handler_name: Arc<str>,
}

impl RouteMeta {
    #[must_use]
    pub fn new(method: Method, path_pattern: &str, handler_name: &str) -> Self {
        Self {
            method,
            path_pattern: Arc::from(path_pattern),
            handler_name: Arc::from(handler_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameter_from_value_strips_required() {
        let p = Parameter::from_value(
            0,
            &json!({"name": "user_login", "in": "query", "required": true, "type": "string", "minLength": 5}),
        )
        .unwrap();
        assert_eq!(p.location, ParameterLocation::Query);
        assert!(p.required);
        assert!(p.fields.get("required").is_none());
        assert_eq!(p.constraint_schema()["minLength"], 5);
        assert_eq!(p.constraint_schema()["in"], "query");
    }

    #[test]
    fn test_parameter_prefers_nested_schema() {
        let p = Parameter::from_value(
            0,
            &json!({"name": "body", "in": "body", "schema": {"type": "object"}}),
        )
        .unwrap();
        assert!(!p.required);
        assert_eq!(p.constraint_schema(), json!({"type": "object"}));
    }

    #[test]
    fn test_unknown_location_is_rejected() {
        let err = Parameter::from_value(3, &json!({"name": "c", "in": "cookie"})).unwrap_err();
        assert_eq!(err, ConfigError::UnknownLocation("cookie".to_string()));
    }

    #[test]
    fn test_document_operation_lookup() {
        let doc = ApiDocument::new(json!({
            "swagger": "2.0",
            "paths": {"/ping": {"get": {"description": "pong"}, "parameters": []}}
        }));
        assert_eq!(doc.operation("/ping", &Method::GET).unwrap()["description"], "pong");
        assert!(doc.operation("/ping", &Method::POST).is_none());
        let ops = doc.operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].1, "get");
    }

    #[test]
    fn test_result_keys() {
        assert_eq!(ParameterLocation::Header.result_key(), "headers");
        assert_eq!(ParameterLocation::FormData.result_key(), "formData");
        assert_eq!(ParameterLocation::from_swagger("formData"), Some(ParameterLocation::FormData));
    }
}

//! Assembly of the Swagger document from registered routes.
//!
//! Every route may carry a [`DocumentProvider`] describing its operation. The
//! provider is resolved once, at setup, and the resulting operations are
//! collected under `paths[pattern][method]` of a skeleton built from
//! [`SwaggerInfo`]. Providers that fail to load degrade into a visible
//! placeholder operation tagged `Invalid Swagger` rather than aborting setup.

use super::load::{parse_document, DocumentFormat};
use super::types::ApiDocument;
use http::Method;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Tag attached to placeholder operations.
pub const INVALID_SWAGGER_TAG: &str = "Invalid Swagger";

/// Top-level metadata of a generated document.
#[derive(Debug, Clone, PartialEq)]
pub struct SwaggerInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    pub contact: String,
    pub base_path: String,
    pub security_definitions: Option<Value>,
}

impl Default for SwaggerInfo {
    fn default() -> Self {
        Self {
            title: "Swagger API".to_string(),
            description: "Swagger API definition".to_string(),
            version: "1.0.0".to_string(),
            contact: String::new(),
            base_path: "/".to_string(),
            security_definitions: None,
        }
    }
}

impl SwaggerInfo {
    /// Build the document skeleton: everything except the operations.
    #[must_use]
    pub fn skeleton(&self) -> Value {
        let mut doc = json!({
            "swagger": "2.0",
            "info": {
                "description": clean_description(&self.description),
                "version": self.version,
                "title": self.title,
                "contact": {"email": self.contact},
            },
            "basePath": self.base_path,
            "paths": {},
        });
        if let (Some(defs), Some(root)) = (&self.security_definitions, doc.as_object_mut()) {
            root.insert("securityDefinitions".to_string(), defs.clone());
        }
        doc
    }
}

/// Drop leading newlines and join the remaining lines with four spaces.
#[must_use]
pub fn clean_description(description: &str) -> String {
    description
        .trim_start_matches('\n')
        .lines()
        .collect::<Vec<_>>()
        .join("    ")
}

/// Source of the Swagger operation documenting one route.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DocumentProvider {
    /// Undocumented: the route is left out of `paths`.
    #[default]
    None,
    /// A ready operation object.
    Operation(Value),
    /// Inline YAML text for the operation.
    Yaml(String),
    /// A YAML file holding the operation.
    File(PathBuf),
}

impl DocumentProvider {
    #[must_use]
    pub fn is_documented(&self) -> bool {
        !matches!(self, DocumentProvider::None)
    }

    /// Resolve the operation object, or `None` for undocumented routes.
    ///
    /// Load failures produce a placeholder operation instead of an error.
    #[must_use]
    pub fn resolve(&self) -> Option<Value> {
        match self {
            DocumentProvider::None => None,
            DocumentProvider::Operation(op) => Some(op.clone()),
            DocumentProvider::Yaml(text) => match serde_yaml::from_str::<Value>(text) {
                Ok(op) => Some(op),
                Err(err) => {
                    warn!(error = %err, "Inline swagger operation is not valid YAML");
                    Some(placeholder_operation(
                        "⚠ Swagger document could not be loaded from docstring ⚠",
                    ))
                }
            },
            DocumentProvider::File(path) => match std::fs::read_to_string(path) {
                Ok(text) => match parse_document(&text, DocumentFormat::Yaml) {
                    Ok(doc) => Some(doc.into_value()),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "Swagger operation file is invalid");
                        Some(placeholder_operation(
                            "⚠ Swagger document could not be loaded from file ⚠",
                        ))
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Swagger operation file not found");
                    Some(placeholder_operation(&format!(
                        "⚠ Swagger file not found ({}) ⚠",
                        path.display()
                    )))
                }
            },
        }
    }
}

fn placeholder_operation(description: &str) -> Value {
    json!({
        "description": description,
        "tags": [INVALID_SWAGGER_TAG],
    })
}

/// Documentation input for one registered `(path, method)` pair.
#[derive(Debug, Clone)]
pub struct RouteDoc {
    pub path: String,
    pub method: Method,
    pub provider: DocumentProvider,
}

/// Collect every documented route into a full document.
#[must_use]
pub fn build_document(info: &SwaggerInfo, routes: &[RouteDoc]) -> ApiDocument {
    let mut doc = info.skeleton();
    let mut paths: Map<String, Value> = Map::new();
    for route in routes {
        let Some(op) = route.provider.resolve() else {
            debug!(path = %route.path, method = %route.method, "Route has no swagger document");
            continue;
        };
        let item = paths
            .entry(route.path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(item) = item.as_object_mut() {
            item.insert(route.method.as_str().to_ascii_lowercase(), op);
        }
    }
    if let Some(root) = doc.as_object_mut() {
        root.insert("paths".to_string(), Value::Object(paths));
    }
    ApiDocument::new(doc)
}

use super::types::{ApiDocument, OPERATION_METHODS};
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Document serialization, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// Parse document text in the given format.
///
/// # Errors
///
/// Returns the YAML or JSON parse error.
pub fn parse_document(content: &str, format: DocumentFormat) -> anyhow::Result<ApiDocument> {
    let value: Value = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content).context("invalid YAML document")?,
        DocumentFormat::Json => serde_json::from_str(content).context("invalid JSON document")?,
    };
    if !value.is_object() {
        anyhow::bail!("swagger document must be a mapping at the top level");
    }
    Ok(ApiDocument::new(value))
}

/// Load a Swagger document from a `.yaml`/`.yml` or JSON file.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load_document<P: AsRef<Path>>(path: P) -> anyhow::Result<ApiDocument> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read swagger document {}", path.display()))?;
    let doc = parse_document(&content, DocumentFormat::from_path(path))
        .with_context(|| format!("failed to parse swagger document {}", path.display()))?;
    info!(
        path = %path.display(),
        paths_count = doc.paths().map(|p| p.len()).unwrap_or(0),
        "Swagger document loaded"
    );
    Ok(doc)
}

/// Merge generated operations into a document loaded from a file.
///
/// The file document is the base: its top-level keys and operations win. Any
/// path or method only the generated document knows about is added.
#[must_use]
pub fn merge_documents(base: ApiDocument, generated: &ApiDocument) -> ApiDocument {
    let mut merged = base.into_value();
    let Some(gen_paths) = generated.paths() else {
        return ApiDocument::new(merged);
    };
    let Some(root) = merged.as_object_mut() else {
        return ApiDocument::new(merged);
    };
    let paths = root
        .entry("paths")
        .or_insert_with(|| Value::Object(Default::default()));
    if !paths.is_object() {
        *paths = Value::Object(Default::default());
    }
    let Some(paths) = paths.as_object_mut() else {
        return ApiDocument::new(merged);
    };

    for (path, item) in gen_paths {
        let Some(item) = item.as_object() else { continue };
        let target = paths
            .entry(path.clone())
            .or_insert_with(|| Value::Object(Default::default()));
        let Some(target) = target.as_object_mut() else { continue };
        for (method, op) in item {
            if !OPERATION_METHODS.contains(&method.as_str()) {
                continue;
            }
            if !target.contains_key(method) {
                debug!(path = %path, method = %method, "Merged generated operation into file document");
                target.insert(method.clone(), op.clone());
            }
        }
    }
    ApiDocument::new(merged)
}

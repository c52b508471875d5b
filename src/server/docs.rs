//! Documentation endpoints mounted by `App::setup_swagger`.

use crate::dispatcher::HandlerResponse;
use crate::spec::ApiDocument;
use crate::static_files::{render_swagger_ui, StaticFiles, SWAGGER_UI_CDN};
use anyhow::Context;
use http::Method;
use std::path::PathBuf;
use tracing::debug;

/// Prepared responses for `{base}`, `{base}/`, `{base}/swagger.json` and
/// `{base}/swagger_static/*`.
#[derive(Debug, Clone)]
pub struct DocsEndpoints {
    base_url: String,
    document_json: String,
    ui_html: String,
    static_files: Option<StaticFiles>,
}

impl DocsEndpoints {
    /// Render the UI page and serialize the document once.
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be serialized or the page rendered.
    pub fn new(
        base_url: &str,
        document: &ApiDocument,
        validator_url: Option<&str>,
        static_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let document_json = document.to_json_string().context("serializing swagger document")?;
        let static_path = format!("{base_url}/swagger_static");
        let asset_base = if static_dir.is_some() { static_path.as_str() } else { SWAGGER_UI_CDN };
        let title = document
            .as_value()
            .pointer("/info/title")
            .and_then(|t| t.as_str())
            .unwrap_or("Swagger UI");
        let ui_html = render_swagger_ui(title, &format!("{base_url}/swagger.json"), asset_base, validator_url)
            .context("rendering swagger UI page")?;
        Ok(Self {
            base_url,
            document_json,
            ui_html,
            static_files: static_dir.map(StaticFiles::new),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn document_json(&self) -> &str {
        &self.document_json
    }

    /// Answer `method path` if it addresses a documentation endpoint.
    #[must_use]
    pub fn respond(&self, method: &Method, path: &str) -> Option<HandlerResponse> {
        if *method != Method::GET {
            return None;
        }
        let rest = path.strip_prefix(self.base_url.as_str())?;
        match rest {
            "" | "/" => Some(HandlerResponse::text(200, "text/html", self.ui_html.clone())),
            "/swagger.json" => Some(HandlerResponse::text(
                200,
                "application/json",
                self.document_json.clone(),
            )),
            _ => {
                let file = rest.strip_prefix("/swagger_static/")?;
                let Some(static_files) = &self.static_files else {
                    return Some(HandlerResponse::error(404, "Not Found"));
                };
                match static_files.load(file) {
                    Ok((bytes, content_type)) => Some(HandlerResponse::bytes(200, content_type, bytes)),
                    Err(e) => {
                        debug!(path, error = %e, "Static swagger asset not served");
                        Some(HandlerResponse::error(404, "Not Found"))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ResponseBody;
    use serde_json::json;

    fn endpoints(static_dir: Option<PathBuf>) -> DocsEndpoints {
        let doc = ApiDocument::new(json!({"swagger": "2.0", "info": {"title": "Pets"}, "paths": {}}));
        DocsEndpoints::new("/api/doc", &doc, Some("//online.swagger.io/validator"), static_dir).unwrap()
    }

    fn body_text(resp: &HandlerResponse) -> String {
        String::from_utf8(resp.body.to_bytes()).unwrap()
    }

    #[test]
    fn test_ui_and_document() {
        let docs = endpoints(None);
        for path in ["/api/doc", "/api/doc/"] {
            let resp = docs.respond(&Method::GET, path).unwrap();
            assert_eq!(resp.get_header("content-type"), Some("text/html"));
            assert!(body_text(&resp).contains("online.swagger.io/validator"));
        }
        let resp = docs.respond(&Method::GET, "/api/doc/swagger.json").unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&resp.body.to_bytes()).unwrap();
        assert_eq!(doc["info"]["title"], "Pets");
        assert!(matches!(resp.body, ResponseBody::Bytes(_)));
    }

    #[test]
    fn test_other_paths_fall_through() {
        let docs = endpoints(None);
        assert!(docs.respond(&Method::POST, "/api/doc").is_none());
        assert!(docs.respond(&Method::GET, "/api/docs").is_none());
        assert!(docs.respond(&Method::GET, "/users").is_none());
        assert_eq!(docs.respond(&Method::GET, "/api/doc/swagger_static/x.js").unwrap().status, 404);
    }

    #[test]
    fn test_static_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("swagger-ui.css"), "body{}").unwrap();
        let docs = endpoints(Some(dir.path().to_path_buf()));
        let resp = docs.respond(&Method::GET, "/api/doc/swagger_static/swagger-ui.css").unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.get_header("content-type"), Some("text/css"));
        let missing = docs.respond(&Method::GET, "/api/doc/swagger_static/../secret").unwrap();
        assert_eq!(missing.status, 404);
        let html = body_text(&docs.respond(&Method::GET, "/api/doc").unwrap());
        assert!(html.contains("/api/doc/swagger_static/swagger-ui.css"));
    }
}

//! Swagger UI page rendering and static asset serving.

use minijinja::{context, Environment};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const SWAGGER_UI_TEMPLATE: &str = include_str!("templates/swagger_ui.html");

/// Where the UI loads its scripts and styles from when no static directory
/// is configured.
pub const SWAGGER_UI_CDN: &str = "https://unpkg.com/swagger-ui-dist@5";

/// Render the Swagger UI page.
///
/// `spec_url` is the URL of the JSON document, `asset_base` the URL prefix of
/// `swagger-ui-bundle.js` and friends.
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn render_swagger_ui(
    title: &str,
    spec_url: &str,
    asset_base: &str,
    validator_url: Option<&str>,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    // No extension in the name: the values are URLs and must not be HTML-escaped.
    env.add_template("swagger_ui", SWAGGER_UI_TEMPLATE)?;
    let tmpl = env.get_template("swagger_ui")?;
    tmpl.render(context! {
        title => title,
        spec_url => spec_url,
        asset_base => asset_base,
        validator_url => validator_url,
    })
}

/// Files served from a directory, rejecting paths that leave it.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(url_path).ok()?;
        let mut pb = self.base_dir.clone();
        for comp in Path::new(decoded.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "map" => "application/json",
            "png" => "image/png",
            "svg" => "image/svg+xml",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }

    /// Read `url_path` below the base directory.
    ///
    /// # Errors
    ///
    /// `NotFound` for traversal attempts and missing files, otherwise the read
    /// error.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

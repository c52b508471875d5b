//! Route table and path matching.

use crate::spec::RouteMeta;
use crate::validator::ConfigError;
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter pairs in request order.
///
/// Names are `Arc<str>` because path parameter names come from the route
/// table built at startup; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Path parameters extracted from the URL, percent-decoded.
    pub path_params: ParamVec,
    pub handler_name: Arc<str>,
}

impl RouteMatch {
    /// Last value captured for `name`.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    meta: Arc<RouteMeta>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

/// Regex-backed route table.
///
/// Routes are tried in registration order and the first match wins.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Build the table from registered routes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRoute`] when a pattern does not compile.
    pub fn new(routes: Vec<RouteMeta>) -> Result<Self, ConfigError> {
        let routes = routes
            .into_iter()
            .map(|meta| {
                let (regex, names) = Self::path_to_regex(&meta.path_pattern)?;
                Ok(CompiledRoute {
                    meta: Arc::new(meta),
                    regex,
                    param_names: names.into_iter().map(Arc::from).collect(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.meta.method, r.meta.path_pattern))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
        Ok(Self { routes })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes in table order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteMeta> {
        self.routes.iter().map(|r| r.meta.as_ref())
    }

    /// Match `method path` to a route.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for route in self.routes.iter().filter(|r| r.meta.method == *method) {
            let Some(captures) = route.regex.captures(path) else { continue };
            let mut path_params = ParamVec::new();
            for (name, capture) in route.param_names.iter().zip(captures.iter().skip(1)) {
                let raw = capture.map_or("", |m| m.as_str());
                let value = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |v| v.into_owned());
                path_params.push((Arc::clone(name), value));
            }
            debug!(
                method = %method,
                path,
                handler_name = %route.meta.handler_name,
                route_pattern = %route.meta.path_pattern,
                path_params = ?path_params,
                "Route matched"
            );
            return Some(RouteMatch {
                route: Arc::clone(&route.meta),
                path_params,
                handler_name: Arc::clone(&route.meta.handler_name),
            });
        }
        debug!(method = %method, path, "No route matched");
        None
    }

    /// Methods registered for any pattern matching `path`, for `405` answers.
    #[must_use]
    pub fn methods_for(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for route in &self.routes {
            if route.regex.is_match(path) && !methods.contains(&route.meta.method) {
                methods.push(route.meta.method.clone());
            }
        }
        methods
    }

    /// Convert a route pattern such as `/users/{id}` into an anchored regex
    /// and the ordered list of parameter names.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRoute {
            path: path.to_string(),
            message,
        };
        if !path.starts_with('/') {
            return Err(invalid("pattern must start with `/`".to_string()));
        }
        if path == "/" {
            return Regex::new(r"^/$")
                .map(|re| (re, Vec::new()))
                .map_err(|e| invalid(e.to_string()));
        }

        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());
        for segment in path.split('/').skip(1) {
            pattern.push('/');
            if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(invalid("empty parameter name".to_string()));
                }
                pattern.push_str("([^/]+)");
                param_names.push(name.to_string());
            } else {
                pattern.push_str(&regex::escape(segment));
            }
        }
        pattern.push('$');
        let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
        Ok((regex, param_names))
    }
}

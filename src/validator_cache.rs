//! # Validator Cache Module
//!
//! Caches compiled operation validators so that each Swagger operation is
//! dereferenced and compiled once, however many routes or setups ask for it.
//!
//! ## Cache Key Structure
//!
//! Keys are formatted as `{spec_version}:{spec_hash}:{METHOD}:{path}`:
//! - `spec_version`: counter incremented whenever the document changes
//! - `spec_hash`: first 16 hex characters of the SHA-256 of the document
//! - `METHOD` / `path`: the operation's HTTP method and route pattern
//!
//! Changing the document through [`ValidatorCache::update_spec_version`] or
//! [`ValidatorCache::clear`] bumps the version, so stale entries can never be
//! returned for the new document.
//!
//! ## Configuration
//!
//! Disabled with `SWAGGER_GATE_SCHEMA_CACHE=off`; every lookup then compiles a
//! fresh validator.

use crate::spec::ApiDocument;
use crate::validator::{compile, CompiledValidator, ConfigError};
use http::Method;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Version identifier for a Swagger document.
///
/// ```rust
/// use swagger_gate::validator_cache::SpecVersion;
///
/// let v1 = SpecVersion::new(1, "abc123def456");
/// let v2 = SpecVersion::from_content(2, b"swagger: '2.0'");
/// assert_ne!(v1, v2);
/// assert_eq!(v2.hash.len(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecVersion {
    /// Monotonic counter.
    pub version: u64,
    /// First 16 hex characters of the SHA-256 of the document.
    pub hash: String,
}

impl SpecVersion {
    pub fn new(version: u64, hash: impl Into<String>) -> Self {
        Self {
            version,
            hash: hash.into(),
        }
    }

    #[must_use]
    pub fn from_content(version: u64, content: &[u8]) -> Self {
        Self {
            version,
            hash: content_hash(content),
        }
    }

    /// `{version}:{hash}`
    #[must_use]
    pub fn to_key(&self) -> String {
        format!("{}:{}", self.version, self.hash)
    }
}

impl Default for SpecVersion {
    fn default() -> Self {
        Self {
            version: 1,
            hash: "initial".to_string(),
        }
    }
}

fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize()).chars().take(16).collect()
}

/// Thread-safe cache of [`CompiledValidator`]s.
///
/// Cloning the cache shares the underlying storage.
#[derive(Clone, Debug)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<String, Arc<CompiledValidator>>>>,
    enabled: bool,
    spec_version: Arc<RwLock<SpecVersion>>,
}

impl ValidatorCache {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        info!(enabled, "Initializing operation validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
            spec_version: Arc::new(RwLock::new(SpecVersion::default())),
        }
    }

    fn cache_key(spec_version: &SpecVersion, method: &Method, path: &str) -> String {
        format!("{}:{}:{}", spec_version.to_key(), method.as_str(), path)
    }

    /// Return the cached validator for `method path`, compiling `operation`
    /// against `document` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the [`ConfigError`] from compilation. Failed compilations
    /// are not cached.
    pub fn get_or_compile(
        &self,
        method: &Method,
        path: &str,
        document: &ApiDocument,
        operation: &Value,
    ) -> Result<Arc<CompiledValidator>, ConfigError> {
        if !self.enabled {
            return compile(document, operation).map(Arc::new);
        }

        let spec_version = self.spec_version();
        let key = Self::cache_key(&spec_version, method, path);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&key) {
                debug!(cache_key = %key, "Operation validator cache hit");
                return Ok(Arc::clone(validator));
            }
        }

        let validator = Arc::new(compile(document, operation)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another coroutine may have compiled it while we were not holding the lock.
        if let Some(existing) = cache.get(&key) {
            return Ok(Arc::clone(existing));
        }
        cache.insert(key.clone(), Arc::clone(&validator));
        info!(
            method = %method,
            path,
            spec_version = spec_version.version,
            spec_hash = %spec_version.hash,
            cache_key = %key,
            cache_size = cache.len(),
            "Operation validator compiled and cached"
        );
        Ok(validator)
    }

    /// Compile every operation of `document` ahead of the first request.
    ///
    /// # Errors
    ///
    /// Stops at the first operation that fails to compile.
    pub fn precompile(&self, document: &ApiDocument) -> Result<usize, ConfigError> {
        if !self.enabled {
            info!("Validator cache disabled, skipping precompilation");
            return Ok(0);
        }
        let mut compiled = 0;
        for (path, method, operation) in document.operations() {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|e| ConfigError::Document(format!("invalid method `{method}`: {e}")))?;
            self.get_or_compile(&method, path, document, operation)?;
            compiled += 1;
        }
        info!(compiled, cache_size = self.size(), "Precompiled operation validators");
        Ok(compiled)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop every entry and bump the version.
    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut version = self.spec_version.write().unwrap_or_else(PoisonError::into_inner);
        let old = version.version;
        version.version += 1;
        version.hash = format!("reload-{}", version.version);
        cache.clear();
        info!(old_version = old, new_version = version.version, "Validator cache cleared");
    }

    /// Record a new document: bump the version, hash `content`, and drop
    /// every entry.
    pub fn update_spec_version(&self, content: &[u8]) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut version = self.spec_version.write().unwrap_or_else(PoisonError::into_inner);
        let old = version.clone();
        *version = SpecVersion::from_content(old.version + 1, content);
        cache.clear();
        info!(
            old_version = old.version,
            old_hash = %old.hash,
            new_version = version.version,
            new_hash = %version.hash,
            "Document version updated and validator cache cleared"
        );
    }

    #[must_use]
    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

//! # Runtime Configuration Module
//!
//! Environment-driven settings read once at startup.
//!
//! ## Environment Variables
//!
//! ### `SWAGGER_GATE_STACK_SIZE`
//!
//! Stack size for handler coroutines, decimal (`131072`) or hexadecimal
//! (`0x20000`). Default: `0x20000` (128 KB). Request validation runs inside the
//! handler coroutine, and schema evaluation (regex patterns in particular) needs
//! more stack than a plain handler.
//!
//! ### `SWAGGER_GATE_SCHEMA_CACHE`
//!
//! `off` (or `false` / `0`) disables the operation validator cache. Default: on.
//!
//! ### `SWAGGER_GATE_ERROR_TRACEBACK`
//!
//! `true` (or `1`) adds a `traceback` entry naming the failing schema path to
//! validation error bodies. Default: off.
//!
//! ```rust
//! use swagger_gate::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;

/// Default coroutine stack size.
pub const DEFAULT_STACK_SIZE: usize = 0x20000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes.
    pub stack_size: usize,
    /// Whether compiled validators are cached.
    pub schema_cache: bool,
    /// Whether error bodies carry a `traceback`.
    pub error_traceback: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            schema_cache: true,
            error_traceback: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let stack_size = lookup("SWAGGER_GATE_STACK_SIZE")
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let schema_cache = lookup("SWAGGER_GATE_SCHEMA_CACHE")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "off" | "false" | "0"))
            .unwrap_or(true);
        let error_traceback = lookup("SWAGGER_GATE_ERROR_TRACEBACK")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on"))
            .unwrap_or(false);
        Self {
            stack_size,
            schema_cache,
            error_traceback,
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        RuntimeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), RuntimeConfig::default());
    }

    #[test]
    fn test_stack_size_hex_and_decimal() {
        assert_eq!(config(&[("SWAGGER_GATE_STACK_SIZE", "0x8000")]).stack_size, 0x8000);
        assert_eq!(config(&[("SWAGGER_GATE_STACK_SIZE", "65536")]).stack_size, 65536);
        assert_eq!(
            config(&[("SWAGGER_GATE_STACK_SIZE", "lots")]).stack_size,
            DEFAULT_STACK_SIZE
        );
    }

    #[test]
    fn test_flags() {
        let c = config(&[
            ("SWAGGER_GATE_SCHEMA_CACHE", "off"),
            ("SWAGGER_GATE_ERROR_TRACEBACK", "true"),
        ]);
        assert!(!c.schema_cache);
        assert!(c.error_traceback);
    }
}

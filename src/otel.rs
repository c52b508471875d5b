//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`], an optional
//! [`SamplingLayer`] and a JSON or pretty fmt layer. Output can go through a
//! `tracing-appender` non-blocking writer so handler coroutines never block on
//! stdout.
//!
//! | variable | values | default |
//! |---|---|---|
//! | `SWAGGER_GATE_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `SWAGGER_GATE_LOG_FORMAT` | json/pretty | `json` |
//! | `SWAGGER_GATE_LOG_TARGET_FILTER` | comma-separated directives | none |
//! | `SWAGGER_GATE_LOG_SAMPLING_MODE` | all/error-only/sampled | `all` |
//! | `SWAGGER_GATE_LOG_SAMPLING_RATE` | 0.0-1.0 | `1.0` |
//! | `SWAGGER_GATE_LOG_ASYNC` | true/false | `true` |
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// JSON for production, pretty-print for development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events reach the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    All,
    /// Only WARN and ERROR.
    ErrorOnly,
    /// Every WARN and ERROR, a fraction of everything else.
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction of non-error events kept in [`SamplingMode::Sampled`].
    pub sampling_rate: f64,
    pub async_logging: bool,
    /// Extra `EnvFilter` directives, comma-separated.
    pub target_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: true,
            target_filter: None,
        }
    }
}

impl LogConfig {
    /// Read the `SWAGGER_GATE_LOG_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("SWAGGER_GATE_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("SWAGGER_GATE_LOG_FORMAT").map_or(defaults.format, |s| LogFormat::parse(&s)),
            sampling_mode: lookup("SWAGGER_GATE_LOG_SAMPLING_MODE")
                .map_or(defaults.sampling_mode, |s| SamplingMode::parse(&s)),
            sampling_rate: lookup("SWAGGER_GATE_LOG_SAMPLING_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sampling_rate),
            async_logging: lookup("SWAGGER_GATE_LOG_ASYNC")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("SWAGGER_GATE_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
        }
    }

    /// Verbose synchronous pretty output, for local runs and tests.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            ..Self::default()
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(e) => eprintln!("Ignoring invalid log filter directive `{directive}`: {e}"),
                }
            }
        }
        filter
    }
}

/// Drops events according to a [`SamplingMode`].
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, level: &Level) -> bool {
        let important = matches!(*level, Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => important,
            SamplingMode::Sampled => {
                if important {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                let interval = (1.0 / self.sampling_rate) as u64;
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                interval > 0 && count % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // Spans always pass; only events are sampled.
        metadata.is_span() || self.should_sample(metadata.level())
    }
}

/// Install the global subscriber.
///
/// With async logging the returned guard flushes pending lines when dropped;
/// keep it alive for the life of the process.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate));

    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(writer)
            .boxed(),
    };

    registry
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> LogConfig {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LogConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.log_level, "info");
        assert_eq!(c.format, LogFormat::Json);
        assert_eq!(c.sampling_mode, SamplingMode::All);
        assert!(c.async_logging);
        assert!(c.target_filter.is_none());
    }

    #[test]
    fn test_from_vars() {
        let c = config(&[
            ("SWAGGER_GATE_LOG_LEVEL", "debug"),
            ("SWAGGER_GATE_LOG_FORMAT", "PRETTY"),
            ("SWAGGER_GATE_LOG_SAMPLING_MODE", "error-only"),
            ("SWAGGER_GATE_LOG_ASYNC", "false"),
            ("SWAGGER_GATE_LOG_TARGET_FILTER", "may_minihttp=warn"),
        ]);
        assert_eq!(c.level(), Level::DEBUG);
        assert_eq!(c.format, LogFormat::Pretty);
        assert_eq!(c.sampling_mode, SamplingMode::ErrorOnly);
        assert!(!c.async_logging);
        assert_eq!(c.target_filter.as_deref(), Some("may_minihttp=warn"));
    }

    #[test]
    fn test_sampling() {
        let errors_only = SamplingLayer::new(SamplingMode::ErrorOnly, 1.0);
        assert!(errors_only.should_sample(&Level::WARN));
        assert!(!errors_only.should_sample(&Level::INFO));

        let half = SamplingLayer::new(SamplingMode::Sampled, 0.5);
        let kept = (0..10).filter(|_| half.should_sample(&Level::INFO)).count();
        assert_eq!(kept, 5);
        assert!(half.should_sample(&Level::ERROR));

        let none = SamplingLayer::new(SamplingMode::Sampled, 0.0);
        assert!(!none.should_sample(&Level::DEBUG));
    }
}

use crate::app::{App, SwaggerConfig, DEFAULT_SWAGGER_URL};
use crate::otel::{init_logging, LogConfig};
use crate::runtime_config::RuntimeConfig;
use crate::server::{DocsEndpoints, HttpServer, ServerHandle};
use crate::spec::load_document;
use crate::validator_cache::ValidatorCache;
use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for swagger-gate.
#[derive(Parser, Debug)]
#[command(name = "swagger-gate")]
#[command(about = "Swagger 2.0 documentation and request validation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a document and compile a validator for each operation
    Check {
        /// Swagger document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Print the document as JSON, or the Swagger UI page
    Render {
        #[arg(short, long)]
        spec: PathBuf,

        /// Print the UI page instead of the document
        #[arg(long, default_value_t = false)]
        ui: bool,

        /// Mount point the page links to
        #[arg(long, default_value = DEFAULT_SWAGGER_URL)]
        url: String,

        #[arg(long)]
        validator_url: Option<String>,
    },
    /// Serve the documentation endpoints for a document
    Serve {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        #[arg(long, default_value = DEFAULT_SWAGGER_URL)]
        url: String,

        /// Directory served under `{url}/swagger_static`
        #[arg(long, env = "SWAGGER_GATE_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },
}

/// Outcome of [`check_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub paths: usize,
    pub operations: usize,
}

/// Load `path` and compile every operation it holds.
///
/// # Errors
///
/// Fails on an unreadable document or the first operation that does not
/// compile.
pub fn check_document(path: &Path) -> anyhow::Result<CheckReport> {
    let document = load_document(path)?;
    let cache = ValidatorCache::new(true);
    let operations = cache
        .precompile(&document)
        .with_context(|| format!("compiling operations of {}", path.display()))?;
    Ok(CheckReport {
        paths: document.paths().map_or(0, |p| p.len()),
        operations,
    })
}

/// Render the document JSON, or the UI page when `ui` is set.
///
/// # Errors
///
/// Fails on an unreadable document or a rendering error.
pub fn render(path: &Path, ui: bool, url: &str, validator_url: Option<&str>) -> anyhow::Result<String> {
    let document = load_document(path)?;
    let url = SwaggerConfig::new().url(url).swagger_url().to_string();
    let docs = DocsEndpoints::new(&url, &document, validator_url, None)?;
    let target = if ui { url } else { format!("{url}/swagger.json") };
    let response = docs
        .respond(&Method::GET, &target)
        .context("documentation endpoint did not answer")?;
    Ok(String::from_utf8_lossy(&response.body.to_bytes()).into_owned())
}

fn serve(spec: PathBuf, addr: &str, url: &str, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let runtime = RuntimeConfig::from_env();
    may::config().set_stack_size(runtime.stack_size);

    let mut app = App::with_runtime_config(runtime);
    let mut config = SwaggerConfig::new().url(url).from_file(spec);
    if let Some(dir) = static_dir {
        config = config.static_dir(dir);
    }
    app.setup_swagger(config)?;

    // SAFETY: the runtime was configured above, before any coroutine is spawned.
    let service = unsafe { app.into_service()? };
    let handle = HttpServer(service).start(addr)?;
    handle.wait_ready()?;
    info!(addr = %handle.addr(), url, "Serving swagger documentation");

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    let mut signals = signal_hook::iterator::Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutting down");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server thread panicked: {e:?}"))
}

/// Run a parsed command line.
///
/// # Errors
///
/// Propagates the command's error.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check { spec } => {
            let report = check_document(&spec)?;
            println!(
                "{}: {} paths, {} operations compiled",
                spec.display(),
                report.paths,
                report.operations
            );
            Ok(())
        }
        Commands::Render {
            spec,
            ui,
            url,
            validator_url,
        } => {
            println!("{}", render(&spec, ui, &url, validator_url.as_deref())?);
            Ok(())
        }
        Commands::Serve {
            spec,
            addr,
            url,
            static_dir,
        } => {
            let _guard = init_logging(&LogConfig::from_env())?;
            serve(spec, &addr, &url, static_dir)
        }
    }
}

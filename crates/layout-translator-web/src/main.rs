//! Layout Translator Web - side-by-side PDF translation in the browser.

mod helpers;
mod preview_store;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use clap::Parser;
use layout_translator_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// How often idle sessions are swept
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Resolve the static files directory.
///
/// Priority:
/// 1. Explicit path if provided
/// 2. ./static if it exists
/// 3. Crate's built-in static directory
fn resolve_static_dir(explicit_path: Option<&str>) -> PathBuf {
    if let Some(path) = explicit_path {
        return PathBuf::from(path);
    }

    let local_static = PathBuf::from("static");
    if local_static.is_dir() {
        return local_static;
    }

    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

#[derive(Parser, Debug)]
#[command(name = "layout-translator-web")]
#[command(author, version, about = "Layout Translator Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file (defaults to ~/.config/layout-translator/config.toml, then ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE")]
    api_base: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Static files directory (defaults to ./static or crate's static dir)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AppConfig::load(),
        };

        if let Some(ref base) = self.api_base {
            config.gemini.api_base.clone_from(base);
        }
        if let Some(ref key) = self.api_key
            && !key.trim().is_empty()
        {
            config.gemini.api_key = Some(key.clone());
        }
        if let Some(ref model) = self.model {
            config.gemini.model.clone_from(model);
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = args.load_config()?;
    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; translations will fail until it is configured");
    }

    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    // Idle sessions are dropped, which revokes their previews
    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(CLEANUP_INTERVAL).await;
            cleanup_state.cleanup_old_sessions().await;
            debug!(
                "{} sessions active, {} previews outstanding",
                cleanup_state.session_count().await,
                cleanup_state.previews.outstanding()
            );
        }
    });

    let app = routes::router(state, resolve_static_dir(args.static_dir.as_deref()));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Resize Proxy - on-demand image resizing.
//!
//! This binary either runs the HTTP server or performs a single resize,
//! depending on the command-line arguments.

use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resize_proxy::{
    config::{Config, OneShotRequest, RunMode},
    create_router, HttpFetcher, ImageCodec, OriginalCache, ResizeService, RouterConfig,
    VariantCache,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse_args(std::env::args_os());

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match config.run_mode() {
        RunMode::Serve => run_serve(config).await,
        RunMode::OneShot(request) => run_one_shot(&config, request).await,
        RunMode::Usage => {
            if let Err(e) = Config::write_usage(&mut std::io::stdout()) {
                error!("Failed to print usage: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Build the resize service from configuration.
fn build_service(config: &Config) -> Result<ResizeService<HttpFetcher, ImageCodec>, String> {
    let fetcher = HttpFetcher::with_timeout(Duration::from_secs(config.fetch_timeout))
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

    Ok(ResizeService::with_original_cache(
        fetcher,
        ImageCodec::new(),
        VariantCache::new(&config.cache_dir),
        OriginalCache::with_capacity(config.memory_cache_size),
    ))
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve(config: Config) -> ExitCode {
    info!("Running as HTTP server");
    info!("  Cache dir: {}", config.cache_dir.display());
    info!("  Memory cache: {} originals", config.memory_cache_size);
    info!("  Fetch timeout: {}s", config.fetch_timeout);

    let service = match build_service(&config) {
        Ok(service) => service,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(service, build_router_config(&config));
    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on http://{}", addr);
    info!("  Try: curl http://{}/format:webp/resize:fill:300:200/plain/<url-encoded image url>", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// One-shot
// =============================================================================

async fn run_one_shot(config: &Config, one_shot: OneShotRequest) -> ExitCode {
    let request = match one_shot.to_request() {
        Ok(request) => request,
        Err(e) => {
            error!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = match build_service(config) {
        Ok(service) => service,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match service.resize(&request).await {
        Ok(outcome) => {
            let path = service.variants().path_for(&outcome.key);
            info!("Image resized and saved successfully");
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "resize_proxy=debug,tower_http=debug"
    } else {
        "resize_proxy=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

mod cli;

use crate::cli::{CacheBackendArg, StorageBackendArg, CLI};
use anyhow::{Context, Result};
use clap::Parser;
use shortlane_cache::{MokaUrlCache, RedisUrlCache};
use shortlane_core::{Repository, UrlCache};
use shortlane_gateway::{App, AppState, RESERVED_CODES};
use shortlane_generator::{RandomGenerator, RandomGeneratorSettings};
use shortlane_shortener::{ShortenerConfig, ShortenerService};
use shortlane_storage::{InMemoryRepository, PostgresRepository};
use shortlane_telemetry::TelemetryConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = CLI::parse();

    let _telemetry = shortlane_telemetry::init(
        TelemetryConfig::builder()
            .service_name("shortlane-gateway")
            .log_format(config.log_format)
            .otlp_endpoint(config.otlp_endpoint.clone())
            .build(),
    )
    .context("failed to initialize telemetry")?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        "starting shortlane gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => with_cache(&config, InMemoryRepository::new()).await,
        StorageBackendArg::Postgres => {
            let dsn = config
                .postgres_dsn
                .as_deref()
                .context("--postgres-dsn is required for the postgres backend")?;
            let repository = PostgresRepository::connect(dsn)
                .await
                .context("failed to connect to PostgreSQL")?;
            repository
                .ensure_schema()
                .await
                .context("failed to create the short_urls table")?;
            with_cache(&config, repository).await
        }
    }
}

async fn with_cache<R: Repository>(config: &CLI, repository: R) -> Result<()> {
    match config.cache {
        CacheBackendArg::InMemory => serve(config, repository, MokaUrlCache::new()).await,
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("--redis-url is required for the redis backend")?;
            let cache = RedisUrlCache::connect(url, &config.redis_key_prefix)
                .await
                .context("failed to connect to Redis")?;
            serve(config, repository, cache).await
        }
    }
}

async fn serve<R: Repository, C: UrlCache>(config: &CLI, repository: R, cache: C) -> Result<()> {
    let generator = RandomGenerator::new(
        RandomGeneratorSettings::builder()
            .length(config.code_length)
            .build(),
    )
    .context("invalid short code settings")?;
    let shortener_config = ShortenerConfig::builder()
        .policy(config.cache_policy())
        .max_attempts(config.max_mint_attempts)
        .reserved_codes(
            RESERVED_CODES
                .iter()
                .map(|code| code.to_string())
                .collect::<Vec<_>>(),
        )
        .build();

    let service = Arc::new(ShortenerService::new(repository, cache, generator, shortener_config));
    let app = App::router(AppState::new(
        service.clone(),
        service.clone(),
        config.public_base_url.as_str(),
    ));

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "Starting gateway server");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    service.close().await;
    served.context("HTTP server failed")?;

    info!("Gateway shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down...");
}

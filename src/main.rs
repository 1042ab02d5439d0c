// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};
use axum::{routing::get, Router};

use scada_signal_resolver::application::metadata_fetcher::MetadataFetcher;
use scada_signal_resolver::application::resolution_service::ResolutionService;
use scada_signal_resolver::application::sync_service::CacheSynchronizer;
use scada_signal_resolver::infrastructure::az_credentials::AzCliCredentialProvider;
use scada_signal_resolver::infrastructure::circuit_breaker::CircuitBreaker;
use scada_signal_resolver::infrastructure::config::load_resolver_config;
use scada_signal_resolver::infrastructure::dgraph_client::DgraphMetadataClient;
use scada_signal_resolver::infrastructure::latest_value_store::InMemoryLatestValueStore;
use scada_signal_resolver::infrastructure::signal_cache::SignalCache;
use scada_signal_resolver::presentation::app_state::AppState;
use scada_signal_resolver::presentation::handlers::{
    health_check, latest_by_installation_type, latest_by_measurement_standard,
    latest_by_reference_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_resolver_config()?;

    // Create adapters (infrastructure layer)
    let credentials = Arc::new(AzCliCredentialProvider);
    let dgraph_client = Arc::new(DgraphMetadataClient::new(
        config.upstream.endpoint.clone(),
        config.upstream.request_timeout(),
    )?);
    let cache = Arc::new(SignalCache::new(
        config.cache.max_size,
        config.cache.ttl(),
    ));
    let breaker = Arc::new(CircuitBreaker::new(
        config.breaker.failure_threshold,
        config.breaker.cooldown(),
    ));
    let latest_values = Arc::new(InMemoryLatestValueStore::new());

    // Create services (application layer)
    let fetcher = Arc::new(MetadataFetcher::new(
        credentials,
        dgraph_client,
        config.upstream.scope.clone(),
        config.upstream.retry_max_attempts,
        config.upstream.retry_backoff(),
    ));
    let synchronizer = CacheSynchronizer::new(cache.clone(), fetcher, breaker);
    let resolution_service =
        ResolutionService::new(cache, synchronizer, config.measurement_standards.clone());

    // Create application state
    let state = Arc::new(AppState {
        resolution_service,
        latest_values,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/ts/scada-reference/latest/:scada_reference_signal_name",
            get(latest_by_reference_signal),
        )
        .route(
            "/ts/scada-measurement-standard-name/latest/:measurement_standard_name",
            get(latest_by_measurement_standard),
        )
        .route(
            "/ts/scada-installation-type/latest/:installation_type",
            get(latest_by_installation_type),
        )
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting scada-signal-resolver service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

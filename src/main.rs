use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bridgewatch_indexer::chains::registry::ChainRegistry;
use bridgewatch_indexer::checkpoint::CheckpointStore;
use bridgewatch_indexer::config::Config;
use bridgewatch_indexer::indexer::ingest::ChainIndexer;
use bridgewatch_indexer::indexer::types::Registries;
use bridgewatch_indexer::rpc;
use bridgewatch_indexer::tokens::pools::PoolRegistry;
use bridgewatch_indexer::tokens::registry::TokenRegistry;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=info for output)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("Bridgewatch Indexer starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        chains = config.chains.len(),
        "Configuration loaded from {}",
        config_path
    );

    let chains = Arc::new(ChainRegistry::from_config(&config)?);

    // Create database connection pool
    let pg = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .map_err(|e| eyre::eyre!("Failed to connect to database: {}", e))?;

    tracing::info!("Connected to PostgreSQL");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pg)
        .await
        .map_err(|e| eyre::eyre!("Failed to run migrations: {}", e))?;

    tracing::info!("Database migrations complete");

    let checkpoints = CheckpointStore::connect(
        &config.redis.host,
        config.redis.port,
        &config.redis.namespace,
    )
    .await?;
    tracing::info!("Connected to Redis checkpoint store");

    // One provider per chain, shared by warmup and ingestion
    let mut providers = HashMap::new();
    for chain in chains.iter() {
        providers.insert(chain.chain_id, rpc::connect(&chain.rpc_http)?);
    }

    // Registries must be complete before any log is decoded; failures here
    // abort startup.
    let tokens = Arc::new(TokenRegistry::warm_up(&chains, &providers).await?);
    tracing::info!(tokens = tokens.token_count(), "Token metadata loaded");

    let pools = Arc::new(PoolRegistry::discover(&chains, &providers).await?);
    tracing::info!("Pool discovery complete");

    let registries = Registries {
        chains: chains.clone(),
        tokens,
        pools,
    };

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    // Spawn one ingestion task per chain
    let mut handles = Vec::new();
    for chain in chains.iter() {
        let provider = providers
            .get(&chain.chain_id)
            .cloned()
            .ok_or_else(|| eyre::eyre!("No provider for chain {}", chain.name))?;

        let indexer = ChainIndexer::new(
            chain.clone(),
            provider,
            registries.clone(),
            pg.clone(),
            checkpoints.clone(),
            shutdown.clone(),
        );

        let chain_name = chain.name.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = indexer.run().await {
                tracing::error!(chain = %chain_name, error = %e, "Chain indexer failed");
            }
        });

        handles.push(handle);
    }

    tracing::info!("All chain indexers started. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping all indexers...");
    shutdown.cancel();

    // Wait for all tasks to finish
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!("Bridgewatch Indexer stopped gracefully");
    Ok(())
}

//! `graphrec` server.
//!
//! Environment:
//! - `GRAPHREC_CONFIG`: path to a TOML config file (optional)
//! - `EMBEDDINGS_API`: embedding service URL, overrides `embedding.endpoint`
//! - `DATABASE_URL`: PostgreSQL URL, overrides `profile.database_url`
//! - `RUST_LOG`: tracing filter

use std::path::PathBuf;
use std::sync::Arc;

use graphrec::api::{create_router, ApiState};
use graphrec::catalog::{load_products_json, seed_catalog};
use graphrec::telemetry::init_tracing;
use graphrec::{
    BackendGraphStore, DeterministicEmbeddingGateway, EmbeddingGateway,
    HttpEmbeddingGateway, InMemoryProfileStore, ProfileStore, RecommendationEngine,
    Result, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,graphrec=debug");

    let config_path = std::env::var_os("GRAPHREC_CONFIG").map(PathBuf::from);
    let mut config = ServiceConfig::load(config_path.as_deref())?;
    if let Ok(url) = std::env::var("EMBEDDINGS_API") {
        config.embedding.endpoint = Some(url);
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.profile.database_url = Some(url);
    }

    let embedder: Arc<dyn EmbeddingGateway> = match &config.embedding.endpoint {
        Some(endpoint) => {
            tracing::info!(%endpoint, "using HTTP embedding service");
            Arc::new(HttpEmbeddingGateway::new(endpoint.clone(), config.embedding.timeout())?)
        }
        None => {
            tracing::warn!("no embedding endpoint configured, using deterministic embeddings");
            Arc::new(DeterministicEmbeddingGateway::new(config.graph.dimension))
        }
    };

    let graph = BackendGraphStore::open_memory(config.graph.schema()).await?;
    if let Some(path) = &config.graph.catalog_seed {
        let products = load_products_json(path)?;
        seed_catalog(&graph, embedder.as_ref(), products).await?;
    }

    let profiles = open_profiles(&config).await?;
    let engine = RecommendationEngine::new(Arc::new(graph), profiles, embedder, &config);
    let app = create_router(ApiState { engine: Arc::new(engine) });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!(addr = %config.server.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn open_profiles(config: &ServiceConfig) -> Result<Arc<dyn ProfileStore>> {
    if let Some(url) = &config.profile.database_url {
        #[cfg(feature = "postgres")]
        {
            let store = graphrec::profile::PostgresProfileStore::connect(url, config.profile.max_connections).await?;
            tracing::info!("using PostgreSQL profile store");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = url;
            return Err(graphrec::Error::Config(
                "profile.database_url is set but graphrec was built without the postgres feature".into(),
            ));
        }
    }

    let store = match &config.profile.seed_path {
        Some(path) => InMemoryProfileStore::load_json(path)?,
        None => InMemoryProfileStore::new(),
    };
    tracing::info!("using in-memory profile store");
    Ok(Arc::new(store))
}

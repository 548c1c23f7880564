//! Catalog seeding: write products into the graph, embedding those that
//! arrive without a vector.

use std::path::Path;

use crate::embedding::{validate_embedding, EmbeddingGateway};
use crate::graph::BackendGraphStore;
use crate::model::ProductSpec;
use crate::storage::StorageBackend;
use crate::{Error, Result};

/// Read a JSON array of products.
pub fn load_products_json(path: &Path) -> Result<Vec<ProductSpec>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("invalid catalog {}: {e}", path.display())))
}

/// Write every product, embedding `name` and `description` through
/// `gateway` when no embedding is supplied. Stops at the first failure;
/// products already written stay written.
pub async fn seed_catalog<B: StorageBackend>(
    store: &BackendGraphStore<B>,
    gateway: &dyn EmbeddingGateway,
    products: Vec<ProductSpec>,
) -> Result<usize> {
    let dimension = store.schema().dimension;
    let mut written = 0;
    for mut product in products {
        if product.embedding.is_none() {
            let vector = gateway.embed(&product.embedding_text()).await?;
            product.embedding = Some(validate_embedding(vector, dimension)?);
        }
        store.add_product(&product).await?;
        written += 1;
    }
    tracing::info!(products = written, gateway = gateway.name(), "catalog seeded");
    Ok(written)
}

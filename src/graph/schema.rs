//! Labels, relationship types and property keys of the recommendation graph,
//! plus the schema bootstrap.

use crate::index::{SimilarityFunction, VectorIndexSpec};
use crate::storage::{ConstraintType, StorageBackend};
use crate::Result;

pub const USER: &str = "User";
pub const PRODUCT: &str = "Product";
pub const ALLERGENS: &str = "Allergens";
pub const GENDER: &str = "Gender";
pub const AFFILIATIONS: &str = "Affiliations";

pub const HAS_ALLERGY: &str = "HAS_ALLERGY";
pub const GENDER_OF: &str = "GENDER";
pub const IS_AFFILIATED_WITH: &str = "IS_AFFILIATED_WITH";

pub const EXTERNAL_ID: &str = "external_id";
pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const TYPE: &str = "type";
pub const TEXT_EMBEDDING: &str = "textEmbedding";

/// Vector index settings for product embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSchema {
    pub vector_index: String,
    pub dimension: usize,
    pub similarity: SimilarityFunction,
}

impl Default for GraphSchema {
    fn default() -> Self {
        Self {
            vector_index: "product_text_embeddings".to_string(),
            dimension: 384,
            similarity: SimilarityFunction::Cosine,
        }
    }
}

impl GraphSchema {
    pub fn vector_index_spec(&self) -> VectorIndexSpec {
        VectorIndexSpec {
            name: self.vector_index.clone(),
            label: PRODUCT.to_string(),
            property: TEXT_EMBEDDING.to_string(),
            dimension: self.dimension,
            similarity: self.similarity,
        }
    }
}

/// Create the constraints and the vector index. Idempotent.
///
/// The unique constraint on `User.external_id` is what makes concurrent
/// provisioning of the same user safe.
pub async fn bootstrap<B: StorageBackend>(backend: &B, schema: &GraphSchema) -> Result<()> {
    backend.create_constraint(USER, EXTERNAL_ID, ConstraintType::Unique).await?;
    backend.create_constraint(PRODUCT, ID, ConstraintType::Unique).await?;
    backend.create_constraint(AFFILIATIONS, ID, ConstraintType::Unique).await?;
    backend.create_vector_index(schema.vector_index_spec()).await?;
    tracing::debug!(index = %schema.vector_index, dimension = schema.dimension, "graph schema ready");
    Ok(())
}

//! `GraphStore` over a `StorageBackend`.

use async_trait::async_trait;

use crate::model::*;
use crate::model::property_map::props;
use crate::embedding::embedding_problem;
use crate::storage::{CreatePattern, MemoryBackend, StorageBackend};
use crate::tx::TxMode;
use crate::{Error, Result};
use super::schema::{self, *};
use super::{CreateUserOutcome, GraphSchema, GraphStore};

const STORE: &str = "graph store";

/// Graph adapter over any storage backend. Constructing one bootstraps the
/// schema, so the uniqueness constraint provisioning relies on is always
/// present.
pub struct BackendGraphStore<B: StorageBackend> {
    backend: B,
    schema: GraphSchema,
}

impl<B: StorageBackend> BackendGraphStore<B> {
    pub async fn open(backend: B, schema: GraphSchema) -> Result<Self> {
        schema::bootstrap(&backend, &schema).await?;
        Ok(Self { backend, schema })
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn schema(&self) -> &GraphSchema {
        &self.schema
    }

    /// Number of `User` nodes carrying `external_id`. Anything but 0 or 1
    /// means the uniqueness invariant is broken.
    pub async fn count_users(&self, external_id: &str) -> Result<usize> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let users = self.backend
            .nodes_by_property(&tx, USER, EXTERNAL_ID, &Value::from(external_id))
            .await?;
        self.backend.commit_tx(tx).await?;
        Ok(users.len())
    }

    /// Write a product with its eligibility edges. Affiliation nodes are
    /// shared by id and merged in the same write that creates the product.
    pub async fn add_product(&self, product: &ProductSpec) -> Result<NodeId> {
        let embedding = product.embedding.as_ref().ok_or_else(|| {
            Error::Validation(format!("product {} has no embedding", product.id))
        })?;
        if let Some(problem) = embedding_problem(embedding, self.schema.dimension) {
            return Err(Error::Validation(format!("product {}: {problem}", product.id)));
        }

        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;

        let mut product_props = PropertyMap::new();
        product_props.insert(ID.into(), Value::from(product.id.as_str()));
        product_props.insert(NAME.into(), Value::from(product.name.as_str()));
        product_props.insert("description".into(), Value::from(product.description.as_str()));
        product_props.insert("price".into(), Value::from(product.price));
        product_props.insert(TEXT_EMBEDDING.into(), Value::Vector(embedding.clone()));

        let mut pattern = CreatePattern::new();
        let p = pattern.node(&[PRODUCT], product_props);
        let a = pattern.node(&[ALLERGENS], props([(TYPE, product.allergen.as_str())]));
        let g = pattern.node(&[GENDER], props([(TYPE, product.gender.as_str())]));
        pattern.relate(p, HAS_ALLERGY, a);
        pattern.relate(p, GENDER_OF, g);

        if let Some(aff) = &product.affiliation {
            let target = pattern.merge_node(
                &[AFFILIATIONS],
                ID,
                props([(ID, aff.as_str()), (NAME, aff.as_str())]),
            );
            pattern.relate(p, IS_AFFILIATED_WITH, target);
        }

        let ids = match self.backend.create_pattern(&mut tx, pattern).await {
            Ok(ids) => ids,
            Err(e) => {
                self.backend.rollback_tx(tx).await?;
                return Err(e);
            }
        };
        self.backend.commit_tx(tx).await?;
        tracing::debug!(product = %product.id, "product written");

        ids.first().copied()
            .ok_or_else(|| Error::StorageError("product creation returned no id".into()))
    }

    /// Tag carried by the first node behind an outgoing `rel_type` edge.
    async fn tag(&self, tx: &B::Tx, node: NodeId, rel_type: &str, key: &str) -> Result<Option<String>> {
        let targets = self.backend.outgoing_targets(tx, node, rel_type).await?;
        Ok(targets.first().and_then(|n| n.get(key)).and_then(value_text))
    }

    async fn find_user_inner(&self, external_id: &str) -> Result<Option<UserRecord>> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let users = self.backend
            .nodes_by_property(&tx, USER, EXTERNAL_ID, &Value::from(external_id))
            .await?;

        let record = match users.first() {
            None => None,
            Some(user) => {
                if users.len() > 1 {
                    tracing::warn!(user = external_id, count = users.len(), "duplicate User nodes");
                }
                Some(UserRecord {
                    node_id: user.id,
                    external_id: external_id.to_string(),
                    allergen: self.tag(&tx, user.id, HAS_ALLERGY, TYPE).await?,
                    gender: self.tag(&tx, user.id, GENDER_OF, TYPE).await?,
                })
            }
        };

        self.backend.commit_tx(tx).await?;
        Ok(record)
    }

    async fn create_user_inner(&self, user: &UserProjection) -> Result<CreateUserOutcome> {
        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;

        let mut user_props = PropertyMap::new();
        user_props.insert(EXTERNAL_ID.into(), Value::from(user.external_id.as_str()));
        user_props.insert(NAME.into(), Value::from(user.name.as_str()));
        user_props.insert("latitude".into(), Value::from(user.latitude));
        user_props.insert("longitude".into(), Value::from(user.longitude));
        if let Some(age) = user.age {
            user_props.insert("age".into(), Value::from(age));
        }
        if let Some(dob) = user.date_of_birth {
            user_props.insert("dob".into(), Value::from(dob));
        }

        let mut pattern = CreatePattern::new();
        let u = pattern.node(&[USER], user_props);
        let a = pattern.node(&[ALLERGENS], props([(TYPE, user.allergy.as_str())]));
        let g = pattern.node(&[GENDER], props([(TYPE, user.gender.as_str())]));
        pattern.relate(u, HAS_ALLERGY, a);
        pattern.relate(u, GENDER_OF, g);

        match self.backend.create_pattern(&mut tx, pattern).await {
            Ok(ids) => {
                self.backend.commit_tx(tx).await?;
                let node_id = ids.first().copied()
                    .ok_or_else(|| Error::StorageError("user creation returned no id".into()))?;
                Ok(CreateUserOutcome::Created(UserRecord {
                    node_id,
                    external_id: user.external_id.clone(),
                    allergen: Some(user.allergy.clone()),
                    gender: Some(user.gender.clone()),
                }))
            }
            Err(Error::ConstraintViolation(reason)) => {
                self.backend.rollback_tx(tx).await?;
                tracing::debug!(user = %user.external_id, %reason, "user already provisioned");
                Ok(CreateUserOutcome::AlreadyExists)
            }
            Err(e) => {
                self.backend.rollback_tx(tx).await?;
                Err(e)
            }
        }
    }

    async fn similar_products_inner(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let hits = self.backend
            .vector_query(&tx, &self.schema.vector_index, limit, vector)
            .await?;

        let mut candidates = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let Some(node) = self.backend.get_node(&tx, id).await? else {
                continue;
            };
            if !node.has_label(PRODUCT) {
                continue;
            }
            let Some(product_id) = node.get(ID).and_then(value_text) else {
                tracing::warn!(node = %id, "indexed product without id skipped");
                continue;
            };
            candidates.push(Candidate {
                product_id,
                name: node.get_str(NAME).unwrap_or_default().to_string(),
                description: node.get_str("description").unwrap_or_default().to_string(),
                price: node.get_float("price").unwrap_or(0.0),
                score,
                allergen: self.tag(&tx, id, HAS_ALLERGY, TYPE).await?,
                gender: self.tag(&tx, id, GENDER_OF, TYPE).await?,
                affiliation: self.tag(&tx, id, IS_AFFILIATED_WITH, ID).await?,
            });
        }

        self.backend.commit_tx(tx).await?;
        Ok(candidates)
    }
}

/// In-memory graph for testing and embedding.
impl BackendGraphStore<MemoryBackend> {
    pub async fn open_memory(schema: GraphSchema) -> Result<Self> {
        Self::open(MemoryBackend::new(), schema).await
    }
}

// Anything the backend raises here is a store fault, not a caller fault.
fn store_failure(e: Error) -> Error {
    match e {
        Error::StoreUnavailable(_) => e,
        other => Error::StoreUnavailable(format!("{STORE}: {other}")),
    }
}

#[async_trait]
impl<B: StorageBackend> GraphStore for BackendGraphStore<B> {
    async fn find_user(&self, external_id: &str) -> Result<Option<UserRecord>> {
        self.find_user_inner(external_id).await.map_err(store_failure)
    }

    async fn create_user(&self, user: &UserProjection) -> Result<CreateUserOutcome> {
        self.create_user_inner(user).await.map_err(store_failure)
    }

    async fn similar_products(&self, vector: &[f32], limit: usize) -> Result<Vec<Candidate>> {
        self.similar_products_inner(vector, limit).await.map_err(store_failure)
    }
}

/// Ids and tags may have been written as integers by older producers.
fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

//! # User Provisioning
//!
//! Guarantees a `User` node exists in the graph before retrieval filters on
//! it. The relational store stays the system of record; the graph copy is
//! written on first use and never updated here.
//!
//! ```text
//! find_user ──found──────────────────────────────▶ Exists
//!     │ absent
//!     ▼
//! get_profile ──none──▶ NotFound
//!     │
//!     ▼
//! create_user ──Created───────────────────────────▶ Provisioned
//!     │ AlreadyExists (lost a race)
//!     ▼
//! find_user ─────────────────────────────────────▶ Exists
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::graph::{CreateUserOutcome, GraphStore};
use crate::model::{UserProjection, UserRecord};
use crate::profile::ProfileStore;
use crate::retry::ReadRetry;
use crate::{Error, Result};

/// Which path `ensure_profile` took. Both carry the graph-side user.
#[derive(Debug, Clone, PartialEq)]
pub enum ProvisionOutcome {
    Exists(UserRecord),
    Provisioned(UserRecord),
}

impl ProvisionOutcome {
    pub fn user(&self) -> &UserRecord {
        match self {
            ProvisionOutcome::Exists(u) | ProvisionOutcome::Provisioned(u) => u,
        }
    }

    pub fn into_user(self) -> UserRecord {
        match self {
            ProvisionOutcome::Exists(u) | ProvisionOutcome::Provisioned(u) => u,
        }
    }

    pub fn is_provisioned(&self) -> bool {
        matches!(self, ProvisionOutcome::Provisioned(_))
    }
}

pub struct ProvisioningService {
    graph: Arc<dyn GraphStore>,
    profiles: Arc<dyn ProfileStore>,
    retry: ReadRetry,
}

impl ProvisioningService {
    pub fn new(graph: Arc<dyn GraphStore>, profiles: Arc<dyn ProfileStore>, retry: ReadRetry) -> Self {
        Self { graph, profiles, retry }
    }

    /// Make sure `external_id` has a `User` node, deriving its age today.
    pub async fn ensure_profile(&self, external_id: &str) -> Result<ProvisionOutcome> {
        self.ensure_profile_on(external_id, Utc::now().date_naive()).await
    }

    /// `ensure_profile` with an explicit "today" for the age derivation.
    #[tracing::instrument(skip(self, external_id), fields(user = %external_id))]
    pub async fn ensure_profile_on(&self, external_id: &str, today: NaiveDate) -> Result<ProvisionOutcome> {
        if external_id.is_empty() {
            return Err(Error::Validation("external id must not be empty".into()));
        }

        if let Some(user) = self.lookup(external_id).await? {
            tracing::debug!("user already in graph");
            return Ok(ProvisionOutcome::Exists(user));
        }

        let profiles = &self.profiles;
        let profile = self.retry
            .run("get_profile", move || profiles.get_profile(external_id))
            .await
            .map_err(|e| e.into_store_failure("profile store"))?;
        let projection = UserProjection::from_profile(&profile, today);

        match self.graph.create_user(&projection).await? {
            CreateUserOutcome::Created(user) => {
                tracing::info!(outcome = "provisioned", "user written to graph");
                Ok(ProvisionOutcome::Provisioned(user))
            }
            CreateUserOutcome::AlreadyExists => {
                tracing::debug!("concurrent provisioning won the race");
                match self.lookup(external_id).await? {
                    Some(user) => Ok(ProvisionOutcome::Exists(user)),
                    None => Err(Error::StoreUnavailable(format!(
                        "graph store reported user {external_id} as existing but returned none"
                    ))),
                }
            }
        }
    }

    async fn lookup(&self, external_id: &str) -> Result<Option<UserRecord>> {
        let graph = &self.graph;
        self.retry
            .run("find_user", move || graph.find_user(external_id))
            .await
    }
}

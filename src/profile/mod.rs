//! # Profile Store Adapter
//!
//! Read-only access to the relational system of record that owns user
//! profiles and consultation history.
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `InMemoryProfileStore` | `memory` | Seedable from JSON; tests and offline runs |
//! | `PostgresProfileStore` | `postgres` | `users` / `allergies` / `consultations` tables (feature `postgres`) |

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::model::ProfileRecord;
use crate::Result;

pub use memory::{InMemoryProfileStore, ProfileSeed, Consultation};
#[cfg(feature = "postgres")]
pub use postgres::PostgresProfileStore;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile keyed by `external_id`.
    ///
    /// Fails with `NotFound` when no row matches and `StoreUnavailable` when
    /// the store cannot be reached.
    async fn get_profile(&self, external_id: &str) -> Result<ProfileRecord>;

    /// Up to `count` diagnosis texts, most recent first. An unknown user has
    /// no history, which is not an error.
    async fn recent_diagnoses(&self, external_id: &str, count: usize) -> Result<Vec<String>>;
}

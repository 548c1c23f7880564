//! In-memory profile store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::ProfileRecord;
use crate::{Error, Result};
use super::ProfileStore;

/// One consultation and the diagnosis recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub external_id: String,
    pub diagnosis: String,
    pub recorded_at: DateTime<Utc>,
}

/// JSON seed for `InMemoryProfileStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSeed {
    #[serde(default)]
    pub profiles: Vec<ProfileRecord>,
    #[serde(default)]
    pub consultations: Vec<Consultation>,
}

/// Profiles and consultation history held in process memory.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, ProfileRecord>>,
    /// external_id → (recorded_at, diagnosis)
    consultations: RwLock<HashMap<String, Vec<(DateTime<Utc>, String)>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: ProfileSeed) -> Self {
        let store = Self::new();
        for profile in seed.profiles {
            store.insert_profile(profile);
        }
        for c in seed.consultations {
            store.record_diagnosis(&c.external_id, c.diagnosis, c.recorded_at);
        }
        store
    }

    /// Load a `ProfileSeed` JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let seed: ProfileSeed = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("invalid profile seed {}: {e}", path.display()))
        })?;
        tracing::info!(
            path = %path.display(),
            profiles = seed.profiles.len(),
            consultations = seed.consultations.len(),
            "profile seed loaded"
        );
        Ok(Self::from_seed(seed))
    }

    /// Insert or replace a profile.
    pub fn insert_profile(&self, profile: ProfileRecord) {
        self.profiles.write().insert(profile.external_id.clone(), profile);
    }

    pub fn record_diagnosis(&self, external_id: &str, diagnosis: impl Into<String>, at: DateTime<Utc>) {
        self.consultations
            .write()
            .entry(external_id.to_string())
            .or_default()
            .push((at, diagnosis.into()));
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, external_id: &str) -> Result<ProfileRecord> {
        self.profiles
            .read()
            .get(external_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("profile {external_id}")))
    }

    async fn recent_diagnoses(&self, external_id: &str, count: usize) -> Result<Vec<String>> {
        let consultations = self.consultations.read();
        let Some(history) = consultations.get(external_id) else {
            return Ok(Vec::new());
        };
        let mut history: Vec<&(DateTime<Utc>, String)> = history.iter().collect();
        history.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(history.into_iter().take(count).map(|(_, d)| d.clone()).collect())
    }
}

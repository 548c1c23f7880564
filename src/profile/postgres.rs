//! PostgreSQL profile store.
//!
//! Reads the system-of-record tables:
//!
//! ```text
//! users(id, email, ic, name, gender, date_of_birth, latitude, longitude)
//! allergies(user_id, name)
//! consultations(user_id, diagnosis, created_at)
//! ```
//!
//! A user is matched by either `email` or `ic` (national ID / passport).

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::model::ProfileRecord;
use crate::{Error, Result};
use super::ProfileStore;

const STORE: &str = "profile store";

const PROFILE_QUERY: &str = r#"
SELECT
    u.name,
    u.gender,
    u.date_of_birth::date AS date_of_birth,
    u.latitude::float8 AS latitude,
    u.longitude::float8 AS longitude,
    (SELECT a.name FROM allergies a WHERE a.user_id = u.id LIMIT 1) AS allergy
FROM users u
WHERE u.email = $1 OR u.ic = $1
LIMIT 1
"#;

const DIAGNOSIS_QUERY: &str = r#"
SELECT c.diagnosis
FROM consultations c
JOIN users u ON c.user_id = u.id
WHERE u.email = $1 OR u.ic = $1
ORDER BY c.created_at DESC
LIMIT $2
"#;

#[derive(sqlx::FromRow)]
struct ProfileRow {
    name: Option<String>,
    gender: Option<String>,
    date_of_birth: Option<NaiveDate>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    allergy: Option<String>,
}

pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(unavailable)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(e: sqlx::Error) -> Error {
    Error::StoreUnavailable(format!("{STORE}: {e}"))
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get_profile(&self, external_id: &str) -> Result<ProfileRecord> {
        let row: Option<ProfileRow> = sqlx::query_as(PROFILE_QUERY)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        let row = row.ok_or_else(|| Error::NotFound(format!("profile {external_id}")))?;

        Ok(ProfileRecord {
            external_id: external_id.to_string(),
            name: row.name,
            gender: row.gender,
            date_of_birth: row.date_of_birth,
            latitude: row.latitude,
            longitude: row.longitude,
            allergy: row.allergy,
        })
    }

    async fn recent_diagnoses(&self, external_id: &str, count: usize) -> Result<Vec<String>> {
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let rows: Vec<Option<String>> = sqlx::query_scalar(DIAGNOSIS_QUERY)
            .bind(external_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().flatten().collect())
    }
}

//! Query text resolution.

use crate::profile::ProfileStore;
use crate::retry::ReadRetry;
use crate::Result;

/// Explicit text wins; the engine passes blank text as `None`. Otherwise the user's `count` most
/// recent diagnoses, newest first, joined by single spaces. No history
/// yields the empty string.
pub async fn resolve_query_text(
    explicit: Option<&str>,
    profiles: &dyn ProfileStore,
    external_id: &str,
    count: usize,
    retry: &ReadRetry,
) -> Result<String> {
    if let Some(text) = explicit {
        return Ok(text.to_string());
    }
    let diagnoses = retry
        .run("recent_diagnoses", move || profiles.recent_diagnoses(external_id, count))
        .await
        .map_err(|e| e.into_store_failure("profile store"))?;
    tracing::debug!(diagnoses = diagnoses.len(), "query text synthesized from history");
    Ok(join_diagnoses(&diagnoses))
}

pub fn join_diagnoses(diagnoses: &[String]) -> String {
    diagnoses
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

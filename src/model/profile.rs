//! User profiles: the relational record, its graph projection, and the
//! graph-side view used for eligibility filtering.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::NodeId;

/// Gender recorded when the system of record has none.
pub const UNKNOWN_GENDER: &str = "Unknown";
/// Name recorded when the system of record has none.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Allergy classification recorded when the user has no allergy row.
pub const NO_ALLERGY: &str = "";

/// A user's demographic and eligibility attributes as held by the relational
/// system of record. Every attribute besides the identifier may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub external_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub allergy: Option<String>,
}

impl ProfileRecord {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self { external_id: external_id.into(), ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_allergy(mut self, allergy: impl Into<String>) -> Self {
        self.allergy = Some(allergy.into());
        self
    }

    pub fn with_date_of_birth(mut self, dob: NaiveDate) -> Self {
        self.date_of_birth = Some(dob);
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// Whole years elapsed between `dob` and `today`. Negative spans clamp to 0.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = i64::from(today.year() - dob.year());
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0)
}

/// The `User` node written into the graph on first use, with every missing
/// attribute replaced by its sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProjection {
    pub external_id: String,
    pub name: String,
    pub age: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: String,
    pub latitude: f64,
    pub longitude: f64,
    pub allergy: String,
}

impl UserProjection {
    /// Project a relational profile as of `today`.
    pub fn from_profile(profile: &ProfileRecord, today: NaiveDate) -> Self {
        Self {
            external_id: profile.external_id.clone(),
            name: profile.name.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            age: profile.date_of_birth.map(|dob| age_on(dob, today)),
            date_of_birth: profile.date_of_birth,
            gender: profile.gender.clone().unwrap_or_else(|| UNKNOWN_GENDER.to_string()),
            latitude: profile.latitude.unwrap_or(0.0),
            longitude: profile.longitude.unwrap_or(0.0),
            allergy: profile.allergy.clone().unwrap_or_else(|| NO_ALLERGY.to_string()),
        }
    }
}

/// A provisioned user as seen by the retrieval query: identity plus the two
/// eligibility tags. A tag is `None` when the edge is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub node_id: NodeId,
    pub external_id: String,
    pub allergen: Option<String>,
    pub gender: Option<String>,
}

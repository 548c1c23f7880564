//! # Property Graph and Domain Model
//!
//! Clean DTOs for the property graph (`Node`, `Relationship`, `Value`) and
//! the typed records that cross adapter boundaries (profiles, candidates,
//! queries, results).
//!
//! Design rule: this module is pure data. No I/O, no state, no async.

pub mod node;
pub mod relationship;
pub mod value;
pub mod property_map;
pub mod profile;
pub mod catalog;
pub mod recommendation;

pub use node::{Node, NodeId};
pub use relationship::{Relationship, RelId, Direction};
pub use value::Value;
pub use property_map::PropertyMap;
pub use profile::{ProfileRecord, UserProjection, UserRecord, age_on, UNKNOWN_GENDER, UNKNOWN_NAME, NO_ALLERGY};
pub use catalog::{ProductSpec, Candidate, NOT_KNOWN_ALLERGEN, UNISEX};
pub use recommendation::{RecommendationQuery, RecommendationResult};

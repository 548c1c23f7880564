//! Graph eligibility predicates and result ordering.
//!
//! A candidate or user without the relevant edge fails the predicate, the
//! same as an unmatched graph pattern.

use std::cmp::Ordering;

use crate::model::{Candidate, UserRecord, NOT_KNOWN_ALLERGEN, UNISEX};

/// Products tagged `"Not-Known"` always pass; otherwise the product's
/// allergen tag must differ from the user's.
pub fn allergen_compatible(candidate: Option<&str>, user: Option<&str>) -> bool {
    match (candidate, user) {
        (Some(c), Some(u)) => c == NOT_KNOWN_ALLERGEN || c != u,
        _ => false,
    }
}

/// `"Unisex"` products always pass; otherwise tags must match.
pub fn gender_compatible(candidate: Option<&str>, user: Option<&str>) -> bool {
    match (candidate, user) {
        (Some(c), Some(u)) => c == UNISEX || c == u,
        _ => false,
    }
}

/// No filter matches everything.
pub fn affiliation_matches(candidate: Option<&str>, filter: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(f) => candidate == Some(f),
    }
}

/// Strict: a score equal to the threshold is dropped.
pub fn above_threshold(score: f64, threshold: f64) -> bool {
    score > threshold
}

pub fn is_eligible(candidate: &Candidate, user: &UserRecord, affiliation: Option<&str>) -> bool {
    allergen_compatible(candidate.allergen.as_deref(), user.allergen.as_deref())
        && gender_compatible(candidate.gender.as_deref(), user.gender.as_deref())
        && affiliation_matches(candidate.affiliation.as_deref(), affiliation)
}

/// Descending score, then product id ascending.
pub fn by_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.product_id.cmp(&b.product_id))
}

/// Filter `candidates` for `user`, apply the threshold and order the rest.
pub fn rank(
    candidates: Vec<Candidate>,
    user: &UserRecord,
    affiliation: Option<&str>,
    threshold: f64,
) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| is_eligible(c, user, affiliation) && above_threshold(c.score, threshold))
        .collect();
    kept.sort_by(by_rank);
    kept
}

//! Index management: vector index definitions and similarity scoring.

use serde::{Deserialize, Serialize};

/// Similarity function of a vector index.
///
/// Scores follow Neo4j's vector index conventions so thresholds tuned
/// against a Neo4j deployment carry over:
/// - cosine: `(1 + cos(a, b)) / 2`, in `[0, 1]`
/// - euclidean: `1 / (1 + d²)`, in `(0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityFunction {
    #[default]
    Cosine,
    Euclidean,
}

impl SimilarityFunction {
    /// Score two equal-length vectors. Returns `None` when cosine is
    /// undefined (a zero vector).
    pub fn score(&self, a: &[f32], b: &[f32]) -> Option<f64> {
        debug_assert_eq!(a.len(), b.len());
        match self {
            SimilarityFunction::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
                for (x, y) in a.iter().zip(b) {
                    let (x, y) = (f64::from(*x), f64::from(*y));
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    return None;
                }
                let cos = (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0);
                Some((1.0 + cos) / 2.0)
            }
            SimilarityFunction::Euclidean => {
                let d2: f64 = a.iter().zip(b)
                    .map(|(x, y)| {
                        let d = f64::from(*x) - f64::from(*y);
                        d * d
                    })
                    .sum();
                Some(1.0 / (1.0 + d2))
            }
        }
    }
}

/// A named vector index over one label's embedding property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndexSpec {
    pub name: String,
    pub label: String,
    pub property: String,
    pub dimension: usize,
    pub similarity: SimilarityFunction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_score_range() {
        let f = SimilarityFunction::Cosine;
        assert!((f.score(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!((f.score(&[1.0, 0.0], &[0.0, 1.0]).unwrap() - 0.5).abs() < 1e-9);
        assert!(f.score(&[1.0, 0.0], &[-1.0, 0.0]).unwrap().abs() < 1e-9);
        assert_eq!(f.score(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn test_euclidean_score() {
        let f = SimilarityFunction::Euclidean;
        assert_eq!(f.score(&[1.0, 2.0], &[1.0, 2.0]), Some(1.0));
        assert!((f.score(&[0.0, 0.0], &[1.0, 0.0]).unwrap() - 0.5).abs() < 1e-9);
    }
}

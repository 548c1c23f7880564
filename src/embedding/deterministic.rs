//! Hashed bag-of-words embeddings.
//!
//! Every lower-cased alphanumeric token is hashed (FNV-1a) into one
//! dimension with a hash-derived sign, then the vector is unit-normalized.
//! Texts sharing words land close together under cosine similarity, which is
//! all tests and offline demos need. Text without tokens maps to the uniform
//! unit vector rather than an error.

use async_trait::async_trait;

use crate::Result;
use super::EmbeddingGateway;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct DeterministicEmbeddingGateway {
    dimension: usize,
}

impl DeterministicEmbeddingGateway {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let mut any = false;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(&token.to_lowercase());
            let slot = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[slot] += sign;
            any = true;
        }
        if !any {
            v.fill(1.0);
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        } else {
            // Tokens cancelled out exactly.
            v.fill(1.0 / (self.dimension as f32).sqrt());
        }
        v
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl EmbeddingGateway for DeterministicEmbeddingGateway {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "deterministic"
    }
}

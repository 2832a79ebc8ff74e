//! Offline embedding provider.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::embedding_client::EmbeddingProvider;
use crate::error::Result;

/// Default vector width.
pub const DEFAULT_TRIGRAM_DIMENSIONS: usize = 384;

/// Hashes character trigrams and whole words into a fixed-width unit vector.
///
/// Deterministic and content-dependent, but not semantic. Used when no
/// embedding service is configured.
#[derive(Debug, Clone)]
pub struct TrigramEmbedder {
    dimensions: usize,
}

impl TrigramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        // Ordered so bucket sums are accumulated identically on every call.
        let mut word_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| w.len() > 2)
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let hash = window
                    .iter()
                    .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
                embedding[(hash % self.dimensions as u64) as usize] += (*freq as f32).sqrt();
            }

            let hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(hash % self.dimensions as u64) as usize] += *freq as f32;
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        embedding
    }
}

impl Default for TrigramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGRAM_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for TrigramEmbedder {
    fn name(&self) -> &str {
        "trigram"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::cosine_similarity;

    #[tokio::test]
    async fn test_one_unit_vector_per_text() {
        let embedder = TrigramEmbedder::new(64);
        let texts = vec!["function login(user)".to_string(), "".to_string()];

        let vectors = embedder.embed(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 64));
        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(vectors[1].iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_bit_identical_across_instances() {
        let text = vec!["fn parse parse parse tokens tokens lexer lexer lexer lexer".to_string()];

        let first = TrigramEmbedder::new(16).embed(&text).await.unwrap();
        for _ in 0..20 {
            let again = TrigramEmbedder::new(16).embed(&text).await.unwrap();
            let same = first[0].iter().zip(&again[0]).all(|(a, b)| a.to_bits() == b.to_bits());
            assert!(same);
        }
    }

    #[tokio::test]
    async fn test_deterministic_and_content_dependent() {
        let embedder = TrigramEmbedder::default();
        let texts = vec![
            "authenticate the user with a password".to_string(),
            "authenticate user password".to_string(),
            "render a chart of quarterly revenue".to_string(),
        ];

        let first = embedder.embed(&texts).await.unwrap();
        let second = embedder.embed(&texts).await.unwrap();
        assert_eq!(first, second);

        let related = cosine_similarity(&first[0], &first[1]);
        let unrelated = cosine_similarity(&first[0], &first[2]);
        assert!(related > unrelated);
    }
}

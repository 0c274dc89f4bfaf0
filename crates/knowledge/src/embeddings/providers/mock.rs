//! Mock embedding provider using trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use ragline_core::AppResult;
use std::collections::{BTreeMap, HashSet};

const STOP_WORDS: [&str; 33] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what",
];

/// Offline provider for tests and development.
///
/// Generates deterministic unit vectors from character trigrams and word
/// frequencies. Not semantically accurate like a real model, but similar
/// texts land close together, which is enough to exercise retrieval.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Generate a mock embedding for text using trigram-based approach.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let stop_words: HashSet<&str> = STOP_WORDS.into_iter().collect();
        let lower = text.to_lowercase();

        // Ordered so float accumulation is identical across runs.
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram_hash = window.iter().fold(0u64, |acc, c| {
                    acc.wrapping_mul(37).wrapping_add(*c as u64)
                });
                let dim_idx = (trigram_hash as usize) % self.dimensions;
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Also encode whole word
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(word_hash as usize) % self.dimensions] += *freq as f32;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_embeddings_are_bit_identical() {
        let provider = MockProvider::new(16);
        let text = "Qdrant stores vectors while LanceDB keeps tables; vectors, tables, \
                    collections and payloads all collide in sixteen dimensions";

        let first: Vec<u32> = provider.embed_text(text).iter().map(|v| v.to_bits()).collect();
        for _ in 0..32 {
            let again: Vec<u32> = provider.embed_text(text).iter().map(|v| v.to_bits()).collect();
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn test_mock_provider_embed_batch() {
        let provider = MockProvider::new(384);
        let texts = vec![
            "hello world".to_string(),
            "test embedding".to_string(),
            "rust programming".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_mock_provider_deterministic() {
        let provider = MockProvider::new(384);
        assert_eq!(
            provider.embed_text("deterministic test"),
            provider.embed_text("deterministic test")
        );
        assert_ne!(
            provider.embed_text("hello world"),
            provider.embed_text("goodbye world")
        );
    }

    #[test]
    fn test_similar_texts_score_higher() {
        let provider = MockProvider::new(384);
        let query = provider.embed_text("How do I configure the vector store?");
        let related = provider.embed_text("Configure the vector store with a collection name.");
        let unrelated = provider.embed_text("Bananas are rich in potassium.");

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_mock_provider_empty_text() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed_text("");

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_mock_provider_utf8_safety() {
        let provider = MockProvider::new(384);
        let embedding =
            provider.embed_text("Gamedex é um aplicativo 🎮 brasileiro para gerenciar jogos!");

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}

//! Semantic match strategy
//!
//! Embedding-based alternative to the fuzzy matcher, for deployments that
//! need recall on paraphrased entity names ("the big multi-strat in
//! Chicago"). Candidate embeddings are computed once at construction into
//! a normalized in-memory index and reused for every query for the life of
//! the process.

use async_trait::async_trait;
use tracing::debug;

use crate::matcher::{Match, MatchError, MatchStrategy};

/// Embedding backend seam. Implemented over HTTP in the agentic crate;
/// tests use a deterministic stub.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. Output order matches input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError>;
}

/// L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize to unit length.
fn normalize(v: Vec<f32>) -> Vec<f32> {
    let n = l2_norm(&v);
    if n > 0.0 {
        v.into_iter().map(|x| x / n).collect()
    } else {
        v
    }
}

/// Dot product of two unit vectors, i.e. cosine similarity.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Matcher scoring by cosine similarity against a prebuilt index.
pub struct SemanticMatch<P> {
    provider: P,
    /// Candidate strings this index was built over, in index order.
    candidates: Vec<String>,
    index: Vec<Vec<f32>>,
}

impl<P: EmbeddingProvider> SemanticMatch<P> {
    /// Embed the candidate list once and keep the normalized index.
    pub async fn index(provider: P, candidates: Vec<String>) -> Result<Self, MatchError> {
        debug!(count = candidates.len(), "building semantic match index");
        let embeddings = provider.embed(&candidates).await?;
        if embeddings.len() != candidates.len() {
            return Err(MatchError::Embedding(format!(
                "provider returned {} embeddings for {} candidates",
                embeddings.len(),
                candidates.len()
            )));
        }
        let index = embeddings.into_iter().map(normalize).collect();
        Ok(Self {
            provider,
            candidates,
            index,
        })
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

#[async_trait]
impl<P: EmbeddingProvider> MatchStrategy for SemanticMatch<P> {
    async fn best_match(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<Option<Match>, MatchError> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let query_embedding = self
            .provider
            .embed(&[query.to_lowercase()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MatchError::Embedding("provider returned no embedding".into()))?;
        let query_embedding = normalize(query_embedding);

        // Score against the prebuilt index where the candidate is known;
        // candidates outside the index cannot be scored semantically and
        // are skipped.
        let best = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| {
                let pos = self.candidates.iter().position(|c| c == candidate)?;
                let score = cosine(&query_embedding, &self.index[pos]) * 100.0;
                Some(Match { index, score })
            })
            .max_by(|a, b| a.score.total_cmp(&b.score));
        Ok(best)
    }
}

//! Match strategy seam
//!
//! Free text is matched against a candidate list through this trait so the
//! scoring backend can be swapped: Jaro-Winkler fuzzy matching is the
//! default (deterministic, no I/O), the semantic matcher in
//! [`crate::semantic`] is the drop-in upgrade for deployments that need
//! recall on paraphrased names.

use async_trait::async_trait;
use thiserror::Error;

/// Scores are on a 0-100 scale; candidates below this are dropped.
pub const MATCH_THRESHOLD: f32 = 80.0;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("embedding backend error: {0}")]
    Embedding(String),
}

/// A scored best match against a candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Index into the candidate list passed to `best_match`.
    pub index: usize,
    /// Similarity on a 0-100 scale.
    pub score: f32,
}

/// Strategy for picking the best candidate for a piece of free text.
#[async_trait]
pub trait MatchStrategy: Send + Sync {
    /// Best-scoring candidate, or None for an empty candidate list.
    /// Thresholding is the caller's decision.
    async fn best_match(&self, query: &str, candidates: &[String])
        -> Result<Option<Match>, MatchError>;
}

/// Edit-distance matcher: normalized Jaro-Winkler scaled to 0-100.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatch;

#[async_trait]
impl MatchStrategy for FuzzyMatch {
    async fn best_match(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<Option<Match>, MatchError> {
        let query = query.to_lowercase();
        let best = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let score =
                    strsim::jaro_winkler(&query, &candidate.to_lowercase()) as f32 * 100.0;
                Match { index, score }
            })
            .max_by(|a, b| a.score.total_cmp(&b.score));
        Ok(best)
    }
}

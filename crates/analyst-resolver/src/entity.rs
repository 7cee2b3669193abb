//! Entity resolution
//!
//! Turns free-text client or group tokens into canonical client IDs:
//! normalize, best-match against the union of names and groups, expand
//! groups, deduplicate. Tokens that cannot be matched confidently are
//! dropped with a warning rather than failing the request, so a plan step
//! naming an unknown client degrades to "no data for that client".

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::kb::KnowledgeBase;
use crate::matcher::{MatchError, MatchStrategy, MATCH_THRESHOLD};

/// Resolves client and group names to canonical IDs.
pub struct EntityResolver {
    kb: Arc<KnowledgeBase>,
    strategy: Arc<dyn MatchStrategy>,
    /// Union of client names and group names, the match universe.
    candidates: Vec<String>,
}

impl EntityResolver {
    pub fn new(kb: Arc<KnowledgeBase>, strategy: Arc<dyn MatchStrategy>) -> Self {
        let candidates = kb.entity_candidates();
        Self {
            kb,
            strategy,
            candidates,
        }
    }

    /// Resolve a list of tokens to a deduplicated ID set. Empty input
    /// yields an empty set; unmatched tokens are dropped.
    pub async fn resolve(&self, tokens: &[String]) -> Result<BTreeSet<String>, MatchError> {
        let mut resolved = BTreeSet::new();

        for token in tokens {
            let clean = token.trim().to_lowercase();
            if clean.is_empty() {
                continue;
            }

            let best = self.strategy.best_match(&clean, &self.candidates).await?;
            let best = match best {
                Some(m) if m.score >= MATCH_THRESHOLD => m,
                Some(m) => {
                    warn!(
                        token = %token,
                        score = m.score,
                        "could not confidently match entity, ignoring"
                    );
                    continue;
                }
                None => continue,
            };

            let name = &self.candidates[best.index];
            if let Some(members) = self.kb.groups.get(name) {
                // Group: union the members. An empty group is the "all
                // clients" convention and expands to the full universe.
                if members.is_empty() {
                    resolved.extend(self.kb.all_client_ids());
                } else {
                    resolved.extend(members.iter().cloned());
                }
                debug!(token = %token, group = %name, "expanded group");
            } else if let Some(id) = self.kb.clients.get(name) {
                resolved.insert(id.clone());
                debug!(token = %token, client = %name, id = %id, "resolved client");
            }
        }

        Ok(resolved)
    }
}

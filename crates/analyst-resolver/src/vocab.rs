//! Controlled-vocabulary resolution
//!
//! Regions, countries, and business lines resolve through the same
//! normalize -> best-match -> threshold -> accept-or-drop pattern as
//! entities, against much smaller alias tables. One extra rule: a
//! designated wildcard ("global" for regions) short-circuits to the whole
//! vocabulary without scoring.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use analyst_data::dimensions::{Business, BusinessFilter, Country, Region, Subbusiness};

use crate::kb::KnowledgeBase;
use crate::matcher::{MatchError, MatchStrategy, MATCH_THRESHOLD};

/// Resolves free text against the region/country/business vocabularies.
pub struct VocabResolver {
    strategy: Arc<dyn MatchStrategy>,
    region_aliases: BTreeMap<String, String>,
    country_aliases: BTreeMap<String, String>,
}

impl VocabResolver {
    pub fn new(kb: &KnowledgeBase, strategy: Arc<dyn MatchStrategy>) -> Self {
        Self {
            strategy,
            region_aliases: kb.region_aliases.clone(),
            country_aliases: kb.country_aliases.clone(),
        }
    }

    /// Generic single-token resolution against an alias table. Returns the
    /// canonical token, or None (with a warning) below threshold.
    async fn resolve_one(
        &self,
        token: &str,
        aliases: &BTreeMap<String, String>,
        what: &str,
    ) -> Result<Option<String>, MatchError> {
        let clean = token.trim().to_lowercase();
        if clean.is_empty() {
            return Ok(None);
        }

        // Exact alias hit needs no scoring.
        if let Some(canonical) = aliases.get(&clean) {
            return Ok(Some(canonical.clone()));
        }

        let candidates: Vec<String> = aliases.keys().cloned().collect();
        match self.strategy.best_match(&clean, &candidates).await? {
            Some(m) if m.score >= MATCH_THRESHOLD => {
                Ok(aliases.get(&candidates[m.index]).cloned())
            }
            _ => {
                warn!(token = %token, "could not resolve {what}, ignoring");
                Ok(None)
            }
        }
    }

    /// Resolve region tokens. "global" expands to every region.
    pub async fn regions(&self, tokens: &[String]) -> Result<Vec<Region>, MatchError> {
        let mut out = Vec::new();
        for token in tokens {
            if token.trim().eq_ignore_ascii_case("global") {
                return Ok(Region::ALL.to_vec());
            }
            if let Some(name) = self
                .resolve_one(token, &self.region_aliases, "region")
                .await?
            {
                if let Some(region) = Region::ALL.iter().find(|r| r.name() == name) {
                    if !out.contains(region) {
                        out.push(*region);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Resolve country tokens.
    pub async fn countries(&self, tokens: &[String]) -> Result<Vec<Country>, MatchError> {
        let mut out = Vec::new();
        for token in tokens {
            if let Some(name) = self
                .resolve_one(token, &self.country_aliases, "country")
                .await?
            {
                if let Some(country) = Country::ALL.iter().find(|c| c.name() == name) {
                    if !out.contains(country) {
                        out.push(*country);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Resolve a single business-line token, including the "Equities"
    /// umbrella.
    pub async fn business(&self, token: &str) -> Result<Option<BusinessFilter>, MatchError> {
        let mut aliases: BTreeMap<String, String> = Business::ALL
            .iter()
            .map(|b| (b.name().to_lowercase(), b.name().to_string()))
            .collect();
        aliases.insert("equities".to_string(), "Equities".to_string());

        let name = match self.resolve_one(token, &aliases, "business").await? {
            Some(n) => n,
            None => return Ok(None),
        };
        Ok(match name.as_str() {
            "Prime" => Some(BusinessFilter::Prime),
            "Equities Ex Prime" => Some(BusinessFilter::EquitiesExPrime),
            "FICC" => Some(BusinessFilter::Ficc),
            "Equities" => Some(BusinessFilter::Equities),
            _ => None,
        })
    }

    /// Resolve a single sub-business token.
    pub async fn subbusiness(&self, token: &str) -> Result<Option<Subbusiness>, MatchError> {
        let aliases: BTreeMap<String, String> = Subbusiness::ALL
            .iter()
            .map(|s| (s.name().to_lowercase(), s.name().to_string()))
            .collect();
        let name = match self.resolve_one(token, &aliases, "subbusiness").await? {
            Some(n) => n,
            None => return Ok(None),
        };
        Ok(Subbusiness::ALL.into_iter().find(|s| s.name() == name))
    }
}

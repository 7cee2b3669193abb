//! Client knowledge base
//!
//! Static mapping of client names and group names to canonical IDs, plus
//! the alias tables for the controlled vocabularies. Built once at process
//! start, immutable afterwards, shared read-only across requests.
//!
//! A YAML overlay file can replace the built-in tables (same shape as the
//! serde structs here); load-time checks enforce the two structural
//! invariants: canonical IDs are unique across the client table, and alias
//! tables are many-to-one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use analyst_data::dimensions::{Business, Subbusiness};

/// URL skeleton for linking a client in synthesized answers.
pub const CLIENT_URL_SKELETON: &str = "https://my-internal-platform.com/clients/{client_id}";

#[derive(Debug, Error)]
pub enum KbError {
    #[error("failed to read knowledge base file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse knowledge base file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("duplicate canonical id '{0}' in client table")]
    DuplicateId(String),

    #[error("group '{group}' references unknown client id '{id}'")]
    UnknownGroupMember { group: String, id: String },
}

/// Serialized shape of the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Client display name (lowercase) -> canonical ID.
    pub clients: BTreeMap<String, String>,

    /// Group name (lowercase) -> member canonical IDs. An empty member
    /// list means "expand dynamically to every known client".
    pub groups: BTreeMap<String, Vec<String>>,

    /// Region aliases (lowercase free text -> canonical region name).
    pub region_aliases: BTreeMap<String, String>,

    /// Country aliases (lowercase free text -> canonical country name).
    pub country_aliases: BTreeMap<String, String>,
}

impl KnowledgeBase {
    /// The built-in knowledge base.
    pub fn builtin() -> Self {
        let clients = [
            ("millennium", "cl_id_millennium"),
            ("citadel", "cl_id_citadel"),
            ("point 72", "cl_id_point72"),
            ("two sigma", "cl_id_twosigma"),
            ("balyasny", "cl_id_balyasny"),
            ("brevan howard", "cl_id_brevanhoward"),
            ("marshall wace", "cl_id_marshallwace"),
            ("de shaw", "cl_id_deshaw"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let groups = [
            (
                "systematic",
                vec!["cl_id_twosigma", "cl_id_citadel", "cl_id_deshaw"],
            ),
            ("quant", vec!["cl_id_twosigma", "cl_id_deshaw"]),
            (
                "multi-manager",
                vec!["cl_id_millennium", "cl_id_point72", "cl_id_balyasny"],
            ),
            (
                "discretionary majors",
                vec!["cl_id_millennium", "cl_id_point72", "cl_id_citadel"],
            ),
            // Empty member list: expands to the full client universe.
            ("all clients", vec![]),
        ]
        .into_iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                v.into_iter().map(str::to_string).collect::<Vec<_>>(),
            )
        })
        .collect();

        let region_aliases = [
            ("americas", "AMERICAS"),
            ("america", "AMERICAS"),
            ("us", "AMERICAS"),
            ("united states", "AMERICAS"),
            ("emea", "EMEA"),
            ("europe", "EMEA"),
            ("asia", "ASIA"),
            ("apac", "ASIA"),
            ("na", "NA"),
            ("north america", "NA"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let country_aliases = [
            ("usa", "USA"),
            ("united states", "USA"),
            ("canada", "CAN"),
            ("brazil", "BRA"),
            ("uk", "GBR"),
            ("united kingdom", "GBR"),
            ("great britain", "GBR"),
            ("france", "FRA"),
            ("germany", "DEU"),
            ("japan", "JPN"),
            ("hong kong", "HKG"),
            ("australia", "AUS"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            clients,
            groups,
            region_aliases,
            country_aliases,
        }
    }

    /// Load an overlay file, replacing the built-in tables.
    pub fn from_yaml_file(path: &Path) -> Result<Self, KbError> {
        let text = std::fs::read_to_string(path)?;
        let kb: KnowledgeBase = serde_yaml::from_str(&text)?;
        kb.check_invariants()?;
        Ok(kb)
    }

    /// Canonical IDs must be unique and group members must exist.
    pub fn check_invariants(&self) -> Result<(), KbError> {
        let mut seen = std::collections::BTreeSet::new();
        for id in self.clients.values() {
            if !seen.insert(id) {
                return Err(KbError::DuplicateId(id.clone()));
            }
        }
        for (group, members) in &self.groups {
            for id in members {
                if !seen.contains(id) {
                    return Err(KbError::UnknownGroupMember {
                        group: group.clone(),
                        id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every known canonical client ID, sorted.
    pub fn all_client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.values().cloned().collect();
        ids.sort();
        ids
    }

    /// The union of client names and group names the entity resolver
    /// matches against.
    pub fn entity_candidates(&self) -> Vec<String> {
        self.clients
            .keys()
            .chain(self.groups.keys())
            .cloned()
            .collect()
    }

    /// Valid business and sub-business lines, for the planner's
    /// `list_business_lines` tool.
    pub fn valid_business_lines(&self) -> BusinessLines {
        BusinessLines {
            businesses: Business::ALL.iter().map(|b| b.name().to_string()).collect(),
            subbusinesses: Subbusiness::ALL
                .iter()
                .map(|s| s.name().to_string())
                .collect(),
        }
    }

    /// URL for a client in synthesized answers.
    pub fn client_url(&self, client_id: &str) -> String {
        CLIENT_URL_SKELETON.replace("{client_id}", client_id)
    }
}

/// The business-line vocabulary exposed to the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessLines {
    pub businesses: Vec<String>,
    pub subbusinesses: Vec<String>,
}

//! Model configuration
//!
//! Model names per role, overridable from the environment so deployments
//! can swap models without touching code.

use anyhow::{anyhow, Result};

/// The planner needs the strongest model; dates and synthesis get by on a
/// cheaper one.
const DEFAULT_PLANNER_MODEL: &str = "gpt-4o";
const DEFAULT_SYNTHESIZER_MODEL: &str = "gpt-4o-mini";
const DEFAULT_DATE_MODEL: &str = "gpt-4o-mini";

/// Runtime configuration for the LLM-backed collaborators.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub planner_model: String,
    pub synthesizer_model: String,
    pub date_model: String,
}

impl AgentConfig {
    /// Read configuration from the environment. `OPENAI_API_KEY` is
    /// required; model overrides are optional.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            api_key,
            planner_model: std::env::var("ANALYST_PLANNER_MODEL")
                .unwrap_or_else(|_| DEFAULT_PLANNER_MODEL.to_string()),
            synthesizer_model: std::env::var("ANALYST_SYNTHESIZER_MODEL")
                .unwrap_or_else(|_| DEFAULT_SYNTHESIZER_MODEL.to_string()),
            date_model: std::env::var("ANALYST_DATE_MODEL")
                .unwrap_or_else(|_| DEFAULT_DATE_MODEL.to_string()),
        })
    }

    /// Configuration with explicit key and default models, for tests and
    /// embedding in other tools.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            planner_model: DEFAULT_PLANNER_MODEL.to_string(),
            synthesizer_model: DEFAULT_SYNTHESIZER_MODEL.to_string(),
            date_model: DEFAULT_DATE_MODEL.to_string(),
        }
    }
}

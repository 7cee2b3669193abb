//! Planner
//!
//! Decomposes a user question into a typed multi-step plan by prompting an
//! LLM with the plan JSON schema and the business-line vocabulary. Also
//! builds the correction prompt the executor uses when a step fails
//! mid-plan.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use analyst_resolver::kb::KnowledgeBase;

use crate::llm::{strip_code_fence, LlmClient};
use crate::plan::Plan;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner LLM call failed: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("planner returned invalid plan JSON: {reason}")]
    InvalidPlan { reason: String },
}

/// Produces a plan from a prompt. The prompt is either the user's original
/// question or a correction request built by [`CorrectionRequest`].
#[async_trait]
pub trait Planner: Send + Sync {
    async fn create_plan(&self, prompt: &str) -> Result<Plan, PlannerError>;
}

/// Everything the planner needs to know about a failed step to produce a
/// corrected plan.
#[derive(Debug, Clone)]
pub struct CorrectionRequest {
    pub original_query: String,
    pub failed_step_summary: String,
    pub error: String,
    pub workspace_summary: String,
}

impl CorrectionRequest {
    /// Render the correction prompt sent back through the planner.
    pub fn to_prompt(&self) -> String {
        format!(
            r#"The previous plan failed during a step. Create a new plan to achieve the original user goal.

**Original user query:** {query}

**Previous plan context:**
The failing step was: "{step}"
It failed with the error: {error}

**Current workspace state:**
{workspace}

Create a new, corrected plan that recovers from this error and completes the original request. Only plan the remaining work; tables already in the workspace can be used directly."#,
            query = self.original_query,
            step = self.failed_step_summary,
            error = self.error,
            workspace = self.workspace_summary,
        )
    }
}

/// LLM-backed planner.
pub struct LlmPlanner {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmPlanner {
    pub fn new(client: Arc<dyn LlmClient>, kb: &KnowledgeBase) -> Self {
        let system_prompt = build_system_prompt(kb);
        Self {
            client,
            system_prompt,
        }
    }
}

fn build_system_prompt(kb: &KnowledgeBase) -> String {
    let instructions = include_str!("prompts/planner_system.md");
    let schema = schemars::schema_for!(Plan);
    let schema_json =
        serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string());
    let lines = kb.valid_business_lines();

    format!(
        "{instructions}\n\nValid businesses: {businesses}\nValid subbusinesses: {subbusinesses}\n\n## Output schema\n\n```json\n{schema}\n```\n",
        instructions = instructions,
        businesses = lines.businesses.join(", "),
        subbusinesses = lines.subbusinesses.join(", "),
        schema = schema_json,
    )
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn create_plan(&self, prompt: &str) -> Result<Plan, PlannerError> {
        info!(model = self.client.model_name(), "creating plan");
        let response = self
            .client
            .chat_json(&self.system_prompt, prompt)
            .await
            .map_err(PlannerError::Llm)?;

        let clean = strip_code_fence(&response);
        debug!(raw = %clean, "planner raw output");

        let plan: Plan =
            serde_json::from_str(clean).map_err(|e| PlannerError::InvalidPlan {
                reason: format!("{e} in: {clean}"),
            })?;
        info!(steps = plan.steps.len(), "plan created");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    /// Scripted client returning canned replies in order.
    struct Scripted(std::sync::Mutex<Vec<String>>);

    #[async_trait]
    impl LlmClient for Scripted {
        async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
            self.chat_json(_system, _user).await
        }

        async fn chat_json(&self, _system: &str, _user: &str) -> Result<String> {
            let mut replies = self.0.lock().expect("test mutex");
            if replies.is_empty() {
                anyhow::bail!("no scripted reply left");
            }
            Ok(replies.remove(0))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn planner_with_reply(reply: &str) -> LlmPlanner {
        LlmPlanner::new(
            Arc::new(Scripted(std::sync::Mutex::new(vec![reply.to_string()]))),
            &KnowledgeBase::builtin(),
        )
    }

    #[tokio::test]
    async fn test_parses_fenced_plan() {
        let planner = planner_with_reply(
            "```json\n{\"plan\":[{\"tool_name\":\"inform_user\",\"summary\":\"s\",\"parameters\":{\"message\":\"m\"}}]}\n```",
        );
        let plan = planner.create_plan("whatever").await.unwrap();
        assert_eq!(plan.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_invalid_plan() {
        let planner = planner_with_reply("{\"plan\": [{\"tool_name\": \"fly\"}]}");
        let err = planner.create_plan("whatever").await.unwrap_err();
        assert!(matches!(err, PlannerError::InvalidPlan { .. }));
    }

    #[test]
    fn test_system_prompt_embeds_schema_and_vocab() {
        let prompt = build_system_prompt(&KnowledgeBase::builtin());
        assert!(prompt.contains("inform_user"));
        assert!(prompt.contains("Eq Deriv"));
        assert!(prompt.contains("\"plan\""));
    }

    #[test]
    fn test_correction_prompt_carries_context() {
        let req = CorrectionRequest {
            original_query: "revenue for citadel".to_string(),
            failed_step_summary: "Fetch revenue".to_string(),
            error: "unknown metric 'revenue'".to_string(),
            workspace_summary: "(workspace is empty)".to_string(),
        };
        let prompt = req.to_prompt();
        assert!(prompt.contains("revenue for citadel"));
        assert!(prompt.contains("unknown metric"));
        assert!(prompt.contains("(workspace is empty)"));
    }
}

//! LLM client abstraction
//!
//! The planner, synthesizer, and date fallback all talk to a model through
//! this trait; implementations are constructed explicitly and passed in as
//! handles, so tests substitute scripted clients without any global state.

use anyhow::Result;
use async_trait::async_trait;

/// Chat-completion client seam.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain chat completion.
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Chat completion constrained to return a JSON object.
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// The model identifier, for logs.
    fn model_name(&self) -> &str;
}

/// Strip a Markdown code fence from a model reply, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let inner = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

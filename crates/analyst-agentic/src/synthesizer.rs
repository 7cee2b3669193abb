//! Response synthesis
//!
//! Turns the final workspace plus the original question into a
//! user-facing answer. Invoked exactly once per request, and only when the
//! executor finished without an inform-user short circuit.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use analyst_data::workspace::Workspace;
use analyst_resolver::kb::KnowledgeBase;

use crate::llm::LlmClient;

#[derive(Debug, Error)]
pub enum SynthesizerError {
    #[error("synthesizer LLM call failed: {0}")]
    Llm(#[source] anyhow::Error),
}

/// Produces the final natural-language answer.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        query: &str,
        workspace: &Workspace,
    ) -> Result<String, SynthesizerError>;
}

/// LLM-backed synthesizer.
pub struct LlmSynthesizer {
    client: Arc<dyn LlmClient>,
    client_url_skeleton: String,
}

impl LlmSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, kb: &KnowledgeBase) -> Self {
        Self {
            client,
            client_url_skeleton: kb.client_url("{client_id}"),
        }
    }

    fn build_prompt(&self, query: &str, workspace: &Workspace) -> String {
        let mut data = String::new();
        for (name, table) in workspace.iter() {
            data.push_str(&format!("\n--- Table: '{}' ---\n", name));
            data.push_str(&table.render());
        }
        if data.is_empty() {
            data.push_str("(no tables were produced)\n");
        }

        format!(
            r#"You are an expert financial analyst assistant. Provide a clear, concise answer to the user's question based on the data below.

**Original user query:** "{query}"

**Available data:**
{data}

**Your task:**
1. Answer the question directly, starting with a concise summary of the findings.
2. If a table contains both 'client_id' and 'client_name' columns, render each client name as a Markdown link using the skeleton {url} (substitute the client_id).
3. For lists or rankings, format the answer as a Markdown table with clean, human-readable headers.
4. For a single number, answer in a sentence and format large numbers readably (write "$45.2 million", not "45200000").
5. Do not mention intermediate table names; refer only to the meaningful results.
6. If the data cannot answer the question, say what is missing and conclude with: "Please reach out to [CA Strats](mailto:ca.strats@example.com) for further details."
"#,
            query = query,
            data = data,
            url = self.client_url_skeleton,
        )
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        workspace: &Workspace,
    ) -> Result<String, SynthesizerError> {
        info!(model = self.client.model_name(), "synthesizing final response");
        let prompt = self.build_prompt(query, workspace);
        self.client
            .chat("You are a helpful financial analyst assistant.", &prompt)
            .await
            .map_err(SynthesizerError::Llm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_data::table::{Table, Value};
    use anyhow::Result;

    struct Echo;

    #[async_trait]
    impl LlmClient for Echo {
        async fn chat(&self, _system: &str, user: &str) -> Result<String> {
            Ok(user.to_string())
        }

        async fn chat_json(&self, _system: &str, user: &str) -> Result<String> {
            Ok(user.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_prompt_includes_rendered_tables_and_query() {
        let mut ws = Workspace::new();
        let mut t = Table::new(vec!["revenues".into()]);
        t.push_row(vec![Value::Int(42)]).unwrap();
        ws.add("total", t);

        let synthesizer = LlmSynthesizer::new(Arc::new(Echo), &KnowledgeBase::builtin());
        let out = synthesizer
            .synthesize("total revenue?", &ws)
            .await
            .unwrap();
        assert!(out.contains("total revenue?"));
        assert!(out.contains("--- Table: 'total' ---"));
        assert!(out.contains("42"));
        assert!(out.contains("my-internal-platform.com"));
    }

    #[tokio::test]
    async fn test_empty_workspace_noted() {
        let synthesizer = LlmSynthesizer::new(Arc::new(Echo), &KnowledgeBase::builtin());
        let out = synthesizer
            .synthesize("anything?", &Workspace::new())
            .await
            .unwrap();
        assert!(out.contains("no tables were produced"));
    }
}

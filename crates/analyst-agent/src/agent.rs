//! Agent assembly
//!
//! Wires planner, executor, and synthesizer into the full
//! question-to-answer flow. One workspace per call; nothing is shared
//! across requests except the read-only knowledge base and matcher index.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use analyst_agentic::planner::Planner;
use analyst_agentic::synthesizer::Synthesizer;

use crate::executor::{InterventionContext, Outcome, PlanExecutor};

/// Final reply for one user question.
#[derive(Debug)]
pub enum AgentReply {
    /// A synthesized (or inform-user verbatim) answer.
    Answer {
        text: String,
        step_summaries: Vec<String>,
    },
    /// Automatic recovery failed; the context tells the operator where.
    NeedsHuman(InterventionContext),
}

/// The end-to-end agent.
pub struct Agent {
    planner: Arc<dyn Planner>,
    executor: PlanExecutor,
    synthesizer: Arc<dyn Synthesizer>,
}

impl Agent {
    pub fn new(
        planner: Arc<dyn Planner>,
        executor: PlanExecutor,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            planner,
            executor,
            synthesizer,
        }
    }

    /// Answer one question: plan, execute, synthesize.
    pub async fn answer(&self, query: &str) -> Result<AgentReply> {
        info!(query = %query, "answering");
        let plan = self.planner.create_plan(query).await?;

        match self.executor.execute(plan, query).await? {
            Outcome::NeedsHuman(context) => Ok(AgentReply::NeedsHuman(context)),
            Outcome::Done {
                summaries,
                terminal_message: Some(message),
                ..
            } => {
                // Inform-user short circuit: the message is the answer and
                // the synthesizer is never consulted.
                Ok(AgentReply::Answer {
                    text: message,
                    step_summaries: summaries,
                })
            }
            Outcome::Done {
                workspace,
                summaries,
                terminal_message: None,
            } => {
                let text = self.synthesizer.synthesize(query, &workspace).await?;
                Ok(AgentReply::Answer {
                    text,
                    step_summaries: summaries,
                })
            }
        }
    }
}

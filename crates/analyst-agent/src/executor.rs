//! Plan executor
//!
//! Drives a plan step by step against the workspace, with bounded retry
//! and mid-plan re-planning. Retrying is never "run the same step again":
//! in this domain failures are usually semantic planning errors (wrong
//! column name, unsupported filter combination), so every retry goes back
//! through the planner with the error context, and the failed suffix of
//! the plan is replaced wholesale. Steps already executed are preserved
//! verbatim.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use analyst_agentic::plan::{Plan, PlanStep};
use analyst_agentic::planner::{CorrectionRequest, Planner, PlannerError};
use analyst_data::table::TableError;
use analyst_data::transform::{self, TransformError};
use analyst_data::workspace::Workspace;
use analyst_resolver::kb::KnowledgeBase;

use crate::query_tool::{QueryError, QueryTool};

/// Consecutive failures at one cursor position before a human is asked.
pub const MAX_STEP_RETRIES: usize = 2;

/// Failure of a single dispatched step; feeds the retry/re-plan path.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Diagnostic context handed to a human operator when automatic recovery
/// is exhausted.
#[derive(Debug, Clone)]
pub struct InterventionContext {
    pub original_query: String,
    pub failed_step: String,
    pub error: String,
    pub workspace_summary: String,
}

/// Terminal result of executing a plan.
#[derive(Debug)]
pub enum Outcome {
    /// The plan ran to completion. `terminal_message` is set when an
    /// inform-user step ended the plan early; synthesis is skipped then.
    Done {
        workspace: Workspace,
        summaries: Vec<String>,
        terminal_message: Option<String>,
    },
    /// Automatic recovery failed; a human needs to take over.
    NeedsHuman(InterventionContext),
}

enum StepOutcome {
    Continue,
    Inform(String),
}

/// The step-by-step plan interpreter.
pub struct PlanExecutor {
    query_tool: QueryTool,
    planner: Arc<dyn Planner>,
    kb: Arc<KnowledgeBase>,
}

impl PlanExecutor {
    pub fn new(query_tool: QueryTool, planner: Arc<dyn Planner>, kb: Arc<KnowledgeBase>) -> Self {
        Self {
            query_tool,
            planner,
            kb,
        }
    }

    /// Execute a plan to a terminal state. A planner failure during
    /// correction is fatal and propagates; everything else resolves to an
    /// [`Outcome`].
    pub async fn execute(
        &self,
        initial_plan: Plan,
        user_query: &str,
    ) -> Result<Outcome, PlannerError> {
        let mut steps = initial_plan.steps;
        let mut workspace = Workspace::new();
        let mut summaries: Vec<String> = Vec::new();
        let mut cursor = 0usize;
        let mut retries = 0usize;

        while cursor < steps.len() {
            let step = steps[cursor].clone();
            let label = format!("Step {}: {}", cursor + 1, step.summary());
            info!("{label}");

            match self.dispatch(&step, &mut workspace).await {
                Ok(StepOutcome::Continue) => {
                    summaries.push(label);
                    retries = 0;
                    cursor += 1;
                }
                Ok(StepOutcome::Inform(message)) => {
                    summaries.push(label);
                    info!("inform-user step ends the plan");
                    return Ok(Outcome::Done {
                        workspace,
                        summaries,
                        terminal_message: Some(message),
                    });
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(error = %error, "step failed");
                    retries += 1;

                    if retries >= MAX_STEP_RETRIES {
                        return Ok(Outcome::NeedsHuman(InterventionContext {
                            original_query: user_query.to_string(),
                            failed_step: step.summary().to_string(),
                            error,
                            workspace_summary: workspace.summary(),
                        }));
                    }

                    // Re-plan: keep the executed prefix, replace the rest.
                    let correction = CorrectionRequest {
                        original_query: user_query.to_string(),
                        failed_step_summary: step.summary().to_string(),
                        error,
                        workspace_summary: workspace.summary(),
                    };
                    info!("requesting a corrected plan from the planner");
                    let replacement = self.planner.create_plan(&correction.to_prompt()).await?;
                    steps.truncate(cursor);
                    steps.extend(replacement.steps);
                    // Cursor stays put: the next iteration retries at this
                    // position against the corrected step.
                }
            }
        }

        info!(steps = summaries.len(), "plan execution finished");
        Ok(Outcome::Done {
            workspace,
            summaries,
            terminal_message: None,
        })
    }

    async fn dispatch(
        &self,
        step: &PlanStep,
        workspace: &mut Workspace,
    ) -> Result<StepOutcome, StepError> {
        match step {
            PlanStep::DataFetch { parameters, .. } => {
                let table = self.query_tool.execute(parameters).await?;
                workspace.add(parameters.output_variable.clone(), table);
                Ok(StepOutcome::Continue)
            }
            PlanStep::DescribeTable { parameters, .. } => {
                let schema = workspace.describe(&parameters.table)?;
                let rendered = schema
                    .iter()
                    .map(|(name, kind)| format!("{} ({:?})", name, kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                info!(table = %parameters.table, schema = %rendered, "described table");
                Ok(StepOutcome::Continue)
            }
            PlanStep::Transform { parameters, .. } => {
                transform::apply(workspace, &parameters.ops)?;
                Ok(StepOutcome::Continue)
            }
            PlanStep::ListBusinessLines { .. } => {
                let lines = self.kb.valid_business_lines();
                info!(
                    businesses = %lines.businesses.join(", "),
                    subbusinesses = %lines.subbusinesses.join(", "),
                    "listed business lines"
                );
                Ok(StepOutcome::Continue)
            }
            PlanStep::InformUser { parameters, .. } => {
                Ok(StepOutcome::Inform(parameters.message.clone()))
            }
        }
    }
}

//! End-to-end agent flow against the mock platform: plan, fetch,
//! describe, transform, synthesize.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use analyst_agent::agent::{Agent, AgentReply};
use analyst_agent::executor::PlanExecutor;
use analyst_agent::query_tool::QueryTool;
use analyst_agentic::plan::{
    DescribeParams, FetchParams, InformParams, Plan, PlanStep, TransformParams,
};
use analyst_agentic::planner::{Planner, PlannerError};
use analyst_agentic::synthesizer::{Synthesizer, SynthesizerError};
use analyst_data::dimensions::Dimension;
use analyst_data::mock::MockDataApi;
use analyst_data::transform::TransformOp;
use analyst_data::workspace::Workspace;
use analyst_resolver::dates::DateRangeResolver;
use analyst_resolver::entity::EntityResolver;
use analyst_resolver::kb::KnowledgeBase;
use analyst_resolver::matcher::FuzzyMatch;
use analyst_resolver::vocab::VocabResolver;

struct FixedPlanner(Plan);

#[async_trait]
impl Planner for FixedPlanner {
    async fn create_plan(&self, _prompt: &str) -> Result<Plan, PlannerError> {
        Ok(self.0.clone())
    }
}

/// Synthesizer that reports the workspace it saw and records being called.
struct RecordingSynthesizer {
    called: Arc<AtomicBool>,
}

#[async_trait]
impl Synthesizer for RecordingSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        workspace: &Workspace,
    ) -> Result<String, SynthesizerError> {
        self.called.store(true, Ordering::SeqCst);
        Ok(format!("answer to '{}' from [{}]", query, workspace.summary()))
    }
}

fn agent(plan: Plan, called: Arc<AtomicBool>) -> Agent {
    let kb = Arc::new(KnowledgeBase::builtin());
    let strategy = Arc::new(FuzzyMatch);
    let planner = Arc::new(FixedPlanner(plan));
    let query_tool = QueryTool::new(
        EntityResolver::new(kb.clone(), strategy.clone()),
        VocabResolver::new(&kb, strategy),
        DateRangeResolver::new(),
        Arc::new(MockDataApi::new(11)),
    );
    let executor = PlanExecutor::new(query_tool, planner.clone(), kb.clone());
    Agent::new(planner, executor, Arc::new(RecordingSynthesizer { called }))
}

fn fetch_step(metric: &str, dates: &str, output: &str) -> PlanStep {
    PlanStep::DataFetch {
        summary: format!("Fetch {} for {}.", metric, dates),
        parameters: FetchParams {
            metric: metric.to_string(),
            entities: vec!["millennium".to_string(), "systematic".to_string()],
            date_description: dates.to_string(),
            row_granularity: vec![Dimension::Client],
            col_granularity: None,
            business: None,
            subbusiness: None,
            region: None,
            country: None,
            balance_type: None,
            fin_or_exec: None,
            primary_or_secondary: None,
            output_variable: output.to_string(),
        },
    }
}

#[tokio::test]
async fn test_return_on_balances_pipeline() {
    // The classic derived-metric flow: fetch revenues and balances, join,
    // derive the ratio, rank, keep the top client.
    let plan = Plan {
        steps: vec![
            fetch_step("revenues", "q1 2024", "rev"),
            fetch_step("balances", "q1 2024", "bal"),
            PlanStep::DescribeTable {
                summary: "Check the revenue schema.".to_string(),
                parameters: DescribeParams {
                    table: "rev".to_string(),
                },
            },
            PlanStep::Transform {
                summary: "Join, derive RoB, and rank.".to_string(),
                parameters: TransformParams {
                    ops: vec![
                        TransformOp::Join {
                            left: "rev".to_string(),
                            right: "bal".to_string(),
                            on: "client_id".to_string(),
                            suffixes: None,
                            output: "rob".to_string(),
                        },
                        TransformOp::Derive {
                            table: "rob".to_string(),
                            column: "rob".to_string(),
                            expr: "revenues / balances".to_string(),
                            output: None,
                        },
                        TransformOp::Sort {
                            table: "rob".to_string(),
                            by: "rob".to_string(),
                            descending: true,
                            output: None,
                        },
                        TransformOp::Head {
                            table: "rob".to_string(),
                            n: 1,
                            output: Some("top".to_string()),
                        },
                    ],
                },
            },
        ],
    };

    let called = Arc::new(AtomicBool::new(false));
    let reply = agent(plan, called.clone())
        .answer("which client has the best return on balances?")
        .await
        .unwrap();

    assert!(called.load(Ordering::SeqCst), "synthesizer must run");
    match reply {
        AgentReply::Answer {
            text,
            step_summaries,
        } => {
            assert_eq!(step_summaries.len(), 4);
            assert!(text.contains("best return on balances"));
            // The synthesizer saw all four tables.
            for table in ["rev", "bal", "rob", "top"] {
                assert!(text.contains(table), "missing table {table} in {text}");
            }
        }
        other => panic!("expected Answer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_inform_plan_skips_synthesizer() {
    let plan = Plan {
        steps: vec![PlanStep::InformUser {
            summary: "Explain the unsupported filter.".to_string(),
            parameters: InformParams {
                message: "Revenue data cannot be filtered by country.".to_string(),
            },
        }],
    };

    let called = Arc::new(AtomicBool::new(false));
    let reply = agent(plan, called.clone())
        .answer("revenues for the US?")
        .await
        .unwrap();

    assert!(
        !called.load(Ordering::SeqCst),
        "synthesizer must not run on an inform short circuit"
    );
    match reply {
        AgentReply::Answer { text, .. } => {
            assert_eq!(text, "Revenue data cannot be filtered by country.");
        }
        other => panic!("expected Answer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pivoted_fetch_flows_through() {
    let plan = Plan {
        steps: vec![PlanStep::DataFetch {
            summary: "Fetch revenue by client, pivoted by financing/execution.".to_string(),
            parameters: FetchParams {
                metric: "revenues".to_string(),
                entities: vec!["all clients".to_string()],
                date_description: "q2 2024".to_string(),
                row_granularity: vec![Dimension::Client],
                col_granularity: Some(vec![Dimension::FinOrExec]),
                business: None,
                subbusiness: None,
                region: None,
                country: None,
                balance_type: None,
                fin_or_exec: None,
                primary_or_secondary: None,
                output_variable: "pivot".to_string(),
            },
        }],
    };

    let called = Arc::new(AtomicBool::new(false));
    let reply = agent(plan, called.clone()).answer("revenue split").await.unwrap();
    match reply {
        AgentReply::Answer { text, .. } => {
            assert!(text.contains("pivot"));
        }
        other => panic!("expected Answer, got {:?}", other),
    }
}

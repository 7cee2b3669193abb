//! CLI entry point
//!
//! Answers a question end to end against the mock data platform. With
//! `--plan-file`, executes a canned JSON plan offline (no LLM calls, no
//! API key); otherwise the planner and synthesizer run against the
//! configured model.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use analyst_agent::agent::{Agent, AgentReply};
use analyst_agent::executor::{Outcome, PlanExecutor};
use analyst_agent::query_tool::QueryTool;
use analyst_agentic::config::AgentConfig;
use analyst_agentic::date_parser::LlmDateParser;
use analyst_agentic::plan::Plan;
use analyst_agentic::planner::{LlmPlanner, Planner, PlannerError};
use analyst_agentic::synthesizer::LlmSynthesizer;
use analyst_agentic::OpenAiClient;
use analyst_data::mock::MockDataApi;
use analyst_resolver::dates::DateRangeResolver;
use analyst_resolver::entity::EntityResolver;
use analyst_resolver::kb::KnowledgeBase;
use analyst_resolver::matcher::FuzzyMatch;
use analyst_resolver::vocab::VocabResolver;

#[derive(Parser)]
#[command(
    name = "analyst-agent",
    about = "Natural-language financial analytics agent"
)]
struct Cli {
    /// The question to answer.
    query: Option<String>,

    /// Execute a canned JSON plan instead of asking the planner (offline,
    /// no API key needed).
    #[arg(long)]
    plan_file: Option<PathBuf>,

    /// Seed for the mock data platform.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Optional YAML knowledge-base overlay.
    #[arg(long)]
    kb: Option<PathBuf>,
}

/// Planner used in offline plan-file mode: there is no model to re-plan
/// with, so any correction request is fatal.
struct OfflinePlanner;

#[async_trait::async_trait]
impl Planner for OfflinePlanner {
    async fn create_plan(&self, _prompt: &str) -> Result<Plan, PlannerError> {
        Err(PlannerError::InvalidPlan {
            reason: "offline mode cannot re-plan; fix the plan file".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let kb = Arc::new(match &cli.kb {
        Some(path) => KnowledgeBase::from_yaml_file(path)?,
        None => KnowledgeBase::builtin(),
    });
    let strategy = Arc::new(FuzzyMatch);
    let api = Arc::new(MockDataApi::new(cli.seed));

    if let Some(plan_file) = &cli.plan_file {
        let text = tokio::fs::read_to_string(plan_file)
            .await
            .with_context(|| format!("reading plan file {}", plan_file.display()))?;
        let plan: Plan = serde_json::from_str(&text).context("parsing plan file")?;

        let query_tool = QueryTool::new(
            EntityResolver::new(kb.clone(), strategy.clone()),
            VocabResolver::new(&kb, strategy.clone()),
            DateRangeResolver::new(),
            api,
        );
        let executor = PlanExecutor::new(query_tool, Arc::new(OfflinePlanner), kb.clone());

        let query = cli.query.as_deref().unwrap_or("(plan file)");
        match executor.execute(plan, query).await? {
            Outcome::Done {
                workspace,
                summaries,
                terminal_message,
            } => {
                for summary in &summaries {
                    println!("{summary}");
                }
                if let Some(message) = terminal_message {
                    println!("\n{message}");
                } else {
                    for (name, table) in workspace.iter() {
                        println!("\n== {name} ==\n{}", table.render());
                    }
                }
            }
            Outcome::NeedsHuman(context) => {
                eprintln!("needs human intervention:");
                eprintln!("  failed step: {}", context.failed_step);
                eprintln!("  error:       {}", context.error);
                eprintln!("  workspace:   {}", context.workspace_summary);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let query = cli
        .query
        .ok_or_else(|| anyhow!("provide a question, or --plan-file for offline mode"))?;

    let config = AgentConfig::from_env()?;
    let planner_client = Arc::new(OpenAiClient::new(
        config.api_key.clone(),
        &config.planner_model,
    ));
    let synthesizer_client = Arc::new(OpenAiClient::new(
        config.api_key.clone(),
        &config.synthesizer_model,
    ));
    let date_client = Arc::new(OpenAiClient::new(config.api_key.clone(), &config.date_model));

    let query_tool = QueryTool::new(
        EntityResolver::new(kb.clone(), strategy.clone()),
        VocabResolver::new(&kb, strategy.clone()),
        DateRangeResolver::new().with_fallback(Arc::new(LlmDateParser::new(date_client))),
        api,
    );
    let planner = Arc::new(LlmPlanner::new(planner_client, &kb));
    let executor = PlanExecutor::new(query_tool, planner.clone(), kb.clone());
    let synthesizer = Arc::new(LlmSynthesizer::new(synthesizer_client, &kb));

    let agent = Agent::new(planner, executor, synthesizer);
    match agent.answer(&query).await? {
        AgentReply::Answer {
            text,
            step_summaries,
        } => {
            for summary in &step_summaries {
                println!("{summary}");
            }
            println!("\n{text}");
        }
        AgentReply::NeedsHuman(context) => {
            eprintln!("needs human intervention:");
            eprintln!("  original query: {}", context.original_query);
            eprintln!("  failed step:    {}", context.failed_step);
            eprintln!("  error:          {}", context.error);
            eprintln!("  workspace:      {}", context.workspace_summary);
            std::process::exit(1);
        }
    }

    Ok(())
}

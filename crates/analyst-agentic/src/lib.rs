//! LLM seam for the analyst agent
//!
//! Plan models, the planner and synthesizer collaborators, the chat and
//! embeddings clients, and the LLM date fallback. No data access or
//! orchestration lives here; everything is constructed explicitly and
//! handed to the orchestration layer as trait objects.

pub mod config;
pub mod date_parser;
pub mod embeddings;
pub mod llm;
pub mod openai;
pub mod plan;
pub mod planner;
pub mod synthesizer;

// Re-exports for convenience
pub use config::AgentConfig;
pub use date_parser::LlmDateParser;
pub use embeddings::OpenAiEmbeddings;
pub use llm::LlmClient;
pub use openai::OpenAiClient;
pub use plan::{DescribeParams, FetchParams, InformParams, Plan, PlanStep, TransformParams};
pub use planner::{CorrectionRequest, LlmPlanner, Planner, PlannerError};
pub use synthesizer::{LlmSynthesizer, Synthesizer, SynthesizerError};

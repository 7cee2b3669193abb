//! Plan model
//!
//! The typed contract between the planner LLM and the executor. A plan is
//! an ordered list of steps; each step is one variant of a closed sum
//! dispatched by `tool_name`, so an unhandled step kind is a compile
//! error, not a runtime "unknown tool".
//!
//! Entity names, date phrases, and most filters stay free text here — the
//! resolver layer owns turning them into canonical values.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use analyst_data::dimensions::{BalanceType, Dimension, FinOrExec, PrimaryOrSecondary};
use analyst_data::transform::TransformOp;

/// Parameters for a data fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Metric name: "revenues", "balances", "balances_decomposition",
    /// "capital", or a capital measure display name such as "Total AE".
    pub metric: String,

    /// Client or group names as the user said them.
    pub entities: Vec<String>,

    /// Natural-language date description, e.g. "Q1 2024".
    pub date_description: String,

    /// Row-grouping dimensions (1-2).
    pub row_granularity: Vec<Dimension>,

    /// Optional column-pivot dimensions (1-2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_granularity: Option<Vec<Dimension>>,

    /// Business-line filter, free text ("Prime", "Equities", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<String>,

    /// Sub-business filter, free text ("PB", "SPG", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subbusiness: Option<String>,

    /// Region filters, free text; "global" means all regions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Vec<String>>,

    /// Country filters, free text (balances metrics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Vec<String>>,

    /// Balance-type filter (balances metric only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_type: Option<BalanceType>,

    /// Financing/execution filter (revenues metric only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fin_or_exec: Option<Vec<FinOrExec>>,

    /// Primary/secondary filter (revenues metric only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_or_secondary: Option<Vec<PrimaryOrSecondary>>,

    /// Workspace name for the resulting table.
    pub output_variable: String,
}

/// Parameters for describing a workspace table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DescribeParams {
    /// Name of the workspace table to describe.
    pub table: String,
}

/// Parameters for a transform step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransformParams {
    /// Operations applied in order against the workspace.
    pub ops: Vec<TransformOp>,
}

/// Parameters for the inform-user step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InformParams {
    /// The message delivered to the user verbatim.
    pub message: String,
}

/// One unit of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tool_name", rename_all = "snake_case")]
pub enum PlanStep {
    /// Fetch data from the platform into the workspace.
    DataFetch {
        summary: String,
        parameters: FetchParams,
    },
    /// Report a workspace table's schema.
    DescribeTable {
        summary: String,
        parameters: DescribeParams,
    },
    /// Reshape workspace tables with the transform language.
    Transform {
        summary: String,
        parameters: TransformParams,
    },
    /// Report the valid business and sub-business lines.
    ListBusinessLines { summary: String },
    /// Send a message to the user and stop.
    InformUser {
        summary: String,
        parameters: InformParams,
    },
}

impl PlanStep {
    /// The user-facing summary of this step.
    pub fn summary(&self) -> &str {
        match self {
            PlanStep::DataFetch { summary, .. }
            | PlanStep::DescribeTable { summary, .. }
            | PlanStep::Transform { summary, .. }
            | PlanStep::ListBusinessLines { summary }
            | PlanStep::InformUser { summary, .. } => summary,
        }
    }
}

/// An ordered sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    #[serde(rename = "plan")]
    pub steps: Vec<PlanStep>,
}

//! Data API seam
//!
//! The agent fetches data through this trait; production wires the real
//! platform client, tests and the bundled demo wire `MockDataApi`. A
//! structurally valid query that matches nothing returns an empty table,
//! never an error.

use async_trait::async_trait;
use thiserror::Error;

use crate::request::{BalancesQuery, CapitalQuery, DecompositionQuery, RevenuesQuery};
use crate::table::Table;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("balance type '{balance_type}' is not booked under subbusiness '{subbusiness}'")]
    IncompatibleBalanceType {
        balance_type: &'static str,
        subbusiness: &'static str,
    },

    #[error("data platform error: {0}")]
    Upstream(String),
}

/// One method per metric family.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn revenues(&self, query: &RevenuesQuery) -> Result<Table, ApiError>;

    async fn balances(&self, query: &BalancesQuery) -> Result<Table, ApiError>;

    async fn balances_decomposition(&self, query: &DecompositionQuery)
        -> Result<Table, ApiError>;

    async fn capital(&self, query: &CapitalQuery) -> Result<Table, ApiError>;
}

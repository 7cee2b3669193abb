//! Query tool
//!
//! Turns a planner-produced fetch request into a data platform call:
//! resolve the free-text parts, validate the granularity, build the
//! metric's typed query (rejecting filters the metric cannot carry), and
//! dispatch. Results come back unmodified; any failure propagates to the
//! executor's retry/re-plan path.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use analyst_agentic::plan::FetchParams;
use analyst_data::api::{ApiError, DataApi};
use analyst_data::granularity::{Granularity, GranularityError};
use analyst_data::request::{
    BalancesQuery, CapitalQuery, DecompositionQuery, MetricKind, RequestError, RevenuesQuery,
    UnknownMetric,
};
use analyst_data::table::Table;
use analyst_resolver::dates::DateRangeResolver;
use analyst_resolver::entity::EntityResolver;
use analyst_resolver::matcher::MatchError;
use analyst_resolver::vocab::VocabResolver;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Metric(#[from] UnknownMetric),

    #[error(transparent)]
    Granularity(#[from] GranularityError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("resolution failed: {0}")]
    Resolution(#[from] MatchError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("metric '{metric}' does not support the '{filter}' filter")]
    UnsupportedFilter {
        metric: &'static str,
        filter: &'static str,
    },
}

/// Orchestrates resolvers, validation, and the data API.
pub struct QueryTool {
    entities: EntityResolver,
    vocab: VocabResolver,
    dates: DateRangeResolver,
    api: Arc<dyn DataApi>,
}

impl QueryTool {
    pub fn new(
        entities: EntityResolver,
        vocab: VocabResolver,
        dates: DateRangeResolver,
        api: Arc<dyn DataApi>,
    ) -> Self {
        Self {
            entities,
            vocab,
            dates,
            api,
        }
    }

    /// Execute one fetch request end to end.
    pub async fn execute(&self, params: &FetchParams) -> Result<Table, QueryError> {
        let metric = MetricKind::parse(&params.metric)?;

        // 1. Resolve the free-text parts.
        let clients: Vec<String> = self
            .entities
            .resolve(&params.entities)
            .await?
            .into_iter()
            .collect();
        let range = self.dates.resolve(&params.date_description).await;
        info!(
            clients = clients.len(),
            start = %range.start(),
            end = %range.end(),
            metric = %params.metric,
            "resolved fetch request"
        );

        let regions = match &params.region {
            Some(tokens) => {
                let resolved = self.vocab.regions(tokens).await?;
                if resolved.is_empty() {
                    None
                } else {
                    Some(resolved)
                }
            }
            None => None,
        };
        let countries = match &params.country {
            Some(tokens) => {
                let resolved = self.vocab.countries(tokens).await?;
                if resolved.is_empty() {
                    None
                } else {
                    Some(resolved)
                }
            }
            None => None,
        };
        let business = match &params.business {
            Some(token) => self.vocab.business(token).await?,
            None => None,
        };
        let subbusiness = match &params.subbusiness {
            Some(token) => self.vocab.subbusiness(token).await?,
            None => None,
        };

        // 2. Validate the granularity before any platform call.
        let granularity = Granularity {
            rows: params.row_granularity.clone(),
            cols: params.col_granularity.clone(),
        };
        granularity.validate()?;

        // 3. Build the metric's typed query and dispatch.
        let table = match metric {
            MetricKind::Revenues => {
                reject_filter("revenues", "country", params.country.is_some())?;
                reject_filter("revenues", "balance_type", params.balance_type.is_some())?;
                let query = RevenuesQuery {
                    clients,
                    range,
                    granularity,
                    business,
                    subbusiness,
                    regions,
                    fin_or_exec: params.fin_or_exec.clone(),
                    primary_or_secondary: params.primary_or_secondary.clone(),
                };
                query.check_granularity()?;
                self.api.revenues(&query).await?
            }
            MetricKind::Balances => {
                reject_filter("balances", "fin_or_exec", params.fin_or_exec.is_some())?;
                reject_filter(
                    "balances",
                    "primary_or_secondary",
                    params.primary_or_secondary.is_some(),
                )?;
                let query = BalancesQuery {
                    clients,
                    range,
                    granularity,
                    business,
                    subbusiness,
                    regions,
                    countries,
                    balance_type: params.balance_type,
                };
                query.check_granularity()?;
                self.api.balances(&query).await?
            }
            MetricKind::BalancesDecomposition => {
                reject_filter(
                    "balances_decomposition",
                    "balance_type",
                    params.balance_type.is_some(),
                )?;
                reject_filter(
                    "balances_decomposition",
                    "fin_or_exec",
                    params.fin_or_exec.is_some(),
                )?;
                reject_filter(
                    "balances_decomposition",
                    "primary_or_secondary",
                    params.primary_or_secondary.is_some(),
                )?;
                let query = DecompositionQuery {
                    clients,
                    range,
                    granularity,
                    business,
                    subbusiness,
                    regions,
                    countries,
                };
                query.check_granularity()?;
                self.api.balances_decomposition(&query).await?
            }
            MetricKind::Capital(measure) => {
                reject_filter("capital", "region", params.region.is_some())?;
                reject_filter("capital", "country", params.country.is_some())?;
                reject_filter("capital", "balance_type", params.balance_type.is_some())?;
                reject_filter("capital", "fin_or_exec", params.fin_or_exec.is_some())?;
                reject_filter(
                    "capital",
                    "primary_or_secondary",
                    params.primary_or_secondary.is_some(),
                )?;
                let query = CapitalQuery {
                    measure,
                    clients,
                    range,
                    granularity,
                    business,
                    subbusiness,
                };
                query.check_granularity()?;
                self.api.capital(&query).await?
            }
        };

        debug!(rows = table.len(), "fetch returned");
        Ok(table)
    }
}

fn reject_filter(
    metric: &'static str,
    filter: &'static str,
    present: bool,
) -> Result<(), QueryError> {
    if present {
        return Err(QueryError::UnsupportedFilter { metric, filter });
    }
    Ok(())
}

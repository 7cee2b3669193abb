//! Mock data platform
//!
//! Generates daily per-client sample rows, then filters, aggregates, and
//! pivots them server-side the way the real platform API does. Seeded so
//! tests are deterministic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::api::{ApiError, DataApi};
use crate::dimensions::{
    BalanceType, Business, Country, Dimension, FinOrExec, PrimaryOrSecondary, Region, Subbusiness,
};
use crate::granularity::Granularity;
use crate::request::{
    BalancesQuery, CapitalQuery, DateRange, DecompositionQuery, RevenuesQuery,
};
use crate::table::{Table, Value};

/// What to do when a balance-type filter cannot be booked under the
/// requested subbusiness: fail loudly (default) or mimic the legacy
/// platform's silent empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    #[default]
    Reject,
    Empty,
}

/// In-process stand-in for the data platform.
pub struct MockDataApi {
    seed: u64,
    mismatch_policy: MismatchPolicy,
}

impl MockDataApi {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            mismatch_policy: MismatchPolicy::default(),
        }
    }

    pub fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }
}

/// One synthetic booking row.
struct SampleRow {
    date: NaiveDate,
    client_id: String,
    business: Business,
    subbusiness: Subbusiness,
    region: Region,
    country: Country,
    fin_or_exec: FinOrExec,
    primary_or_secondary: PrimaryOrSecondary,
    balance_type: BalanceType,
    revenues: i64,
    balances: i64,
}

fn pick<T: Copy>(rng: &mut StdRng, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}

/// Placeholder universe when the query names no clients.
fn fallback_clients() -> Vec<String> {
    (0..5).map(|i| format!("cl_id_{}", i)).collect()
}

fn generate_rows(rng: &mut StdRng, clients: &[String], range: &DateRange) -> Vec<SampleRow> {
    let clients = if clients.is_empty() {
        fallback_clients()
    } else {
        clients.to_vec()
    };

    let mut rows = Vec::new();
    for date in range.days() {
        for client_id in &clients {
            for _ in 0..rng.gen_range(1..4) {
                let subbusiness = pick(rng, &Subbusiness::ALL);
                let region = pick(rng, &Region::ALL);
                let balance_type = if subbusiness.is_pb_family() {
                    pick(
                        rng,
                        &[
                            BalanceType::Debit,
                            BalanceType::Credit,
                            BalanceType::PhysicalShorts,
                        ],
                    )
                } else {
                    pick(rng, &[BalanceType::SyntheticLongs, BalanceType::SyntheticShorts])
                };
                rows.push(SampleRow {
                    date,
                    client_id: client_id.clone(),
                    business: pick(rng, &Business::ALL),
                    subbusiness,
                    region,
                    country: pick(rng, region.countries()),
                    fin_or_exec: pick(rng, &[FinOrExec::Financing, FinOrExec::Execution]),
                    primary_or_secondary: pick(
                        rng,
                        &[PrimaryOrSecondary::Primary, PrimaryOrSecondary::Secondary],
                    ),
                    balance_type,
                    revenues: rng.gen_range(1_000..50_000),
                    balances: rng.gen_range(100_000..5_000_000),
                });
            }
        }
    }
    rows
}

/// The measured quantity and how groups of it reduce.
#[derive(Clone, Copy)]
enum Measure {
    SumRevenues,
    MeanBalances,
    SumCapital,
}

impl Measure {
    fn column_name(&self, capital_name: &str) -> String {
        match self {
            Measure::SumRevenues => "revenues".to_string(),
            Measure::MeanBalances => "balances".to_string(),
            Measure::SumCapital => capital_name.to_string(),
        }
    }

    fn reduce(&self, values: &[i64]) -> Value {
        match self {
            Measure::SumRevenues | Measure::SumCapital => {
                Value::Int(values.iter().sum::<i64>())
            }
            Measure::MeanBalances => {
                if values.is_empty() {
                    Value::Null
                } else {
                    Value::Float(values.iter().sum::<i64>() as f64 / values.len() as f64)
                }
            }
        }
    }
}

fn display_client_name(client_id: &str) -> String {
    let stem = client_id.strip_prefix("cl_id_").unwrap_or(client_id);
    let mut out = String::new();
    for (i, word) in stem.split('_').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Sortable key plus the display value for one dimension of one row.
fn dim_value(row: &SampleRow, dim: Dimension) -> (String, Value) {
    match dim {
        Dimension::Date => (row.date.to_string(), Value::Date(row.date)),
        Dimension::Client => (row.client_id.clone(), Value::Str(row.client_id.clone())),
        Dimension::Business => {
            let name = row.business.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        Dimension::Subbusiness => {
            let name = row.subbusiness.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        Dimension::Region => {
            let name = row.region.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        Dimension::Country => {
            let name = row.country.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        Dimension::BalanceType => {
            let name = row.balance_type.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        Dimension::FinOrExec => {
            let name = row.fin_or_exec.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        Dimension::PrimaryOrSecondary => {
            let name = row.primary_or_secondary.name();
            (name.to_string(), Value::Str(name.to_string()))
        }
        // Aggregate never reaches per-row keying; it is handled before
        // grouping.
        Dimension::Aggregate => (String::new(), Value::Null),
    }
}

fn dim_column_name(dim: Dimension) -> &'static str {
    match dim {
        Dimension::Client => "client_id",
        other => other.name(),
    }
}

/// Group rows along `granularity` and reduce with `measure`.
///
/// Row dimensions become leading columns; column dimensions pivot into one
/// value column per observed combination, Null where a row group has no
/// rows for that combination.
fn aggregate(
    rows: &[SampleRow],
    granularity: &Granularity,
    measure: Measure,
    capital_name: &str,
    values: impl Fn(&SampleRow) -> i64,
) -> Table {
    let value_column = measure.column_name(capital_name);

    if granularity.is_aggregate() {
        let all: Vec<i64> = rows.iter().map(&values).collect();
        let mut table = Table::new(vec![value_column]);
        if !all.is_empty() {
            table
                .push_row(vec![measure.reduce(&all)])
                .expect("single-column row");
        }
        return table;
    }

    let row_dims = &granularity.rows;
    let col_dims = granularity.cols.as_deref().unwrap_or(&[]);

    // Group by row key; within a group, bucket by pivot key.
    struct Group {
        repr: Vec<Value>,
        buckets: BTreeMap<String, Vec<i64>>,
    }
    let mut groups: BTreeMap<Vec<String>, Group> = BTreeMap::new();
    let mut pivot_keys: std::collections::BTreeSet<String> = Default::default();

    for row in rows {
        let mut key = Vec::with_capacity(row_dims.len());
        let mut repr = Vec::with_capacity(row_dims.len());
        for dim in row_dims {
            let (k, v) = dim_value(row, *dim);
            key.push(k);
            repr.push(v);
        }
        let pivot_key = if col_dims.is_empty() {
            value_column.clone()
        } else {
            col_dims
                .iter()
                .map(|d| dim_value(row, *d).0)
                .collect::<Vec<_>>()
                .join(" / ")
        };
        pivot_keys.insert(pivot_key.clone());
        let group = groups.entry(key).or_insert_with(|| Group {
            repr,
            buckets: BTreeMap::new(),
        });
        group.buckets.entry(pivot_key).or_default().push(values(row));
    }

    let mut columns: Vec<String> = row_dims
        .iter()
        .map(|d| dim_column_name(*d).to_string())
        .collect();
    let add_client_name = row_dims.contains(&Dimension::Client);
    if add_client_name {
        columns.push("client_name".to_string());
    }
    columns.extend(pivot_keys.iter().cloned());

    let mut table = Table::new(columns);
    let client_idx = row_dims.iter().position(|d| *d == Dimension::Client);
    for group in groups.into_values() {
        let mut out = group.repr.clone();
        if let Some(i) = client_idx {
            if let Value::Str(id) = &group.repr[i] {
                out.push(Value::Str(display_client_name(id)));
            } else {
                out.push(Value::Null);
            }
        }
        for pk in &pivot_keys {
            out.push(match group.buckets.get(pk) {
                Some(bucket) => measure.reduce(bucket),
                None => Value::Null,
            });
        }
        table.push_row(out).expect("columns built alongside rows");
    }
    table
}

impl MockDataApi {
    fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }

    fn check_balance_type(
        &self,
        rows: &[SampleRow],
        balance_type: BalanceType,
    ) -> Result<bool, ApiError> {
        // A PB-style filter is incompatible with SPG rows and vice versa.
        let offending = rows.iter().find(|r| {
            if r.subbusiness.is_pb_family() {
                !balance_type.is_pb_style()
            } else {
                balance_type.is_pb_style()
            }
        });
        if let Some(row) = offending {
            return match self.mismatch_policy {
                MismatchPolicy::Reject => Err(ApiError::IncompatibleBalanceType {
                    balance_type: balance_type.name(),
                    subbusiness: row.subbusiness.name(),
                }),
                MismatchPolicy::Empty => Ok(false),
            };
        }
        Ok(true)
    }
}

#[async_trait]
impl DataApi for MockDataApi {
    async fn revenues(&self, query: &RevenuesQuery) -> Result<Table, ApiError> {
        debug!(clients = query.clients.len(), "mock revenues fetch");
        let mut rng = self.rng();
        let mut rows = generate_rows(&mut rng, &query.clients, &query.range);

        if let Some(regions) = &query.regions {
            rows.retain(|r| regions.contains(&r.region));
        }
        if let Some(fe) = &query.fin_or_exec {
            rows.retain(|r| fe.contains(&r.fin_or_exec));
        }
        if let Some(ps) = &query.primary_or_secondary {
            rows.retain(|r| ps.contains(&r.primary_or_secondary));
        }
        if let Some(business) = &query.business {
            rows.retain(|r| business.members().contains(&r.business));
        }
        if let Some(sb) = &query.subbusiness {
            rows.retain(|r| r.subbusiness == *sb);
        }

        Ok(aggregate(
            &rows,
            &query.granularity,
            Measure::SumRevenues,
            "",
            |r| r.revenues,
        ))
    }

    async fn balances(&self, query: &BalancesQuery) -> Result<Table, ApiError> {
        debug!(clients = query.clients.len(), "mock balances fetch");
        let mut rng = self.rng();
        let mut rows = generate_rows(&mut rng, &query.clients, &query.range);

        if let Some(regions) = &query.regions {
            rows.retain(|r| regions.contains(&r.region));
        }
        if let Some(countries) = &query.countries {
            rows.retain(|r| countries.contains(&r.country));
        }
        if let Some(business) = &query.business {
            rows.retain(|r| business.members().contains(&r.business));
        }
        if let Some(sb) = &query.subbusiness {
            rows.retain(|r| r.subbusiness == *sb);
        }
        if let Some(bt) = query.balance_type {
            if !self.check_balance_type(&rows, bt)? {
                return Ok(Table::new(vec!["balances".to_string()]));
            }
            rows.retain(|r| r.balance_type == bt);
        }

        Ok(aggregate(
            &rows,
            &query.granularity,
            Measure::MeanBalances,
            "",
            |r| r.balances,
        ))
    }

    async fn balances_decomposition(
        &self,
        query: &DecompositionQuery,
    ) -> Result<Table, ApiError> {
        debug!(clients = query.clients.len(), "mock decomposition fetch");
        let mut rng = self.rng();
        let mut rows = generate_rows(&mut rng, &query.clients, &query.range);

        if let Some(regions) = &query.regions {
            rows.retain(|r| regions.contains(&r.region));
        }
        if let Some(countries) = &query.countries {
            rows.retain(|r| countries.contains(&r.country));
        }
        if let Some(business) = &query.business {
            rows.retain(|r| business.members().contains(&r.business));
        }
        if let Some(sb) = &query.subbusiness {
            rows.retain(|r| r.subbusiness == *sb);
        }

        // Period-end balances per group, then a synthetic start-of-period
        // level and an MTM/Activity split of the delta.
        let base = aggregate(
            &rows,
            &query.granularity,
            Measure::MeanBalances,
            "",
            |r| r.balances,
        );

        let dim_columns: Vec<String> = base
            .columns()
            .iter()
            .filter(|c| *c != "balances")
            .cloned()
            .collect();
        let mut columns = dim_columns.clone();
        columns.extend(
            [
                "Balance.Start",
                "Balance.End",
                "Balance.Delta.Total",
                "Balance.Delta.MTM",
                "Balance.Delta.Activity",
            ]
            .map(String::from),
        );

        let mut table = Table::new(columns);
        // An empty base has no value column at all; the empty table with the
        // decomposition schema is the correct result.
        let balances_idx = match base.column_index("balances") {
            Ok(i) => i,
            Err(_) => return Ok(table),
        };
        for row in base.rows() {
            let end = row[balances_idx].as_f64().unwrap_or(0.0);
            let start = end * (1.0 + rng.gen_range(-0.2..0.2));
            let total = end - start;
            let mtm = total * rng.gen_range(0.3..0.7);
            let activity = total - mtm;

            let mut out: Vec<Value> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != balances_idx)
                .map(|(_, v)| v.clone())
                .collect();
            out.extend([
                Value::Float(start),
                Value::Float(end),
                Value::Float(total),
                Value::Float(mtm),
                Value::Float(activity),
            ]);
            table.push_row(out).expect("columns built alongside rows");
        }
        Ok(table)
    }

    async fn capital(&self, query: &CapitalQuery) -> Result<Table, ApiError> {
        debug!(measure = query.measure.name(), "mock capital fetch");
        let mut rng = self.rng();
        let mut rows = generate_rows(&mut rng, &query.clients, &query.range);

        // Capital values live on different scales per measure.
        let range = match query.measure.name() {
            name if name.contains("RWA") => 100_000..5_000_000,
            "Balance Sheet" | "Supplemental Balance Sheet" => 1_000_000..20_000_000,
            "GSIB Points" => 10..1_000,
            _ => 50_000..2_000_000,
        };
        for row in &mut rows {
            row.balances = rng.gen_range(range.clone());
        }

        if let Some(business) = &query.business {
            rows.retain(|r| business.members().contains(&r.business));
        }
        if let Some(sb) = &query.subbusiness {
            rows.retain(|r| r.subbusiness == *sb);
        }

        Ok(aggregate(
            &rows,
            &query.granularity,
            Measure::SumCapital,
            query.measure.name(),
            |r| r.balances,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::CapitalMeasure;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .unwrap()
    }

    fn revenues_query(granularity: Granularity) -> RevenuesQuery {
        RevenuesQuery {
            clients: vec!["cl_id_millennium".into(), "cl_id_citadel".into()],
            range: range(),
            granularity,
            business: None,
            subbusiness: None,
            regions: None,
            fin_or_exec: None,
            primary_or_secondary: None,
        }
    }

    #[tokio::test]
    async fn test_aggregate_is_single_cell() {
        let api = MockDataApi::new(7);
        let table = api
            .revenues(&revenues_query(Granularity::by(Dimension::Aggregate)))
            .await
            .unwrap();
        assert_eq!(table.columns(), ["revenues"]);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_client_granularity_adds_display_name() {
        let api = MockDataApi::new(7);
        let table = api
            .revenues(&revenues_query(Granularity::by(Dimension::Client)))
            .await
            .unwrap();
        assert_eq!(table.columns(), ["client_id", "client_name", "revenues"]);
        assert_eq!(table.len(), 2);
        let names: Vec<String> = table
            .rows()
            .iter()
            .map(|r| r[1].to_string())
            .collect();
        assert!(names.contains(&"Millennium".to_string()));
    }

    #[tokio::test]
    async fn test_same_seed_same_result() {
        let q = revenues_query(Granularity::by(Dimension::Client));
        let a = MockDataApi::new(42).revenues(&q).await.unwrap();
        let b = MockDataApi::new(42).revenues(&q).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_pivot_emits_column_per_value() {
        let api = MockDataApi::new(7);
        let table = api
            .revenues(&revenues_query(Granularity::with_cols(
                vec![Dimension::Client],
                vec![Dimension::FinOrExec],
            )))
            .await
            .unwrap();
        assert!(table.columns().contains(&"Financing".to_string()));
        assert!(table.columns().contains(&"Execution".to_string()));
    }

    #[tokio::test]
    async fn test_region_filter_restricts_rows() {
        let api = MockDataApi::new(7);
        let mut q = revenues_query(Granularity::by(Dimension::Region));
        q.regions = Some(vec![Region::Emea]);
        let table = api.revenues(&q).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, 0), Some(&Value::Str("EMEA".into())));
    }

    #[tokio::test]
    async fn test_balance_type_mismatch_rejects_by_default() {
        let api = MockDataApi::new(7);
        let q = BalancesQuery {
            clients: vec!["cl_id_millennium".into()],
            range: range(),
            granularity: Granularity::by(Dimension::Aggregate),
            business: None,
            subbusiness: Some(Subbusiness::Pb),
            regions: None,
            countries: None,
            balance_type: Some(BalanceType::SyntheticLongs),
        };
        let err = api.balances(&q).await.unwrap_err();
        assert!(err.to_string().contains("Synthetic Longs"));
    }

    #[tokio::test]
    async fn test_balance_type_mismatch_empty_on_opt_in() {
        let api = MockDataApi::new(7).with_mismatch_policy(MismatchPolicy::Empty);
        let q = BalancesQuery {
            clients: vec!["cl_id_millennium".into()],
            range: range(),
            granularity: Granularity::by(Dimension::Aggregate),
            business: None,
            subbusiness: Some(Subbusiness::Pb),
            regions: None,
            countries: None,
            balance_type: Some(BalanceType::SyntheticLongs),
        };
        let table = api.balances(&q).await.unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_compatible_balance_type_filters() {
        let api = MockDataApi::new(7);
        let q = BalancesQuery {
            clients: vec!["cl_id_millennium".into()],
            range: range(),
            granularity: Granularity::by(Dimension::BalanceType),
            business: None,
            subbusiness: Some(Subbusiness::Spg),
            regions: None,
            countries: None,
            balance_type: Some(BalanceType::SyntheticLongs),
        };
        let table = api.balances(&q).await.unwrap();
        for row in table.rows() {
            assert_eq!(row[0], Value::Str("Synthetic Longs".into()));
        }
    }

    #[tokio::test]
    async fn test_decomposition_columns() {
        let api = MockDataApi::new(7);
        let q = DecompositionQuery {
            clients: vec!["cl_id_millennium".into()],
            range: range(),
            granularity: Granularity::by(Dimension::Client),
            business: None,
            subbusiness: None,
            regions: None,
            countries: None,
        };
        let table = api.balances_decomposition(&q).await.unwrap();
        assert!(table.columns().contains(&"Balance.Delta.MTM".to_string()));
        assert!(table.columns().contains(&"Balance.Delta.Activity".to_string()));
        // Delta components sum to the total.
        let total = table.column_index("Balance.Delta.Total").unwrap();
        let mtm = table.column_index("Balance.Delta.MTM").unwrap();
        let act = table.column_index("Balance.Delta.Activity").unwrap();
        for row in table.rows() {
            let t = row[total].as_f64().unwrap();
            let parts = row[mtm].as_f64().unwrap() + row[act].as_f64().unwrap();
            assert!((t - parts).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_capital_value_column_is_measure_name() {
        let api = MockDataApi::new(7);
        let q = CapitalQuery {
            measure: CapitalMeasure::TotalAe,
            clients: vec!["cl_id_millennium".into()],
            range: range(),
            granularity: Granularity::by(Dimension::Business),
            business: None,
            subbusiness: None,
        };
        let table = api.capital(&q).await.unwrap();
        assert!(table.columns().contains(&"Total AE".to_string()));
    }
}

//! Typed metric queries
//!
//! One query struct per metric kind. Filters a metric cannot carry are not
//! representable on its struct, so the compiler enforces most of the
//! metric/filter matrix; the residual rules (granularity subsets per
//! metric) are checked at construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dimensions::{
    BalanceType, BusinessFilter, CapitalMeasure, Country, Dimension, FinOrExec,
    PrimaryOrSecondary, Region, Subbusiness,
};
use crate::granularity::Granularity;

/// A concrete, inclusive date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Error)]
#[error("invalid date range: start {start} is after end {end}")]
pub struct DateRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Iterate the days of the range, inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        let n = (self.end - self.start).num_days() as usize + 1;
        (0..n).map(move |i| start + chrono::Duration::days(i as i64))
    }
}

/// The metric families the data platform serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Revenues,
    Balances,
    BalancesDecomposition,
    Capital(CapitalMeasure),
}

#[derive(Debug, Error)]
#[error("unknown metric '{0}' (expected revenues, balances, balances_decomposition, capital, or a capital measure name)")]
pub struct UnknownMetric(pub String);

impl MetricKind {
    /// Parse the planner's metric string. Capital accepts both the generic
    /// "capital" (defaulting to Total AE) and a measure's display name.
    pub fn parse(s: &str) -> Result<MetricKind, UnknownMetric> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "revenues" => Ok(MetricKind::Revenues),
            "balances" => Ok(MetricKind::Balances),
            "balances_decomposition" => Ok(MetricKind::BalancesDecomposition),
            "capital" => Ok(MetricKind::Capital(CapitalMeasure::TotalAe)),
            _ => CapitalMeasure::parse(s)
                .map(MetricKind::Capital)
                .ok_or_else(|| UnknownMetric(s.to_string())),
        }
    }
}

/// Errors building a typed query from resolved parts.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("metric '{metric}' does not support granularity dimension '{dimension}'")]
    UnsupportedGranularity {
        metric: &'static str,
        dimension: Dimension,
    },

    #[error("metric '{metric}' does not support column pivoting")]
    UnsupportedPivot { metric: &'static str },
}

/// Flow revenue query. No country or balance-type filter exists for
/// revenues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenuesQuery {
    pub clients: Vec<String>,
    pub range: DateRange,
    pub granularity: Granularity,
    pub business: Option<BusinessFilter>,
    pub subbusiness: Option<Subbusiness>,
    pub regions: Option<Vec<Region>>,
    pub fin_or_exec: Option<Vec<FinOrExec>>,
    pub primary_or_secondary: Option<Vec<PrimaryOrSecondary>>,
}

impl RevenuesQuery {
    const SUPPORTED: [Dimension; 8] = [
        Dimension::Aggregate,
        Dimension::Client,
        Dimension::Date,
        Dimension::Business,
        Dimension::Subbusiness,
        Dimension::Region,
        Dimension::FinOrExec,
        Dimension::PrimaryOrSecondary,
    ];

    pub fn check_granularity(&self) -> Result<(), RequestError> {
        check_dims("revenues", &self.granularity, &Self::SUPPORTED)
    }
}

/// Point-in-time balance query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesQuery {
    pub clients: Vec<String>,
    pub range: DateRange,
    pub granularity: Granularity,
    pub business: Option<BusinessFilter>,
    pub subbusiness: Option<Subbusiness>,
    pub regions: Option<Vec<Region>>,
    pub countries: Option<Vec<Country>>,
    pub balance_type: Option<BalanceType>,
}

impl BalancesQuery {
    const SUPPORTED: [Dimension; 8] = [
        Dimension::Aggregate,
        Dimension::Client,
        Dimension::Date,
        Dimension::Business,
        Dimension::Subbusiness,
        Dimension::Region,
        Dimension::Country,
        Dimension::BalanceType,
    ];

    pub fn check_granularity(&self) -> Result<(), RequestError> {
        check_dims("balances", &self.granularity, &Self::SUPPORTED)
    }
}

/// Balance-change decomposition query. Period-level by construction, so
/// per-date grouping is not part of its vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionQuery {
    pub clients: Vec<String>,
    pub range: DateRange,
    pub granularity: Granularity,
    pub business: Option<BusinessFilter>,
    pub subbusiness: Option<Subbusiness>,
    pub regions: Option<Vec<Region>>,
    pub countries: Option<Vec<Country>>,
}

impl DecompositionQuery {
    const SUPPORTED: [Dimension; 6] = [
        Dimension::Aggregate,
        Dimension::Client,
        Dimension::Business,
        Dimension::Subbusiness,
        Dimension::Region,
        Dimension::Country,
    ];

    pub fn check_granularity(&self) -> Result<(), RequestError> {
        // The decomposition result already spreads across five value
        // columns; a pivot on top of that has no sensible shape.
        if self.granularity.cols.is_some() {
            return Err(RequestError::UnsupportedPivot {
                metric: "balances_decomposition",
            });
        }
        check_dims("balances_decomposition", &self.granularity, &Self::SUPPORTED)
    }
}

/// Capital query. Capital has no regional dimension at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalQuery {
    pub measure: CapitalMeasure,
    pub clients: Vec<String>,
    pub range: DateRange,
    pub granularity: Granularity,
    pub business: Option<BusinessFilter>,
    pub subbusiness: Option<Subbusiness>,
}

impl CapitalQuery {
    const SUPPORTED: [Dimension; 5] = [
        Dimension::Aggregate,
        Dimension::Client,
        Dimension::Date,
        Dimension::Business,
        Dimension::Subbusiness,
    ];

    pub fn check_granularity(&self) -> Result<(), RequestError> {
        check_dims("capital", &self.granularity, &Self::SUPPORTED)
    }
}

fn check_dims(
    metric: &'static str,
    granularity: &Granularity,
    supported: &[Dimension],
) -> Result<(), RequestError> {
    let all = granularity
        .rows
        .iter()
        .chain(granularity.cols.iter().flatten());
    for dim in all {
        if !supported.contains(dim) {
            return Err(RequestError::UnsupportedGranularity {
                metric,
                dimension: *dim,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let err = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_date_range_days_inclusive() {
        let r = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
        )
        .unwrap();
        assert_eq!(r.days().count(), 4);
    }

    #[test]
    fn test_metric_parse_basic() {
        assert_eq!(MetricKind::parse("revenues").unwrap(), MetricKind::Revenues);
        assert_eq!(
            MetricKind::parse("balances_decomposition").unwrap(),
            MetricKind::BalancesDecomposition
        );
    }

    #[test]
    fn test_metric_parse_capital_display_names() {
        assert_eq!(
            MetricKind::parse("Total AE").unwrap(),
            MetricKind::Capital(CapitalMeasure::TotalAe)
        );
        assert_eq!(
            MetricKind::parse("capital").unwrap(),
            MetricKind::Capital(CapitalMeasure::TotalAe)
        );
        assert_eq!(
            MetricKind::parse("GSIB Points").unwrap(),
            MetricKind::Capital(CapitalMeasure::GsibPoints)
        );
        assert!(MetricKind::parse("profits").is_err());
    }

    #[test]
    fn test_capital_rejects_region_granularity() {
        let q = CapitalQuery {
            measure: CapitalMeasure::TotalAe,
            clients: vec!["cl_id_millennium".into()],
            range: range(),
            granularity: Granularity::by(Dimension::Region),
            business: None,
            subbusiness: None,
        };
        let err = q.check_granularity().unwrap_err();
        assert!(err.to_string().contains("capital"));
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_decomposition_rejects_date_granularity() {
        let q = DecompositionQuery {
            clients: vec![],
            range: range(),
            granularity: Granularity::by(Dimension::Date),
            business: None,
            subbusiness: None,
            regions: None,
            countries: None,
        };
        assert!(q.check_granularity().is_err());
    }

    #[test]
    fn test_revenues_accepts_fin_or_exec_granularity() {
        let q = RevenuesQuery {
            clients: vec![],
            range: range(),
            granularity: Granularity::by(Dimension::FinOrExec),
            business: None,
            subbusiness: None,
            regions: None,
            fin_or_exec: None,
            primary_or_secondary: None,
        };
        assert!(q.check_granularity().is_ok());
    }
}

//! Granularity specification and validation
//!
//! A result table is grouped along 1-2 row dimensions and optionally
//! pivoted along 1-2 column dimensions. The combinatorics carry structural
//! rules: no duplicates, no row/column overlap, "aggregate" stands alone,
//! and per-client / per-date grouping is row-only.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dimensions::Dimension;

/// Rule violations, one variant per rule so callers can act on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GranularityError {
    #[error("row granularity must have 1 or 2 dimensions, got {0}")]
    RowCardinality(usize),

    #[error("duplicate dimension '{0}' in row granularity")]
    DuplicateRow(Dimension),

    #[error("'aggregate' cannot be combined with other row dimensions")]
    AggregateNotAloneInRows,

    #[error("column granularity must have 1 or 2 dimensions, got {0}")]
    ColCardinality(usize),

    #[error("duplicate dimension '{0}' in column granularity")]
    DuplicateCol(Dimension),

    #[error("'aggregate' cannot be combined with other column dimensions")]
    AggregateNotAloneInCols,

    #[error("dimension '{0}' appears in both row and column granularity")]
    Overlap(Dimension),

    #[error("dimension '{0}' is row-only and cannot be a column granularity")]
    RowOnlyInCols(Dimension),
}

/// Row/column grouping specification for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Granularity {
    /// Ordered row-grouping dimensions (1-2 entries).
    pub rows: Vec<Dimension>,
    /// Optional ordered column-pivot dimensions (1-2 entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<Vec<Dimension>>,
}

impl Granularity {
    /// Single row dimension, no pivot.
    pub fn by(dim: Dimension) -> Self {
        Self {
            rows: vec![dim],
            cols: None,
        }
    }

    pub fn with_cols(rows: Vec<Dimension>, cols: Vec<Dimension>) -> Self {
        Self {
            rows,
            cols: Some(cols),
        }
    }

    /// True when the whole result collapses to one number.
    pub fn is_aggregate(&self) -> bool {
        self.rows == [Dimension::Aggregate]
    }

    /// Check the structural rules, in order. First failure wins.
    pub fn validate(&self) -> Result<(), GranularityError> {
        // 1. Row cardinality and duplicates
        if self.rows.is_empty() || self.rows.len() > 2 {
            return Err(GranularityError::RowCardinality(self.rows.len()));
        }
        if let Some(dup) = first_duplicate(&self.rows) {
            return Err(GranularityError::DuplicateRow(dup));
        }

        // 2. Aggregate exclusivity in rows
        if self.rows.contains(&Dimension::Aggregate) && self.rows.len() != 1 {
            return Err(GranularityError::AggregateNotAloneInRows);
        }

        if let Some(cols) = &self.cols {
            // 3. Column cardinality and duplicates
            if cols.is_empty() || cols.len() > 2 {
                return Err(GranularityError::ColCardinality(cols.len()));
            }
            if let Some(dup) = first_duplicate(cols) {
                return Err(GranularityError::DuplicateCol(dup));
            }

            // 4. Aggregate exclusivity in columns
            if cols.contains(&Dimension::Aggregate) && cols.len() != 1 {
                return Err(GranularityError::AggregateNotAloneInCols);
            }

            // 5. No row/column overlap
            if let Some(shared) = self.rows.iter().find(|d| cols.contains(d)) {
                return Err(GranularityError::Overlap(*shared));
            }

            // 6. Per-client and per-date grouping is row-only
            if let Some(bad) = cols
                .iter()
                .find(|d| matches!(d, Dimension::Client | Dimension::Date))
            {
                return Err(GranularityError::RowOnlyInCols(*bad));
            }
        }

        Ok(())
    }
}

fn first_duplicate(dims: &[Dimension]) -> Option<Dimension> {
    for (i, d) in dims.iter().enumerate() {
        if dims[..i].contains(d) {
            return Some(*d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::Dimension::*;

    #[test]
    fn test_single_dimension_is_valid() {
        assert!(Granularity::by(Client).validate().is_ok());
    }

    #[test]
    fn test_two_rows_with_cols_valid() {
        let g = Granularity::with_cols(vec![Date, Client], vec![Business, Region]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_duplicate_row_rejected() {
        let g = Granularity {
            rows: vec![Client, Client],
            cols: None,
        };
        assert_eq!(g.validate(), Err(GranularityError::DuplicateRow(Client)));
    }

    #[test]
    fn test_aggregate_must_stand_alone() {
        let g = Granularity {
            rows: vec![Aggregate, Client],
            cols: None,
        };
        assert_eq!(g.validate(), Err(GranularityError::AggregateNotAloneInRows));
    }

    #[test]
    fn test_three_rows_rejected() {
        let g = Granularity {
            rows: vec![Client, Business, Date],
            cols: None,
        };
        assert_eq!(g.validate(), Err(GranularityError::RowCardinality(3)));
    }

    #[test]
    fn test_row_col_overlap_names_the_dimension() {
        let g = Granularity::with_cols(vec![Client, Business], vec![Business, Region]);
        assert_eq!(g.validate(), Err(GranularityError::Overlap(Business)));
    }

    #[test]
    fn test_client_is_row_only() {
        let g = Granularity::with_cols(vec![Business], vec![Client]);
        assert_eq!(g.validate(), Err(GranularityError::RowOnlyInCols(Client)));
        let g = Granularity::with_cols(vec![Business], vec![Date]);
        assert_eq!(g.validate(), Err(GranularityError::RowOnlyInCols(Date)));
    }

    #[test]
    fn test_empty_cols_rejected() {
        let g = Granularity::with_cols(vec![Client], vec![]);
        assert_eq!(g.validate(), Err(GranularityError::ColCardinality(0)));
    }

    #[test]
    fn test_rule_order_duplicate_before_overlap() {
        // Duplicate in rows is reported before the overlap with cols.
        let g = Granularity::with_cols(vec![Business, Business], vec![Business]);
        assert_eq!(g.validate(), Err(GranularityError::DuplicateRow(Business)));
    }
}

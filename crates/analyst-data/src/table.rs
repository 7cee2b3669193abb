//! Tabular result container
//!
//! Every data fetch and transform produces a `Table`: an ordered list of
//! named columns plus rows of typed values. Tables are small (post-aggregation
//! result sets), so operations clone freely rather than chase zero-copy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
}

/// Coarse type of a column, inferred from its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Date,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Date(_) => ValueKind::Date,
        }
    }

    /// Numeric view of the value, if it has one. Ints widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Ordering used for sorts: numbers before strings before dates,
    /// nulls last.
    fn sort_key_cmp(&self, other: &Value) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => match (self, other) {
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                (Value::Date(a), Value::Date(b)) => a.cmp(b),
                (Value::Null, Value::Null) => Ordering::Equal,
                (Value::Null, _) => Ordering::Greater,
                (_, Value::Null) => Ordering::Less,
                _ => Ordering::Equal,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:.2}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
        }
    }
}

/// Errors raised by table operations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{0}' not found (available: {1})")]
    UnknownColumn(String, String),

    #[error("row has {got} values but the table has {expected} columns")]
    ArityMismatch { got: usize, expected: usize },

    #[error("table '{0}' not found in workspace (available: {1})")]
    NotFound(String, String),
}

/// An in-memory result table: ordered columns, rows of typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The row must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::ArityMismatch {
                got: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string(), self.columns.join(", ")))
    }

    /// Cell accessor.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Column names paired with the kind of the first non-null value.
    pub fn schema(&self) -> Vec<(String, ValueKind)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = self
                    .rows
                    .iter()
                    .map(|r| r[i].kind())
                    .find(|k| *k != ValueKind::Null)
                    .unwrap_or(ValueKind::Null);
                (name.clone(), kind)
            })
            .collect()
    }

    /// Sort rows by a column, in place.
    pub fn sort_by(&mut self, column: &str, descending: bool) -> Result<(), TableError> {
        let idx = self.column_index(column)?;
        self.rows.sort_by(|a, b| {
            let ord = a[idx].sort_key_cmp(&b[idx]);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(())
    }

    /// Keep the first `n` rows.
    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    /// Render the table as aligned plain text, for logs and LLM prompts.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let s = v.to_string();
                        widths[i] = widths[i].max(s.len());
                        s
                    })
                    .collect()
            })
            .collect();

        let mut out = String::new();
        for (i, c) in self.columns.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", c, width = widths[i]));
        }
        out.push('\n');
        for row in rendered {
            for (i, cell) in row.iter().enumerate() {
                out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(vec!["client_id".into(), "revenues".into()]);
        t.push_row(vec![Value::Str("cl_id_citadel".into()), Value::Int(300)])
            .unwrap();
        t.push_row(vec![Value::Str("cl_id_millennium".into()), Value::Int(100)])
            .unwrap();
        t.push_row(vec![Value::Str("cl_id_point72".into()), Value::Int(200)])
            .unwrap();
        t
    }

    #[test]
    fn test_push_row_arity_checked() {
        let mut t = Table::new(vec!["a".into()]);
        let err = t.push_row(vec![Value::Int(1), Value::Int(2)]).unwrap_err();
        assert!(matches!(err, TableError::ArityMismatch { got: 2, expected: 1 }));
    }

    #[test]
    fn test_unknown_column_names_available() {
        let t = sample();
        let err = t.column_index("balances").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("balances"));
        assert!(msg.contains("client_id"));
    }

    #[test]
    fn test_sort_descending() {
        let mut t = sample();
        t.sort_by("revenues", true).unwrap();
        assert_eq!(t.get(0, 1), Some(&Value::Int(300)));
        assert_eq!(t.get(2, 1), Some(&Value::Int(100)));
    }

    #[test]
    fn test_schema_infers_kinds() {
        let t = sample();
        let schema = t.schema();
        assert_eq!(schema[0], ("client_id".to_string(), ValueKind::Str));
        assert_eq!(schema[1], ("revenues".to_string(), ValueKind::Int));
    }

    #[test]
    fn test_render_contains_headers_and_values() {
        let t = sample();
        let text = t.render();
        assert!(text.contains("client_id"));
        assert!(text.contains("cl_id_citadel"));
    }

    #[test]
    fn test_empty_table_is_valid() {
        let t = Table::new(vec!["x".into()]);
        assert!(t.is_empty());
        assert_eq!(t.schema()[0].1, ValueKind::Null);
    }
}

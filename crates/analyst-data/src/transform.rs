//! Transform operations
//!
//! The typed operation set a `transform` plan step carries. Each op reads
//! tables from the workspace and writes its result back under `output`
//! (or over its input when `output` is omitted). Ops are applied in order;
//! the first failure aborts the step with an error naming the offending
//! table, column, or expression.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::expr::{Expr, ExprError};
use crate::table::{Table, TableError, Value};
use crate::workspace::Workspace;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error("join key '{key}' missing from table '{table}'")]
    MissingJoinKey { key: String, table: String },

    #[error("cannot summarize non-numeric column '{0}'")]
    NonNumericSummary(String),
}

/// Aggregation functions for `summarize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AggFn {
    Sum,
    Mean,
}

/// One workspace transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformOp {
    /// Inner-join two tables on a shared column. Clashing non-key column
    /// names get suffixes (default `_x` / `_y`).
    Join {
        left: String,
        right: String,
        on: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suffixes: Option<(String, String)>,
        output: String,
    },
    /// Add (or replace) a column computed row-wise from an expression.
    Derive {
        table: String,
        column: String,
        expr: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Keep rows where the predicate holds.
    Filter {
        table: String,
        predicate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Sort by a column.
    Sort {
        table: String,
        by: String,
        #[serde(default)]
        descending: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Keep the first `n` rows.
    Head {
        table: String,
        n: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Keep only the named columns, in the given order.
    Select {
        table: String,
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Rename columns (old name -> new name).
    Rename {
        table: String,
        columns: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    /// Reduce one numeric column to a single-row table.
    Summarize {
        table: String,
        column: String,
        agg: AggFn,
        output: String,
    },
}

/// Apply a sequence of ops against the workspace.
pub fn apply(workspace: &mut Workspace, ops: &[TransformOp]) -> Result<(), TransformError> {
    for op in ops {
        apply_one(workspace, op)?;
    }
    Ok(())
}

fn apply_one(workspace: &mut Workspace, op: &TransformOp) -> Result<(), TransformError> {
    debug!(?op, "applying transform op");
    match op {
        TransformOp::Join {
            left,
            right,
            on,
            suffixes,
            output,
        } => {
            let result = join(workspace.get(left)?, workspace.get(right)?, on, suffixes)?;
            workspace.add(output.clone(), result);
        }
        TransformOp::Derive {
            table,
            column,
            expr,
            output,
        } => {
            let parsed = Expr::parse(expr)?;
            let source = workspace.get(table)?;
            let mut result = source.clone();
            let mut values = Vec::with_capacity(source.len());
            for row in 0..source.len() {
                values.push(Value::Float(parsed.eval_number(source, row)?));
            }
            result = set_column(result, column, values);
            workspace.add(output.as_deref().unwrap_or(table), result);
        }
        TransformOp::Filter {
            table,
            predicate,
            output,
        } => {
            let parsed = Expr::parse(predicate)?;
            let source = workspace.get(table)?;
            let mut result = Table::new(source.columns().to_vec());
            for row in 0..source.len() {
                if parsed.eval_bool(source, row)? {
                    result
                        .push_row(source.rows()[row].clone())
                        .expect("same columns");
                }
            }
            workspace.add(output.as_deref().unwrap_or(table), result);
        }
        TransformOp::Sort {
            table,
            by,
            descending,
            output,
        } => {
            let mut result = workspace.get(table)?.clone();
            result.sort_by(by, *descending)?;
            workspace.add(output.as_deref().unwrap_or(table), result);
        }
        TransformOp::Head { table, n, output } => {
            let mut result = workspace.get(table)?.clone();
            result.truncate(*n);
            workspace.add(output.as_deref().unwrap_or(table), result);
        }
        TransformOp::Select {
            table,
            columns,
            output,
        } => {
            let source = workspace.get(table)?;
            let indices: Vec<usize> = columns
                .iter()
                .map(|c| source.column_index(c))
                .collect::<Result<_, _>>()?;
            let mut result = Table::new(columns.clone());
            for row in source.rows() {
                result
                    .push_row(indices.iter().map(|&i| row[i].clone()).collect())
                    .expect("selected columns");
            }
            workspace.add(output.as_deref().unwrap_or(table), result);
        }
        TransformOp::Rename {
            table,
            columns,
            output,
        } => {
            let source = workspace.get(table)?;
            // Validate old names before building anything.
            for old in columns.keys() {
                source.column_index(old)?;
            }
            let renamed: Vec<String> = source
                .columns()
                .iter()
                .map(|c| columns.get(c).cloned().unwrap_or_else(|| c.clone()))
                .collect();
            let mut result = Table::new(renamed);
            for row in source.rows() {
                result.push_row(row.clone()).expect("same arity");
            }
            workspace.add(output.as_deref().unwrap_or(table), result);
        }
        TransformOp::Summarize {
            table,
            column,
            agg,
            output,
        } => {
            let source = workspace.get(table)?;
            let idx = source.column_index(column)?;
            let mut values = Vec::with_capacity(source.len());
            for row in source.rows() {
                match row[idx].as_f64() {
                    Some(v) => values.push(v),
                    None if row[idx] == Value::Null => {}
                    None => return Err(TransformError::NonNumericSummary(column.clone())),
                }
            }
            let reduced = match agg {
                AggFn::Sum => values.iter().sum::<f64>(),
                AggFn::Mean => {
                    if values.is_empty() {
                        0.0
                    } else {
                        values.iter().sum::<f64>() / values.len() as f64
                    }
                }
            };
            let mut result = Table::new(vec![column.clone()]);
            result
                .push_row(vec![Value::Float(reduced)])
                .expect("single column");
            workspace.add(output.clone(), result);
        }
    }
    Ok(())
}

/// Replace or append a column.
fn set_column(table: Table, name: &str, values: Vec<Value>) -> Table {
    match table.column_index(name) {
        Ok(idx) => {
            let mut result = Table::new(table.columns().to_vec());
            for (row, value) in table.rows().iter().zip(values) {
                let mut row = row.clone();
                row[idx] = value;
                result.push_row(row).expect("same arity");
            }
            result
        }
        Err(_) => {
            let mut columns = table.columns().to_vec();
            columns.push(name.to_string());
            let mut result = Table::new(columns);
            for (row, value) in table.rows().iter().zip(values) {
                let mut row = row.clone();
                row.push(value);
                result.push_row(row).expect("arity grown with column");
            }
            result
        }
    }
}

fn join(
    left: &Table,
    right: &Table,
    on: &str,
    suffixes: &Option<(String, String)>,
) -> Result<Table, TransformError> {
    let left_key = left.column_index(on).map_err(|_| TransformError::MissingJoinKey {
        key: on.to_string(),
        table: "left".to_string(),
    })?;
    let right_key = right
        .column_index(on)
        .map_err(|_| TransformError::MissingJoinKey {
            key: on.to_string(),
            table: "right".to_string(),
        })?;

    let (lsuf, rsuf) = suffixes
        .clone()
        .unwrap_or_else(|| ("_x".to_string(), "_y".to_string()));

    // Output columns: key, left non-key, right non-key; clashes suffixed.
    let mut columns = vec![on.to_string()];
    for (i, c) in left.columns().iter().enumerate() {
        if i == left_key {
            continue;
        }
        if right.columns().contains(c) {
            columns.push(format!("{}{}", c, lsuf));
        } else {
            columns.push(c.clone());
        }
    }
    for (i, c) in right.columns().iter().enumerate() {
        if i == right_key {
            continue;
        }
        if left.columns().contains(c) {
            columns.push(format!("{}{}", c, rsuf));
        } else {
            columns.push(c.clone());
        }
    }

    let mut result = Table::new(columns);
    for lrow in left.rows() {
        for rrow in right.rows() {
            if lrow[left_key] != rrow[right_key] {
                continue;
            }
            let mut out = vec![lrow[left_key].clone()];
            out.extend(
                lrow.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != left_key)
                    .map(|(_, v)| v.clone()),
            );
            out.extend(
                rrow.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != right_key)
                    .map(|(_, v)| v.clone()),
            );
            result.push_row(out).expect("columns built alongside rows");
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Workspace {
        let mut rev = Table::new(vec!["client_id".into(), "revenues".into()]);
        rev.push_row(vec![Value::Str("cl_id_citadel".into()), Value::Int(100)])
            .unwrap();
        rev.push_row(vec![Value::Str("cl_id_millennium".into()), Value::Int(300)])
            .unwrap();

        let mut bal = Table::new(vec!["client_id".into(), "balances".into()]);
        bal.push_row(vec![Value::Str("cl_id_citadel".into()), Value::Float(400.0)])
            .unwrap();
        bal.push_row(vec![
            Value::Str("cl_id_millennium".into()),
            Value::Float(600.0),
        ])
        .unwrap();

        let mut ws = Workspace::new();
        ws.add("rev", rev);
        ws.add("bal", bal);
        ws
    }

    #[test]
    fn test_join_then_derive_ratio() {
        let mut ws = workspace();
        apply(
            &mut ws,
            &[
                TransformOp::Join {
                    left: "rev".into(),
                    right: "bal".into(),
                    on: "client_id".into(),
                    suffixes: None,
                    output: "joined".into(),
                },
                TransformOp::Derive {
                    table: "joined".into(),
                    column: "rob".into(),
                    expr: "revenues / balances".into(),
                    output: None,
                },
            ],
        )
        .unwrap();

        let joined = ws.get("joined").unwrap();
        assert_eq!(joined.columns(), ["client_id", "revenues", "balances", "rob"]);
        let rob = joined.column_index("rob").unwrap();
        assert_eq!(joined.get(0, rob), Some(&Value::Float(0.25)));
        assert_eq!(joined.get(1, rob), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_join_suffixes_clashing_columns() {
        let mut ws = workspace();
        // Join rev with itself: the revenues columns clash.
        let rev = ws.get("rev").unwrap().clone();
        ws.add("rev_prior", rev);
        apply(
            &mut ws,
            &[TransformOp::Join {
                left: "rev".into(),
                right: "rev_prior".into(),
                on: "client_id".into(),
                suffixes: Some(("_2024".into(), "_2023".into())),
                output: "both".into(),
            }],
        )
        .unwrap();
        let both = ws.get("both").unwrap();
        assert_eq!(
            both.columns(),
            ["client_id", "revenues_2024", "revenues_2023"]
        );
    }

    #[test]
    fn test_filter_sort_head_pipeline() {
        let mut ws = workspace();
        apply(
            &mut ws,
            &[
                TransformOp::Filter {
                    table: "rev".into(),
                    predicate: "revenues > 50".into(),
                    output: Some("big".into()),
                },
                TransformOp::Sort {
                    table: "big".into(),
                    by: "revenues".into(),
                    descending: true,
                    output: None,
                },
                TransformOp::Head {
                    table: "big".into(),
                    n: 1,
                    output: Some("top".into()),
                },
            ],
        )
        .unwrap();
        let top = ws.get("top").unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top.get(0, 1), Some(&Value::Int(300)));
        // Source table untouched when output is named.
        assert_eq!(ws.get("rev").unwrap().len(), 2);
    }

    #[test]
    fn test_derive_overwrites_in_place_without_output() {
        let mut ws = workspace();
        apply(
            &mut ws,
            &[TransformOp::Derive {
                table: "rev".into(),
                column: "revenues".into(),
                expr: "revenues * 2".into(),
                output: None,
            }],
        )
        .unwrap();
        assert_eq!(ws.get("rev").unwrap().get(0, 1), Some(&Value::Float(200.0)));
    }

    #[test]
    fn test_summarize_sum() {
        let mut ws = workspace();
        apply(
            &mut ws,
            &[TransformOp::Summarize {
                table: "rev".into(),
                column: "revenues".into(),
                agg: AggFn::Sum,
                output: "total".into(),
            }],
        )
        .unwrap();
        assert_eq!(ws.get("total").unwrap().get(0, 0), Some(&Value::Float(400.0)));
    }

    #[test]
    fn test_rename_and_select() {
        let mut ws = workspace();
        let mut mapping = BTreeMap::new();
        mapping.insert("revenues".to_string(), "Revenue".to_string());
        apply(
            &mut ws,
            &[
                TransformOp::Rename {
                    table: "rev".into(),
                    columns: mapping,
                    output: None,
                },
                TransformOp::Select {
                    table: "rev".into(),
                    columns: vec!["Revenue".into()],
                    output: None,
                },
            ],
        )
        .unwrap();
        assert_eq!(ws.get("rev").unwrap().columns(), ["Revenue"]);
    }

    #[test]
    fn test_missing_table_fails_with_names() {
        let mut ws = workspace();
        let err = apply(
            &mut ws,
            &[TransformOp::Head {
                table: "nope".into(),
                n: 1,
                output: None,
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(err.to_string().contains("rev"));
    }

    #[test]
    fn test_unknown_derive_column_fails() {
        let mut ws = workspace();
        let err = apply(
            &mut ws,
            &[TransformOp::Derive {
                table: "rev".into(),
                column: "x".into(),
                expr: "missing * 2".into(),
                output: None,
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_ops_roundtrip_serde() {
        let ops = vec![TransformOp::Derive {
            table: "t".into(),
            column: "c".into(),
            expr: "a + b".into(),
            output: None,
        }];
        let json = serde_json::to_string(&ops).unwrap();
        assert!(json.contains("\"op\":\"derive\""));
        let back: Vec<TransformOp> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ops);
    }
}

//! Row-wise expression grammar for transform steps
//!
//! A deliberately small language: numeric literals, column references
//! (bare identifiers, or double-quoted for names with spaces or dots),
//! arithmetic with the usual precedence, parentheses, unary minus, and
//! comparisons. Evaluated per row against numeric columns. This replaces
//! the original system's arbitrary code execution with something that can
//! never escape the workspace.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt, recognize},
    number::complete::double,
    sequence::{delimited, pair, preceded},
    IResult,
};
use thiserror::Error;

use crate::table::{Table, Value};

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Column(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("could not parse expression '{0}'")]
    Parse(String),

    #[error("column '{0}' not found while evaluating expression")]
    UnknownColumn(String),

    #[error("column '{0}' is not numeric in row {1}")]
    NotNumeric(String, usize),

    #[error("division by zero while evaluating expression")]
    DivisionByZero,

    #[error("expression yields a boolean where a number is needed")]
    BooleanValue,

    #[error("expression yields a number where a boolean is needed")]
    NumericValue,
}

/// Result of evaluating an expression for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluated {
    Number(f64),
    Bool(bool),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        opt(take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')),
    ))(input)
}

fn quoted_column(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), is_not("\""), char('"'))(input)
}

fn atom(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        map(quoted_column, |s: &str| Expr::Column(s.to_string())),
        map(identifier, |s: &str| Expr::Column(s.to_string())),
        map(double, Expr::Number),
        delimited(char('('), comparison, char(')')),
        map(preceded(char('-'), atom), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
    )))(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut acc) = atom(input)?;
    loop {
        let op = alt((
            map(ws(char('*')), |_| BinaryOp::Mul),
            map(ws(char('/')), |_| BinaryOp::Div),
        ))(input);
        match op {
            Ok((rest, op)) => {
                let (rest, rhs) = atom(rest)?;
                acc = Expr::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(_) => return Ok((input, acc)),
        }
    }
}

fn additive(input: &str) -> IResult<&str, Expr> {
    let (mut input, mut acc) = term(input)?;
    loop {
        let op = alt((
            map(ws(char('+')), |_| BinaryOp::Add),
            map(ws(char('-')), |_| BinaryOp::Sub),
        ))(input);
        match op {
            Ok((rest, op)) => {
                let (rest, rhs) = term(rest)?;
                acc = Expr::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(_) => return Ok((input, acc)),
        }
    }
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, lhs) = additive(input)?;
    let op = alt((
        map(ws(tag(">=")), |_| BinaryOp::Ge),
        map(ws(tag("<=")), |_| BinaryOp::Le),
        map(ws(tag("==")), |_| BinaryOp::Eq),
        map(ws(tag("!=")), |_| BinaryOp::Ne),
        map(ws(tag(">")), |_| BinaryOp::Gt),
        map(ws(tag("<")), |_| BinaryOp::Lt),
    ))(input);
    match op {
        Ok((rest, op)) => {
            let (rest, rhs) = additive(rest)?;
            Ok((rest, Expr::Binary(op, Box::new(lhs), Box::new(rhs))))
        }
        Err(_) => Ok((input, lhs)),
    }
}

impl Expr {
    /// Parse a complete expression string.
    pub fn parse(input: &str) -> Result<Expr, ExprError> {
        all_consuming(ws(comparison))(input)
            .map(|(_, e)| e)
            .map_err(|_| ExprError::Parse(input.to_string()))
    }

    /// Evaluate against one row of a table.
    pub fn eval(&self, table: &Table, row: usize) -> Result<Evaluated, ExprError> {
        match self {
            Expr::Number(n) => Ok(Evaluated::Number(*n)),
            Expr::Column(name) => {
                let idx = table
                    .column_index(name)
                    .map_err(|_| ExprError::UnknownColumn(name.clone()))?;
                match table.get(row, idx) {
                    Some(v) => v
                        .as_f64()
                        .map(Evaluated::Number)
                        .ok_or_else(|| ExprError::NotNumeric(name.clone(), row)),
                    None => Err(ExprError::NotNumeric(name.clone(), row)),
                }
            }
            Expr::Unary(UnaryOp::Neg, inner) => match inner.eval(table, row)? {
                Evaluated::Number(n) => Ok(Evaluated::Number(-n)),
                Evaluated::Bool(_) => Err(ExprError::BooleanValue),
            },
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.eval(table, row)?.number()?;
                let r = rhs.eval(table, row)?.number()?;
                Ok(match op {
                    BinaryOp::Add => Evaluated::Number(l + r),
                    BinaryOp::Sub => Evaluated::Number(l - r),
                    BinaryOp::Mul => Evaluated::Number(l * r),
                    BinaryOp::Div => {
                        if r == 0.0 {
                            return Err(ExprError::DivisionByZero);
                        }
                        Evaluated::Number(l / r)
                    }
                    BinaryOp::Gt => Evaluated::Bool(l > r),
                    BinaryOp::Lt => Evaluated::Bool(l < r),
                    BinaryOp::Ge => Evaluated::Bool(l >= r),
                    BinaryOp::Le => Evaluated::Bool(l <= r),
                    BinaryOp::Eq => Evaluated::Bool(l == r),
                    BinaryOp::Ne => Evaluated::Bool(l != r),
                })
            }
        }
    }

    /// Evaluate as a numeric column value.
    pub fn eval_number(&self, table: &Table, row: usize) -> Result<f64, ExprError> {
        self.eval(table, row)?.number()
    }

    /// Evaluate as a predicate.
    pub fn eval_bool(&self, table: &Table, row: usize) -> Result<bool, ExprError> {
        match self.eval(table, row)? {
            Evaluated::Bool(b) => Ok(b),
            Evaluated::Number(_) => Err(ExprError::NumericValue),
        }
    }
}

impl Evaluated {
    fn number(self) -> Result<f64, ExprError> {
        match self {
            Evaluated::Number(n) => Ok(n),
            Evaluated::Bool(_) => Err(ExprError::BooleanValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut t = Table::new(vec![
            "revenues".into(),
            "balances".into(),
            "Balance.Delta.Total".into(),
        ]);
        t.push_row(vec![Value::Int(100), Value::Float(400.0), Value::Float(25.0)])
            .unwrap();
        t
    }

    #[test]
    fn test_parse_precedence() {
        let e = Expr::parse("1 + 2 * 3").unwrap();
        assert_eq!(
            e,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0)),
                )),
            )
        );
    }

    #[test]
    fn test_ratio_of_columns() {
        let e = Expr::parse("revenues / balances").unwrap();
        assert_eq!(e.eval_number(&table(), 0).unwrap(), 0.25);
    }

    #[test]
    fn test_quoted_column_with_dots() {
        let e = Expr::parse("\"Balance.Delta.Total\" * 2").unwrap();
        assert_eq!(e.eval_number(&table(), 0).unwrap(), 50.0);
    }

    #[test]
    fn test_parens_and_unary() {
        let e = Expr::parse("-(revenues - 50) / 2").unwrap();
        assert_eq!(e.eval_number(&table(), 0).unwrap(), -25.0);
    }

    #[test]
    fn test_comparison_predicate() {
        let e = Expr::parse("revenues > 50").unwrap();
        assert!(e.eval_bool(&table(), 0).unwrap());
        let e = Expr::parse("balances <= 100").unwrap();
        assert!(!e.eval_bool(&table(), 0).unwrap());
    }

    #[test]
    fn test_unknown_column_is_named() {
        let e = Expr::parse("missing + 1").unwrap();
        let err = e.eval_number(&table(), 0).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_division_by_zero() {
        let e = Expr::parse("revenues / 0").unwrap();
        assert!(matches!(
            e.eval_number(&table(), 0),
            Err(ExprError::DivisionByZero)
        ));
    }

    #[test]
    fn test_garbage_fails_to_parse() {
        assert!(Expr::parse("revenues +* 2").is_err());
        assert!(Expr::parse("").is_err());
    }

    #[test]
    fn test_number_where_bool_needed() {
        let e = Expr::parse("revenues + 1").unwrap();
        assert!(matches!(e.eval_bool(&table(), 0), Err(ExprError::NumericValue)));
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Rewriting engine filter expressions into Oracle SQL fragments

use chrono::{DateTime, NaiveDate, TimeDelta};
use datafusion::common::ScalarValue;
use datafusion::logical_expr::{expr::Like, BinaryExpr, Expr, Operator};
use oracle_client::util::quote_identifier;
use oracle_client::OracleColumnInfo;

use crate::sql::ScanBindData;

/// Render a filter expression as a parenthesized Oracle SQL fragment.
///
/// `None` means "not pushable": the expression stays in the engine.
/// Only a closed set of shapes is rewritten — column references against
/// the table's column list, a handful of literal types, the six ordering
/// comparisons, AND/OR conjunctions whose children all push, and
/// IS NULL / IS NOT NULL / LIKE. Everything else is left alone, which is
/// always safe: pushed filters only further restrict Oracle's result and
/// the engine re-applies whatever stays behind.
pub fn expr_to_sql(expr: &Expr, columns: &[OracleColumnInfo]) -> Option<String> {
    match expr {
        Expr::Column(col) => {
            if columns.iter().any(|c| c.name == col.name) {
                Some(quote_identifier(&col.name))
            } else {
                None
            }
        }
        Expr::Literal(value) => scalar_to_sql(value),
        Expr::BinaryExpr(BinaryExpr { left, op, right }) => match op {
            Operator::And | Operator::Or => {
                let lhs = expr_to_sql(left, columns)?;
                let rhs = expr_to_sql(right, columns)?;
                let word = if matches!(op, Operator::And) { "AND" } else { "OR" };
                Some(format!("({lhs} {word} {rhs})"))
            }
            _ => {
                let symbol = comparison_symbol(op)?;
                let lhs = expr_to_sql(left, columns)?;
                let rhs = expr_to_sql(right, columns)?;
                Some(format!("({lhs} {symbol} {rhs})"))
            }
        },
        Expr::IsNull(inner) => Some(format!("({} IS NULL)", expr_to_sql(inner, columns)?)),
        Expr::IsNotNull(inner) => {
            Some(format!("({} IS NOT NULL)", expr_to_sql(inner, columns)?))
        }
        Expr::Like(like) => like_to_sql(like, columns),
        _ => None,
    }
}

fn like_to_sql(like: &Like, columns: &[OracleColumnInfo]) -> Option<String> {
    if like.negated || like.case_insensitive || like.escape_char.is_some() {
        return None;
    }
    let lhs = expr_to_sql(&like.expr, columns)?;
    let pattern = expr_to_sql(&like.pattern, columns)?;
    Some(format!("({lhs} LIKE {pattern})"))
}

fn comparison_symbol(op: &Operator) -> Option<&'static str> {
    match op {
        Operator::Eq => Some("="),
        Operator::NotEq => Some("<>"),
        Operator::Lt => Some("<"),
        Operator::LtEq => Some("<="),
        Operator::Gt => Some(">"),
        Operator::GtEq => Some(">="),
        _ => None,
    }
}

/// Render a literal the way Oracle expects it in a WHERE clause.
fn scalar_to_sql(value: &ScalarValue) -> Option<String> {
    if value.is_null() {
        return Some("NULL".to_string());
    }
    match value {
        ScalarValue::Boolean(Some(b)) => Some(if *b { "1" } else { "0" }.to_string()),
        ScalarValue::Int8(Some(v)) => Some(v.to_string()),
        ScalarValue::Int16(Some(v)) => Some(v.to_string()),
        ScalarValue::Int32(Some(v)) => Some(v.to_string()),
        ScalarValue::Int64(Some(v)) => Some(v.to_string()),
        ScalarValue::UInt8(Some(v)) => Some(v.to_string()),
        ScalarValue::UInt16(Some(v)) => Some(v.to_string()),
        ScalarValue::UInt32(Some(v)) => Some(v.to_string()),
        ScalarValue::UInt64(Some(v)) => Some(v.to_string()),
        ScalarValue::Float32(Some(v)) => Some(v.to_string()),
        ScalarValue::Float64(Some(v)) => Some(v.to_string()),
        ScalarValue::Utf8(Some(s)) | ScalarValue::LargeUtf8(Some(s)) => {
            Some(format!("'{}'", s.replace('\'', "''")))
        }
        ScalarValue::Date32(Some(days)) => {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1)?
                .checked_add_signed(TimeDelta::days(i64::from(*days)))?;
            Some(format!("DATE '{}'", date.format("%Y-%m-%d")))
        }
        ScalarValue::TimestampMicrosecond(Some(micros), _) => {
            // Sub-second precision is dropped from the literal.
            let datetime = DateTime::from_timestamp(micros.div_euclid(1_000_000), 0)?;
            Some(format!("TIMESTAMP '{}'", datetime.format("%Y-%m-%d %H:%M:%S")))
        }
        _ => None,
    }
}

/// Partition `filters` into pushed-down fragments and a residual list.
///
/// Every filter that renders is appended to `bind.filters`; the rest are
/// returned for the engine to evaluate. The row set the caller observes
/// is the same either way.
pub fn pushdown_filters(bind: &mut ScanBindData, filters: &[Expr]) -> Vec<Expr> {
    let mut residual = Vec::new();
    for filter in filters {
        match expr_to_sql(filter, &bind.columns) {
            Some(fragment) => bind.filters.push(fragment),
            None => residual.push(filter.clone()),
        }
    }
    residual
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::common::Column;
    use datafusion::logical_expr::lit;
    use oracle_client::{ConnectionParameters, OracleConnectionPool};
    use std::sync::Arc;

    fn columns() -> Vec<OracleColumnInfo> {
        vec![
            OracleColumnInfo {
                name: "EMP_ID".to_string(),
                oracle_type_name: "NUMBER".to_string(),
                precision: 9,
                scale: 0,
                char_length: 0,
                nullable: false,
            },
            OracleColumnInfo {
                name: "NAME".to_string(),
                oracle_type_name: "VARCHAR2".to_string(),
                precision: 0,
                scale: -127,
                char_length: 50,
                nullable: true,
            },
        ]
    }

    fn column(name: &str) -> Expr {
        Expr::Column(Column::new_unqualified(name))
    }

    #[test]
    fn test_equality_and_like_push_down() {
        let cols = columns();
        let eq = column("EMP_ID").eq(lit(42i32));
        assert_eq!(expr_to_sql(&eq, &cols).as_deref(), Some("(\"EMP_ID\" = 42)"));

        let like = column("NAME").like(lit("A%"));
        assert_eq!(
            expr_to_sql(&like, &cols).as_deref(),
            Some("(\"NAME\" LIKE 'A%')")
        );
    }

    #[test]
    fn test_all_comparison_operators() {
        let cols = columns();
        for (expr, symbol) in [
            (column("EMP_ID").not_eq(lit(1i32)), "<>"),
            (column("EMP_ID").lt(lit(1i32)), "<"),
            (column("EMP_ID").lt_eq(lit(1i32)), "<="),
            (column("EMP_ID").gt(lit(1i32)), ">"),
            (column("EMP_ID").gt_eq(lit(1i32)), ">="),
        ] {
            let sql = expr_to_sql(&expr, &cols).unwrap();
            assert_eq!(sql, format!("(\"EMP_ID\" {symbol} 1)"));
        }
    }

    #[test]
    fn test_conjunction_requires_all_children_pushable() {
        let cols = columns();
        let both = column("EMP_ID").eq(lit(1i32)).and(column("NAME").eq(lit("x")));
        assert_eq!(
            expr_to_sql(&both, &cols).as_deref(),
            Some("((\"EMP_ID\" = 1) AND (\"NAME\" = 'x'))")
        );

        let or = column("EMP_ID").eq(lit(1i32)).or(column("NAME").is_null());
        assert_eq!(
            expr_to_sql(&or, &cols).as_deref(),
            Some("((\"EMP_ID\" = 1) OR (\"NAME\" IS NULL))")
        );

        // One unpushable child poisons the whole conjunction.
        let poisoned = column("EMP_ID")
            .eq(lit(1i32))
            .and(Expr::Not(Box::new(column("NAME").eq(lit("x")))));
        assert_eq!(expr_to_sql(&poisoned, &cols), None);
    }

    #[test]
    fn test_unknown_column_is_not_pushable() {
        let cols = columns();
        let expr = column("MISSING").eq(lit(1i32));
        assert_eq!(expr_to_sql(&expr, &cols), None);
    }

    #[test]
    fn test_null_tests() {
        let cols = columns();
        assert_eq!(
            expr_to_sql(&column("NAME").is_null(), &cols).as_deref(),
            Some("(\"NAME\" IS NULL)")
        );
        assert_eq!(
            expr_to_sql(&column("NAME").is_not_null(), &cols).as_deref(),
            Some("(\"NAME\" IS NOT NULL)")
        );
    }

    #[test]
    fn test_negated_like_is_not_pushable() {
        let cols = columns();
        let negated = column("NAME").not_like(lit("A%"));
        assert_eq!(expr_to_sql(&negated, &cols), None);
        let ilike = column("NAME").ilike(lit("A%"));
        assert_eq!(expr_to_sql(&ilike, &cols), None);
    }

    #[test]
    fn test_literal_rendering() {
        let cols = columns();
        let quoted = column("NAME").eq(lit("O'Brien"));
        assert_eq!(
            expr_to_sql(&quoted, &cols).as_deref(),
            Some("(\"NAME\" = 'O''Brien')")
        );

        assert_eq!(scalar_to_sql(&ScalarValue::Boolean(Some(true))).as_deref(), Some("1"));
        assert_eq!(scalar_to_sql(&ScalarValue::Boolean(Some(false))).as_deref(), Some("0"));
        assert_eq!(scalar_to_sql(&ScalarValue::Utf8(None)).as_deref(), Some("NULL"));
        assert_eq!(scalar_to_sql(&ScalarValue::Null).as_deref(), Some("NULL"));

        // 2024-01-01 is 19723 days after the epoch.
        assert_eq!(
            scalar_to_sql(&ScalarValue::Date32(Some(19_723))).as_deref(),
            Some("DATE '2024-01-01'")
        );
        // Sub-second precision is dropped.
        assert_eq!(
            scalar_to_sql(&ScalarValue::TimestampMicrosecond(
                Some(1_704_067_200_500_000),
                None
            ))
            .as_deref(),
            Some("TIMESTAMP '2024-01-01 00:00:00'")
        );

        // Unsupported literal types are not pushable.
        assert_eq!(scalar_to_sql(&ScalarValue::Binary(Some(vec![1, 2]))), None);
    }

    #[test]
    fn test_pushdown_partitions_filters() {
        let pool = Arc::new(OracleConnectionPool::new(
            ConnectionParameters::default(),
            8,
        ));
        let mut bind = ScanBindData::new(pool, "HR", "EMPLOYEES", columns(), 12, 10_000);

        let pushable = column("EMP_ID").eq(lit(42i32));
        let not_pushable = Expr::Not(Box::new(column("NAME").eq(lit("x"))));
        let residual = pushdown_filters(&mut bind, &[pushable, not_pushable.clone()]);

        assert_eq!(bind.filters, vec!["(\"EMP_ID\" = 42)".to_string()]);
        assert_eq!(residual, vec![not_pushable]);
        assert!(
            bind.build_select_query()
                .contains("WHERE (\"EMP_ID\" = 42)")
        );
    }
}

// fhir2omop-core/src/domain/mapping/sql_values.rs

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use sqlparser::ast::{Expr, SetExpr, Statement, UnaryOperator, Value as SqlLiteral};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Column names (possibly empty) and the first row of literals of an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertValues {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

fn re_insert_into() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\binsert\s+into\b").unwrap_or_else(|e| unreachable!("invalid pattern: {e}"))
    })
}

/// Finds the first parseable `INSERT INTO ... VALUES (...)` in free text and
/// returns its first row.
///
/// Every `INSERT INTO` occurrence is tried in order, so prose mentioning the
/// keyword does not hide a later statement. Prose after the statement is
/// tolerated: the text is cut at each `;` in turn until the parser accepts it.
pub fn parse_insert_values(text: &str) -> Option<InsertValues> {
    re_insert_into()
        .find_iter(text)
        .find_map(|m| parse_from(&text[m.start()..]))
}

fn parse_from(sql: &str) -> Option<InsertValues> {
    let mut candidates: Vec<&str> = vec![sql];
    candidates.extend(sql.match_indices(';').map(|(i, _)| &sql[..=i]));

    candidates.into_iter().find_map(|candidate| {
        let statements = Parser::parse_sql(&GenericDialect {}, candidate).ok()?;
        statements.into_iter().find_map(|stmt| first_row(&stmt))
    })
}

fn first_row(stmt: &Statement) -> Option<InsertValues> {
    let Statement::Insert(insert) = stmt else {
        return None;
    };
    let source = insert.source.as_ref()?;
    let SetExpr::Values(values) = source.body.as_ref() else {
        return None;
    };
    let row = values.rows.first()?;

    Some(InsertValues {
        columns: insert.columns.iter().map(|c| c.value.clone()).collect(),
        values: row.iter().map(literal).collect(),
    })
}

/// Literal expression as JSON. Anything that is not a plain literal is kept as text.
fn literal(expr: &Expr) -> Value {
    match expr {
        Expr::Value(v) => match &v.value {
            SqlLiteral::Null => Value::Null,
            SqlLiteral::Boolean(b) => Value::Bool(*b),
            SqlLiteral::Number(n, _) => {
                serde_json::from_str::<Value>(n).unwrap_or_else(|_| Value::String(n.clone()))
            }
            SqlLiteral::SingleQuotedString(s) | SqlLiteral::DoubleQuotedString(s) => {
                Value::String(s.clone())
            }
            other => Value::String(other.to_string()),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match literal(inner) {
            Value::Number(n) => n
                .as_i64()
                .map(|i| Value::from(-i))
                .or_else(|| n.as_f64().map(|f| Value::from(-f)))
                .unwrap_or(Value::Null),
            other => other,
        },
        Expr::Nested(inner) => literal(inner),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_with_column_list() {
        let parsed = parse_insert_values(
            "INSERT INTO person (person_id, year_of_birth) VALUES (5, 1990);",
        )
        .unwrap();
        assert_eq!(parsed.columns, vec!["person_id", "year_of_birth"]);
        assert_eq!(parsed.values, vec![json!(5), json!(1990)]);
    }

    #[test]
    fn test_negative_and_escaped_literals() {
        let parsed =
            parse_insert_values("insert into observation values (1, 2, 3, 'O''Brien', -4.5, NULL)")
                .unwrap();
        assert!(parsed.columns.is_empty());
        assert_eq!(parsed.values[3], json!("O'Brien"));
        assert_eq!(parsed.values[4], json!(-4.5));
        assert_eq!(parsed.values[5], Value::Null);
    }

    #[test]
    fn test_trailing_prose_and_semicolons_in_strings() {
        let parsed = parse_insert_values(
            "Result:\nINSERT INTO visit_occurrence VALUES (1, 2, NULL, 'a;b'); This row maps the encounter.",
        )
        .unwrap();
        assert_eq!(parsed.values[3], json!("a;b"));
    }

    #[test]
    fn test_statement_after_prose_mentioning_insert() {
        let parsed = parse_insert_values(
            "Sure, I will insert the record as follows:\nINSERT INTO person VALUES (1, NULL, 1980, 1, 1, NULL, NULL);",
        )
        .unwrap();
        assert_eq!(parsed.values[0], json!(1));
        assert_eq!(parsed.values[2], json!(1980));

        // A broken first statement does not hide a later valid one
        let parsed = parse_insert_values(
            "INSERT INTO person VALUES (oops\nCorrected: insert into person (person_id) values (7);",
        )
        .unwrap();
        assert_eq!(parsed.columns, vec!["person_id"]);
        assert_eq!(parsed.values, vec![json!(7)]);
    }

    #[test]
    fn test_no_insert() {
        assert!(parse_insert_values("SELECT 1").is_none());
        assert!(parse_insert_values("insert coin to continue").is_none());
    }
}

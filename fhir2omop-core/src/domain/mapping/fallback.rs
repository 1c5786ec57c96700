// fhir2omop-core/src/domain/mapping/fallback.rs

// Contract with the text-generation service when the direct rules give up:
// the model answers with one JSON object keyed by column name, and every value
// is checked against the declared column type before it reaches a row.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::error::DomainError;
use crate::domain::mapping::direct::MappedRow;
use crate::domain::mapping::sql_values::{InsertValues, parse_insert_values};
use crate::domain::omop::{ColumnDef, OmopTable, SqlType, SqlValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Json,
    /// Older models answer with an `INSERT ... VALUES` statement.
    LegacySql,
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackMapping {
    pub row: MappedRow,
    /// Keys or values that could not be used, one message each.
    pub rejected: Vec<String>,
    pub format: ResponseFormat,
}

pub fn build_fallback_prompt(resource: &Value, table: OmopTable) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|c| format!("- {} ({})", c.name, type_hint(c.sql_type)))
        .collect();
    let resource_json =
        serde_json::to_string_pretty(resource).unwrap_or_else(|_| resource.to_string());

    format!(
        "You are a biomedical data engineer. Map the following FHIR resource to a row of the OMOP CDM v5.3 table `{table}`.\n\
         Answer with ONE JSON object and nothing else. Its keys must be exactly these columns:\n\
         {columns}\n\
         Use null for any value that is missing or unknown. Dates are ISO-8601 strings.\n\n\
         FHIR resource:\n{resource_json}\n",
        table = table.name(),
        columns = columns.join("\n"),
        resource_json = resource_json,
    )
}

fn type_hint(sql_type: SqlType) -> &'static str {
    match sql_type {
        SqlType::Integer => "integer",
        SqlType::Real => "number",
        SqlType::Text => "string",
    }
}

/// Turns a model answer into a row of `table`.
pub fn parse_fallback_response(
    response: &str,
    table: OmopTable,
) -> Result<FallbackMapping, DomainError> {
    if let Some(object) = extract_json_object(response) {
        return Ok(from_json_object(&object, table));
    }

    if let Some(insert) = parse_insert_values(response) {
        return Ok(from_sql_insert(insert, table));
    }

    Err(DomainError::FallbackUnparseable {
        table: table.name().to_string(),
        response: response.to_string(),
    })
}

/// A JSON object, bare or inside a fenced block. Surrounding prose is ignored.
fn extract_json_object(response: &str) -> Option<Map<String, Value>> {
    let fenced = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
    } else if response.contains("```") {
        response.split("```").nth(1)
    } else {
        None
    };

    let candidate = fenced.unwrap_or(response).trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
        return Some(map);
    }

    // Outermost braces of the raw text
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&response[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn from_json_object(object: &Map<String, Value>, table: OmopTable) -> FallbackMapping {
    let mut rejected = Vec::new();

    for key in object.keys() {
        if !table.columns().iter().any(|c| c.name == key.as_str()) {
            rejected.push(format!("unknown column '{}'", key));
        }
    }

    let values = table
        .columns()
        .iter()
        .map(|col| match object.get(col.name) {
            None => SqlValue::Null,
            Some(v) => coerce_or_reject(col, v, &mut rejected),
        })
        .collect();

    FallbackMapping {
        row: MappedRow::new(table, values),
        rejected,
        format: ResponseFormat::Json,
    }
}

fn from_sql_insert(insert: InsertValues, table: OmopTable) -> FallbackMapping {
    let mut rejected = Vec::new();

    let values = if insert.columns.is_empty() {
        // Positional: MappedRow::new pads or truncates to the declared arity.
        if insert.values.len() > table.arity() {
            rejected.push(format!(
                "{} extra value(s) dropped",
                insert.values.len() - table.arity()
            ));
        }
        table
            .columns()
            .iter()
            .zip(insert.values.iter())
            .map(|(col, v)| coerce_or_reject(col, v, &mut rejected))
            .collect()
    } else {
        for name in &insert.columns {
            if !table.columns().iter().any(|c| c.name.eq_ignore_ascii_case(name)) {
                rejected.push(format!("unknown column '{}'", name));
            }
        }
        table
            .columns()
            .iter()
            .map(|col| {
                insert
                    .columns
                    .iter()
                    .position(|n| n.eq_ignore_ascii_case(col.name))
                    .and_then(|i| insert.values.get(i))
                    .map(|v| coerce_or_reject(col, v, &mut rejected))
                    .unwrap_or(SqlValue::Null)
            })
            .collect()
    };

    FallbackMapping {
        row: MappedRow::new(table, values),
        rejected,
        format: ResponseFormat::LegacySql,
    }
}

fn coerce_or_reject(col: &ColumnDef, value: &Value, rejected: &mut Vec<String>) -> SqlValue {
    match coerce(col.sql_type, value) {
        Some(v) => v,
        None => {
            rejected.push(format!(
                "{}: {} is not a valid {}",
                col.name,
                value,
                type_hint(col.sql_type)
            ));
            SqlValue::Null
        }
    }
}

/// `None` when the value cannot be stored in a column of that type.
pub fn coerce(sql_type: SqlType, value: &Value) -> Option<SqlValue> {
    if value.is_null() {
        return Some(SqlValue::Null);
    }
    if let Value::String(s) = value {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("null") {
            return Some(SqlValue::Null);
        }
    }

    match sql_type {
        SqlType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(SqlValue::Integer),
            Value::String(s) => s.trim().parse::<i64>().ok().map(SqlValue::Integer),
            _ => None,
        },
        SqlType::Real => match value {
            Value::Number(n) => n.as_f64().map(SqlValue::Real),
            Value::String(s) => s.trim().parse::<f64>().ok().map(SqlValue::Real),
            _ => None,
        },
        SqlType::Text => match value {
            Value::String(s) => Some(SqlValue::Text(s.clone())),
            Value::Number(n) => Some(SqlValue::Text(n.to_string())),
            Value::Bool(b) => Some(SqlValue::Text(b.to_string())),
            _ => None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_lists_every_column() {
        let prompt = build_fallback_prompt(&json!({"resourceType": "Observation"}), OmopTable::Observation);
        for col in OmopTable::Observation.column_names() {
            assert!(prompt.contains(col), "missing {}", col);
        }
        assert!(prompt.contains("\"resourceType\": \"Observation\""));
    }

    #[test]
    fn test_json_response_with_coercion() {
        let response = r#"Here you go:
```json
{"observation_id": "10", "person_id": 123, "observation_concept_id": 3004249.0,
 "observation_date": "2020-01-01", "value_as_number": "120.5", "value_as_string": null,
 "unit": "mmHg"}
```"#;
        let mapping = parse_fallback_response(response, OmopTable::Observation).unwrap();
        assert_eq!(mapping.format, ResponseFormat::Json);
        assert_eq!(
            mapping.row.values,
            vec![
                SqlValue::Integer(10),
                SqlValue::Integer(123),
                SqlValue::Integer(3004249),
                SqlValue::Text("2020-01-01".into()),
                SqlValue::Real(120.5),
                SqlValue::Null,
            ]
        );
        assert_eq!(mapping.rejected, vec!["unknown column 'unit'".to_string()]);
    }

    #[test]
    fn test_uncoercible_value_is_rejected_and_nulled() {
        let mapping = parse_fallback_response(
            r#"{"person_id": "abc", "year_of_birth": 1980}"#,
            OmopTable::Person,
        )
        .unwrap();
        assert_eq!(mapping.row.values.len(), 7);
        assert_eq!(mapping.row.values[0], SqlValue::Null);
        assert_eq!(mapping.row.values[2], SqlValue::Integer(1980));
        assert_eq!(mapping.rejected.len(), 1);
        assert!(mapping.rejected[0].starts_with("person_id"));
    }

    #[test]
    fn test_legacy_sql_positional_is_padded() {
        let response = "INSERT INTO person VALUES (123, NULL, 1980, 1, 1);";
        let mapping = parse_fallback_response(response, OmopTable::Person).unwrap();
        assert_eq!(mapping.format, ResponseFormat::LegacySql);
        assert_eq!(mapping.row.values.len(), 7);
        assert_eq!(mapping.row.values[2], SqlValue::Integer(1980));
        assert!(mapping.row.values[6].is_null());
    }

    #[test]
    fn test_legacy_sql_after_prose_mentioning_insert() {
        let response = "Sure, I will insert the record as follows:\n\
            INSERT INTO person VALUES (1, NULL, 1980, 1, 1, NULL, NULL);";
        let mapping = parse_fallback_response(response, OmopTable::Person).unwrap();
        assert_eq!(mapping.format, ResponseFormat::LegacySql);
        assert_eq!(mapping.row.values[0], SqlValue::Integer(1));
        assert_eq!(mapping.row.values[3], SqlValue::Integer(1));
    }

    #[test]
    fn test_legacy_sql_keeps_commas_inside_literals() {
        let response = "Sure! INSERT INTO condition_occurrence \
            (condition_occurrence_id, person_id, condition_source_value) \
            VALUES (1, 2, 'Diabetes, type 2 (disorder)'); Hope that helps.";
        let mapping = parse_fallback_response(response, OmopTable::ConditionOccurrence).unwrap();
        assert_eq!(
            mapping.row.get("condition_source_value"),
            Some(&SqlValue::Text("Diabetes, type 2 (disorder)".into()))
        );
        assert_eq!(mapping.row.get("person_id"), Some(&SqlValue::Integer(2)));
        assert!(mapping.rejected.is_empty());
    }

    #[test]
    fn test_unparseable_response() {
        let err = parse_fallback_response("I cannot help with that.", OmopTable::Person).unwrap_err();
        assert!(matches!(err, DomainError::FallbackUnparseable { .. }));
    }
}

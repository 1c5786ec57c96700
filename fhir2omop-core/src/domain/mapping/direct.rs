// fhir2omop-core/src/domain/mapping/direct.rs

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::fhir::reference_id;
use crate::domain::omop::{OmopTable, SqlValue};

/// One target row, always of the table's declared arity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedRow {
    pub table: OmopTable,
    pub values: Vec<SqlValue>,
}

impl MappedRow {
    /// Builds a row, padding with nulls or truncating to the declared arity.
    pub fn new(table: OmopTable, mut values: Vec<SqlValue>) -> Self {
        values.resize(table.arity(), SqlValue::Null);
        Self { table, values }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.table
            .columns()
            .iter()
            .position(|c| c.name == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn primary_key(&self) -> &SqlValue {
        self.values
            .get(self.table.primary_key_index())
            .unwrap_or(&SqlValue::Null)
    }

    /// Single INSERT statement, used by dry runs.
    pub fn to_insert_sql(&self) -> String {
        let values: Vec<String> = self.values.iter().map(SqlValue::to_sql_literal).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.table.name(),
            self.table.column_names().join(", "),
            values.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MappingOutcome {
    Mapped(MappedRow),
    /// The document does not have the shape the rules expect.
    NeedsFallback(String),
}

type Shape<T> = Result<T, String>;

/// Maps a FHIR resource onto `table` using fixed field rules.
pub fn map_direct(resource: &Value, table: OmopTable) -> MappingOutcome {
    let Some(obj) = resource.as_object() else {
        return MappingOutcome::NeedsFallback("resource is not a JSON object".into());
    };

    let mapped = match table {
        OmopTable::Person => map_patient(obj),
        OmopTable::ConditionOccurrence => map_condition(obj),
        OmopTable::VisitOccurrence => map_encounter(obj),
        OmopTable::Observation => Err("no direct rules for observation".to_string()),
    };

    match mapped {
        Ok(values) => MappingOutcome::Mapped(MappedRow::new(table, values)),
        Err(reason) => MappingOutcome::NeedsFallback(reason),
    }
}

// --- Patient -> person ---

fn map_patient(obj: &Map<String, Value>) -> Shape<Vec<SqlValue>> {
    let (year, month, day) = match present(obj, "birthDate") {
        None => (None, None, None),
        Some(Value::String(s)) => split_date(s),
        Some(_) => return Err("birthDate is not a string".into()),
    };

    Ok(vec![
        id_of(obj),
        SqlValue::Null, // gender_concept_id
        year.into(),
        month.into(),
        day.into(),
        SqlValue::Null, // race_concept_id
        SqlValue::Null, // ethnicity_concept_id
    ])
}

// --- Condition -> condition_occurrence ---

fn map_condition(obj: &Map<String, Value>) -> Shape<Vec<SqlValue>> {
    let person_id = subject_id(obj)?;

    let coding = match object_field(obj, "code")? {
        Some(code) => first_element(code, "coding")?,
        None => None,
    };
    let (source_value, vocabulary) = match coding {
        Some(c) => (text_field(c, "code")?, text_field(c, "system")?),
        None => (None, None),
    };

    let start = match text_field(obj, "onsetDateTime")? {
        Some(onset) => Some(onset),
        None => text_field(obj, "recordedDate")?,
    };
    let end = text_field(obj, "abatementDateTime")?;

    Ok(vec![
        id_of(obj),
        person_id,
        SqlValue::Null, // condition_concept_id
        start.into(),
        end.into(),
        SqlValue::Null, // condition_type_concept_id
        source_value.into(),
        vocabulary.into(),
    ])
}

// --- Encounter -> visit_occurrence ---

fn map_encounter(obj: &Map<String, Value>) -> Shape<Vec<SqlValue>> {
    let person_id = subject_id(obj)?;

    let (start, end) = match object_field(obj, "period")? {
        Some(period) => (text_field(period, "start")?, text_field(period, "end")?),
        None => (None, None),
    };

    let source_value = match first_element(obj, "type")? {
        Some(Value::Object(kind)) => match first_element(kind, "coding")? {
            Some(c) => text_field(c, "code")?,
            None => None,
        },
        Some(_) => return Err("type[0] is not an object".into()),
        None => None,
    };

    Ok(vec![
        id_of(obj),
        person_id,
        SqlValue::Null, // visit_concept_id
        start.into(),
        end.into(),
        SqlValue::Null, // visit_type_concept_id
        source_value.into(),
    ])
}

// --- Shape helpers ---

/// A key that is absent or explicitly null counts as missing.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Numeric ids only; anything else maps to null.
fn id_of(obj: &Map<String, Value>) -> SqlValue {
    match present(obj, "id") {
        Some(Value::String(s)) => s.trim().parse::<i64>().ok().into(),
        Some(Value::Number(n)) => n.as_i64().into(),
        _ => SqlValue::Null,
    }
}

fn subject_id(obj: &Map<String, Value>) -> Shape<SqlValue> {
    Ok(match object_field(obj, "subject")? {
        Some(subject) => text_field(subject, "reference")?
            .as_deref()
            .and_then(reference_id)
            .into(),
        None => SqlValue::Null,
    })
}

fn object_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Shape<Option<&'a Map<String, Value>>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::Object(inner)) => Ok(Some(inner)),
        Some(_) => Err(format!("{} is not an object", key)),
    }
}

/// First element of an array field. Absent is fine, empty or non-array is not.
fn first_element<'a>(obj: &'a Map<String, Value>, key: &str) -> Shape<Option<&'a Value>> {
    match present(obj, key) {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .first()
            .map(Some)
            .ok_or_else(|| format!("{} is an empty array", key)),
        Some(_) => Err(format!("{} is not an array", key)),
    }
}

fn text_field(value: &impl AsObject, key: &str) -> Shape<Option<String>> {
    let Some(obj) = value.as_map() else {
        return Err(format!("parent of {} is not an object", key));
    };
    match present(obj, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("{} is not a string", key)),
    }
}

trait AsObject {
    fn as_map(&self) -> Option<&Map<String, Value>>;
}

impl AsObject for Map<String, Value> {
    fn as_map(&self) -> Option<&Map<String, Value>> {
        Some(self)
    }
}

impl AsObject for Value {
    fn as_map(&self) -> Option<&Map<String, Value>> {
        self.as_object()
    }
}

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`; unparsable pieces become null.
fn split_date(date: &str) -> (Option<i64>, Option<i64>, Option<i64>) {
    // Drop any time part of a dateTime.
    let date = date.split('T').next().unwrap_or_default();
    let mut parts = date.splitn(3, '-').map(|p| p.trim().parse::<i64>().ok());
    let year = parts.next().flatten();
    let month = parts.next().flatten().filter(|m| (1..=12).contains(m));
    let day = parts.next().flatten().filter(|d| (1..=31).contains(d));
    (year, month, day)
}

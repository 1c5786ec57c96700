// fhir2omop-core/src/domain/records.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::omop::SqlValue;

/// One line of the person sample dataset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonRecord {
    pub person_id: Option<i64>,
    pub gender_concept_id: Option<i64>,
    pub year_of_birth: Option<i64>,
    pub month_of_birth: Option<i64>,
    pub day_of_birth: Option<i64>,
    pub race_concept_id: Option<i64>,
    pub ethnicity_concept_id: Option<i64>,
}

impl PersonRecord {
    pub fn to_row(&self) -> Vec<SqlValue> {
        vec![
            self.person_id.into(),
            self.gender_concept_id.into(),
            self.year_of_birth.into(),
            self.month_of_birth.into(),
            self.day_of_birth.into(),
            self.race_concept_id.into(),
            self.ethnicity_concept_id.into(),
        ]
    }
}

/// Observation line as read from disk. The concept column may hold a source
/// code instead of a concept id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawObservation {
    pub observation_id: Option<i64>,
    pub person_id: Option<i64>,
    pub observation_concept_id: Option<String>,
    pub observation_date: Option<String>,
    pub value_as_number: Option<f64>,
    pub value_as_string: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationRecord {
    pub observation_id: Option<i64>,
    pub person_id: Option<i64>,
    pub observation_concept_id: Option<i64>,
    pub observation_date: Option<String>,
    pub value_as_number: Option<f64>,
    pub value_as_string: Option<String>,
}

impl ObservationRecord {
    pub fn to_row(&self) -> Vec<SqlValue> {
        vec![
            self.observation_id.into(),
            self.person_id.into(),
            self.observation_concept_id.into(),
            self.observation_date.clone().into(),
            self.value_as_number.into(),
            self.value_as_string.clone().into(),
        ]
    }
}

/// `source_code -> standard_concept_id` lookup.
#[derive(Debug, Clone, Default)]
pub struct CodeMapping {
    codes: HashMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeMappingEntry {
    pub source_code: String,
    pub standard_concept_id: i64,
}

impl CodeMapping {
    pub fn new(entries: impl IntoIterator<Item = CodeMappingEntry>) -> Self {
        Self {
            codes: entries
                .into_iter()
                .map(|e| (e.source_code.trim().to_string(), e.standard_concept_id))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Integer values pass through, codes go through the table, the rest is unmapped.
    pub fn resolve(&self, raw: Option<&str>) -> Option<i64> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(id);
        }
        // Spreadsheet exports write ids as "3004249.0"
        if let Ok(f) = raw.parse::<f64>() {
            if f.fract() == 0.0 {
                return Some(f as i64);
            }
        }
        self.codes.get(raw).copied()
    }
}

impl RawObservation {
    pub fn resolve(self, mapping: &CodeMapping) -> ObservationRecord {
        ObservationRecord {
            observation_concept_id: mapping.resolve(self.observation_concept_id.as_deref()),
            observation_id: self.observation_id,
            person_id: self.person_id,
            observation_date: self.observation_date,
            value_as_number: self.value_as_number,
            value_as_string: self.value_as_string,
        }
    }
}

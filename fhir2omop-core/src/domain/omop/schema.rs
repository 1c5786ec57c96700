// fhir2omop-core/src/domain/omop/schema.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Column storage class. Dates are kept as ISO-8601 text so both engines agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn ddl(&self) -> &'static str {
        match self {
            SqlType::Integer => "BIGINT",
            SqlType::Real => "DOUBLE PRECISION",
            SqlType::Text => "VARCHAR",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
}

const fn pk(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type: SqlType::Integer,
        primary_key: true,
    }
}

const fn int(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type: SqlType::Integer,
        primary_key: false,
    }
}

const fn real(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type: SqlType::Real,
        primary_key: false,
    }
}

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type: SqlType::Text,
        primary_key: false,
    }
}

// =============================================================================
//  CANONICAL SCHEMA (OMOP CDM, concept-id typed)
// =============================================================================

const PERSON: [ColumnDef; 7] = [
    pk("person_id"),
    int("gender_concept_id"),
    int("year_of_birth"),
    int("month_of_birth"),
    int("day_of_birth"),
    int("race_concept_id"),
    int("ethnicity_concept_id"),
];

const OBSERVATION: [ColumnDef; 6] = [
    pk("observation_id"),
    int("person_id"),
    int("observation_concept_id"),
    text("observation_date"),
    real("value_as_number"),
    text("value_as_string"),
];

// condition_source_vocabulary is a staging extension: it holds the FHIR coding
// system URI until the code is resolved against the vocabulary tables.
const CONDITION_OCCURRENCE: [ColumnDef; 8] = [
    pk("condition_occurrence_id"),
    int("person_id"),
    int("condition_concept_id"),
    text("condition_start_date"),
    text("condition_end_date"),
    int("condition_type_concept_id"),
    text("condition_source_value"),
    text("condition_source_vocabulary"),
];

const VISIT_OCCURRENCE: [ColumnDef; 7] = [
    pk("visit_occurrence_id"),
    int("person_id"),
    int("visit_concept_id"),
    text("visit_start_date"),
    text("visit_end_date"),
    int("visit_type_concept_id"),
    text("visit_source_value"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmopTable {
    Person,
    Observation,
    ConditionOccurrence,
    VisitOccurrence,
}

impl OmopTable {
    pub const ALL: [OmopTable; 4] = [
        OmopTable::Person,
        OmopTable::Observation,
        OmopTable::ConditionOccurrence,
        OmopTable::VisitOccurrence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OmopTable::Person => "person",
            OmopTable::Observation => "observation",
            OmopTable::ConditionOccurrence => "condition_occurrence",
            OmopTable::VisitOccurrence => "visit_occurrence",
        }
    }

    pub fn columns(&self) -> &'static [ColumnDef] {
        match self {
            OmopTable::Person => &PERSON,
            OmopTable::Observation => &OBSERVATION,
            OmopTable::ConditionOccurrence => &CONDITION_OCCURRENCE,
            OmopTable::VisitOccurrence => &VISIT_OCCURRENCE,
        }
    }

    pub fn arity(&self) -> usize {
        self.columns().len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.name).collect()
    }

    pub fn primary_key(&self) -> &'static str {
        self.columns()
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name)
            .unwrap_or("id")
    }

    /// Position of the primary key inside a row.
    pub fn primary_key_index(&self) -> usize {
        self.columns()
            .iter()
            .position(|c| c.primary_key)
            .unwrap_or(0)
    }

    /// FHIR resource type feeding this table, if any.
    pub fn for_resource_type(resource_type: &str) -> Result<Self, DomainError> {
        match resource_type {
            "Patient" => Ok(OmopTable::Person),
            "Condition" => Ok(OmopTable::ConditionOccurrence),
            "Encounter" => Ok(OmopTable::VisitOccurrence),
            other => Err(DomainError::UnsupportedResource(other.to_string())),
        }
    }

    pub fn create_table_sql(&self, if_not_exists: bool) -> String {
        let cols: Vec<String> = self
            .columns()
            .iter()
            .map(|c| {
                if c.primary_key {
                    format!("    {} {} PRIMARY KEY", c.name, c.sql_type.ddl())
                } else {
                    format!("    {} {}", c.name, c.sql_type.ddl())
                }
            })
            .collect();
        format!(
            "CREATE TABLE {}{} (\n{}\n)",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.name(),
            cols.join(",\n")
        )
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name())
    }
}

impl fmt::Display for OmopTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OmopTable {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OmopTable::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnknownTable(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_arity() {
        assert_eq!(OmopTable::Person.arity(), 7);
        assert_eq!(OmopTable::Observation.arity(), 6);
        assert_eq!(OmopTable::ConditionOccurrence.arity(), 8);
        assert_eq!(OmopTable::VisitOccurrence.arity(), 7);
    }

    #[test]
    fn test_parse_table_name() {
        assert_eq!(
            "Condition_Occurrence".parse::<OmopTable>().unwrap(),
            OmopTable::ConditionOccurrence
        );
        assert!(matches!(
            "drug_exposure".parse::<OmopTable>(),
            Err(DomainError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_create_table_sql() {
        let ddl = OmopTable::Person.create_table_sql(true);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS person ("));
        assert!(ddl.contains("person_id BIGINT PRIMARY KEY"));
        assert!(ddl.contains("ethnicity_concept_id BIGINT"));
    }

    #[test]
    fn test_resource_routing() {
        assert_eq!(
            OmopTable::for_resource_type("Encounter").unwrap(),
            OmopTable::VisitOccurrence
        );
        assert!(OmopTable::for_resource_type("Observation").is_err());
    }
}

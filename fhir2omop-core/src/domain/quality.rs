// fhir2omop-core/src/domain/quality.rs

use std::collections::HashSet;
use std::fmt;

use crate::domain::records::{ObservationRecord, PersonRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    MissingPersonIdInPerson,
    MissingPersonIdInObservation,
    DuplicatePersonId,
    FutureYearOfBirth,
    UnknownPersonReference,
    UnmappedObservationConcept,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Violation::MissingPersonIdInPerson => "Missing person_id in person data",
            Violation::MissingPersonIdInObservation => "Missing person_id in observation data",
            Violation::DuplicatePersonId => "Duplicate person_id found in person data",
            Violation::FutureYearOfBirth => "year_of_birth in the future found in person data",
            Violation::UnknownPersonReference => {
                "Observation references person_id not in person table"
            }
            Violation::UnmappedObservationConcept => {
                "Unmapped observation_concept_id found in observation data"
            }
        };
        f.write_str(msg)
    }
}

/// Runs every check and returns all violations, in a fixed order.
pub fn check_datasets(
    persons: &[PersonRecord],
    observations: &[ObservationRecord],
    current_year: i64,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    // 1. Completeness
    if persons.iter().any(|p| p.person_id.is_none()) {
        violations.push(Violation::MissingPersonIdInPerson);
    }
    if observations.iter().any(|o| o.person_id.is_none()) {
        violations.push(Violation::MissingPersonIdInObservation);
    }

    // 2. Uniqueness
    let mut seen = HashSet::new();
    if persons
        .iter()
        .filter_map(|p| p.person_id)
        .any(|id| !seen.insert(id))
    {
        violations.push(Violation::DuplicatePersonId);
    }

    // 3. Plausibility
    if persons
        .iter()
        .filter_map(|p| p.year_of_birth)
        .any(|y| y > current_year)
    {
        violations.push(Violation::FutureYearOfBirth);
    }

    // 4. Referential integrity (a missing person_id is already reported above)
    let known: HashSet<i64> = persons.iter().filter_map(|p| p.person_id).collect();
    if observations
        .iter()
        .filter_map(|o| o.person_id)
        .any(|id| !known.contains(&id))
    {
        violations.push(Violation::UnknownPersonReference);
    }

    // 5. Vocabulary
    if observations.iter().any(|o| o.observation_concept_id.is_none()) {
        violations.push(Violation::UnmappedObservationConcept);
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: Option<i64>, year: Option<i64>) -> PersonRecord {
        PersonRecord {
            person_id: id,
            year_of_birth: year,
            ..Default::default()
        }
    }

    fn observation(person_id: Option<i64>, concept: Option<i64>) -> ObservationRecord {
        ObservationRecord {
            observation_id: Some(1),
            person_id,
            observation_concept_id: concept,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_datasets() {
        let persons = vec![person(Some(1), Some(1980)), person(Some(2), None)];
        let observations = vec![observation(Some(1), Some(3004249))];
        assert!(check_datasets(&persons, &observations, 2026).is_empty());
    }

    #[test]
    fn test_duplicate_person_id() {
        let persons = vec![person(Some(1), Some(1980)), person(Some(1), Some(1990))];
        let v = check_datasets(&persons, &[], 2026);
        assert_eq!(v, vec![Violation::DuplicatePersonId]);
    }

    #[test]
    fn test_all_violations_are_collected() {
        let persons = vec![person(None, Some(3000)), person(Some(1), None)];
        let observations = vec![observation(None, Some(1)), observation(Some(99), None)];
        let v = check_datasets(&persons, &observations, 2026);
        assert_eq!(
            v,
            vec![
                Violation::MissingPersonIdInPerson,
                Violation::MissingPersonIdInObservation,
                Violation::FutureYearOfBirth,
                Violation::UnknownPersonReference,
                Violation::UnmappedObservationConcept,
            ]
        );
        assert_eq!(
            v[3].to_string(),
            "Observation references person_id not in person table"
        );
    }
}

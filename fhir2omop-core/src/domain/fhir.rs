// fhir2omop-core/src/domain/fhir.rs

use indexmap::IndexMap;
use serde_json::Value;

use crate::domain::error::DomainError;

/// FHIR R4 resource names accepted by the fetcher.
pub const R4_RESOURCE_TYPES: &[&str] = &[
    "Account",
    "ActivityDefinition",
    "AdverseEvent",
    "AllergyIntolerance",
    "Appointment",
    "AppointmentResponse",
    "AuditEvent",
    "Basic",
    "Binary",
    "BiologicallyDerivedProduct",
    "BodyStructure",
    "Bundle",
    "CapabilityStatement",
    "CarePlan",
    "CareTeam",
    "CatalogEntry",
    "ChargeItem",
    "ChargeItemDefinition",
    "Claim",
    "ClaimResponse",
    "ClinicalImpression",
    "CodeSystem",
    "Communication",
    "CommunicationRequest",
    "CompartmentDefinition",
    "Composition",
    "ConceptMap",
    "Condition",
    "Consent",
    "Contract",
    "Coverage",
    "CoverageEligibilityRequest",
    "CoverageEligibilityResponse",
    "DetectedIssue",
    "Device",
    "DeviceDefinition",
    "DeviceMetric",
    "DeviceRequest",
    "DeviceUseStatement",
    "DiagnosticReport",
    "DocumentManifest",
    "DocumentReference",
    "EffectEvidenceSynthesis",
    "Encounter",
    "Endpoint",
    "EnrollmentRequest",
    "EnrollmentResponse",
    "EpisodeOfCare",
    "EventDefinition",
    "Evidence",
    "EvidenceVariable",
    "ExampleScenario",
    "ExplanationOfBenefit",
    "FamilyMemberHistory",
    "Flag",
    "Goal",
    "GraphDefinition",
    "Group",
    "GuidanceResponse",
    "HealthcareService",
    "ImagingStudy",
    "Immunization",
    "ImmunizationEvaluation",
    "ImmunizationRecommendation",
    "ImplementationGuide",
    "InsurancePlan",
    "Invoice",
    "Library",
    "Linkage",
    "List",
    "Location",
    "Measure",
    "MeasureReport",
    "Media",
    "Medication",
    "MedicationAdministration",
    "MedicationDispense",
    "MedicationKnowledge",
    "MedicationRequest",
    "MedicationStatement",
    "MedicinalProduct",
    "MedicinalProductAuthorization",
    "MedicinalProductContraindication",
    "MedicinalProductIndication",
    "MedicinalProductIngredient",
    "MedicinalProductInteraction",
    "MedicinalProductManufactured",
    "MedicinalProductPackaged",
    "MedicinalProductPharmaceutical",
    "MedicinalProductUndesirableEffect",
    "MessageDefinition",
    "MessageHeader",
    "MolecularSequence",
    "NamingSystem",
    "NutritionOrder",
    "Observation",
    "ObservationDefinition",
    "OperationDefinition",
    "OperationOutcome",
    "Organization",
    "OrganizationAffiliation",
    "Parameters",
    "Patient",
    "PaymentNotice",
    "PaymentReconciliation",
    "Person",
    "PlanDefinition",
    "Practitioner",
    "PractitionerRole",
    "Procedure",
    "Provenance",
    "Questionnaire",
    "QuestionnaireResponse",
    "RelatedPerson",
    "RequestGroup",
    "ResearchDefinition",
    "ResearchElementDefinition",
    "ResearchStudy",
    "ResearchSubject",
    "RiskAssessment",
    "RiskEvidenceSynthesis",
    "Schedule",
    "SearchParameter",
    "ServiceRequest",
    "Slot",
    "Specimen",
    "SpecimenDefinition",
    "StructureDefinition",
    "StructureMap",
    "Subscription",
    "Substance",
    "SubstanceNucleicAcid",
    "SubstancePolymer",
    "SubstanceProtein",
    "SubstanceReferenceInformation",
    "SubstanceSourceMaterial",
    "SubstanceSpecification",
    "SupplyDelivery",
    "SupplyRequest",
    "Task",
    "TerminologyCapabilities",
    "TestReport",
    "TestScript",
    "ValueSet",
    "VerificationResult",
    "VisionPrescription",
];

/// Returns the canonical spelling of an R4 resource name (case-insensitive lookup).
pub fn validate_resource_type(name: &str) -> Result<&'static str, DomainError> {
    R4_RESOURCE_TYPES
        .iter()
        .find(|r| r.eq_ignore_ascii_case(name.trim()))
        .copied()
        .ok_or_else(|| DomainError::UnknownResourceType(name.to_string()))
}

pub fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

/// `entry[].resource` of a search bundle. A lone resource comes back as itself.
pub fn unwrap_bundle(document: Value) -> Vec<Value> {
    if resource_type(&document) != Some("Bundle") {
        return vec![document];
    }
    match document {
        Value::Object(mut map) => match map.remove("entry") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|mut e| e.get_mut("resource").map(Value::take))
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Numeric id of a literal reference: the segment right after the resource
/// type, as in `Patient/123`, `Patient/123/_history/2` or an absolute URL.
/// `urn:uuid:` and other non-numeric ids give `None`.
pub fn reference_id(reference: &str) -> Option<i64> {
    let segments: Vec<&str> = reference.trim().split('/').collect();
    let id = segments
        .windows(2)
        .find(|pair| R4_RESOURCE_TYPES.contains(&pair[0]))
        .map(|pair| pair[1])?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Flattens nested objects and arrays into dotted keys (`code.coding.0.system`).
pub fn flatten(resource: &Value) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    flatten_into(resource, String::new(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut IndexMap<String, Value>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(v, join(k), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(v, join(&i.to_string()), out);
            }
        }
        other => {
            out.insert(prefix, other.clone());
        }
    }
}

/// Union of flattened keys over many resources, first-seen order.
pub fn flattened_columns(rows: &[IndexMap<String, Value>]) -> Vec<String> {
    let mut columns: IndexMap<&str, ()> = IndexMap::new();
    for row in rows {
        for key in row.keys() {
            columns.entry(key.as_str()).or_insert(());
        }
    }
    columns.into_keys().map(str::to_string).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_resource_type() {
        assert_eq!(validate_resource_type("patient").unwrap(), "Patient");
        assert!(matches!(
            validate_resource_type("Spaceship"),
            Err(DomainError::UnknownResourceType(_))
        ));
    }

    #[test]
    fn test_unwrap_bundle() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "1"}},
                {"fullUrl": "no-resource"},
                {"resource": {"resourceType": "Patient", "id": "2"}}
            ]
        });
        let resources = unwrap_bundle(bundle);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1]["id"], "2");

        let empty = unwrap_bundle(json!({"resourceType": "Bundle", "total": 0}));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_reference_id() {
        assert_eq!(reference_id("Patient/123"), Some(123));
        assert_eq!(reference_id("Patient/123/_history/2"), Some(123));
        assert_eq!(reference_id("https://hapi.fhir.org/baseR4/Patient/77"), Some(77));
        assert_eq!(reference_id("urn:uuid:abc"), None);
        assert_eq!(
            reference_id("urn:uuid:f81d4fae-7dec-11d0-a765-00a0c91e6bf6"),
            None
        );
        assert_eq!(reference_id("Patient/example-6"), None);
        assert_eq!(reference_id("123"), None);
    }

    #[test]
    fn test_flatten_dotted_keys() {
        let flat = flatten(&json!({
            "id": "7",
            "code": {"coding": [{"system": "http://snomed.info/sct", "code": "44054006"}]},
            "tags": []
        }));
        assert_eq!(flat["code.coding.0.code"], "44054006");
        assert_eq!(flat["tags"], json!([]));
        assert_eq!(flat.len(), 4);
    }
}

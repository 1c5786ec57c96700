// fhir2omop-core/src/infrastructure/http/cbioportal.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{info, instrument};

use crate::domain::error::DomainError;
use crate::error::OmopError;
use crate::infrastructure::config::OncologyConfig;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::http::{build_client, get_json};

const SERVICE: &str = "cBioPortal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MolecularProfile {
    pub molecular_profile_id: String,
    #[serde(default)]
    pub molecular_alteration_type: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl MolecularProfile {
    pub fn alteration(&self) -> AlterationType {
        AlterationType::parse(&self.molecular_alteration_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterationType {
    MutationExtended,
    CopyNumberAlteration,
    MrnaExpression,
    Other(String),
}

impl AlterationType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MUTATION_EXTENDED" => AlterationType::MutationExtended,
            "COPY_NUMBER_ALTERATION" => AlterationType::CopyNumberAlteration,
            "MRNA_EXPRESSION" => AlterationType::MrnaExpression,
            other => AlterationType::Other(other.to_string()),
        }
    }

    /// Data endpoint under `/molecular-profiles/{id}/`.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            AlterationType::MutationExtended => Some("mutations"),
            AlterationType::CopyNumberAlteration => Some("discrete-copy-number"),
            AlterationType::MrnaExpression => Some("mRNA-expr"),
            AlterationType::Other(_) => None,
        }
    }
}

impl fmt::Display for AlterationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterationType::MutationExtended => f.write_str("MUTATION_EXTENDED"),
            AlterationType::CopyNumberAlteration => f.write_str("COPY_NUMBER_ALTERATION"),
            AlterationType::MrnaExpression => f.write_str("MRNA_EXPRESSION"),
            AlterationType::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleList {
    sample_list_id: String,
}

pub struct CbioPortalClient {
    client: reqwest::Client,
    base_url: String,
}

impl CbioPortalClient {
    pub fn new(config: &OncologyConfig) -> Result<Self, InfrastructureError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.cbioportal_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn profile_data_url(&self, profile_id: &str, endpoint: &str, sample_list_id: &str) -> String {
        self.url(&format!(
            "molecular-profiles/{}/{}?sampleListId={}",
            profile_id, endpoint, sample_list_id
        ))
    }

    #[instrument(skip(self))]
    pub async fn clinical_data(&self, study_id: &str) -> Result<Vec<Value>, OmopError> {
        let url = self.url(&format!("studies/{}/clinical-data", study_id));
        let payload = get_json(self.client.get(&url), SERVICE).await?;
        let records = clinical_records(payload)?;
        info!(study_id, records = records.len(), "🧬 Clinical data loaded");
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn molecular_profiles(
        &self,
        study_id: &str,
    ) -> Result<Vec<MolecularProfile>, OmopError> {
        let url = self.url(&format!("studies/{}/molecular-profiles", study_id));
        let payload = get_json(self.client.get(&url), SERVICE).await?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn first_sample_list(&self, study_id: &str) -> Result<String, OmopError> {
        let url = self.url(&format!("studies/{}/sample-lists", study_id));
        let payload = get_json(self.client.get(&url), SERVICE).await?;
        let lists: Vec<SampleList> = serde_json::from_value(payload)?;
        lists
            .into_iter()
            .next()
            .map(|l| l.sample_list_id)
            .ok_or_else(|| DomainError::NoSampleList(study_id.to_string()).into())
    }

    /// Data for one profile, read through the study's first sample list.
    #[instrument(skip(self, profile), fields(profile = %profile.molecular_profile_id))]
    pub async fn profile_data(
        &self,
        study_id: &str,
        profile: &MolecularProfile,
    ) -> Result<Vec<Value>, OmopError> {
        let alteration = profile.alteration();
        let endpoint = alteration
            .endpoint()
            .ok_or_else(|| DomainError::UnsupportedAlteration(alteration.to_string()))?;

        let sample_list_id = self.first_sample_list(study_id).await?;
        let url = self.profile_data_url(&profile.molecular_profile_id, endpoint, &sample_list_id);
        match get_json(self.client.get(&url), SERVICE).await? {
            Value::Array(records) => {
                info!(records = records.len(), %alteration, "🧬 Profile data loaded");
                Ok(records)
            }
            other => Ok(vec![other]),
        }
    }
}

/// The API answers with a bare array; some deployments wrap it in `clinicalData`.
fn clinical_records(payload: Value) -> Result<Vec<Value>, InfrastructureError> {
    match payload {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("clinicalData") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(unexpected("expected an array or a 'clinicalData' field")),
        },
        _ => Err(unexpected("expected an array or a 'clinicalData' field")),
    }
}

fn unexpected(reason: &str) -> InfrastructureError {
    InfrastructureError::UnexpectedPayload {
        service: SERVICE.to_string(),
        reason: reason.to_string(),
    }
}

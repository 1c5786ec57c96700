// fhir2omop-core/src/infrastructure/http/fhir.rs

use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::error::DomainError;
use crate::domain::fhir::{unwrap_bundle, validate_resource_type};
use crate::error::OmopError;
use crate::infrastructure::config::FhirConfig;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::http::{build_client, get_json};

pub const MAX_COUNT: u32 = 20;

/// Read-only search client for a FHIR R4 server.
pub struct FhirClient {
    client: reqwest::Client,
    base_url: String,
}

impl FhirClient {
    pub fn new(config: &FhirConfig) -> Result<Self, InfrastructureError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn search_url(&self, resource_type: &str, count: u32) -> String {
        format!("{}/{}?_count={}", self.base_url, resource_type, count)
    }

    /// Fetches up to `count` resources (1..=20) of one type.
    #[instrument(skip(self))]
    pub async fn fetch_resources(
        &self,
        resource_type: &str,
        count: u32,
    ) -> Result<Vec<Value>, OmopError> {
        let resource_type = validate_resource_type(resource_type)?;
        if !(1..=MAX_COUNT).contains(&count) {
            return Err(DomainError::SchemaError(format!(
                "count must be between 1 and {}, got {}",
                MAX_COUNT, count
            ))
            .into());
        }

        let url = self.search_url(resource_type, count);
        let bundle = get_json(self.client.get(&url), "FHIR server").await?;
        let resources = unwrap_bundle(bundle);
        info!(resource_type, fetched = resources.len(), "🔥 FHIR resources fetched");
        Ok(resources)
    }
}

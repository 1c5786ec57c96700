// fhir2omop-core/src/infrastructure/http/mod.rs

pub mod cbioportal;
pub mod fhir;
pub mod oncokb;

pub use cbioportal::{AlterationType, CbioPortalClient, MolecularProfile};
pub use fhir::FhirClient;
pub use oncokb::OncoKbClient;

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::infrastructure::error::InfrastructureError;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, InfrastructureError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// GET returning JSON. A non-2xx status becomes `HttpStatus` with the body kept for diagnosis.
pub(crate) async fn get_json(
    request: reqwest::RequestBuilder,
    service: &str,
) -> Result<Value, InfrastructureError> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InfrastructureError::HttpStatus {
            service: service.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let value: Value = response.json().await?;
    debug!(service, "JSON payload received");
    Ok(value)
}

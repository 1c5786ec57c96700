// fhir2omop-core/src/infrastructure/http/oncokb.rs

use serde_json::Value;
use tracing::{info, instrument};

use crate::error::OmopError;
use crate::infrastructure::config::OncologyConfig;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::http::{build_client, get_json};

pub const DEFAULT_GENE: &str = "TP53";

pub struct OncoKbClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl OncoKbClient {
    /// Fails when no API token is configured (`oncology.oncokb_token` or `ONCOKB_TOKEN`).
    pub fn new(config: &OncologyConfig) -> Result<Self, InfrastructureError> {
        let token = config
            .oncokb_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                InfrastructureError::ConfigError(
                    "OncoKB requires an API token. Set oncology.oncokb_token or ONCOKB_TOKEN".into(),
                )
            })?
            .to_string();

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.oncokb_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn variants_url(&self, gene: &str) -> String {
        format!("{}/genes/{}/variants", self.base_url, gene.trim())
    }

    #[instrument(skip(self))]
    pub async fn variants(&self, gene: &str) -> Result<Vec<Value>, OmopError> {
        let request = self
            .client
            .get(self.variants_url(gene))
            .bearer_auth(&self.token);
        let records = match get_json(request, "OncoKB").await? {
            Value::Array(records) => records,
            other => vec![other],
        };
        info!(gene, variants = records.len(), "🧬 OncoKB variants loaded");
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_required() {
        let mut config = OncologyConfig::default();
        assert!(matches!(
            OncoKbClient::new(&config),
            Err(InfrastructureError::ConfigError(_))
        ));

        config.oncokb_token = Some("  ".into());
        assert!(OncoKbClient::new(&config).is_err());

        config.oncokb_token = Some("secret".into());
        let client = OncoKbClient::new(&config).unwrap();
        assert_eq!(
            client.variants_url("BRAF"),
            "https://www.oncokb.org/api/v1/genes/BRAF/variants"
        );
    }
}

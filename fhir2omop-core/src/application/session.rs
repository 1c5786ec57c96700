// fhir2omop-core/src/application/session.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::infrastructure::http::MolecularProfile;

/// What one command leaves behind for the next: the last FHIR fetch and the
/// cBioPortal profile selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub resources: Vec<Value>,
    pub last_resource_type: Option<String>,
    pub study_id: Option<String>,
    pub cbioportal_profiles: Vec<MolecularProfile>,
    pub selected_profile: Option<String>,
}

impl SessionState {
    /// Missing file means a fresh session.
    pub fn load(path: &Path) -> Result<Self, InfrastructureError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let state = serde_json::from_str(&content)?;
        debug!(path = ?path, "Session restored");
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<(), InfrastructureError> {
        atomic_write(path, serde_json::to_string_pretty(self)?)
    }

    pub fn store_resources(&mut self, resource_type: &str, resources: Vec<Value>) {
        self.last_resource_type = Some(resource_type.to_string());
        self.resources = resources;
    }

    /// A new study invalidates the previous selection.
    pub fn store_profiles(&mut self, study_id: &str, profiles: Vec<MolecularProfile>) {
        if self.study_id.as_deref() != Some(study_id) {
            self.selected_profile = None;
        }
        self.study_id = Some(study_id.to_string());
        self.cbioportal_profiles = profiles;
    }

    pub fn profile(&self, profile_id: &str) -> Option<&MolecularProfile> {
        self.cbioportal_profiles
            .iter()
            .find(|p| p.molecular_profile_id == profile_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    fn profile(id: &str) -> MolecularProfile {
        MolecularProfile {
            molecular_profile_id: id.into(),
            molecular_alteration_type: "MUTATION_EXTENDED".into(),
            name: None,
        }
    }

    #[test]
    fn test_save_and_restore() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(".fhir2omop/session.json");
        assert_eq!(SessionState::load(&path)?, SessionState::default());

        let mut state = SessionState::default();
        state.store_resources("Patient", vec![json!({"resourceType": "Patient", "id": "1"})]);
        state.store_profiles("acc_tcga", vec![profile("acc_tcga_mutations")]);
        state.selected_profile = Some("acc_tcga_mutations".into());
        state.save(&path)?;

        let restored = SessionState::load(&path)?;
        assert_eq!(restored, state);
        assert!(restored.profile("acc_tcga_mutations").is_some());
        Ok(())
    }

    #[test]
    fn test_new_study_clears_selection() {
        let mut state = SessionState::default();
        state.store_profiles("a", vec![profile("a_mut")]);
        state.selected_profile = Some("a_mut".into());

        state.store_profiles("a", vec![profile("a_mut")]);
        assert_eq!(state.selected_profile.as_deref(), Some("a_mut"));

        state.store_profiles("b", vec![profile("b_mut")]);
        assert_eq!(state.selected_profile, None);
        assert!(state.profile("a_mut").is_none());
    }
}

// fhir2omop/src/commands/oncology.rs
//
// USE CASE: Oncology data loaders (cBioPortal, OncoKB, COSMIC, file preview).

use std::path::Path;

use fhir2omop_core::application::SessionState;
use fhir2omop_core::domain::DomainError;
use fhir2omop_core::domain::table::DataTable;
use fhir2omop_core::infrastructure::config::AppConfig;
use fhir2omop_core::infrastructure::datasets::read_table;
use fhir2omop_core::infrastructure::http::{CbioPortalClient, OncoKbClient};

use crate::cli::OncologyCommand;
use crate::output::print_data_table;

pub async fn execute(config: Option<&Path>, command: OncologyCommand) -> anyhow::Result<()> {
    let config = super::load(config)?;

    match command {
        OncologyCommand::Clinical { study, rows } => {
            println!("🧬 Loading clinical data of study '{}'...", study);
            let client = CbioPortalClient::new(&config.oncology)?;
            let records = client.clinical_data(&study).await?;
            print_data_table(&DataTable::from_records(&records), rows);
        }
        OncologyCommand::Profiles { study } => list_profiles(&config, &study).await?,
        OncologyCommand::ProfileData { profile, rows } => {
            profile_data(&config, profile.as_deref(), rows).await?
        }
        OncologyCommand::Oncokb { gene, rows } => {
            println!("🧬 Loading OncoKB variants for {}...", gene);
            let client = OncoKbClient::new(&config.oncology)?;
            let records = client.variants(&gene).await?;
            print_data_table(&DataTable::from_records(&records), rows);
        }
        OncologyCommand::Cosmic { file, rows } | OncologyCommand::Preview { file, rows } => {
            println!("📄 Reading {}...", file.display());
            let table = read_table(&file)?;
            print_data_table(&table, rows);
        }
    }
    Ok(())
}

async fn list_profiles(config: &AppConfig, study: &str) -> anyhow::Result<()> {
    println!("🧬 Listing molecular profiles of study '{}'...", study);
    let client = CbioPortalClient::new(&config.oncology)?;
    let profiles = client.molecular_profiles(study).await?;

    if profiles.is_empty() {
        println!("   No molecular profiles found for this study.");
    }
    for p in &profiles {
        println!(
            "   • {} [{}]{}",
            p.molecular_profile_id,
            p.molecular_alteration_type,
            p.name.as_deref().map(|n| format!(" {}", n)).unwrap_or_default()
        );
    }

    let session_path = config.session_path();
    let mut session = SessionState::load(&session_path)?;
    session.store_profiles(study, profiles);
    session.save(&session_path)?;
    Ok(())
}

async fn profile_data(config: &AppConfig, profile_id: Option<&str>, rows: usize) -> anyhow::Result<()> {
    let session_path = config.session_path();
    let mut session = SessionState::load(&session_path)?;
    let Some(study) = session.study_id.clone() else {
        anyhow::bail!("❌ No study in session.\n👉 List profiles first: fhir2omop oncology profiles <study>");
    };

    // Explicit id, else the previous selection, else the first listed profile
    let wanted = profile_id
        .map(str::to_string)
        .or_else(|| session.selected_profile.clone())
        .or_else(|| {
            session
                .cbioportal_profiles
                .first()
                .map(|p| p.molecular_profile_id.clone())
        });
    let Some(wanted) = wanted else {
        anyhow::bail!("No molecular profiles found for study '{}'", study);
    };
    let profile = session
        .profile(&wanted)
        .cloned()
        .ok_or_else(|| DomainError::UnknownProfile(wanted.clone()))?;

    println!(
        "🧬 Fetching {} ({})...",
        profile.molecular_profile_id,
        profile.alteration()
    );
    let client = CbioPortalClient::new(&config.oncology)?;
    let records = client.profile_data(&study, &profile).await?;
    print_data_table(&DataTable::from_records(&records), rows);

    session.selected_profile = Some(wanted);
    session.save(&session_path)?;
    Ok(())
}

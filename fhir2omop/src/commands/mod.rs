// fhir2omop/src/commands/mod.rs

pub mod analytics;
pub mod ask;
pub mod etl;
pub mod fetch;
pub mod inspect;
pub mod load;
pub mod map;
pub mod oncology;
pub mod pipeline;
pub mod prompt;
pub mod qa;
pub mod query;
pub mod tables;

use anyhow::Context;
use std::path::Path;

use fhir2omop_core::infrastructure::config::{AppConfig, load_config};

/// Config shared by every command; `--config` may be a file or a directory.
pub fn load(config: Option<&Path>) -> anyhow::Result<AppConfig> {
    println!("⚙️  Loading configuration...");
    let config = load_config(config).with_context(|| {
        format!(
            "Failed to load configuration from {:?}",
            config.unwrap_or_else(|| Path::new("."))
        )
    })?;
    println!("   Store: {}", config.database.backend);
    Ok(config)
}

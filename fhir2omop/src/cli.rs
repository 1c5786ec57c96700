// fhir2omop/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fhir2omop")]
#[command(about = "FHIR → OMOP bridge: mapping, ETL, analytics and QA profiling", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file, or a directory holding fhir2omop.yaml / config.yaml
    #[arg(long, short, global = true, env = "FHIR2OMOP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 📥 Loads the person/observation samples with data-quality checks
    Etl,

    /// 📊 Renders the analytics charts into the docs directory
    Analytics,

    /// 🔎 Profiles a CSV file (or a store table) into an HTML report
    Qa {
        /// CSV/TSV file to profile
        #[arg(conflicts_with = "table", required_unless_present = "table")]
        csv: Option<PathBuf>,

        /// Export and profile a table of the store instead
        #[arg(long, short)]
        table: Option<String>,

        /// Report path (default: <docs>/<name>_profile_report.html)
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// 🔥 Fetches FHIR resources from the configured server into the session
    Fetch {
        /// FHIR R4 resource type (ex: Patient, Condition, Encounter)
        resource_type: String,

        /// Number of resources (1-20)
        #[arg(long, short = 'n', default_value = "5")]
        count: u32,
    },

    /// 💾 Maps the fetched resources and upserts them into the store
    Load {
        /// Resource type to load (default: the last fetched type)
        #[arg(long)]
        resource_type: Option<String>,
    },

    /// 🤖 Maps one FHIR JSON document onto an OMOP table
    Map {
        /// FHIR resource or search bundle (JSON file)
        file: PathBuf,

        /// Target table: person, observation, condition_occurrence, visit_occurrence
        #[arg(long, short)]
        table: String,
    },

    /// 💬 Asks the model a free question
    Ask {
        question: String,

        #[arg(long, short)]
        model: Option<String>,
    },

    /// 🧪 Prompt playground: prompt + sample data sent to the model
    Prompt {
        #[arg(long, short)]
        prompt: Option<String>,

        /// Column names or JSON
        #[arg(long, short)]
        sample: Option<String>,

        #[arg(long, short)]
        model: Option<String>,
    },

    /// 🧬 Oncology data loaders (cBioPortal, OncoKB, COSMIC)
    #[command(subcommand)]
    Oncology(OncologyCommand),

    /// 🚀 Runs the pipeline steps in sequence
    Pipeline(PipelineArgs),

    /// ⚡ Executes a raw SQL query (Ad-hoc)
    Query { query: String },

    /// 🔍 Inspects a table (schema + sample rows)
    Inspect {
        table: String,

        /// Number of sample rows to display
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// 🗂️ Lists the tables of the store
    Tables,
}

#[derive(Subcommand)]
pub enum OncologyCommand {
    /// Clinical data of a cBioPortal study
    Clinical {
        #[arg(default_value = "brca_tcga")]
        study: String,

        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Lists the molecular profiles of a study and remembers them
    Profiles {
        #[arg(default_value = "brca_tcga")]
        study: String,
    },

    /// Fetches data for a molecular profile listed by `profiles`
    ProfileData {
        /// Profile id (default: the selected or first listed profile)
        #[arg(long, short)]
        profile: Option<String>,

        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// OncoKB variants for a gene (needs an API token)
    Oncokb {
        #[arg(default_value = "TP53")]
        gene: String,

        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Loads a COSMIC tab-separated export
    Cosmic {
        file: PathBuf,

        #[arg(long, default_value = "10")]
        rows: usize,
    },

    /// Previews any CSV/TSV file
    Preview {
        file: PathBuf,

        #[arg(long, default_value = "10")]
        rows: usize,
    },
}

#[derive(Args)]
pub struct PipelineArgs {
    /// Comma-separated steps (default: etl,llm_mapping,qa,analytics)
    #[arg(long, value_delimiter = ',')]
    pub steps: Vec<String>,

    /// FHIR JSON for the llm_mapping step
    #[arg(long)]
    pub resource: Option<PathBuf>,

    /// Target table for the llm_mapping step
    #[arg(long)]
    pub table: Option<String>,

    /// CSV input of the qa step
    #[arg(long)]
    pub qa_csv: Option<PathBuf>,

    /// HTML output of the qa step
    #[arg(long)]
    pub qa_html: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_fetch_defaults() -> Result<()> {
        let args = Cli::parse_from(["fhir2omop", "fetch", "Patient"]);
        assert!(args.config.is_none());
        match args.command {
            Commands::Fetch {
                resource_type,
                count,
            } => {
                assert_eq!(resource_type, "Patient");
                assert_eq!(count, 5);
                Ok(())
            }
            _ => bail!("Expected Fetch command"),
        }
    }

    #[test]
    fn test_cli_parse_pipeline_steps() -> Result<()> {
        let args = Cli::parse_from([
            "fhir2omop",
            "pipeline",
            "--steps",
            "etl,qa",
            "--qa-csv",
            "data/person_sample.csv",
            "--config",
            "/tmp/project",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/project")));
        match args.command {
            Commands::Pipeline(p) => {
                assert_eq!(p.steps, vec!["etl", "qa"]);
                assert_eq!(p.qa_csv, Some(PathBuf::from("data/person_sample.csv")));
                assert!(p.qa_html.is_none());
                Ok(())
            }
            _ => bail!("Expected Pipeline command"),
        }
    }

    #[test]
    fn test_cli_qa_needs_csv_or_table() {
        assert!(Cli::try_parse_from(["fhir2omop", "qa"]).is_err());
        assert!(Cli::try_parse_from(["fhir2omop", "qa", "x.csv", "--table", "person"]).is_err());
        assert!(Cli::try_parse_from(["fhir2omop", "qa", "--table", "person"]).is_ok());
    }

    #[test]
    fn test_cli_parse_oncology() -> Result<()> {
        let args = Cli::parse_from(["fhir2omop", "oncology", "oncokb"]);
        match args.command {
            Commands::Oncology(OncologyCommand::Oncokb { gene, rows }) => {
                assert_eq!(gene, "TP53");
                assert_eq!(rows, 10);
                Ok(())
            }
            _ => bail!("Expected Oncology Oncokb command"),
        }
    }
}

// fhir2omop-core/src/infrastructure/config/app.rs

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::error::InfrastructureError;

const CONFIG_CANDIDATES: [&str; 2] = ["fhir2omop.yaml", "config.yaml"];

// --- DATABASE ---

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// File-based DuckDB store.
    #[default]
    #[serde(alias = "sqlite", alias = "embedded")]
    Duckdb,
    #[serde(alias = "postgres")]
    Postgresql,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Backend::Duckdb => "duckdb",
            Backend::Postgresql => "postgresql",
        })
    }
}

impl FromStr for Backend {
    type Err = InfrastructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duckdb" | "sqlite" | "embedded" => Ok(Backend::Duckdb),
            "postgresql" | "postgres" => Ok(Backend::Postgresql),
            other => Err(InfrastructureError::ConfigError(format!(
                "Unsupported database backend '{}' (expected duckdb or postgresql)",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct PostgresSettings {
    #[validate(length(min = 1, message = "user cannot be empty"))]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[validate(length(min = 1, message = "host cannot be empty"))]
    pub host: String,
    #[serde(default = "default_pg_port")]
    #[validate(range(min = 1))]
    pub port: u16,
    #[validate(length(min = 1, message = "database name cannot be empty"))]
    pub db: String,
}

impl PostgresSettings {
    /// Settings taken from `DB_USER`, `DB_PASS`, `DB_HOST`, `DB_PORT`, `DB_NAME`.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            user: lookup("DB_USER").unwrap_or_else(|| "clinical_user".into()),
            password: lookup("DB_PASS").unwrap_or_default(),
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".into()),
            port: lookup("DB_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_pg_port),
            db: lookup("DB_NAME").unwrap_or_else(|| "clinical_demo".into()),
        }
    }

    /// Connection options built field by field, so credentials need no URL escaping.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_embedded_path", alias = "sqlite_path")]
    pub embedded_path: PathBuf,

    #[validate(nested)]
    pub postgresql: Option<PostgresSettings>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            embedded_path: default_embedded_path(),
            postgresql: None,
        }
    }
}

// --- DATA & DOCS ---

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_person_sample")]
    #[validate(length(min = 1))]
    pub person_sample: String,
    #[serde(default = "default_observation_sample")]
    #[validate(length(min = 1))]
    pub observation_sample: String,
    #[serde(default = "default_code_mapping_sample")]
    pub code_mapping_sample: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_dir: default_data_dir(),
            person_sample: default_person_sample(),
            observation_sample: default_observation_sample(),
            code_mapping_sample: default_code_mapping_sample(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DocsConfig {
    #[serde(default = "default_docs_dir")]
    pub output_dir: PathBuf,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_docs_dir(),
        }
    }
}

// --- REMOTE SERVICES ---

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_host")]
    #[validate(url)]
    pub host: String,
    #[serde(default = "default_model")]
    #[validate(length(min = 1))]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct FhirConfig {
    #[serde(default = "default_fhir_url")]
    #[validate(url)]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            base_url: default_fhir_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct OncologyConfig {
    #[serde(default = "default_cbioportal_url")]
    #[validate(url)]
    pub cbioportal_url: String,
    #[serde(default = "default_oncokb_url")]
    #[validate(url)]
    pub oncokb_url: String,
    #[serde(default)]
    pub oncokb_token: Option<String>,
    #[serde(default = "default_http_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for OncologyConfig {
    fn default() -> Self {
        Self {
            cbioportal_url: default_cbioportal_url(),
            oncokb_url: default_oncokb_url(),
            oncokb_token: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

// --- ROOT ---

#[derive(Debug, Deserialize, Serialize, Clone, Default, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[serde(default)]
    #[validate(nested)]
    pub data: DataConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    #[validate(nested)]
    pub llm: LlmConfig,
    #[serde(default)]
    #[validate(nested)]
    pub fhir: FhirConfig,
    #[serde(default)]
    #[validate(nested)]
    pub oncology: OncologyConfig,

    /// Directory holding the config file. Relative paths resolve against it.
    #[serde(skip)]
    pub root: PathBuf,
}

impl AppConfig {
    pub fn from_yaml(content: &str, root: &Path) -> Result<Self, InfrastructureError> {
        let mut config: AppConfig = serde_yaml::from_str(content)?;
        config.root = root.to_path_buf();
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.data.base_dir)
    }

    pub fn person_sample_path(&self) -> PathBuf {
        self.data_dir().join(&self.data.person_sample)
    }

    pub fn observation_sample_path(&self) -> PathBuf {
        self.data_dir().join(&self.data.observation_sample)
    }

    pub fn code_mapping_path(&self) -> PathBuf {
        self.data_dir().join(&self.data.code_mapping_sample)
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.resolve(&self.docs.output_dir)
    }

    pub fn embedded_db_path(&self) -> PathBuf {
        self.resolve(&self.database.embedded_path)
    }

    /// Where commands persist their shared state between invocations.
    pub fn session_path(&self) -> PathBuf {
        self.root.join(".fhir2omop").join("session.json")
    }

    /// Effective PostgreSQL settings: the config section, or the `DB_*` environment.
    pub fn postgres_settings(&self) -> PostgresSettings {
        self.database
            .postgresql
            .clone()
            .unwrap_or_else(|| PostgresSettings::from_lookup(&|k: &str| std::env::var(k).ok()))
    }
}

// --- LOADER ---

/// Loads the YAML config.
///
/// `path` may be a file, a directory to search, or `None` for the current directory.
#[instrument]
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, InfrastructureError> {
    // 1. Discovery
    let config_path = match path {
        Some(p) if p.is_file() => p.to_path_buf(),
        Some(p) if p.is_dir() => find_main_config(p)?,
        Some(p) => {
            return Err(InfrastructureError::ConfigNotFound(p.display().to_string()));
        }
        None => find_main_config(Path::new("."))?,
    };
    info!(path = ?config_path, "Loading configuration");

    // 2. Parse
    let content = fs::read_to_string(&config_path)?;
    let root = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut config = AppConfig::from_yaml(&content, root)?;

    // 3. Layering
    apply_overrides(&mut config, |key| std::env::var(key).ok())?;

    // 4. Fail fast on bad values
    config.validate()?;

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

/// Environment layering. `lookup` is `std::env::var` outside of tests.
pub fn apply_overrides(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), InfrastructureError> {
    if let Some(val) = lookup("FHIR2OMOP_DB_BACKEND") {
        info!(old = ?config.database.backend, new = %val, "Overriding backend via ENV");
        config.database.backend = val.parse()?;
    }
    if let Some(val) = lookup("FHIR2OMOP_DB_PATH") {
        info!(new = %val, "Overriding embedded database path via ENV");
        config.database.embedded_path = PathBuf::from(val);
    }
    if let Some(val) = lookup("FHIR2OMOP_DOCS_DIR") {
        info!(new = %val, "Overriding docs directory via ENV");
        config.docs.output_dir = PathBuf::from(val);
    }
    if let Some(val) = lookup("OLLAMA_HOST") {
        config.llm.host = val.trim_end_matches('/').to_string();
    }
    if let Some(val) = lookup("ONCOKB_TOKEN") {
        config.oncology.oncokb_token = Some(val);
    }
    if config.database.backend == Backend::Postgresql && config.database.postgresql.is_none() {
        config.database.postgresql = Some(PostgresSettings::from_lookup(&lookup));
    }
    Ok(())
}

// --- DEFAULTS ---

fn default_embedded_path() -> PathBuf {
    PathBuf::from("omop_demo.duckdb")
}
fn default_pg_port() -> u16 {
    5432
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_person_sample() -> String {
    "person_sample.csv".to_string()
}
fn default_observation_sample() -> String {
    "observation_sample.csv".to_string()
}
fn default_code_mapping_sample() -> String {
    "code_mapping_sample.csv".to_string()
}
fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama2".to_string()
}
fn default_llm_timeout() -> u64 {
    120
}
fn default_fhir_url() -> String {
    "https://hapi.fhir.org/baseR4".to_string()
}
fn default_http_timeout() -> u64 {
    30
}
fn default_cbioportal_url() -> String {
    "https://www.cbioportal.org/api".to_string()
}
fn default_oncokb_url() -> String {
    "https://www.oncokb.org/api/v1".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
database:
  backend: sqlite
  sqlite_path: omop_demo.db
data:
  base_dir: data
  person_sample: person_sample.csv
  observation_sample: observation_sample.csv
  code_mapping_sample: code_mapping_sample.csv
docs:
  output_dir: docs
"#;

    #[test]
    fn test_load_from_directory() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("config.yaml"), SAMPLE)?;

        let config = load_config(Some(dir.path()))?;
        assert_eq!(config.database.backend, Backend::Duckdb);
        assert_eq!(config.embedded_db_path(), dir.path().join("omop_demo.db"));
        assert_eq!(
            config.person_sample_path(),
            dir.path().join("data").join("person_sample.csv")
        );
        assert_eq!(config.llm.model, "llama2");
        Ok(())
    }

    #[test]
    fn test_missing_config() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path())).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigNotFound(_)));
    }

    #[test]
    fn test_env_layering() -> Result<()> {
        let mut config = AppConfig::from_yaml(SAMPLE, Path::new("/srv/omop"))?;
        let env: HashMap<&str, &str> = HashMap::from([
            ("FHIR2OMOP_DB_BACKEND", "postgresql"),
            ("FHIR2OMOP_DOCS_DIR", "/tmp/charts"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
        ]);
        apply_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()))?;

        assert_eq!(config.database.backend, Backend::Postgresql);
        assert_eq!(config.docs_dir(), PathBuf::from("/tmp/charts"));
        let pg = config.database.postgresql.unwrap();
        assert_eq!(pg.host, "db.internal");
        assert_eq!(pg.port, 6543);
        assert_eq!(pg.user, "clinical_user");
        Ok(())
    }

    #[test]
    fn test_connect_options_keep_special_characters() {
        let settings = PostgresSettings {
            user: "etl@omop".into(),
            password: "p@ss/w:rd#1".into(),
            host: "db.internal".into(),
            port: 6543,
            db: "clinical/demo".into(),
        };
        let options = settings.connect_options();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "etl@omop");
        assert_eq!(options.get_database(), Some("clinical/demo"));
    }

    #[test]
    fn test_invalid_backend_and_port() {
        let mut config = AppConfig::default();
        let err = apply_overrides(&mut config, |k| {
            (k == "FHIR2OMOP_DB_BACKEND").then(|| "oracle".to_string())
        });
        assert!(err.is_err());

        let bad = r#"
database:
  backend: postgresql
  postgresql: { user: u, password: p, host: h, port: 0, db: d }
"#;
        let config = AppConfig::from_yaml(bad, Path::new(".")).unwrap();
        assert!(config.validate().is_err());
    }
}

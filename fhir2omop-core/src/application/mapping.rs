// fhir2omop-core/src/application/mapping.rs

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::application::engine::execute_query;
use crate::domain::fhir::resource_type;
use crate::domain::mapping::{
    MappedRow, MappingOutcome, ResponseFormat, build_fallback_prompt, map_direct,
    parse_fallback_response,
};
use crate::domain::omop::OmopTable;
use crate::error::OmopError;
use crate::ports::connector::Connector;
use crate::ports::llm::TextGenerator;

pub const DEFAULT_PLAYGROUND_PROMPT: &str = "You are a biomedical data engineer. Map the following data to OMOP. \
Suggest the best OMOP table and field mapping for each column. \
Output as a table with columns: CSV Column, OMOP Table, OMOP Field, Mapping Rationale.";

pub const DEFAULT_SAMPLE_DATA: &str = "['patientId', 'age', 'gender', 'mutation', 'diagnosis']";

#[derive(Debug, Clone, Serialize)]
pub struct MappingResult {
    pub row: MappedRow,
    /// Why the direct rules gave up, when the model was asked.
    pub fallback_reason: Option<String>,
    pub format: Option<ResponseFormat>,
    pub rejected: Vec<String>,
}

impl MappingResult {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Direct rules first, the text-generation service only when they give up.
#[instrument(skip(resource, llm), fields(table = %table))]
pub async fn map_resource(
    resource: &Value,
    table: OmopTable,
    llm: &dyn TextGenerator,
) -> Result<MappingResult, OmopError> {
    let reason = match map_direct(resource, table) {
        MappingOutcome::Mapped(row) => {
            return Ok(MappingResult {
                row,
                fallback_reason: None,
                format: None,
                rejected: Vec::new(),
            });
        }
        MappingOutcome::NeedsFallback(reason) => reason,
    };

    info!(%reason, model = llm.default_model(), "🤖 Asking the model to map the resource");
    let answer = llm.generate(&build_fallback_prompt(resource, table)).await?;
    let mapping = parse_fallback_response(&answer, table)?;
    for r in &mapping.rejected {
        warn!("⚠️ Model output rejected: {}", r);
    }

    Ok(MappingResult {
        row: mapping.row,
        fallback_reason: Some(reason),
        format: Some(mapping.format),
        rejected: mapping.rejected,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: OmopTable,
    pub loaded: usize,
    /// Rows dropped because their primary key was null.
    pub skipped: usize,
    pub fallbacks: usize,
}

/// Maps fetched resources of one type and upserts them by primary key.
#[instrument(skip(resources, connector, llm), fields(count = resources.len()))]
pub async fn map_and_load(
    resources: &[Value],
    resource_type_name: &str,
    connector: &dyn Connector,
    llm: &dyn TextGenerator,
) -> Result<LoadReport, OmopError> {
    let table = OmopTable::for_resource_type(resource_type_name)?;

    let mut rows = Vec::with_capacity(resources.len());
    let mut skipped = 0;
    let mut fallbacks = 0;
    for resource in resources {
        if let Some(actual) = resource_type(resource) {
            if actual != resource_type_name {
                warn!(expected = resource_type_name, actual, "Resource of another type ignored");
                skipped += 1;
                continue;
            }
        }

        let result = map_resource(resource, table, llm).await?;
        if result.used_fallback() {
            fallbacks += 1;
        }
        if result.row.primary_key().is_null() {
            skipped += 1;
            continue;
        }
        rows.push(result.row.values);
    }

    execute_query(connector, &table.create_table_sql(true)).await?;
    let loaded = if rows.is_empty() {
        0
    } else {
        connector.upsert_rows(table, &rows).await?
    };

    info!(%table, loaded, skipped, fallbacks, "💾 Resources loaded");
    Ok(LoadReport {
        table,
        loaded,
        skipped,
        fallbacks,
    })
}

/// Free question to the model.
pub async fn ask(
    llm: &dyn TextGenerator,
    question: &str,
    model: Option<&str>,
) -> Result<String, OmopError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(OmopError::InternalError("Please enter a question.".into()));
    }
    let model = model.unwrap_or(llm.default_model());
    info!(model, "💬 Sending question to the model");
    llm.generate_with_model(model, question).await
}

/// Prompt playground: `custom_prompt` followed by the sample data. Sample data
/// that is not JSON is wrapped as `{"columns": <text>}`.
pub async fn prompt(
    llm: &dyn TextGenerator,
    custom_prompt: &str,
    sample_data: &str,
    model: Option<&str>,
) -> Result<String, OmopError> {
    let model = model.unwrap_or(llm.default_model());
    llm.generate_with_model(model, &playground_prompt(custom_prompt, sample_data))
        .await
}

pub fn playground_prompt(custom_prompt: &str, sample_data: &str) -> String {
    let data = serde_json::from_str::<Value>(sample_data)
        .unwrap_or_else(|_| json!({ "columns": sample_data }));
    let rendered = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
    format!("{}\n\nSample data:\n{}\n", custom_prompt.trim(), rendered)
}

// fhir2omop/src/main.rs

use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug fhir2omop etl ... to see the details
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Etl => commands::etl::execute(config).await,
        Commands::Analytics => commands::analytics::execute(config).await,
        Commands::Qa { csv, table, html } => commands::qa::execute(config, csv, table, html).await,
        Commands::Fetch {
            resource_type,
            count,
        } => commands::fetch::execute(config, &resource_type, count).await,
        Commands::Load { resource_type } => commands::load::execute(config, resource_type).await,
        Commands::Map { file, table } => commands::map::execute(config, &file, &table).await,
        Commands::Ask { question, model } => {
            commands::ask::execute(config, &question, model.as_deref()).await
        }
        Commands::Prompt {
            prompt,
            sample,
            model,
        } => {
            commands::prompt::execute(
                config,
                prompt.as_deref(),
                sample.as_deref(),
                model.as_deref(),
            )
            .await
        }
        Commands::Oncology(command) => commands::oncology::execute(config, command).await,
        Commands::Pipeline(args) => commands::pipeline::execute(config, args).await,
        Commands::Query { query } => commands::query::execute(config, &query).await,
        Commands::Inspect { table, limit } => {
            commands::inspect::execute(config, &table, limit).await
        }
        Commands::Tables => commands::tables::execute(config).await,
    }
}

mod cli;
mod commands;
mod fallback;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use octofhir_rag::config::loader;
use octofhir_rag::observability;

use cli::{Cli, Commands};
use output::{error_message, print_error};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    if let Err(e) = run().await {
        print_error(&error_message(&e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    observability::init_tracing_with_level(cli.log_level.as_deref().unwrap_or("warn"));

    let mut config =
        loader::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.log_level.is_none() && std::env::var_os("RUST_LOG").is_none() {
        observability::apply_logging_level(&config.logging.level);
    }
    if let Some(key) = cli.llm_api_key {
        config.llm.api_key = Some(key);
    }
    if let Some(key) = cli.index_api_key {
        config.index.api_key = Some(key);
    }

    let build = || -> Result<octofhir_rag::PatientResourceRetriever> {
        let retriever = config
            .build_retriever()
            .context("Failed to initialize retriever")?;
        tracing::debug!(
            backend = %config.index.backend,
            model = %config.llm.model,
            "retriever ready"
        );
        Ok(retriever)
    };

    match cli.command {
        Commands::Retrieve(args) => commands::retrieve::run(build()?, args, format).await,
        Commands::PatientName(args) => {
            commands::steps::patient_name(&build()?, args, format).await
        }
        Commands::ResourceTypes(args) => {
            commands::steps::resource_types(&build()?, args, format).await
        }
        Commands::Resolve(args) => commands::steps::resolve(&build()?, args, format).await,
        Commands::Fetch(args) => commands::steps::fetch(&build()?, args, format).await,
        Commands::Config(args) => commands::config::run(&config, args.command, format),
    }
}

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octofhir-rag")]
#[command(about = "OctoFHIR RAG: retrieve a patient's FHIR records for a clinical question")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./octofhir-rag.toml when present)
    #[arg(short, long, global = true, env = "OCTOFHIR_RAG_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log level (overrides logging.level; RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Language model API key
    #[arg(long, global = true, env = "OCTOFHIR_RAG_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    /// Similarity search API key
    #[arg(long, global = true, env = "OCTOFHIR_RAG_INDEX_API_KEY", hide_env_values = true)]
    pub index_api_key: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full retrieval for a question
    Retrieve(RetrieveArgs),
    /// Extract the patient name from a question
    PatientName(QueryArgs),
    /// Infer the FHIR resource types a question is about
    ResourceTypes(QueryArgs),
    /// Resolve a patient name to its identifier
    Resolve(ResolveArgs),
    /// Fetch a patient's records for a question
    Fetch(FetchArgs),
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct RetrieveArgs {
    /// Question, e.g. "What medications is Antone69 allergic to?"
    pub query: String,
    /// Ask on the terminal for the patient name when none is found
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(clap::Args)]
pub struct QueryArgs {
    /// Question text
    pub query: String,
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    /// Patient name (e.g. Antone69)
    pub name: String,
}

#[derive(clap::Args)]
pub struct FetchArgs {
    /// Question text
    pub query: String,
    /// Patient identifier to scope records to
    #[arg(long)]
    pub patient_id: String,
    /// Resource types to steer the search (e.g. AllergyIntolerance,Observation)
    #[arg(long, value_delimiter = ',')]
    pub types: Vec<String>,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (API keys masked)
    Show,
}

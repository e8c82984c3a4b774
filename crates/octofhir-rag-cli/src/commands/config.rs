use anyhow::Result;
use octofhir_rag::RagConfig;

use crate::cli::{ConfigCommands, OutputFormat};
use crate::output::print_json;

pub fn run(config: &RagConfig, command: ConfigCommands, format: OutputFormat) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let shown = config.redacted();
            match format {
                OutputFormat::Json => print_json(&shown)?,
                OutputFormat::Text | OutputFormat::Table => {
                    print!("{}", toml::to_string_pretty(&shown)?);
                }
            }
        }
    }
    Ok(())
}

use anyhow::Result;
use colored::Colorize;
use octofhir_rag::{ConfigError, RetrieverError};
use octofhir_rag_core::{CoreError, ErrorCategory};
use octofhir_rag_core::{OutputDocument, ResourceRecord};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

const CONTENT_WIDTH: usize = 96;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Error chain as one line, tagged with its category when known.
pub fn error_message(err: &anyhow::Error) -> String {
    match error_category(err) {
        Some(category) => format!("[{category}] {err:#}"),
        None => format!("{err:#}"),
    }
}

fn error_category(err: &anyhow::Error) -> Option<ErrorCategory> {
    if let Some(retrieval) = err.downcast_ref::<RetrieverError>() {
        Some(retrieval.category())
    } else if let Some(core) = err.downcast_ref::<CoreError>() {
        Some(core.category())
    } else if err.downcast_ref::<ConfigError>().is_some() {
        Some(ErrorCategory::Configuration)
    } else {
        None
    }
}

/// Summary lines followed by the scored records.
pub fn print_output_table(output: &OutputDocument) {
    println!("{} {}", "Patient:".cyan(), output.patient_name);
    println!("{} {}", "Patient ID:".cyan(), output.patient_id);
    println!("{} {}", "Resource types:".cyan(), output.resource_types);
    print_records_table(&output.records);
}

pub fn print_records_table(records: &[ResourceRecord]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["#", "Score", "Content"]);
    for (i, record) in records.iter().enumerate() {
        builder.push_record([
            (i + 1).to_string(),
            format!("{:.3}", record.score),
            truncate(&record.content, CONTENT_WIDTH),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    println!("Total: {}", records.len());
}

fn truncate(text: &str, width: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

use std::sync::Arc;

use anyhow::Result;
use octofhir_rag::{PatientResourceRetriever, RetrieverError};

use crate::cli::{OutputFormat, RetrieveArgs};
use crate::fallback::TerminalPrompt;
use crate::output::{print_json, print_output_table, print_warning};

pub async fn run(
    retriever: PatientResourceRetriever,
    args: RetrieveArgs,
    format: OutputFormat,
) -> Result<()> {
    let retriever = if args.interactive {
        retriever.with_fallback(Arc::new(TerminalPrompt))
    } else {
        retriever
    };

    let output = retriever
        .retrieve(&args.query)
        .await
        .map_err(|e| explain(e, args.interactive))?;

    if output.records.is_empty() {
        print_warning(&format!(
            "No records for {} cleared the relevance threshold",
            output.patient_name
        ));
    }

    match format {
        OutputFormat::Text => println!("{output}"),
        OutputFormat::Json => print_json(&output)?,
        OutputFormat::Table => print_output_table(&output),
    }
    Ok(())
}

/// Point at `--interactive` when the name could not be resolved without it.
fn explain(err: RetrieverError, interactive: bool) -> anyhow::Error {
    match err {
        RetrieverError::UnresolvedPatientName { .. } if !interactive => {
            anyhow::Error::new(err).context("pass --interactive to enter the patient name")
        }
        other => other.into(),
    }
}

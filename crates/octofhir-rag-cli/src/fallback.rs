use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use colored::Colorize;
use octofhir_rag::{NameFallback, RetrieverError};
use octofhir_rag_core::PatientName;

/// Asks the operator on the terminal when no patient name was found in the
/// question. An empty answer declines.
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn ask(
        query: &str,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> io::Result<Option<PatientName>> {
        writeln!(output, "{} No patient name found in: {query}", "?".yellow())?;
        write!(output, "Could you please help me with the Patient name: ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        Ok(PatientName::new(line).ok())
    }
}

#[async_trait]
impl NameFallback for TerminalPrompt {
    async fn patient_name(&self, query: &str) -> Result<Option<PatientName>, RetrieverError> {
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            Self::ask(&query, &mut io::stdin().lock(), &mut io::stderr().lock())
        })
        .await
        .map_err(|e| RetrieverError::Fallback(e.to_string()))?
        .map_err(|e| RetrieverError::Fallback(format!("failed to read patient name: {e}")))
    }
}

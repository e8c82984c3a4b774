//! Single retrieval steps, for inspecting what each stage produces.

use anyhow::{Context, Result};
use octofhir_rag::PatientResourceRetriever;
use octofhir_rag_core::{NO_NAME_SENTINEL, PatientId, PatientName, ResourceType, ResourceTypeHint};
use serde_json::json;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::{FetchArgs, OutputFormat, QueryArgs, ResolveArgs};
use crate::output::{print_json, print_records_table, print_warning};

pub async fn patient_name(
    retriever: &PatientResourceRetriever,
    args: QueryArgs,
    format: OutputFormat,
) -> Result<()> {
    let name = retriever.extract_patient_name(&args.query).await?.into_name();
    match format {
        OutputFormat::Json => print_json(&json!({
            "resolved": name.is_some(),
            "patient_name": name,
        }))?,
        OutputFormat::Text | OutputFormat::Table => match name {
            Some(name) => println!("{name}"),
            None => {
                print_warning("No patient name found in the question");
                println!("{NO_NAME_SENTINEL}");
            }
        },
    }
    Ok(())
}

pub async fn resource_types(
    retriever: &PatientResourceRetriever,
    args: QueryArgs,
    format: OutputFormat,
) -> Result<()> {
    let hint = retriever.extract_resource_type_hint(&args.query).await?;
    match format {
        OutputFormat::Text => println!("{hint}"),
        OutputFormat::Json => print_json(&hint)?,
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Resource type"]);
            for resource_type in hint.types() {
                builder.push_record([resource_type.as_str()]);
            }
            if hint.is_unfiltered() {
                builder.push_record(["(unspecified)"]);
            }
            println!("{}", builder.build().with(Style::rounded()));
            println!("Model answer: {}", hint.raw().trim());
        }
    }
    Ok(())
}

pub async fn resolve(
    retriever: &PatientResourceRetriever,
    args: ResolveArgs,
    format: OutputFormat,
) -> Result<()> {
    let name = PatientName::new(args.name)?;
    let id = retriever.resolve_patient_identifier(&name).await?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "patient_name": name,
            "patient_id": id,
        }))?,
        OutputFormat::Text | OutputFormat::Table => println!("{id}"),
    }
    Ok(())
}

pub async fn fetch(
    retriever: &PatientResourceRetriever,
    args: FetchArgs,
    format: OutputFormat,
) -> Result<()> {
    let patient_id = PatientId::new(args.patient_id)?;
    let types = args
        .types
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            t.parse::<ResourceType>()
                .with_context(|| format!("--types: '{t}' is not an R4 resource type"))
        })
        .collect::<Result<Vec<_>>>()?;
    let hint = if types.is_empty() {
        ResourceTypeHint::unfiltered()
    } else {
        ResourceTypeHint::from_types(types)
    };

    let records = retriever
        .fetch_resources(&args.query, &hint, &patient_id)
        .await?;
    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                print_warning("No records cleared the relevance threshold");
            }
            for record in &records {
                println!("{}", record.content);
            }
        }
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => print_records_table(&records),
    }
    Ok(())
}

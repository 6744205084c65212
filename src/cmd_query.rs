//! `pagelink query` and `pagelink catalog`.

use std::path::Path;

use anyhow::Context;
use pagelink_dom::Document;
use pagelink_protocols::{ActionRegistry, Query, QueryMap};
use serde_json::{Value, json};

use crate::cli::OutputFormat;

pub(crate) fn run(
    html: &Path,
    url: &str,
    query: Option<String>,
    query_file: Option<&Path>,
    map: bool,
) -> anyhow::Result<()> {
    let source = match (query, query_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Either --query or --query-file is required"),
    };
    let markup = std::fs::read_to_string(html)
        .with_context(|| format!("Failed to read {}", html.display()))?;
    let document = Document::parse_html(&markup, url).context("Failed to parse document")?;

    let output = evaluate(&document, &source, map)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn evaluate(document: &Document, source: &str, map: bool) -> anyhow::Result<Value> {
    if map {
        let query_map: QueryMap = serde_json::from_str(source).context("Invalid query map")?;
        Ok(serde_json::to_value(pagelink_query::evaluate_map(
            document, &query_map, None,
        ))?)
    } else {
        let query: Query = serde_json::from_str(source).context("Invalid query")?;
        Ok(serde_json::to_value(pagelink_query::evaluate(
            document, &query, None,
        ))?)
    }
}

pub(crate) fn catalog(format: OutputFormat) {
    let registry = ActionRegistry::with_host_functions();
    match format {
        OutputFormat::Table => {
            let width = registry.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, action) in registry.iter() {
                println!("{:width$}  {}", name, action.description, width = width);
            }
        }
        OutputFormat::Json => println!("{}", catalog_json(&registry)),
    }
}

fn catalog_json(registry: &ActionRegistry) -> Value {
    registry
        .iter()
        .map(|(name, action)| {
            json!({"name": name, "label": action.label, "description": action.description})
        })
        .collect()
}

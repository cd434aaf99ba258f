//! Command-line driver for the lab analyte normalization engine.
//!
//! Usage: `labnorm <results.json> [analyte]`
//!
//! The input file holds the documents of one user and the lab results
//! extracted from them:
//!
//! ```json
//! {
//!   "documents": [{ "id": "doc-1", "date": "2024-03-01" }],
//!   "results": [{ "document_id": "doc-1", "test_name": "HGB", "value": "14,5", "unit": "г/дл" }]
//! }
//! ```
//!
//! Prints the normalized results and their category grouping as JSON, plus
//! the time series of `analyte` when one is given.

use std::collections::HashMap;

use chrono::NaiveDate;
use labnorm_service::{spawn_refresher, EngineConfig, LabEngine};
use labnorm_types::{AnalyteCount, DocumentLabResult, RawLabResult};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct Document {
    id: String,
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    documents: Vec<Document>,
    results: Vec<DocumentLabResult>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(input_path) = args.next() else {
        return Err("usage: labnorm <results.json> [analyte]".into());
    };
    let analyte = args.next();

    let config = EngineConfig::from_env()?;
    tracing::info!("Loading reference catalog from: {}", config.catalog_path.display());

    let engine = LabEngine::from_config(&config);
    let stats = engine.load().await?;
    tracing::info!(
        "Catalog ready: {} categories, {} analytes, {} synonyms, {} conversions",
        stats.categories,
        stats.analytes,
        stats.synonyms,
        stats.conversions
    );

    let refresher = spawn_refresher(engine.catalog().clone(), config.refresh_interval);

    let input: Input = serde_json::from_str(&std::fs::read_to_string(&input_path)?)?;
    tracing::info!(
        "Read {} results from {} documents",
        input.results.len(),
        input.documents.len()
    );

    let raws: Vec<RawLabResult> = input.results.iter().map(|r| r.result.clone()).collect();
    let normalized = engine.normalize_results(&raws)?;

    // Counts per canonical name, raw name when unresolved, in first-seen order.
    let mut counts: Vec<AnalyteCount> = Vec::new();
    for result in &normalized {
        let name = result
            .canonical_name
            .as_deref()
            .unwrap_or(result.raw.test_name.as_str());
        match counts.iter_mut().find(|c| c.name == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(AnalyteCount::new(name, 1)),
        }
    }
    let categories = engine.group_analytes(&counts)?;

    let mut output = serde_json::json!({
        "normalized": normalized,
        "categories": categories,
    });

    if let Some(analyte) = analyte {
        let dates: HashMap<&str, NaiveDate> = input
            .documents
            .iter()
            .filter_map(|d| d.date.map(|date| (d.id.as_str(), date)))
            .collect();
        let series = engine.build_series(&analyte, &input.results, |doc| dates.get(doc).copied())?;
        tracing::info!(
            "Built '{}' series: {} points, {} dropped",
            analyte,
            series.len(),
            series.dropped_unparseable
        );
        output["series"] = serde_json::to_value(&series)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);

    refresher.abort();
    Ok(())
}

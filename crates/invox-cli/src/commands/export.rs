//! Stage 3: normalize stage-2 records into CSV tables.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, warn};

use invox_core::store::NormalizationStore;

use crate::stages::{Stage2Document, Stage2Payload};

use super::load_config;

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Directory of stage-2 JSON files
    #[arg(default_value = "stage2_output")]
    input_dir: PathBuf,

    /// Output directory for the CSV tables
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

pub async fn run(args: ExportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let output_dir = args.output_dir.unwrap_or(config.export.csv_dir);

    let mut files: Vec<PathBuf> = fs::read_dir(&args.input_dir)
        .with_context(|| format!("cannot read {}", args.input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();

    println!(
        "{} Found {} stage-2 files",
        style("ℹ").blue(),
        files.len()
    );

    let mut store = NormalizationStore::new();
    let mut ingested = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for path in &files {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document");

        let doc: Stage2Document = match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!("cannot read {}: {}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        match doc.invoice_data {
            Stage2Payload::Error(err) => {
                debug!("skipping failed extraction {}: {}", filename, err.error);
                skipped += 1;
            }
            Stage2Payload::Record(record) => {
                match store.ingest(&record, &doc.metadata.source_file) {
                    Ok(outcome) => {
                        debug!(
                            "{} -> invoice {} with {} line items",
                            filename, outcome.invoice_id, outcome.line_items
                        );
                        ingested += 1;
                    }
                    Err(e) => {
                        println!("   {} skipping {}: {}", style("⚠").yellow(), filename, e);
                        skipped += 1;
                    }
                }
            }
        }
    }

    fs::create_dir_all(&output_dir)?;

    let vendors = write_csv(&output_dir.join("vendors.csv"), store.vendors())?;
    let customers = write_csv(&output_dir.join("customers.csv"), store.customers())?;
    let invoices = write_csv(&output_dir.join("invoices.csv"), store.invoices())?;
    let line_items = write_csv(&output_dir.join("line_items.csv"), store.line_items())?;

    let manifest = serde_json::json!({
        "export_date": chrono::Utc::now().to_rfc3339(),
        "total_vendors": vendors,
        "total_customers": customers,
        "total_invoices": invoices,
        "total_line_items": line_items,
        "files": {
            "vendors.csv": "Unique vendors with contact information",
            "customers.csv": "Unique customers with contact information",
            "invoices.csv": "Invoice headers with totals and references",
            "line_items.csv": "Individual line items for each invoice",
        },
        "relationships": {
            "invoices.vendor_id": "→ vendors.vendor_id",
            "invoices.customer_id": "→ customers.customer_id",
            "line_items.invoice_id": "→ invoices.invoice_id",
        },
    });
    let manifest_path = output_dir.join("metadata.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    println!();
    println!("{} Export complete", style("✓").green());
    println!(
        "   {} ingested, {} skipped, {} unreadable",
        style(ingested).green(),
        style(skipped).yellow(),
        style(failed).red()
    );
    println!(
        "   {} vendors, {} customers, {} invoices, {} line items",
        vendors, customers, invoices, line_items
    );
    println!("   Tables: {}", output_dir.display());

    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<usize> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

//! Stage 2: extract structured fields from stage-1 transcriptions.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{debug, warn};

use invox_core::extract::StructuredExtractionEngine;
use invox_core::models::record::ExtractionOutcome;
use invox_core::CompletionService;
use invox_llm::GroqClient;

use crate::stages::{Stage2Document, Stage2Error, Stage2Metadata, Stage2Payload};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Directory of stage-1 JSON files
    #[arg(default_value = "stage1_output")]
    input_dir: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "stage2_output")]
    output_dir: PathBuf,

    /// Model identifier override
    #[arg(long)]
    model: Option<String>,

    /// API key (falls back to the GROQ_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Seconds to wait between requests
    #[arg(long)]
    delay: Option<u64>,

    /// Attempts per document
    #[arg(long)]
    max_retries: Option<u32>,
}

enum DocStatus {
    Success,
    Warnings,
    Failed,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(model) = &args.model {
        config.extraction.model = model.clone();
    }
    if let Some(delay) = args.delay {
        config.extraction.request_delay_secs = delay;
    }
    if let Some(max_retries) = args.max_retries {
        config.extraction.max_retries = max_retries;
    }

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("GROQ_API_KEY").ok())
        .context("no API key: pass --api-key or set GROQ_API_KEY")?;

    let client = GroqClient::new(api_key)?
        .with_api_base(config.extraction.api_base.clone())
        .with_model(config.extraction.model.clone())
        .with_max_tokens(config.extraction.max_tokens)
        .with_temperature(config.extraction.temperature);
    let engine = StructuredExtractionEngine::from_config(client, &config.extraction);

    let mut files: Vec<PathBuf> = fs::read_dir(&args.input_dir)
        .with_context(|| format!("cannot read {}", args.input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().and_then(|e| e.to_str()) == Some("json")
                && path.file_name().and_then(|n| n.to_str()) != Some("batch_summary.json")
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!(
            "no stage-1 files found in {}",
            args.input_dir.display()
        );
    }

    let delay = config.extraction.request_delay_secs;
    println!(
        "{} Found {} stage-1 files ({}s between requests, ~{} min estimated)",
        style("ℹ").blue(),
        files.len(),
        delay,
        files.len() as u64 * delay / 60
    );

    fs::create_dir_all(&args.output_dir)?;

    let mut successful = 0usize;
    let mut warnings = 0usize;
    let mut failed = 0usize;

    let total = files.len();
    for (idx, path) in files.iter().enumerate() {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document");
        println!("[{:3}/{}] {}", idx + 1, total, filename);

        // Per-document failures are recorded, never fatal to the batch.
        let mut extra_delay = 0u64;
        match process_stage1_file(&engine, path, &args.output_dir).await {
            Ok(DocStatus::Success) => {
                successful += 1;
                println!("   {} extracted", style("✓").green());
            }
            Ok(DocStatus::Warnings) => {
                warnings += 1;
                println!("   {} completed with warnings", style("⚠").yellow());
            }
            Ok(DocStatus::Failed) => {
                failed += 1;
                println!("   {} extraction failed", style("✗").red());
            }
            Err(e) => {
                failed += 1;
                warn!("error processing {}: {}", path.display(), e);
                println!("   {} {}", style("✗").red(), e);
                extra_delay = 3;
            }
        }

        // Inter-request delay, to respect the service rate limit.
        let remaining = total - idx - 1;
        if remaining > 0 {
            debug!("waiting {}s before the next request", delay + extra_delay);
            tokio::time::sleep(Duration::from_secs(delay + extra_delay)).await;
        }
    }

    println!();
    println!("{} Stage 2 complete", style("✓").green());
    println!(
        "   {} extracted, {} with warnings, {} failed (of {})",
        style(successful).green(),
        style(warnings).yellow(),
        style(failed).red(),
        total
    );

    Ok(())
}

async fn process_stage1_file<C: CompletionService>(
    engine: &StructuredExtractionEngine<C>,
    path: &Path,
    output_dir: &Path,
) -> anyhow::Result<DocStatus> {
    let content = fs::read_to_string(path)?;
    let stage1: crate::stages::Stage1Document = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a stage-1 document", path.display()))?;

    let outcome = engine.extract(&stage1.ocr.text).await;

    let (payload, status) = match outcome {
        ExtractionOutcome::Record(record) => {
            let issues = record.validation_issues();
            let status = if issues.is_empty() {
                DocStatus::Success
            } else {
                for issue in &issues {
                    warn!("{}: {}", stage1.metadata.filename, issue);
                }
                DocStatus::Warnings
            };
            (Stage2Payload::Record(record), status)
        }
        ExtractionOutcome::Failed(failure) => {
            warn!(
                "{}: extraction failed after {} attempts: {}",
                stage1.metadata.filename, failure.attempts, failure.message
            );
            (
                Stage2Payload::Error(Stage2Error {
                    error: failure.message,
                    extracted: false,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                }),
                DocStatus::Failed,
            )
        }
    };

    let doc = Stage2Document {
        metadata: Stage2Metadata {
            source_file: stage1.metadata.filename.clone(),
            stage1_confidence: stage1.ocr.confidence,
            processed_at: stage1.metadata.processed_at.clone(),
        },
        invoice_data: payload,
    };

    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("document");
    let output_name = match stem.strip_suffix("_stage1") {
        Some(base) => format!("{}_stage2.json", base),
        None => format!("{}_stage2.json", stem),
    };
    let output_path = output_dir.join(output_name);
    fs::write(&output_path, serde_json::to_string_pretty(&doc)?)?;
    debug!("wrote {}", output_path.display());

    Ok(status)
}

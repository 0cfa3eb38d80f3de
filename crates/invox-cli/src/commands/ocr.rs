//! Stage 1: transcribe invoice images with multi-strategy OCR.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use image::GenericImageView;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use invox_core::ocr::{BackendKind, ImageInput, Strategy, TextExtractionEngine};

use crate::stages::{
    BatchInfo, DocumentStatus, Stage1Document, Stage1Metadata, Stage1Summary,
};

use super::{default_model_dir, load_config};

/// Arguments for the ocr command.
#[derive(Args)]
pub struct OcrArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long, default_value = "stage1_output")]
    output_dir: PathBuf,

    /// Backend selection strategy
    #[arg(short, long, value_enum, default_value = "auto")]
    strategy: StrategyArg,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StrategyArg {
    /// Primary backend with confidence-gated fallback
    Auto,
    /// PaddleOCR models only
    Paddle,
    /// Tesseract only
    Tesseract,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Strategy::Auto,
            StrategyArg::Paddle => Strategy::Only(BackendKind::Paddle),
            StrategyArg::Tesseract => Strategy::Only(BackendKind::Tesseract),
        }
    }
}

pub async fn run(args: OcrArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(dir) = &args.model_dir {
        config.ocr.model_dir = dir.clone();
    } else if !config.ocr.model_dir.exists() {
        config.ocr.model_dir = default_model_dir();
    }

    // Construction fails fatally when no backend initializes; that is a
    // deployment problem, not a per-document one.
    let engine = TextExtractionEngine::from_config(&config.ocr)
        .context("no OCR backend could be initialized")?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|entry| entry.ok())
        .filter(|path| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(
                ext.to_lowercase().as_str(),
                "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp"
            )
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("no matching image files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let strategy = Strategy::from(args.strategy);
    let mut results = Vec::with_capacity(files.len());

    for path in &files {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document")
            .to_string();

        // A single document's failure never aborts the batch.
        match process_single(path, &engine, strategy, &args.output_dir) {
            Ok(doc) => {
                debug!(
                    "{}: {} lines via {} ({:.2}%)",
                    filename,
                    doc.ocr.num_lines,
                    doc.ocr.method,
                    doc.ocr.confidence * 100.0
                );
                results.push(DocumentStatus {
                    file: filename,
                    status: "success".to_string(),
                    method: Some(doc.ocr.method),
                    confidence: Some(doc.ocr.confidence),
                    error: None,
                });
            }
            Err(e) => {
                warn!("failed to process {}: {}", path.display(), e);
                results.push(DocumentStatus {
                    file: filename,
                    status: "error".to_string(),
                    method: None,
                    confidence: None,
                    error: Some(e.to_string()),
                });
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let successful = results.iter().filter(|r| r.status == "success").count();
    let failed = results.len() - successful;
    let total_time_ms = start.elapsed().as_millis() as u64;

    let summary = Stage1Summary {
        batch_info: BatchInfo {
            total_files: files.len(),
            successful,
            failed,
            total_time_ms,
            avg_time_ms: total_time_ms / files.len() as u64,
            processed_at: chrono::Utc::now().to_rfc3339(),
        },
        results,
    };

    let summary_path = args.output_dir.join("batch_summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        files.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed).red()
    );
    println!("   Summary: {}", summary_path.display());

    if failed > 0 {
        println!();
        println!("{}", style("Failed files:").red());
        for result in summary.results.iter().filter(|r| r.status == "error") {
            println!(
                "  - {}: {}",
                result.file,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single(
    path: &Path,
    engine: &TextExtractionEngine,
    strategy: Strategy,
    output_dir: &Path,
) -> anyhow::Result<Stage1Document> {
    let file_start = Instant::now();

    let image =
        image::open(path).with_context(|| format!("cannot decode {}", path.display()))?;
    let (width, height) = image.dimensions();

    let transcription = engine.extract(ImageInput::Image(image), strategy)?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .to_string();

    let doc = Stage1Document {
        metadata: Stage1Metadata {
            filename,
            file_path: path.display().to_string(),
            processed_at: chrono::Utc::now().to_rfc3339(),
            processing_time_ms: file_start.elapsed().as_millis() as u64,
            image_size: [width, height],
        },
        ocr: transcription.into(),
    };

    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("document");
    let output_path = output_dir.join(format!("{}_stage1.json", stem));
    fs::write(&output_path, serde_json::to_string_pretty(&doc)?)?;
    debug!("wrote {}", output_path.display());

    Ok(doc)
}

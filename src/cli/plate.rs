// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::config::PlateConfig;
use crate::vision::batch::{process_directory, DEFAULT_CONCURRENCY};
use crate::vision::model_manager::{self, PlateModelManager};
use crate::vision::plate::PlateResult;

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Image to read (.jpg, .jpeg, .png)
    pub image: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the annotate command
#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// Image to read
    pub image: PathBuf,

    /// Where to write the annotated copy (format from extension)
    pub output: PathBuf,
}

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory containing images
    pub dir: PathBuf,

    /// JSON report path
    #[arg(long, default_value = "plate_report.json")]
    pub output: PathBuf,

    /// Images processed at the same time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

pub async fn detect(config: &PlateConfig, args: DetectArgs) -> Result<()> {
    let manager = PlateModelManager::new(config).await?;
    let pipeline = manager.pipeline();

    let image = args.image.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.recognize_path(&image))
        .await
        .context("Recognition task panicked")??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&args.image, &result);
    }
    Ok(())
}

pub async fn annotate(config: &PlateConfig, args: AnnotateArgs) -> Result<()> {
    let manager = PlateModelManager::new(config).await?;
    let pipeline = manager.pipeline();

    let AnnotateArgs { image, output } = args;
    let target = output.clone();
    let (result, written) = tokio::task::spawn_blocking(move || {
        crate::vision::annotate::annotate(&pipeline, &image, &target)
    })
    .await
    .context("Annotation task panicked")??;

    if written {
        println!("✅ Annotated image saved to {}", output.display());
    } else {
        println!("⚠️  {}", result.outcome.user_message());
    }
    Ok(())
}

pub async fn batch(config: &PlateConfig, args: BatchArgs) -> Result<()> {
    let manager = PlateModelManager::new(config).await?;
    let pipeline = manager.pipeline();

    let report = process_directory(&pipeline, &args.dir, args.concurrency).await?;
    report.write_json(&args.output).await?;

    println!("\n📋 Batch Summary:");
    println!("  Images:     {}", report.total);
    println!("  Recognized: {}", report.recognized);
    println!("  Failed:     {}", report.failed);
    println!("  Report:     {}", args.output.display());
    Ok(())
}

pub async fn fetch_models(config: &PlateConfig) -> Result<()> {
    let paths = model_manager::fetch_models(config).await?;

    println!("✅ Model artifacts ready:");
    println!("  Detector:   {}", paths.detector.display());
    println!("  Recognizer: {}", paths.recognizer.display());
    println!("  Dictionary: {}", paths.dictionary.display());
    Ok(())
}

pub async fn list_models(config: &PlateConfig) -> Result<()> {
    let manager = PlateModelManager::new(config).await?;
    for model in manager.list_models() {
        let status = if model.available { "✅" } else { "❌" };
        println!(
            "{} {:<18} {:<12} {}",
            status,
            model.name,
            model.model_type,
            model.path.display()
        );
    }
    Ok(())
}

fn print_result(image: &std::path::Path, result: &PlateResult) {
    info!("Result for {}: {:?}", image.display(), result.outcome);

    if result.is_success() {
        println!("✅ Plate:               {}", result.text);
        println!("   Detection confidence: {:.2}", result.confidence);
        println!("   OCR confidence:       {:.2}", result.ocr_confidence);
    } else {
        println!("⚠️  {}", result.outcome.user_message());
        if result.bbox.is_some() {
            println!("   Detection confidence: {:.2}", result.confidence);
        }
    }

    if let Some(bbox) = result.bbox {
        println!(
            "   Box:                  ({}, {}) - ({}, {})",
            bbox.x1, bbox.y1, bbox.x2, bbox.y2
        );
    }
}

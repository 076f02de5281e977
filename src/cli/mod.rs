// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod plate;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PlateConfig;

/// License plate reader CLI
#[derive(Parser, Debug)]
#[command(name = "plate-reader")]
#[command(version)]
#[command(about = "Detect and read vehicle license plates from photographs", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command; they override config file and env
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML config file
    #[arg(long, global = true, env = "PLATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Plate detection model (.onnx)
    #[arg(long, global = true)]
    pub detector_model: Option<PathBuf>,

    /// Minimum detection confidence (0-1)
    #[arg(long, global = true)]
    pub confidence: Option<f32>,

    /// IoU threshold for overlapping detections (0-1)
    #[arg(long, global = true)]
    pub iou: Option<f32>,
}

impl GlobalArgs {
    /// Resolve the effective configuration
    pub fn load_config(&self) -> Result<PlateConfig> {
        let mut config = PlateConfig::load(self.config.as_deref())?;
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_to(&self, config: &mut PlateConfig) {
        if let Some(path) = &self.detector_model {
            config.detector_model_path = path.clone();
        }
        if let Some(confidence) = self.confidence {
            config.confidence_threshold = confidence;
        }
        if let Some(iou) = self.iou {
            config.iou_threshold = iou;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize the plate in one image
    Detect(plate::DetectArgs),

    /// Save a copy of the image with the detected plate outlined
    Annotate(plate::AnnotateArgs),

    /// Process every image in a directory and write a JSON report
    Batch(plate::BatchArgs),

    /// Download any missing model artifacts
    FetchModels,

    /// Load the models and list them
    ListModels,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.global.load_config()?;

    match cli.command {
        Commands::Detect(args) => plate::detect(&config, args).await,
        Commands::Annotate(args) => plate::annotate(&config, args).await,
        Commands::Batch(args) => plate::batch(&config, args).await,
        Commands::FetchModels => plate::fetch_models(&config).await,
        Commands::ListModels => plate::list_models(&config).await,
    }
}

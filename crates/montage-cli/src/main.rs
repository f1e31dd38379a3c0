//! Montage CLI: stitch images into one vertical strip or horizontal row.
//!
//! Engine limits come from MONTAGE_MAX_IMAGE_PIXELS, MONTAGE_JPEG_QUALITY and
//! MONTAGE_FAILURE_POLICY (a `.env` file is honoured).

use anyhow::Context;
use clap::Parser;
use montage_cli::{build_entries, format_from_path, init_tracing, FilterArg, RotateArg};
use montage_core::{
    Align, EngineConfig, FailurePolicy, MergeOptions, OutputFormat, Spacing, TargetWidth,
};
use montage_processing::{ImageOutcome, MergeEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "montage", about = "Merge images into a single strip")]
struct Cli {
    /// Images to merge, in order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Where to write the merged image
    #[arg(short, long)]
    output: PathBuf,

    /// Cross-axis size in pixels, or keep-original
    #[arg(long, default_value = "keep-original")]
    width: TargetWidth,

    /// Gap between images: none, narrow, normal or wide
    #[arg(long, default_value = "none")]
    spacing: Spacing,

    /// Merge direction: vertical or horizontal
    #[arg(long, default_value = "vertical")]
    align: Align,

    /// Output format: png or jpg (defaults to the output file extension)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Rotate image INDEX counter-clockwise, as INDEX:DEGREES
    #[arg(long = "rotate", value_name = "INDEX:DEGREES")]
    rotations: Vec<RotateArg>,

    /// Mirror image INDEX horizontally
    #[arg(long = "flip", value_name = "INDEX", value_parser = montage_cli::parse_index)]
    flips: Vec<usize>,

    /// Set a filter on image INDEX, as INDEX:NAME=VALUE
    #[arg(long = "filter", value_name = "INDEX:NAME=VALUE")]
    filters: Vec<FilterArg>,

    /// Leave out unreadable images instead of failing
    #[arg(long)]
    skip_unreadable: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env().context("Invalid engine configuration")?;
    if cli.skip_unreadable {
        config = config.with_failure_policy(FailurePolicy::Skip);
    }

    let images = build_entries(&cli.images, &cli.rotations, &cli.flips, &cli.filters)?;
    let output_format = cli
        .format
        .or_else(|| format_from_path(&cli.output))
        .unwrap_or_default();
    let options = MergeOptions {
        target_width: cli.width,
        spacing: cli.spacing,
        align: cli.align,
        output_format,
    };

    let engine = Arc::new(MergeEngine::new(config));
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling merge");
            interrupt.cancel();
        }
    });

    let worker = Arc::clone(&engine);
    let token = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut last_logged = 0.0f32;
        worker.run(
            &images,
            &options,
            |percent| {
                if percent - last_logged >= 10.0 || percent >= 100.0 {
                    tracing::info!(percent = percent.round(), "Merging");
                    last_logged = percent;
                }
            },
            &token,
        )
    })
    .await
    .context("Merge worker stopped unexpectedly")??;

    for outcome in result.skipped() {
        if let ImageOutcome::Failed { path, error, .. } = outcome {
            tracing::warn!(path = %path.display(), error = %error, "Image left out");
        }
    }

    tokio::fs::write(&cli.output, &result.encoded)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    let (width, height) = result.dimensions();
    tracing::info!(
        path = %cli.output.display(),
        width = width,
        height = height,
        bytes = result.encoded.len(),
        "Wrote merged image"
    );

    Ok(())
}

//! Merge pipeline: load, transform, resize, composite, encode
//!
//! A run walks the inputs strictly in order. Each image is decoded, put
//! through its own transform and filter state, resized to the shared cross
//! axis and finally copied onto the canvas. Intermediate rasters are moved
//! from stage to stage and released as soon as the next stage has consumed
//! them.

use crate::compression::ImageEncoder;
use crate::image::{Compositor, ImageLoader, ImageResize, ImageTransformer};
use crate::progress::{ProgressPhase, ProgressTracker};
use bytes::Bytes;
use image::{DynamicImage, GenericImageView};
use montage_core::{
    EngineConfig, FailurePolicy, ImageEntry, MergeError, MergeOptions, MergeStage, OutputFormat,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What happened to one input during a run
#[derive(Debug)]
pub enum ImageOutcome {
    /// Placed on the canvas at the given size
    Merged {
        index: usize,
        path: PathBuf,
        width: u32,
        height: u32,
    },
    /// Left out under the skip policy
    Failed {
        index: usize,
        path: PathBuf,
        error: MergeError,
    },
}

impl ImageOutcome {
    pub fn index(&self) -> usize {
        match self {
            ImageOutcome::Merged { index, .. } | ImageOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ImageOutcome::Merged { path, .. } | ImageOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, ImageOutcome::Merged { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Success,
    /// Some inputs were skipped; the output holds the rest
    PartialFailure,
}

/// Output of a completed merge
#[derive(Debug)]
pub struct MergeResult {
    pub run_id: Uuid,
    /// Final raster, already in the layout the output format stores
    pub image: DynamicImage,
    /// Encoded file contents
    pub encoded: Bytes,
    pub format: OutputFormat,
    /// One entry per input, in input order
    pub outcomes: Vec<ImageOutcome>,
    pub status: MergeStatus,
}

impl MergeResult {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// File name for saving the output, e.g. `merged.png`
    pub fn suggested_file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes.iter().filter(|o| !o.is_merged())
    }
}

/// Runs merges with a fixed configuration.
///
/// One engine runs at most one merge at a time; a second `run` while one is in
/// flight fails with `MergeError::MergeInProgress`. Share the engine behind an
/// `Arc` to enforce this across threads.
#[derive(Debug)]
pub struct MergeEngine {
    config: EngineConfig,
    busy: AtomicBool,
    stage: Mutex<MergeStage>,
}

/// Clears the busy flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, MergeError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MergeError::MergeInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MergeEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            busy: AtomicBool::new(false),
            stage: Mutex::new(MergeStage::Idle),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stage of the current or most recent run
    pub fn stage(&self) -> MergeStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_stage(&self, stage: MergeStage) {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
        tracing::debug!(stage = ?stage, "Merge stage");
    }

    /// Merge `images` in order into one raster and encode it.
    ///
    /// `on_progress` receives non-decreasing percentages and is called with
    /// exactly 100 once the output is encoded. `cancel` is checked before each
    /// image is processed; a cancelled run releases everything it allocated
    /// and returns `MergeError::Cancelled`.
    pub fn run<F>(
        &self,
        images: &[ImageEntry],
        options: &MergeOptions,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<MergeResult, MergeError>
    where
        F: FnMut(f32),
    {
        let _guard = RunGuard::acquire(&self.busy)?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("merge", run_id = %run_id);
        let _enter = span.enter();

        tracing::info!(
            images = images.len(),
            width = %options.target_width,
            spacing = options.spacing_pixels(),
            align = ?options.align,
            format = options.output_format.extension(),
            "Starting merge"
        );

        let result = self.execute(run_id, images, options, on_progress, cancel);
        match &result {
            Ok(merged) => {
                self.set_stage(MergeStage::Done);
                let (width, height) = merged.dimensions();
                tracing::info!(
                    width = width,
                    height = height,
                    bytes = merged.encoded.len(),
                    status = ?merged.status,
                    "Merge completed"
                );
            }
            Err(err) => {
                self.set_stage(MergeStage::Failed);
                tracing::warn!(error = %err, code = err.error_code(), "Merge failed");
            }
        }
        result
    }

    fn execute<F>(
        &self,
        run_id: Uuid,
        images: &[ImageEntry],
        options: &MergeOptions,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<MergeResult, MergeError>
    where
        F: FnMut(f32),
    {
        if images.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        let total = images.len();
        let loader = ImageLoader::new(self.config.max_image_pixels);
        let mut progress = ProgressTracker::new(on_progress);
        let mut outcomes = Vec::with_capacity(total);
        let mut prepared: Vec<(usize, &Path, DynamicImage)> = Vec::with_capacity(total);

        for (index, entry) in images.iter().enumerate() {
            Self::check_cancelled(cancel)?;
            self.set_stage(MergeStage::Loading);

            match loader.load(&entry.path) {
                Ok(img) => {
                    self.set_stage(MergeStage::Transforming);
                    let img = ImageTransformer::apply(img, &entry.transform, &entry.filter);
                    prepared.push((index, entry.path.as_path(), img));
                }
                Err(err) => self.skip_or_fail(index, &entry.path, err, &mut outcomes)?,
            }
            progress.report(ProgressPhase::Loading, index + 1, total);
        }

        if prepared.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        self.set_stage(MergeStage::Resizing);
        let survivors = prepared.len();
        let mut resized = Vec::with_capacity(survivors);
        for (done, (index, path, img)) in prepared.into_iter().enumerate() {
            Self::check_cancelled(cancel)?;
            match self.resize(path, img, options) {
                Ok(img) => {
                    let (width, height) = img.dimensions();
                    outcomes.push(ImageOutcome::Merged {
                        index,
                        path: path.to_path_buf(),
                        width,
                        height,
                    });
                    resized.push(img);
                }
                Err(err) => self.skip_or_fail(index, path, err, &mut outcomes)?,
            }
            progress.report(ProgressPhase::Resizing, done + 1, survivors);
        }

        if resized.is_empty() {
            return Err(MergeError::EmptyInput);
        }

        Self::check_cancelled(cancel)?;
        self.set_stage(MergeStage::Compositing);
        // One extra unit so that encoding completes the band.
        let steps = resized.len() + 1;
        let compositor = Compositor::new(self.config.max_image_pixels);
        let canvas = compositor.compose(
            resized,
            options.align,
            options.spacing_pixels(),
            |placed| progress.report(ProgressPhase::Compositing, placed, steps),
        )?;

        Self::check_cancelled(cancel)?;
        self.set_stage(MergeStage::Encoding);
        let image = ImageEncoder::prepare(canvas, options.output_format);
        let encoded =
            ImageEncoder::encode(&image, options.output_format, self.config.jpeg_quality)?;
        progress.report(ProgressPhase::Compositing, steps, steps);

        outcomes.sort_by_key(ImageOutcome::index);
        let status = if outcomes.iter().all(ImageOutcome::is_merged) {
            MergeStatus::Success
        } else {
            MergeStatus::PartialFailure
        };

        Ok(MergeResult {
            run_id,
            image,
            encoded,
            format: options.output_format,
            outcomes,
            status,
        })
    }

    fn resize(
        &self,
        path: &Path,
        img: DynamicImage,
        options: &MergeOptions,
    ) -> Result<DynamicImage, MergeError> {
        let Some((width, height)) =
            ImageResize::target_dimensions(&img, options.target_width, options.align)
        else {
            return Ok(img);
        };

        let too_large = || MergeError::ImageTooLarge {
            path: Some(path.to_path_buf()),
            width,
            height,
            max_pixels: self.config.max_image_pixels,
        };
        if width.saturating_mul(height) > self.config.max_image_pixels {
            return Err(too_large());
        }
        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(too_large());
        };

        Ok(ImageResize::resize_image(img, width, height))
    }

    /// Record a per-image failure under the skip policy, or propagate it.
    fn skip_or_fail(
        &self,
        index: usize,
        path: &Path,
        err: MergeError,
        outcomes: &mut Vec<ImageOutcome>,
    ) -> Result<(), MergeError> {
        if self.config.failure_policy != FailurePolicy::Skip || !err.is_per_image() {
            return Err(err);
        }
        tracing::warn!(
            index = index,
            path = %path.display(),
            error = %err,
            "Skipping image"
        );
        outcomes.push(ImageOutcome::Failed {
            index,
            path: path.to_path_buf(),
            error: err,
        });
        Ok(())
    }

    fn check_cancelled(cancel: &CancellationToken) -> Result<(), MergeError> {
        if cancel.is_cancelled() {
            tracing::info!("Merge cancelled");
            return Err(MergeError::Cancelled);
        }
        Ok(())
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Merge with the default configuration and no cancellation.
pub fn merge_images<F>(
    images: &[ImageEntry],
    options: &MergeOptions,
    on_progress: F,
) -> Result<MergeResult, MergeError>
where
    F: FnMut(f32),
{
    MergeEngine::default().run(images, options, on_progress, &CancellationToken::new())
}

//! Montage image composition engine
//!
//! Loads an ordered list of images, applies each image's transform and filter
//! state, resizes them to a shared cross-axis size, and stitches them into a
//! single raster.

pub mod compression;
pub mod image;
pub mod pipeline;
pub mod progress;

pub use compression::ImageEncoder;
pub use crate::image::{
    Compositor, ImageFilters, ImageLoader, ImageOrientation, ImageResize, ImageTransformer,
};
pub use pipeline::{merge_images, ImageOutcome, MergeEngine, MergeResult, MergeStatus};
pub use progress::{ProgressPhase, ProgressTracker};

pub use tokio_util::sync::CancellationToken;

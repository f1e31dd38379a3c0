use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use montage_core::{Align, TargetWidth};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Calculate the size an image takes so that its cross-axis extent
    /// (width for vertical stacks, height for horizontal rows) equals
    /// `target`, preserving aspect ratio.
    pub fn calculate_dimensions(
        orig_width: u32,
        orig_height: u32,
        target: u32,
        align: Align,
    ) -> (u64, u64) {
        let (w, h) = (orig_width.max(1) as f64, orig_height.max(1) as f64);
        match align {
            Align::Vertical => {
                let height = (h * target as f64 / w).round() as u64;
                (u64::from(target), height.max(1))
            }
            Align::Horizontal => {
                let width = (w * target as f64 / h).round() as u64;
                (width.max(1), u64::from(target))
            }
        }
    }

    /// Dimensions after resizing for the merge, or `None` when the image is
    /// kept at its original size.
    pub fn target_dimensions(
        img: &DynamicImage,
        target: TargetWidth,
        align: Align,
    ) -> Option<(u64, u64)> {
        let (width, height) = img.dimensions();
        target
            .as_pixels()
            .map(|pixels| Self::calculate_dimensions(width, height, pixels, align))
    }

    /// Resize to exact dimensions with Lanczos resampling
    pub fn resize_image(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
        if img.dimensions() == (width, height) {
            return img;
        }
        tracing::debug!(
            from_width = img.width(),
            from_height = img.height(),
            to_width = width,
            to_height = height,
            "Resizing image"
        );
        img.resize_exact(width, height, FilterType::Lanczos3)
    }
}

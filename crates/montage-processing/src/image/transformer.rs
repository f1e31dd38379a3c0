//! Image transformer - the fixed per-image pipeline
//!
//! Chains the geometric and tonal operations of one source image in a fixed
//! order: rotation, horizontal flip, brightness, contrast, saturation,
//! posterize. Stages at their default value are skipped.

use crate::image::filters::ImageFilters;
use crate::image::orientation::ImageOrientation;
use image::DynamicImage;
use montage_core::{FilterState, TransformState};

pub struct ImageTransformer;

impl ImageTransformer {
    /// Apply one image's transform and filter state.
    ///
    /// Also used for previews, so the merge and a preview of the same state
    /// produce identical pixels.
    pub fn apply(
        img: DynamicImage,
        transform: &TransformState,
        filter: &FilterState,
    ) -> DynamicImage {
        let mut img = img;

        let angle = transform.rotation_degrees();
        if angle != 0 {
            tracing::debug!(angle = angle, "Applying rotation");
            img = ImageOrientation::rotate_by_angle(img, angle);
        }

        if transform.flipped_horizontally() {
            tracing::debug!("Applying horizontal flip");
            img = ImageOrientation::apply_flip_horizontal(img);
        }

        if !filter.is_default() {
            tracing::debug!(?filter, "Applying image filters");
            img = ImageFilters::apply(img, filter);
        }

        img
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use montage_core::FilterKind;

    fn red_blue() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_default_state_is_identity() {
        let out = ImageTransformer::apply(
            red_blue(),
            &TransformState::default(),
            &FilterState::default(),
        );
        assert_eq!(out, red_blue());
    }

    #[test]
    fn test_four_quarter_turns_restore_image() {
        let mut transform = TransformState::default();
        let mut img = red_blue();
        for _ in 0..4 {
            transform.add_rotation(90).unwrap();
        }
        assert_eq!(transform.rotation_degrees(), 0);

        for _ in 0..4 {
            let mut quarter = TransformState::default();
            quarter.set_rotation(90).unwrap();
            img = ImageTransformer::apply(img, &quarter, &FilterState::default());
        }
        assert_eq!(img, red_blue());
    }

    #[test]
    fn test_rotation_happens_before_flip() {
        let mut transform = TransformState::default();
        transform.set_rotation(90).unwrap();
        transform.toggle_flip();

        // Rotating a 2x1 row gives a 1x2 column; a horizontal flip of a
        // single column leaves it unchanged.
        let out = ImageTransformer::apply(red_blue(), &transform, &FilterState::default());
        let rgb = out.to_rgb8();
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_filters_follow_geometry() {
        let mut transform = TransformState::default();
        transform.toggle_flip();
        let mut filter = FilterState::default();
        filter.set_filter(FilterKind::Brightness, 0.0).unwrap();

        let out = ImageTransformer::apply(red_blue(), &transform, &filter);
        assert_eq!(out.dimensions(), (2, 1));
        assert!(out.to_rgb8().pixels().all(|p| p.0 == [0, 0, 0]));
    }
}

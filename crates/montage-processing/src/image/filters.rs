use image::DynamicImage;
use montage_core::{FilterKind, FilterState};

pub struct ImageFilters;

impl ImageFilters {
    /// Apply the tonal filters of `state` in fixed order:
    /// brightness, contrast, saturation, posterize.
    ///
    /// Filters sitting at their neutral value are skipped, so a default state
    /// returns the input pixels unchanged. Alpha is never touched.
    pub fn apply(img: DynamicImage, state: &FilterState) -> DynamicImage {
        let mut result = img;

        if !state.is_identity(FilterKind::Brightness) {
            result = Self::adjust_brightness(result, state.get(FilterKind::Brightness));
        }

        if !state.is_identity(FilterKind::Contrast) {
            result = Self::adjust_contrast(result, state.get(FilterKind::Contrast));
        }

        if !state.is_identity(FilterKind::Saturation) {
            result = Self::adjust_saturation(result, state.get(FilterKind::Saturation));
        }

        if !state.is_identity(FilterKind::Posterize) {
            result = Self::apply_posterize(result, state.get(FilterKind::Posterize));
        }

        result
    }

    /// Scale every channel by `factor` (1.0 is no change, 0.0 is black)
    pub fn adjust_brightness(img: DynamicImage, factor: f32) -> DynamicImage {
        map_rgb(img, |[r, g, b]| {
            [
                to_channel(r as f32 * factor),
                to_channel(g as f32 * factor),
                to_channel(b as f32 * factor),
            ]
        })
    }

    /// Stretch channels away from mid-gray by `factor` (1.0 is no change)
    pub fn adjust_contrast(img: DynamicImage, factor: f32) -> DynamicImage {
        let intercept = 128.0 * (1.0 - factor);
        map_rgb(img, |[r, g, b]| {
            [
                to_channel(r as f32 * factor + intercept),
                to_channel(g as f32 * factor + intercept),
                to_channel(b as f32 * factor + intercept),
            ]
        })
    }

    /// Interpolate between the pixel's luma and its color (0.0 is grayscale)
    pub fn adjust_saturation(img: DynamicImage, factor: f32) -> DynamicImage {
        map_rgb(img, |[r, g, b]| {
            let (r, g, b) = (r as f32, g as f32, b as f32);
            let gray = 0.299 * r + 0.587 * g + 0.114 * b;
            [
                to_channel(gray + (r - gray) * factor),
                to_channel(gray + (g - gray) * factor),
                to_channel(gray + (b - gray) * factor),
            ]
        })
    }

    /// Reduce each channel to a limited number of levels.
    ///
    /// 3.0 keeps all 256 levels; lower values remove progressively more.
    pub fn apply_posterize(img: DynamicImage, value: f32) -> DynamicImage {
        let levels = Self::posterize_levels(value);
        if levels >= 256 {
            return img;
        }

        let mut table = [0u8; 256];
        let step = 255.0 / (levels - 1) as f32;
        for (c, slot) in table.iter_mut().enumerate() {
            let bucket = (c as u32 * levels / 256) as f32;
            *slot = to_channel(bucket * step);
        }

        map_rgb(img, |[r, g, b]| {
            [table[r as usize], table[g as usize], table[b as usize]]
        })
    }

    /// Number of output levels per channel for a posterize value in 1..=3
    pub fn posterize_levels(value: f32) -> u32 {
        let levels = (256.0 / (1.0 + (3.0 - value) * 3.0)).floor();
        (levels as u32).clamp(2, 256)
    }
}

fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Map the color channels of every pixel, leaving alpha and layout intact.
fn map_rgb<F>(img: DynamicImage, f: F) -> DynamicImage
where
    F: Fn([u8; 3]) -> [u8; 3],
{
    match img {
        DynamicImage::ImageRgb8(mut buf) => {
            for pixel in buf.pixels_mut() {
                pixel.0 = f(pixel.0);
            }
            DynamicImage::ImageRgb8(buf)
        }
        DynamicImage::ImageRgba8(mut buf) => {
            for pixel in buf.pixels_mut() {
                let [r, g, b, a] = pixel.0;
                let [r, g, b] = f([r, g, b]);
                pixel.0 = [r, g, b, a];
            }
            DynamicImage::ImageRgba8(buf)
        }
        other if other.color().has_alpha() => {
            map_rgb(DynamicImage::ImageRgba8(other.into_rgba8()), f)
        }
        other => map_rgb(DynamicImage::ImageRgb8(other.into_rgb8()), f),
    }
}

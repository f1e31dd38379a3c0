use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use montage_core::{MergeError, OutputFormat, QualityPreset};
use std::io::Cursor;

/// Encodes the composed canvas into the requested output format
pub struct ImageEncoder;

impl ImageEncoder {
    /// Bring the canvas into a pixel layout the format can store.
    ///
    /// JPEG has no alpha channel, so transparent areas are flattened onto an
    /// opaque white background. PNG keeps the canvas as is.
    pub fn prepare(img: DynamicImage, format: OutputFormat) -> DynamicImage {
        if format.supports_alpha() || !img.color().has_alpha() {
            return img;
        }
        DynamicImage::ImageRgb8(Self::flatten_on_white(&img))
    }

    /// Encode with specified format and quality
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: QualityPreset,
    ) -> Result<Bytes, MergeError> {
        let data = match format {
            OutputFormat::Png => Self::encode_png(img)?,
            OutputFormat::Jpg => Self::encode_jpeg(img, quality)?,
        };

        tracing::debug!(
            format = format.extension(),
            bytes = data.len(),
            "Encoded merged image"
        );

        Ok(data)
    }

    fn encode_jpeg(img: &DynamicImage, quality: QualityPreset) -> Result<Bytes, MergeError> {
        let rgb = match img {
            DynamicImage::ImageRgb8(rgb) => rgb.clone(),
            other if other.color().has_alpha() => Self::flatten_on_white(other),
            other => other.to_rgb8(),
        };

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality())
            .encode_image(&rgb)
            .map_err(|e| MergeError::Encoding(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    fn encode_png(img: &DynamicImage) -> Result<Bytes, MergeError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| MergeError::Encoding(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    fn flatten_on_white(img: &DynamicImage) -> RgbImage {
        let rgba = img.to_rgba8();
        let mut flat = RgbImage::new(rgba.width(), rgba.height());
        for (src, dst) in rgba.pixels().zip(flat.pixels_mut()) {
            let [r, g, b, a] = src.0;
            let alpha = u32::from(a);
            let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
            dst.0 = [blend(r), blend(g), blend(b)];
        }
        flat
    }
}

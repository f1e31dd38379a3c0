use image::error::{ImageError, LimitErrorKind};
use image::{DynamicImage, ImageFormat, ImageReader};
use montage_core::{is_supported_path, MergeError, MergeStage};
use std::io::Cursor;
use std::path::Path;

/// Decodes source files into in-memory rasters
#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    max_pixels: u64,
}

impl ImageLoader {
    pub fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    /// Read and decode one image.
    ///
    /// Dimensions are checked against the pixel ceiling from the header before
    /// any pixel data is decoded. The result is normalized to 8-bit RGB, or
    /// RGBA when the source carries alpha.
    pub fn load(&self, path: &Path) -> Result<DynamicImage, MergeError> {
        if !is_supported_path(path) {
            return Err(MergeError::ImageFormatUnsupported {
                path: path.to_path_buf(),
                reason: "expected a .png, .jpg or .jpeg file".to_string(),
            });
        }

        let data = std::fs::read(path).map_err(|e| MergeError::ImageNotReadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let (width, height) = Self::dimensions(path, &data)?;
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_pixels {
            return Err(MergeError::ImageTooLarge {
                path: Some(path.to_path_buf()),
                width: u64::from(width),
                height: u64::from(height),
                max_pixels: self.max_pixels,
            });
        }

        let img = Self::reader(path, &data)?
            .decode()
            .map_err(|e| Self::map_decode_error(path, width, height, self.max_pixels, e))?;

        tracing::debug!(
            path = %path.display(),
            width = width,
            height = height,
            color = ?img.color(),
            "Decoded image"
        );

        Ok(Self::normalize(img))
    }

    /// Validate the container format and read dimensions without decoding.
    pub fn dimensions(path: &Path, data: &[u8]) -> Result<(u32, u32), MergeError> {
        Self::reader(path, data)?
            .into_dimensions()
            .map_err(|e| MergeError::ImageFormatUnsupported {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn reader<'a>(
        path: &Path,
        data: &'a [u8],
    ) -> Result<ImageReader<Cursor<&'a [u8]>>, MergeError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| MergeError::ImageNotReadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        match reader.format() {
            Some(ImageFormat::Png) | Some(ImageFormat::Jpeg) => Ok(reader),
            Some(other) => Err(MergeError::ImageFormatUnsupported {
                path: path.to_path_buf(),
                reason: format!("{:?} content is not supported", other),
            }),
            None => Err(MergeError::ImageFormatUnsupported {
                path: path.to_path_buf(),
                reason: "content is not a recognized image".to_string(),
            }),
        }
    }

    fn map_decode_error(
        path: &Path,
        width: u32,
        height: u32,
        max_pixels: u64,
        err: ImageError,
    ) -> MergeError {
        match err {
            ImageError::Limits(limit) => match limit.kind() {
                LimitErrorKind::InsufficientMemory => MergeError::InsufficientMemory {
                    path: Some(path.to_path_buf()),
                    stage: MergeStage::Loading,
                },
                LimitErrorKind::DimensionError => MergeError::ImageTooLarge {
                    path: Some(path.to_path_buf()),
                    width: u64::from(width),
                    height: u64::from(height),
                    max_pixels,
                },
                _ => MergeError::ImageFormatUnsupported {
                    path: path.to_path_buf(),
                    reason: limit.to_string(),
                },
            },
            ImageError::IoError(e) => MergeError::ImageNotReadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => MergeError::ImageFormatUnsupported {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }

    fn normalize(img: DynamicImage) -> DynamicImage {
        if matches!(img, DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_)) {
            img
        } else if img.color().has_alpha() {
            DynamicImage::ImageRgba8(img.into_rgba8())
        } else {
            DynamicImage::ImageRgb8(img.into_rgb8())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::error::LimitError;
    use image::{GenericImageView, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, img: &DynamicImage) -> PathBuf {
        let path = dir.path().join(name);
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn test_load_png() {
        let dir = TempDir::new().unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([10, 20, 30])));
        let path = write_png(&dir, "a.png", &img);

        let loaded = ImageLoader::new(1_000).load(&path).unwrap();
        assert_eq!(loaded.dimensions(), (8, 4));
        assert_eq!(loaded.to_rgb8().get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_missing_file_is_not_readable() {
        let err = ImageLoader::new(1_000)
            .load(Path::new("/nonexistent/missing.png"))
            .unwrap_err();
        assert!(matches!(err, MergeError::ImageNotReadable { .. }));
        assert_eq!(err.path(), Some(Path::new("/nonexistent/missing.png")));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ImageLoader::new(1_000)
            .load(Path::new("picture.gif"))
            .unwrap_err();
        assert!(matches!(err, MergeError::ImageFormatUnsupported { .. }));
    }

    #[test]
    fn test_garbage_content_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = ImageLoader::new(1_000).load(&path).unwrap_err();
        assert!(matches!(err, MergeError::ImageFormatUnsupported { .. }));
    }

    #[test]
    fn test_pixel_ceiling() {
        let dir = TempDir::new().unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::new(20, 20));
        let path = write_png(&dir, "big.png", &img);

        let err = ImageLoader::new(399).load(&path).unwrap_err();
        match err {
            MergeError::ImageTooLarge {
                path: Some(p),
                width,
                height,
                max_pixels,
            } => {
                assert_eq!(p, path);
                assert_eq!((width, height, max_pixels), (20, 20, 399));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(ImageLoader::new(400).load(&path).is_ok());
    }

    #[test]
    fn test_normalizes_color_modes() {
        let dir = TempDir::new().unwrap();
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([90])));
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4])));
        let gray_path = write_png(&dir, "gray.png", &gray);
        let rgba_path = write_png(&dir, "alpha.png", &rgba);

        let loader = ImageLoader::new(1_000);
        assert!(matches!(
            loader.load(&gray_path).unwrap(),
            DynamicImage::ImageRgb8(_)
        ));
        let loaded = loader.load(&rgba_path).unwrap();
        assert!(matches!(loaded, DynamicImage::ImageRgba8(_)));
        assert_eq!(loaded.to_rgba8().get_pixel(1, 1), &Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn test_decoder_out_of_memory_maps_to_insufficient_memory() {
        let path = Path::new("huge.png");
        let err = ImageLoader::map_decode_error(
            path,
            10,
            10,
            50,
            ImageError::Limits(LimitError::from_kind(LimitErrorKind::InsufficientMemory)),
        );
        match err {
            MergeError::InsufficientMemory {
                path: Some(p),
                stage: MergeStage::Loading,
            } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decoder_dimension_limit_maps_to_too_large() {
        let path = Path::new("wide.jpg");
        let err = ImageLoader::map_decode_error(
            path,
            10,
            10,
            50,
            ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)),
        );
        assert_eq!(err.path(), Some(path));
        assert!(matches!(
            err,
            MergeError::ImageTooLarge {
                path: Some(_),
                width: 10,
                height: 10,
                max_pixels: 50,
            }
        ));
    }
}

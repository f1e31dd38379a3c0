use image::{imageops, DynamicImage, GenericImageView, ImageBuffer, Pixel};
use montage_core::{Align, MergeError, MergeStage};

const BACKGROUND: u8 = 255;

/// Stitches resized images onto a single canvas along the merge axis
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    max_pixels: u64,
}

impl Compositor {
    pub fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    /// Canvas size for the given image sizes: the along-axis extents are
    /// summed with `spacing` between neighbours, the cross-axis extent is the
    /// largest of the inputs.
    pub fn canvas_dimensions(
        sizes: &[(u32, u32)],
        align: Align,
        spacing: u32,
    ) -> Option<(u64, u64)> {
        let gaps = (sizes.len() as u64).checked_sub(1)?;
        let mut along = gaps.checked_mul(u64::from(spacing))?;
        let mut cross = 0u64;
        for &(width, height) in sizes {
            let (a, c) = match align {
                Align::Vertical => (height, width),
                Align::Horizontal => (width, height),
            };
            along = along.checked_add(u64::from(a))?;
            cross = cross.max(u64::from(c));
        }
        Some(match align {
            Align::Vertical => (cross, along),
            Align::Horizontal => (along, cross),
        })
    }

    /// Place `images` in order on an opaque white canvas.
    ///
    /// A single image is returned as is. The canvas carries alpha only when
    /// one of the inputs does. `on_placed` is called with the number of images
    /// placed so far. Each input is dropped as soon as it is copied.
    pub fn compose<F>(
        &self,
        images: Vec<DynamicImage>,
        align: Align,
        spacing: u32,
        mut on_placed: F,
    ) -> Result<DynamicImage, MergeError>
    where
        F: FnMut(usize),
    {
        if images.len() == 1 {
            on_placed(1);
            return images.into_iter().next().ok_or(MergeError::EmptyInput);
        }

        let sizes: Vec<(u32, u32)> = images.iter().map(|img| img.dimensions()).collect();
        let (width, height) =
            Self::canvas_dimensions(&sizes, align, spacing).ok_or(MergeError::EmptyInput)?;

        let too_large = MergeError::ImageTooLarge {
            path: None,
            width,
            height,
            max_pixels: self.max_pixels,
        };
        let (Ok(canvas_width), Ok(canvas_height)) = (u32::try_from(width), u32::try_from(height))
        else {
            return Err(too_large);
        };
        if width.saturating_mul(height) > self.max_pixels {
            return Err(too_large);
        }

        let with_alpha = images.iter().any(|img| img.color().has_alpha());
        tracing::debug!(
            width = canvas_width,
            height = canvas_height,
            count = images.len(),
            alpha = with_alpha,
            "Allocating canvas"
        );

        if with_alpha {
            let mut canvas = blank_canvas(canvas_width, canvas_height)?;
            Self::place_all(
                &mut canvas,
                images,
                align,
                spacing,
                DynamicImage::into_rgba8,
                &mut on_placed,
            );
            Ok(DynamicImage::ImageRgba8(canvas))
        } else {
            let mut canvas = blank_canvas(canvas_width, canvas_height)?;
            Self::place_all(
                &mut canvas,
                images,
                align,
                spacing,
                DynamicImage::into_rgb8,
                &mut on_placed,
            );
            Ok(DynamicImage::ImageRgb8(canvas))
        }
    }

    fn place_all<P, C, F>(
        canvas: &mut ImageBuffer<P, Vec<u8>>,
        images: Vec<DynamicImage>,
        align: Align,
        spacing: u32,
        convert: C,
        on_placed: &mut F,
    ) where
        P: Pixel<Subpixel = u8>,
        C: Fn(DynamicImage) -> ImageBuffer<P, Vec<u8>>,
        F: FnMut(usize),
    {
        let mut offset = 0i64;
        for (index, img) in images.into_iter().enumerate() {
            let tile = convert(img);
            let (x, y) = match align {
                Align::Vertical => (0, offset),
                Align::Horizontal => (offset, 0),
            };
            let along = match align {
                Align::Vertical => tile.height(),
                Align::Horizontal => tile.width(),
            };
            imageops::replace(canvas, &tile, x, y);
            offset += i64::from(along) + i64::from(spacing);
            on_placed(index + 1);
        }
    }
}

/// Allocate a canvas filled with opaque white, reporting allocation failure
/// instead of aborting.
fn blank_canvas<P>(width: u32, height: u32) -> Result<ImageBuffer<P, Vec<u8>>, MergeError>
where
    P: Pixel<Subpixel = u8>,
{
    let out_of_memory = || MergeError::InsufficientMemory {
        path: None,
        stage: MergeStage::Compositing,
    };

    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(usize::from(P::CHANNEL_COUNT)))
        .ok_or_else(out_of_memory)?;

    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| out_of_memory())?;
    buf.resize(len, BACKGROUND);

    ImageBuffer::from_raw(width, height, buf).ok_or_else(out_of_memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn rgb(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_canvas_dimensions() {
        let sizes = [(100, 200), (100, 200)];
        assert_eq!(
            Compositor::canvas_dimensions(&sizes, Align::Vertical, 0),
            Some((100, 400))
        );
        assert_eq!(
            Compositor::canvas_dimensions(&sizes, Align::Horizontal, 60),
            Some((260, 200))
        );
        assert_eq!(Compositor::canvas_dimensions(&[], Align::Vertical, 0), None);
    }

    #[test]
    fn test_vertical_stack_with_spacing() {
        let compositor = Compositor::new(1_000_000);
        let mut placed = Vec::new();
        let canvas = compositor
            .compose(
                vec![rgb(10, 5, [255, 0, 0]), rgb(10, 5, [0, 0, 255])],
                Align::Vertical,
                3,
                |n| placed.push(n),
            )
            .unwrap();

        assert_eq!(canvas.dimensions(), (10, 13));
        assert_eq!(placed, vec![1, 2]);
        let buf = canvas.to_rgb8();
        assert_eq!(buf.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(buf.get_pixel(9, 4), &Rgb([255, 0, 0]));
        assert_eq!(buf.get_pixel(0, 6), &Rgb([255, 255, 255]));
        assert_eq!(buf.get_pixel(0, 8), &Rgb([0, 0, 255]));
        assert_eq!(buf.get_pixel(9, 12), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_horizontal_uses_widest_cross_extent() {
        let compositor = Compositor::new(1_000_000);
        let canvas = compositor
            .compose(
                vec![rgb(4, 6, [0, 255, 0]), rgb(4, 2, [0, 0, 0])],
                Align::Horizontal,
                0,
                |_| {},
            )
            .unwrap();

        assert_eq!(canvas.dimensions(), (8, 6));
        let buf = canvas.to_rgb8();
        assert_eq!(buf.get_pixel(5, 1), &Rgb([0, 0, 0]));
        // Short image leaves the rest of its column as background.
        assert_eq!(buf.get_pixel(5, 4), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_single_image_passthrough() {
        let compositor = Compositor::new(10);
        let img = rgb(3, 3, [1, 2, 3]);
        let out = compositor
            .compose(vec![img.clone()], Align::Vertical, 90, |_| {})
            .unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_empty_input() {
        let err = Compositor::new(10)
            .compose(Vec::new(), Align::Vertical, 0, |_| {})
            .unwrap_err();
        assert!(matches!(err, MergeError::EmptyInput));
    }

    #[test]
    fn test_canvas_over_ceiling() {
        let err = Compositor::new(100)
            .compose(
                vec![rgb(10, 8, [0, 0, 0]), rgb(10, 8, [0, 0, 0])],
                Align::Vertical,
                0,
                |_| {},
            )
            .unwrap_err();
        match err {
            MergeError::ImageTooLarge {
                path,
                width,
                height,
                ..
            } => {
                assert!(path.is_none());
                assert_eq!((width, height), (10, 16));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_alpha_input_gives_rgba_canvas() {
        let translucent =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 40])));
        let canvas = Compositor::new(1_000)
            .compose(
                vec![rgb(4, 2, [0, 0, 0]), translucent],
                Align::Vertical,
                0,
                |_| {},
            )
            .unwrap();

        assert!(matches!(canvas, DynamicImage::ImageRgba8(_)));
        let buf = canvas.to_rgba8();
        assert_eq!(buf.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(buf.get_pixel(1, 3), &Rgba([10, 20, 30, 40]));
        assert_eq!(buf.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_unallocatable_canvas_is_insufficient_memory() {
        let err = blank_canvas::<Rgba<u8>>(u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            MergeError::InsufficientMemory {
                path: None,
                stage: MergeStage::Compositing,
            }
        ));
        assert_eq!(err.error_code(), "INSUFFICIENT_MEMORY");
    }
}

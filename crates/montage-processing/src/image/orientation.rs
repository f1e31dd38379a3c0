use image::DynamicImage;

/// Image orientation operations (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotate counter-clockwise by a multiple of 90 degrees.
    ///
    /// The canvas always grows to hold the whole rotated image, so a quarter
    /// turn swaps width and height. The pixel layout is preserved.
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle % 360 {
            90 => img.rotate270(),
            180 => img.rotate180(),
            270 => img.rotate90(),
            _ => img,
        }
    }

    /// Apply horizontal flip (mirror)
    pub fn apply_flip_horizontal(img: DynamicImage) -> DynamicImage {
        img.fliph()
    }
}

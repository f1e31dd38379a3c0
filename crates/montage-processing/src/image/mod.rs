//! Image processing module
//!
//! - Decoding with a size ceiling (loader)
//! - Geometric transforms (orientation) and tonal filters (filters)
//! - The fixed per-image pipeline that chains them (transformer)
//! - Lanczos resampling (resize) and canvas stitching (compose)

pub mod compose;
pub mod filters;
pub mod loader;
pub mod orientation;
pub mod resize;
pub mod transformer;

pub use compose::Compositor;
pub use filters::ImageFilters;
pub use loader::ImageLoader;
pub use orientation::ImageOrientation;
pub use resize::ImageResize;
pub use transformer::ImageTransformer;

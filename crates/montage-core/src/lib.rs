//! Montage core types
//!
//! Per-image transform and filter state, merge options, the error taxonomy
//! shared by every engine boundary, and engine configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use config::EngineConfig;
pub use error::MergeError;
pub use models::{
    Align, FailurePolicy, FilterKind, FilterState, MergeOptions, MergeStage, OutputFormat,
    QualityPreset, Spacing, TargetWidth, TransformState,
};
pub use session::{ImageEntry, ImageSession};

/// File extensions accepted as merge inputs (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Check whether a path carries one of the supported raster extensions.
pub fn is_supported_path(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_supported_extensions_case_insensitive() {
        assert!(is_supported_path(Path::new("a.png")));
        assert!(is_supported_path(Path::new("b.JPG")));
        assert!(is_supported_path(Path::new("dir/c.JpEg")));
        assert!(!is_supported_path(Path::new("d.gif")));
        assert!(!is_supported_path(Path::new("no_extension")));
    }
}

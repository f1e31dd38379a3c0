//! Error types module
//!
//! Every engine-boundary operation returns `Result<_, MergeError>`. Errors that
//! can be attributed to a single input carry its path so the caller can name
//! the offending file.

use std::path::{Path, PathBuf};

use crate::models::MergeStage;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Image not readable: {}: {reason}", .path.display())]
    ImageNotReadable { path: PathBuf, reason: String },

    #[error("Unsupported image format: {}: {reason}", .path.display())]
    ImageFormatUnsupported { path: PathBuf, reason: String },

    #[error("Image too large: {width}x{height} exceeds {max_pixels} pixels{}", display_path(.path))]
    ImageTooLarge {
        path: Option<PathBuf>,
        width: u64,
        height: u64,
        max_pixels: u64,
    },

    #[error("Insufficient memory during {stage:?}{}", display_path(.path))]
    InsufficientMemory {
        path: Option<PathBuf>,
        stage: MergeStage,
    },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("No images to merge")]
    EmptyInput,

    #[error("Merge cancelled")]
    Cancelled,

    #[error("A merge is already running on this engine")]
    MergeInProgress,

    #[error("Encoding error: {0}")]
    Encoding(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" ({})", p.display()),
        None => String::new(),
    }
}

impl MergeError {
    /// Path of the input this error is attributable to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            MergeError::ImageNotReadable { path, .. }
            | MergeError::ImageFormatUnsupported { path, .. } => Some(path),
            MergeError::ImageTooLarge { path, .. } | MergeError::InsufficientMemory { path, .. } => {
                path.as_deref()
            }
            _ => None,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            MergeError::ImageNotReadable { .. } => "IMAGE_NOT_READABLE",
            MergeError::ImageFormatUnsupported { .. } => "IMAGE_FORMAT_UNSUPPORTED",
            MergeError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            MergeError::InsufficientMemory { .. } => "INSUFFICIENT_MEMORY",
            MergeError::InvalidOption(_) => "INVALID_OPTION",
            MergeError::EmptyInput => "EMPTY_INPUT",
            MergeError::Cancelled => "CANCELLED",
            MergeError::MergeInProgress => "MERGE_IN_PROGRESS",
            MergeError::Encoding(_) => "ENCODING_ERROR",
        }
    }

    /// Whether the skip policy may drop the offending image and keep going.
    ///
    /// Only decode-side failures qualify; option, memory, and run-control
    /// errors always end the run.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            MergeError::ImageNotReadable { .. }
                | MergeError::ImageFormatUnsupported { .. }
                | MergeError::ImageTooLarge { path: Some(_), .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_attached_to_per_image_errors() {
        let err = MergeError::ImageNotReadable {
            path: PathBuf::from("/tmp/missing.png"),
            reason: "No such file or directory".to_string(),
        };
        assert_eq!(err.path(), Some(Path::new("/tmp/missing.png")));
        assert_eq!(err.error_code(), "IMAGE_NOT_READABLE");
        assert!(err.is_per_image());
        assert!(err.to_string().contains("/tmp/missing.png"));
    }

    #[test]
    fn test_canvas_too_large_has_no_path() {
        let err = MergeError::ImageTooLarge {
            path: None,
            width: 100_000,
            height: 100_000,
            max_pixels: 1_000,
        };
        assert_eq!(err.path(), None);
        assert!(!err.is_per_image());
        assert_eq!(
            err.to_string(),
            "Image too large: 100000x100000 exceeds 1000 pixels"
        );
    }

    #[test]
    fn test_run_control_errors() {
        assert_eq!(MergeError::EmptyInput.error_code(), "EMPTY_INPUT");
        assert!(!MergeError::Cancelled.is_per_image());
        assert!(!MergeError::InvalidOption("x".into()).is_per_image());
        assert_eq!(
            MergeError::InsufficientMemory {
                path: None,
                stage: MergeStage::Compositing
            }
            .to_string(),
            "Insufficient memory during Compositing"
        );
    }
}

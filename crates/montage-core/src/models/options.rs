use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Target size along the cross axis.
///
/// For vertical merges this is the output width; for horizontal merges the
/// same number is applied to image height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "WidthRecord", into = "WidthRecord")]
pub enum TargetWidth {
    #[default]
    KeepOriginal,
    Pixels(NonZeroU32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WidthRecord {
    Pixels(u32),
    Named(String),
}

impl TargetWidth {
    pub fn pixels(value: u32) -> Result<Self, MergeError> {
        NonZeroU32::new(value)
            .map(TargetWidth::Pixels)
            .ok_or_else(|| MergeError::InvalidOption("Width must be a positive integer".into()))
    }

    pub fn as_pixels(self) -> Option<u32> {
        match self {
            TargetWidth::KeepOriginal => None,
            TargetWidth::Pixels(px) => Some(px.get()),
        }
    }
}

impl FromStr for TargetWidth {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "keep-original" | "keep_original" | "original" => Ok(TargetWidth::KeepOriginal),
            other => {
                let value = other
                    .parse::<u32>()
                    .map_err(|_| MergeError::InvalidOption(format!("Invalid width: {}", s)))?;
                TargetWidth::pixels(value)
            }
        }
    }
}

impl fmt::Display for TargetWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetWidth::KeepOriginal => f.write_str("keep-original"),
            TargetWidth::Pixels(px) => write!(f, "{}", px),
        }
    }
}

impl TryFrom<WidthRecord> for TargetWidth {
    type Error = MergeError;

    fn try_from(record: WidthRecord) -> Result<Self, Self::Error> {
        match record {
            WidthRecord::Pixels(px) => TargetWidth::pixels(px),
            WidthRecord::Named(name) => name.parse(),
        }
    }
}

impl From<TargetWidth> for WidthRecord {
    fn from(width: TargetWidth) -> Self {
        match width {
            TargetWidth::KeepOriginal => WidthRecord::Named("keep-original".to_string()),
            TargetWidth::Pixels(px) => WidthRecord::Pixels(px.get()),
        }
    }
}

/// Gap between neighbouring images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    #[default]
    None,
    Narrow,
    Normal,
    Wide,
}

impl Spacing {
    pub fn pixels(self) -> u32 {
        match self {
            Spacing::None => 0,
            Spacing::Narrow => 30,
            Spacing::Normal => 60,
            Spacing::Wide => 90,
        }
    }
}

impl FromStr for Spacing {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Spacing::None),
            "narrow" => Ok(Spacing::Narrow),
            "normal" => Ok(Spacing::Normal),
            "wide" => Ok(Spacing::Wide),
            _ => Err(MergeError::InvalidOption(format!("Invalid spacing: {}", s))),
        }
    }
}

/// Concatenation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Vertical,
    Horizontal,
}

impl FromStr for Align {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vertical" => Ok(Align::Vertical),
            "horizontal" => Ok(Align::Horizontal),
            _ => Err(MergeError::InvalidOption(format!("Invalid align: {}", s))),
        }
    }
}

/// Output format for the merged image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
        }
    }

    /// Whether the encoded file can carry an alpha channel
    pub fn supports_alpha(self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

impl FromStr for OutputFormat {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpg),
            _ => Err(MergeError::InvalidOption(format!("Invalid format: {}", s))),
        }
    }
}

/// Quality presets for JPEG output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Lightest, // Maximum compression
    Lighter,
    Normal,
    Better,
    #[default]
    Best, // Near pristine
}

impl QualityPreset {
    /// Get quality value for JPEG (0-100)
    pub fn jpeg_quality(self) -> u8 {
        match self {
            QualityPreset::Lightest => 50,
            QualityPreset::Lighter => 65,
            QualityPreset::Normal => 75,
            QualityPreset::Better => 85,
            QualityPreset::Best => 95,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lightest" => Ok(QualityPreset::Lightest),
            "lighter" => Ok(QualityPreset::Lighter),
            "normal" => Ok(QualityPreset::Normal),
            "better" => Ok(QualityPreset::Better),
            "best" => Ok(QualityPreset::Best),
            _ => Err(MergeError::InvalidOption(format!(
                "Invalid quality preset: {}",
                s
            ))),
        }
    }
}

/// What to do when one input cannot be read or decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole run; no partial output
    #[default]
    Abort,
    /// Log the failure, drop the image, and merge the rest
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            _ => Err(MergeError::InvalidOption(format!(
                "Invalid failure policy: {}",
                s
            ))),
        }
    }
}

/// Options for one merge run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeOptions {
    #[serde(rename = "width", default)]
    pub target_width: TargetWidth,
    #[serde(default)]
    pub spacing: Spacing,
    #[serde(default)]
    pub align: Align,
    #[serde(rename = "format", default)]
    pub output_format: OutputFormat,
}

impl MergeOptions {
    pub fn spacing_pixels(&self) -> u32 {
        self.spacing.pixels()
    }
}

//! Configuration module
//!
//! Engine-wide settings that do not change between merge runs: the decoded
//! size ceiling, JPEG quality, and what to do with unreadable inputs.

use std::env;

use crate::models::{FailurePolicy, QualityPreset};

/// Largest decoded image, in pixels, before a file is treated as a
/// decompression bomb.
pub const MAX_IMAGE_PIXELS: u64 = 178_956_970;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_image_pixels: u64,
    pub jpeg_quality: QualityPreset,
    pub failure_policy: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_image_pixels: MAX_IMAGE_PIXELS,
            jpeg_quality: QualityPreset::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let max_image_pixels = match env::var("MONTAGE_MAX_IMAGE_PIXELS") {
            Ok(value) => value.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("MONTAGE_MAX_IMAGE_PIXELS must be a positive integer")
            })?,
            Err(_) => MAX_IMAGE_PIXELS,
        };

        let jpeg_quality = match env::var("MONTAGE_JPEG_QUALITY") {
            Ok(value) => value.parse::<QualityPreset>()?,
            Err(_) => QualityPreset::default(),
        };

        let failure_policy = match env::var("MONTAGE_FAILURE_POLICY") {
            Ok(value) => value.parse::<FailurePolicy>()?,
            Err(_) => FailurePolicy::default(),
        };

        let config = Self {
            max_image_pixels,
            jpeg_quality,
            failure_policy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_image_pixels == 0 {
            return Err(anyhow::anyhow!(
                "MONTAGE_MAX_IMAGE_PIXELS must be greater than zero"
            ));
        }
        Ok(())
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_image_pixels(mut self, max_image_pixels: u64) -> Self {
        self.max_image_pixels = max_image_pixels;
        self
    }
}

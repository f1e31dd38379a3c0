//! Argument helpers for the `montage` binary.

use anyhow::{bail, Context};
use montage_core::{FilterKind, ImageEntry, ImageSession, OutputFormat};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// `INDEX:DEGREES`, rotating image INDEX (counted from 1) counter-clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateArg {
    pub index: usize,
    pub degrees: i32,
}

impl FromStr for RotateArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, degrees) = s
            .split_once(':')
            .ok_or_else(|| format!("expected INDEX:DEGREES, got {s:?}"))?;
        Ok(Self {
            index: parse_index(index)?,
            degrees: degrees
                .trim()
                .parse()
                .map_err(|_| format!("invalid rotation angle: {degrees:?}"))?,
        })
    }
}

/// `INDEX:NAME=VALUE`, e.g. `2:brightness=1.4`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterArg {
    pub index: usize,
    pub kind: FilterKind,
    pub value: f32,
}

impl FromStr for FilterArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, setting) = s
            .split_once(':')
            .ok_or_else(|| format!("expected INDEX:NAME=VALUE, got {s:?}"))?;
        let (name, value) = setting
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got {setting:?}"))?;
        Ok(Self {
            index: parse_index(index)?,
            kind: name.trim().parse().map_err(|e| format!("{e}"))?,
            value: value
                .trim()
                .parse()
                .map_err(|_| format!("invalid filter value: {value:?}"))?,
        })
    }
}

/// Parse a 1-based image index
pub fn parse_index(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("image index must be a number from 1, got {s:?}")),
        Ok(n) => Ok(n),
    }
}

/// Output format implied by the output path's extension, if recognized
pub fn format_from_path(path: &Path) -> Option<OutputFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
}

/// Build the ordered merge inputs from the positional paths and the
/// per-image flags.
pub fn build_entries(
    images: &[PathBuf],
    rotations: &[RotateArg],
    flips: &[usize],
    filters: &[FilterArg],
) -> anyhow::Result<Vec<ImageEntry>> {
    let mut session = ImageSession::new();
    for path in images {
        let added = session
            .add(path.clone())
            .with_context(|| format!("Cannot use {}", path.display()))?;
        if !added {
            bail!("{} is listed more than once", path.display());
        }
    }

    let path_at = |index: usize| -> anyhow::Result<PathBuf> {
        index
            .checked_sub(1)
            .and_then(|i| images.get(i))
            .cloned()
            .with_context(|| {
                format!(
                    "Image index {} is out of range (1..={})",
                    index,
                    images.len()
                )
            })
    };

    for rotate in rotations {
        let path = path_at(rotate.index)?;
        if let Some(transform) = session.transform_mut(&path) {
            transform
                .add_rotation(rotate.degrees)
                .with_context(|| format!("Invalid rotation for image {}", rotate.index))?;
        }
    }

    for &index in flips {
        let path = path_at(index)?;
        if let Some(transform) = session.transform_mut(&path) {
            transform.toggle_flip();
        }
    }

    for filter in filters {
        let path = path_at(filter.index)?;
        if let Some(state) = session.filter_mut(&path) {
            state
                .set_filter(filter.kind, filter.value)
                .with_context(|| format!("Invalid filter for image {}", filter.index))?;
        }
    }

    tracing::debug!(
        images = session.len(),
        modified = session.modified_count(),
        "Prepared merge inputs"
    );

    Ok(session.entries().to_vec())
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("montage=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

//! Per-image state owned by the caller's working set.
//!
//! The session is the single owner of every image's transform and filter
//! state. Panels that need to read or change an image's state borrow it
//! through the session by path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::models::{FilterState, TransformState};

/// One merge input: a path plus the state applied to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub transform: TransformState,
    #[serde(default)]
    pub filter: FilterState,
}

impl ImageEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            transform: TransformState::default(),
            filter: FilterState::default(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.transform.is_default() && self.filter.is_default()
    }
}

/// Ordered working set of images keyed by path
#[derive(Debug, Clone, Default)]
pub struct ImageSession {
    entries: Vec<ImageEntry>,
}

impl ImageSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image with default state.
    ///
    /// Returns `Ok(true)` when the path was appended. A path that is already
    /// part of the session yields `Ok(false)`; the session is not changed and
    /// the existing entry keeps its position and state. Callers that need every
    /// path to be distinct must check the flag, as `?` alone discards it.
    ///
    /// # Errors
    ///
    /// `ImageFormatUnsupported` when the extension is not png, jpg or jpeg.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<bool, MergeError> {
        let path = path.into();
        if !crate::is_supported_path(&path) {
            return Err(MergeError::ImageFormatUnsupported {
                reason: "extension is not one of png, jpg, jpeg".to_string(),
                path,
            });
        }
        if self.contains(&path) {
            return Ok(false);
        }
        self.entries.push(ImageEntry::new(path));
        Ok(true)
    }

    /// Drop an image and its state
    pub fn remove(&mut self, path: &Path) -> Option<ImageEntry> {
        let index = self.position(path)?;
        Some(self.entries.remove(index))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<&ImageEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn transform_mut(&mut self, path: &Path) -> Option<&mut TransformState> {
        self.entry_mut(path).map(|e| &mut e.transform)
    }

    pub fn filter_mut(&mut self, path: &Path) -> Option<&mut FilterState> {
        self.entry_mut(path).map(|e| &mut e.filter)
    }

    /// Reset one image's transform and filter state. Returns `false` for an
    /// unknown path.
    pub fn reset(&mut self, path: &Path) -> bool {
        match self.entry_mut(path) {
            Some(entry) => {
                entry.transform.reset();
                entry.filter.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.transform.reset();
            entry.filter.reset();
        }
    }

    /// Number of images whose state differs from the defaults
    pub fn modified_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_default()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Inputs in merge order
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    fn entry_mut(&mut self, path: &Path) -> Option<&mut ImageEntry> {
        self.entries.iter_mut().find(|e| e.path == path)
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Values closer than this to a filter's default count as the default.
pub const FILTER_EPSILON: f32 = 1e-3;

/// Tonal adjustments, in the order the pipeline applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturation,
    Posterize,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturation,
        FilterKind::Posterize,
    ];

    /// Inclusive domain of accepted values
    pub fn domain(self) -> (f32, f32) {
        match self {
            FilterKind::Posterize => (1.0, 3.0),
            _ => (0.0, 3.0),
        }
    }

    /// Value at which the filter has no effect.
    ///
    /// Posterize is neutral at its upper bound, the others at 1.0.
    pub fn default_value(self) -> f32 {
        match self {
            FilterKind::Posterize => 3.0,
            _ => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Saturation => "saturation",
            FilterKind::Posterize => "posterize",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brightness" => Ok(FilterKind::Brightness),
            "contrast" => Ok(FilterKind::Contrast),
            "saturation" => Ok(FilterKind::Saturation),
            "posterize" => Ok(FilterKind::Posterize),
            _ => Err(MergeError::InvalidOption(format!("Unknown filter: {}", s))),
        }
    }
}

/// Tonal filter parameters for one source image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FilterRecord", into = "FilterRecord")]
pub struct FilterState {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    posterize: f32,
    modified: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct FilterRecord {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    posterize: f32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brightness: FilterKind::Brightness.default_value(),
            contrast: FilterKind::Contrast.default_value(),
            saturation: FilterKind::Saturation.default_value(),
            posterize: FilterKind::Posterize.default_value(),
            modified: false,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Posterize => self.posterize,
        }
    }

    /// Store a filter value after checking it against the filter's domain.
    ///
    /// Out-of-domain and non-finite values are rejected and leave the state
    /// untouched.
    pub fn set_filter(&mut self, kind: FilterKind, value: f32) -> Result<(), MergeError> {
        let (min, max) = kind.domain();
        if !value.is_finite() || value < min || value > max {
            return Err(MergeError::InvalidOption(format!(
                "{} must be between {} and {}, got {}",
                kind, min, max, value
            )));
        }

        let slot = match kind {
            FilterKind::Brightness => &mut self.brightness,
            FilterKind::Contrast => &mut self.contrast,
            FilterKind::Saturation => &mut self.saturation,
            FilterKind::Posterize => &mut self.posterize,
        };
        *slot = value;
        self.modified = true;
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Whether this one filter sits at its neutral value
    pub fn is_identity(&self, kind: FilterKind) -> bool {
        (self.get(kind) - kind.default_value()).abs() < FILTER_EPSILON
    }

    pub fn is_default(&self) -> bool {
        FilterKind::ALL.iter().all(|&kind| self.is_identity(kind))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl TryFrom<FilterRecord> for FilterState {
    type Error = MergeError;

    fn try_from(record: FilterRecord) -> Result<Self, Self::Error> {
        let mut state = FilterState::default();
        state.set_filter(FilterKind::Brightness, record.brightness)?;
        state.set_filter(FilterKind::Contrast, record.contrast)?;
        state.set_filter(FilterKind::Saturation, record.saturation)?;
        state.set_filter(FilterKind::Posterize, record.posterize)?;
        state.modified = false;
        Ok(state)
    }
}

impl From<FilterState> for FilterRecord {
    fn from(state: FilterState) -> Self {
        Self {
            brightness: state.brightness,
            contrast: state.contrast,
            saturation: state.saturation,
            posterize: state.posterize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_state_default() {
        let state = FilterState::new();
        assert_eq!(state.get(FilterKind::Brightness), 1.0);
        assert_eq!(state.get(FilterKind::Contrast), 1.0);
        assert_eq!(state.get(FilterKind::Saturation), 1.0);
        assert_eq!(state.get(FilterKind::Posterize), 3.0);
        assert!(state.is_default());
        assert!(!state.is_modified());
    }

    #[test]
    fn test_any_single_change_leaves_default() {
        for kind in FilterKind::ALL {
            let mut state = FilterState::new();
            let value = if kind == FilterKind::Posterize { 2.0 } else { 1.5 };
            state.set_filter(kind, value).unwrap();
            assert!(!state.is_default(), "{} should break default", kind);
            assert!(state.is_modified());
        }
    }

    #[test]
    fn test_set_filter_rejects_out_of_domain() {
        let mut state = FilterState::new();
        assert!(state.set_filter(FilterKind::Brightness, 3.5).is_err());
        assert!(state.set_filter(FilterKind::Contrast, -0.1).is_err());
        assert!(state.set_filter(FilterKind::Saturation, f32::NAN).is_err());
        // Posterize has a narrower domain than the others
        assert!(state.set_filter(FilterKind::Posterize, 0.5).is_err());
        assert!(state.is_default());
        assert!(!state.is_modified());
    }

    #[test]
    fn test_domain_bounds_are_inclusive() {
        let mut state = FilterState::new();
        state.set_filter(FilterKind::Brightness, 0.0).unwrap();
        state.set_filter(FilterKind::Contrast, 3.0).unwrap();
        state.set_filter(FilterKind::Posterize, 1.0).unwrap();
        assert_eq!(state.get(FilterKind::Brightness), 0.0);
        assert_eq!(state.get(FilterKind::Posterize), 1.0);
    }

    #[test]
    fn test_reset_after_changes() {
        let mut state = FilterState::new();
        state.set_filter(FilterKind::Saturation, 0.0).unwrap();
        state.set_filter(FilterKind::Posterize, 1.5).unwrap();
        state.reset();
        assert!(state.is_default());
        assert!(!state.is_modified());
    }

    #[test]
    fn test_near_default_counts_as_default() {
        let mut state = FilterState::new();
        state.set_filter(FilterKind::Contrast, 1.0 + FILTER_EPSILON / 2.0).unwrap();
        assert!(state.is_default());
    }

    #[test]
    fn test_filter_kind_from_str() {
        assert_eq!("Brightness".parse::<FilterKind>().unwrap(), FilterKind::Brightness);
        assert_eq!(" posterize ".parse::<FilterKind>().unwrap(), FilterKind::Posterize);
        assert!("blur".parse::<FilterKind>().is_err());
    }

    #[test]
    fn test_record_rejects_out_of_domain() {
        let json = r#"{"brightness":1.2,"contrast":1.0,"saturation":0.5,"posterize":2.0}"#;
        let state: FilterState = serde_json::from_str(json).unwrap();
        assert_eq!(state.get(FilterKind::Saturation), 0.5);
        assert!(!state.is_modified());

        let json = r#"{"brightness":9.0,"contrast":1.0,"saturation":1.0,"posterize":3.0}"#;
        assert!(serde_json::from_str::<FilterState>(json).is_err());
    }
}

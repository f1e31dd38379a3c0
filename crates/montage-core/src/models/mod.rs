//! Merge data model
//!
//! Per-image state records (`TransformState`, `FilterState`) and the
//! immutable per-run `MergeOptions`.

pub mod filter;
pub mod options;
pub mod stage;
pub mod transform;

pub use filter::{FilterKind, FilterState};
pub use options::{
    Align, FailurePolicy, MergeOptions, OutputFormat, QualityPreset, Spacing, TargetWidth,
};
pub use stage::MergeStage;
pub use transform::TransformState;

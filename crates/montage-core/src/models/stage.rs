use serde::Serialize;

/// Lifecycle of a merge run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStage {
    #[default]
    Idle,
    Loading,
    Transforming,
    Resizing,
    Compositing,
    Encoding,
    Done,
    Failed,
}

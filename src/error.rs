use thiserror::Error;

/// Domain errors raised by the curriculum tables and the service layer.
///
/// Missing grades are never errors; they are modelled as `None`.
#[derive(Error, Debug)]
pub enum GradebookError {
    #[error("lesson index {0} is outside 1..=10")]
    LessonOutOfRange(u32),

    #[error("unit index {0} is outside 0..=9")]
    UnitOutOfRange(u32),

    #[error("global lesson slot {0} is outside 1..=100")]
    SlotOutOfRange(u32),

    #[error("unknown icon: {0}")]
    UnknownIcon(String),

    #[error("backend fetch failed: {0}")]
    BackendFetch(#[from] anyhow::Error),
}

use thiserror::Error;

/// Conditions the controllers absorb instead of surfacing to the player.
///
/// Every variant is logged at debug level where it is detected and then
/// dropped; none of them aborts an operation that has already mutated state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("missing prerequisite: {0} not yet received")]
    MissingPrerequisite(&'static str),

    #[error("navigation surface not ready, evaluation deferred")]
    NavigationSurfaceNotReady,

    #[error("cursor {requested} outside [0, {len}], clamped")]
    InvalidCursorState { requested: usize, len: usize },

    #[error("snapshot superseded before it was processed ({dropped} dropped)")]
    StaleSnapshotRace { dropped: usize },
}

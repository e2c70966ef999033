use thiserror::Error;

use crate::profiles::Role;

/// Failures surfaced by the automation core. Nothing in this crate is allowed
/// to panic into the foreign page; every risky operation converts into one of
/// these.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A role had no live match among its selector candidates. Usually
    /// non-fatal; callers skip the operation.
    #[error("no {0} matched any selector candidate")]
    ResolutionAbsent(Role),

    /// The payload could not be written into the editor.
    #[error("payload could not be written: {0}")]
    InsertionFailed(String),

    /// The submit control was located but never became ready within budget.
    #[error("submit control never became ready")]
    DispatchTimedOut,

    /// The submit control could not be located at all.
    #[error("submit control could not be located")]
    DispatchAborted,

    /// Soft rejection: the queue is already at capacity.
    #[error("queue is full ({0} items)")]
    QueueCapacityExceeded(usize),

    /// No send handler is registered for the active site. Fatal to the
    /// current queue run, not to the process.
    #[error("no send handler registered for site '{0}'")]
    HandlerNotFound(String),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Transport-level failures talking to the foreign document.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("browser connection failed: {0}")]
    Connection(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("element interaction failed: {0}")]
    Interaction(String),

    #[error("unexpected value from page: {0}")]
    InvalidResponse(String),
}

impl From<chromiumoxide::error::CdpError> for SurfaceError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        SurfaceError::Interaction(e.to_string())
    }
}

impl From<reqwest::Error> for SurfaceError {
    fn from(e: reqwest::Error) -> Self {
        SurfaceError::Connection(e.to_string())
    }
}

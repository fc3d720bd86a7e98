//! Error types for window sources.

use std::fmt;

/// Errors surfaced by window sources.
///
/// Every failure is reported at the next public call; nothing is swallowed
/// and nothing is retried. Teardown is best-effort and never raises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// No window is available and no outstanding fetch can produce one.
    ///
    /// Consumers are expected to check [`exhausted`] before reading; hitting
    /// this error is a usage bug, but a deterministic one.
    ///
    /// [`exhausted`]: crate::traits::WindowSource::exhausted
    Exhausted,

    /// The requested window does not fit the ring it would slide over.
    WindowTooLarge {
        /// Requested window size.
        window: u32,
        /// Number of elements in the ring.
        len: usize,
    },

    /// A fetch from the underlying supply failed.
    ///
    /// The source is terminal after this: every later call repeats the
    /// original cause.
    SupplyFailed(String),

    /// The source could not be built: file not openable, statement not
    /// preparable, or a zero window size.
    Construction(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Exhausted => {
                write!(f, "source exhausted: no window available and no pending fetch")
            }
            SourceError::WindowTooLarge { window, len } => {
                write!(f, "window of {} does not fit ring of {} elements", window, len)
            }
            SourceError::SupplyFailed(cause) => {
                write!(f, "supply failed: {}", cause)
            }
            SourceError::Construction(cause) => {
                write!(f, "source construction failed: {}", cause)
            }
        }
    }
}

impl std::error::Error for SourceError {}

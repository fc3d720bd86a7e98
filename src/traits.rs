//! The window protocol every source implements.

use async_trait::async_trait;

use crate::error::SourceError;

/// A sliding window of `window_size()` elements over a stream of `T`.
///
/// The protocol is deliberately single-consumer: the view returned by
/// [`current`] borrows the source and is invalidated by the next mutating
/// call. Sources are exclusively owned and movable, never clonable.
///
/// Streaming implementations may suspend inside [`current`], [`advance`] or
/// [`exhausted`] to complete a pending background fetch; in-memory
/// implementations resolve immediately.
///
/// [`current`]: WindowSource::current
/// [`advance`]: WindowSource::advance
/// [`exhausted`]: WindowSource::exhausted
#[async_trait]
pub trait WindowSource<T>: Send {
    /// Returns the current window: a contiguous view of exactly
    /// `window_size()` elements.
    ///
    /// Fails with [`SourceError::Exhausted`] when no window is available and
    /// no further fetch can produce one, and with
    /// [`SourceError::SupplyFailed`] when the source is terminally errored.
    async fn current(&mut self) -> Result<&[T], SourceError>;

    /// Shifts the window start forward by one element.
    ///
    /// Stepping one past the final window is legal; that step is what makes
    /// [`exhausted`] observable. Any further call fails with
    /// [`SourceError::Exhausted`].
    ///
    /// [`exhausted`]: WindowSource::exhausted
    async fn advance(&mut self) -> Result<(), SourceError>;

    /// True iff no further full window can be produced from buffered data
    /// plus any outstanding fetch.
    ///
    /// Callable repeatedly at end-of-stream; never fails with
    /// [`SourceError::Exhausted`].
    async fn exhausted(&mut self) -> Result<bool, SourceError>;

    /// The window size, constant for the lifetime of the source.
    fn window_size(&self) -> u32;
}

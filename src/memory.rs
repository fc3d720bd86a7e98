//! In-memory window sources.
//!
//! These sources window over data that is already resident: an owned
//! vector, a borrowed slice, or a ring that wraps around its own end. None
//! of them performs I/O; the async protocol methods resolve immediately.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::traits::WindowSource;

fn check_window_size(window_size: u32) -> Result<(), SourceError> {
    if window_size == 0 {
        return Err(SourceError::Construction(
            "window size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// A window over an owned vector.
pub struct VectorSource<T> {
    data: Vec<T>,
    window: u32,
    start: usize,
}

impl<T> VectorSource<T> {
    pub fn new(data: Vec<T>, window_size: u32) -> Result<Self, SourceError> {
        check_window_size(window_size)?;
        Ok(VectorSource {
            data,
            window: window_size,
            start: 0,
        })
    }

    fn has_window(&self) -> bool {
        self.start + self.window as usize <= self.data.len()
    }
}

#[async_trait]
impl<T: Send> WindowSource<T> for VectorSource<T> {
    async fn current(&mut self) -> Result<&[T], SourceError> {
        if !self.has_window() {
            return Err(SourceError::Exhausted);
        }
        Ok(&self.data[self.start..self.start + self.window as usize])
    }

    async fn advance(&mut self) -> Result<(), SourceError> {
        if !self.has_window() {
            return Err(SourceError::Exhausted);
        }
        self.start += 1;
        Ok(())
    }

    async fn exhausted(&mut self) -> Result<bool, SourceError> {
        Ok(!self.has_window())
    }

    fn window_size(&self) -> u32 {
        self.window
    }
}

/// A vector source that can still grow while it is being consumed.
///
/// Useful when the producer filling the vector has not finished by the time
/// windowing starts: pushing elements extends the range of valid windows,
/// and a source that reported itself exhausted becomes live again.
pub struct MutableVectorSource<T> {
    inner: VectorSource<T>,
}

impl<T> MutableVectorSource<T> {
    pub fn new(data: Vec<T>, window_size: u32) -> Result<Self, SourceError> {
        Ok(MutableVectorSource {
            inner: VectorSource::new(data, window_size)?,
        })
    }

    /// Appends an element to the end of the underlying vector.
    pub fn push(&mut self, value: T) {
        self.inner.data.push(value);
    }
}

#[async_trait]
impl<T: Send> WindowSource<T> for MutableVectorSource<T> {
    async fn current(&mut self) -> Result<&[T], SourceError> {
        self.inner.current().await
    }

    async fn advance(&mut self) -> Result<(), SourceError> {
        self.inner.advance().await
    }

    async fn exhausted(&mut self) -> Result<bool, SourceError> {
        self.inner.exhausted().await
    }

    fn window_size(&self) -> u32 {
        self.inner.window_size()
    }
}

/// A window over an externally owned buffer.
///
/// The source borrows the slice for its whole lifetime and never frees it,
/// so one allocation can back several sources at once, e.g. to run the same
/// computation with different window sizes over one dataset.
pub struct SliceSource<'a, T> {
    data: &'a [T],
    window: u32,
    start: usize,
}

impl<'a, T> SliceSource<'a, T> {
    pub fn new(data: &'a [T], window_size: u32) -> Result<Self, SourceError> {
        check_window_size(window_size)?;
        Ok(SliceSource {
            data,
            window: window_size,
            start: 0,
        })
    }

    fn has_window(&self) -> bool {
        self.start + self.window as usize <= self.data.len()
    }
}

#[async_trait]
impl<T: Send + Sync> WindowSource<T> for SliceSource<'_, T> {
    async fn current(&mut self) -> Result<&[T], SourceError> {
        if !self.has_window() {
            return Err(SourceError::Exhausted);
        }
        Ok(&self.data[self.start..self.start + self.window as usize])
    }

    async fn advance(&mut self) -> Result<(), SourceError> {
        if !self.has_window() {
            return Err(SourceError::Exhausted);
        }
        self.start += 1;
        Ok(())
    }

    async fn exhausted(&mut self) -> Result<bool, SourceError> {
        Ok(!self.has_window())
    }

    fn window_size(&self) -> u32 {
        self.window
    }
}

/// An endless window over a ring of `N` elements.
///
/// Windows that would run past the end of the vector wrap around to its
/// start. Wrap-around views come from a patch buffer of `2·(W−1)` elements,
/// the last `W−1` of the ring followed by the first `W−1`, so every window
/// is still one contiguous slice. The source never exhausts.
pub struct RingSource<T> {
    data: Vec<T>,
    patch: Vec<T>,
    window: u32,
    start: usize,
}

impl<T: Clone> RingSource<T> {
    pub fn new(data: Vec<T>, window_size: u32) -> Result<Self, SourceError> {
        check_window_size(window_size)?;
        if window_size as usize > data.len() {
            return Err(SourceError::WindowTooLarge {
                window: window_size,
                len: data.len(),
            });
        }
        let wrap = window_size as usize - 1;
        let mut patch = Vec::with_capacity(wrap * 2);
        patch.extend_from_slice(&data[data.len() - wrap..]);
        patch.extend_from_slice(&data[..wrap]);
        Ok(RingSource {
            data,
            patch,
            window: window_size,
            start: 0,
        })
    }
}

#[async_trait]
impl<T: Send> WindowSource<T> for RingSource<T> {
    async fn current(&mut self) -> Result<&[T], SourceError> {
        let n = self.data.len();
        let w = self.window as usize;
        let m = self.start % n;
        if m + w <= n {
            Ok(&self.data[m..m + w])
        } else {
            // The window wraps; its image in the patch starts right after
            // the last position that fits the main vector.
            let offset = m - (n - w + 1);
            Ok(&self.patch[offset..offset + w])
        }
    }

    async fn advance(&mut self) -> Result<(), SourceError> {
        self.start = (self.start + 1) % self.data.len();
        Ok(())
    }

    async fn exhausted(&mut self) -> Result<bool, SourceError> {
        Ok(false)
    }

    fn window_size(&self) -> u32 {
        self.window
    }
}

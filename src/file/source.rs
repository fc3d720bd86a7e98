//! Line-oriented file supply and its window source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use log::warn;

use crate::error::SourceError;
use crate::streaming::{LaunchPolicy, StreamingSource, Supply};
use crate::traits::WindowSource;

/// Reads one value of `T` per line from an open file.
///
/// Leading and trailing whitespace around a value is tolerated. A line that
/// does not parse as `T` ends the stream at that point, the same as a real
/// EOF; it is not an error. Reading stops once `limit` elements have been
/// produced.
pub struct FileSupply<T> {
    reader: BufReader<File>,
    consumed: u32,
    limit: u32,
    done: bool,
    _element: PhantomData<fn() -> T>,
}

impl<T: FromStr> FileSupply<T> {
    fn fetch(&mut self, budget: u32) -> Result<Vec<T>, SourceError> {
        let mut batch = Vec::with_capacity(budget as usize);
        let mut line = String::new();
        while (batch.len() as u32) < budget && !self.done && self.consumed < self.limit {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| SourceError::SupplyFailed(e.to_string()))?;
            if read == 0 {
                self.done = true;
                break;
            }
            match line.trim().parse::<T>() {
                Ok(value) => {
                    batch.push(value);
                    self.consumed += 1;
                }
                Err(_) => {
                    warn!("unparsable line after {} elements, ending stream", self.consumed);
                    self.done = true;
                }
            }
        }
        Ok(batch)
    }
}

impl<T> Supply for FileSupply<T>
where
    T: FromStr + Send + 'static,
{
    type Item = T;

    fn fetch_initial(&mut self, budget: u32) -> Result<Vec<T>, SourceError> {
        self.fetch(budget)
    }

    fn fetch_refill(&mut self, budget: u32) -> Result<Vec<T>, SourceError> {
        self.fetch(budget)
    }
}

/// A sliding window over the values in a text file, one value per line.
pub struct FileSource<T>
where
    T: FromStr + Send + 'static,
{
    inner: StreamingSource<FileSupply<T>>,
}

impl<T> FileSource<T>
where
    T: FromStr + Send + 'static,
{
    /// Opens `path` with the deferred launch policy and no element limit.
    pub fn open(path: impl AsRef<Path>, window_size: u32) -> Result<Self, SourceError> {
        Self::open_with(path, window_size, LaunchPolicy::default(), None)
    }

    /// Opens `path` with an explicit launch policy and an optional upper
    /// bound on the number of elements ever read from the file.
    pub fn open_with(
        path: impl AsRef<Path>,
        window_size: u32,
        policy: LaunchPolicy,
        limit: Option<u32>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SourceError::Construction(format!("cannot open {}: {}", path.display(), e))
        })?;
        let supply = FileSupply {
            reader: BufReader::new(file),
            consumed: 0,
            limit: limit.unwrap_or(u32::MAX),
            done: false,
            _element: PhantomData,
        };
        Ok(FileSource {
            inner: StreamingSource::new(supply, window_size, policy)?,
        })
    }
}

#[async_trait]
impl<T> WindowSource<T> for FileSource<T>
where
    T: FromStr + Send + 'static,
{
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

//! Text-file window source.
//!
//! Reads one ASCII-formatted value per line from a file and exposes the
//! stream through the sliding-window protocol, prefetching ahead of the
//! consumer via [`StreamingSource`](crate::streaming::StreamingSource).
//!
//! ```rust,no_run
//! use windowstream::{FileSource, WindowSource};
//!
//! # async fn demo() -> Result<(), windowstream::SourceError> {
//! let mut source = FileSource::<u32>::open("ticks.txt", 10)?;
//! while !source.exhausted().await? {
//!     println!("{:?}", source.current().await?);
//!     source.advance().await?;
//! }
//! # Ok(())
//! # }
//! ```

mod source;

pub use source::{FileSource, FileSupply};

//! Sliding-window data sources.
//!
//! This library presents one abstraction over several data supplies: a
//! contiguous, fixed-size window of values of a numeric element type,
//! advanced one element at a time. Trivial sources window over memory that
//! is already resident (a vector, a borrowed slice, a ring); the streaming
//! sources window over a text file or a SQLite query and keep reading in
//! the background while the consumer works through the current window.
//!
//! - [`WindowSource`]: the protocol every source implements
//! - [`StreamingSource`]: the double-buffered engine behind the file and
//!   SQLite sources, generic over a [`Supply`]
//! - [`FileSource`] / [`SqliteSource`]: streaming sources over a line-based
//!   text file and a `LIMIT ?/OFFSET ?` query
//! - [`VectorSource`] / [`SliceSource`] / [`RingSource`] /
//!   [`MutableVectorSource`]: in-memory sources
//!
//! # Example
//!
//! ```rust,no_run
//! use windowstream::{FileSource, WindowSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), windowstream::SourceError> {
//!     let mut source = FileSource::<f64>::open("samples.txt", 16)?;
//!     while !source.exhausted().await? {
//!         let window = source.current().await?;
//!         let mean = window.iter().sum::<f64>() / window.len() as f64;
//!         println!("{mean}");
//!         source.advance().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod sqlite;
pub mod streaming;
pub mod traits;

pub use error::SourceError;
pub use file::FileSource;
pub use memory::{MutableVectorSource, RingSource, SliceSource, VectorSource};
pub use sqlite::SqliteSource;
pub use streaming::{LaunchPolicy, StreamingSource, Supply};
pub use traits::WindowSource;

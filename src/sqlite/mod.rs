//! SQLite window source.
//!
//! Windows over the rows of a parameterised query. The query must carry two
//! positional parameters in order, row count then offset, e.g.
//! `SELECT v FROM samples LIMIT ? OFFSET ?`; each background fetch binds the
//! fetch budget and the number of elements already consumed. Column 0 of
//! each row is read as the element type.
//!
//! No SQL escaping is performed anywhere in this module; query safety is
//! the caller's responsibility.
//!
//! ```rust,no_run
//! use std::sync::{Arc, Mutex};
//! use rusqlite::Connection;
//! use windowstream::{SqliteSource, WindowSource};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = Arc::new(Mutex::new(Connection::open("samples.db")?));
//! let mut source =
//!     SqliteSource::<f64>::new(conn, "SELECT v FROM samples LIMIT ? OFFSET ?", 10)?;
//! while !source.exhausted().await? {
//!     println!("{:?}", source.current().await?);
//!     source.advance().await?;
//! }
//! # Ok(())
//! # }
//! ```

mod source;

pub use source::{SqliteSource, SqliteSupply};

//! Paged query supply and its window source.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::FromSql;
use rusqlite::{params, Connection};

use crate::error::SourceError;
use crate::streaming::{LaunchPolicy, StreamingSource, Supply};
use crate::traits::WindowSource;

/// Reads pages of rows through a `LIMIT ?/OFFSET ?` query.
///
/// The connection is shared, not owned: the caller keeps its own handle and
/// closes it after the source is dropped. Statements go through the
/// connection's statement cache, so refills re-bind without re-parsing the
/// SQL. `consumed` doubles as the offset binding, which keeps the paging
/// consistent with however many rows earlier fetches actually returned.
pub struct SqliteSupply<T> {
    conn: Arc<Mutex<Connection>>,
    query: String,
    consumed: u32,
    limit: u32,
    _element: PhantomData<fn() -> T>,
}

impl<T: FromSql> SqliteSupply<T> {
    fn fetch(&mut self, budget: u32) -> Result<Vec<T>, SourceError> {
        if self.consumed >= self.limit {
            return Ok(Vec::new());
        }
        let rows_wanted = budget.min(self.limit - self.consumed);
        let conn = self
            .conn
            .lock()
            .map_err(|_| SourceError::SupplyFailed("connection mutex poisoned".to_string()))?;
        let mut stmt = conn
            .prepare_cached(&self.query)
            .map_err(|e| SourceError::SupplyFailed(e.to_string()))?;
        let mut rows = stmt
            .query(params![rows_wanted, self.consumed])
            .map_err(|e| SourceError::SupplyFailed(e.to_string()))?;
        let mut batch = Vec::with_capacity(rows_wanted as usize);
        while let Some(row) = rows
            .next()
            .map_err(|e| SourceError::SupplyFailed(e.to_string()))?
        {
            let value: T = row
                .get(0)
                .map_err(|e| SourceError::SupplyFailed(e.to_string()))?;
            batch.push(value);
            self.consumed += 1;
        }
        Ok(batch)
    }
}

impl<T> Supply for SqliteSupply<T>
where
    T: FromSql + Send + 'static,
{
    type Item = T;

    fn fetch_initial(&mut self, budget: u32) -> Result<Vec<T>, SourceError> {
        self.fetch(budget)
    }

    fn fetch_refill(&mut self, budget: u32) -> Result<Vec<T>, SourceError> {
        self.fetch(budget)
    }
}

/// A sliding window over the rows of a paged SQLite query.
pub struct SqliteSource<T>
where
    T: FromSql + Send + 'static,
{
    inner: StreamingSource<SqliteSupply<T>>,
}

impl<T> SqliteSource<T>
where
    T: FromSql + Send + 'static,
{
    /// Builds a source over `query` with the deferred launch policy and no
    /// element limit.
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        query: impl Into<String>,
        window_size: u32,
    ) -> Result<Self, SourceError> {
        Self::new_with(conn, query, window_size, LaunchPolicy::default(), None)
    }

    /// Builds a source with an explicit launch policy and an optional upper
    /// bound on the number of rows ever read.
    ///
    /// The query is prepared here once, both to validate it and to seed the
    /// statement cache the fetches go through.
    pub fn new_with(
        conn: Arc<Mutex<Connection>>,
        query: impl Into<String>,
        window_size: u32,
        policy: LaunchPolicy,
        limit: Option<u32>,
    ) -> Result<Self, SourceError> {
        let query = query.into();
        {
            let guard = conn.lock().map_err(|_| {
                SourceError::Construction("connection mutex poisoned".to_string())
            })?;
            let stmt = guard
                .prepare_cached(&query)
                .map_err(|e| SourceError::Construction(format!("cannot prepare query: {}", e)))?;
            if stmt.parameter_count() != 2 {
                return Err(SourceError::Construction(format!(
                    "query must bind two parameters (row count, offset), found {}",
                    stmt.parameter_count()
                )));
            }
        }
        let supply = SqliteSupply {
            conn,
            query,
            consumed: 0,
            limit: limit.unwrap_or(u32::MAX),
            _element: PhantomData,
        };
        Ok(SqliteSource {
            inner: StreamingSource::new(supply, window_size, policy)?,
        })
    }
}

#[async_trait]
impl<T> WindowSource<T> for SqliteSource<T>
where
    T: FromSql + Send + 'static,
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

//! Double-buffered streaming engine.
//!
//! [`StreamingSource`] keeps a contiguous working buffer of elements ahead
//! of the consumer and tops it up from a [`Supply`] while the consumer works
//! through the current window. The exposed window is always a dense slice
//! of one allocation: a completed fetch is folded in by discarding the
//! consumed prefix and appending at the tail, so the view never straddles a
//! seam.
//!
//! One fetch is outstanding at most. Under [`LaunchPolicy::Eager`] it runs
//! on a blocking worker concurrent with the consumer; under
//! [`LaunchPolicy::Deferred`] the request is recorded and executed on the
//! consumer's context when its result is first needed. The interface is
//! identical either way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::task::JoinHandle;

use crate::error::SourceError;
use crate::traits::WindowSource;

/// How fetches from the supply are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchPolicy {
    /// Fetches run on a Tokio blocking worker, concurrent with the
    /// consumer. Requires a Tokio runtime context at the call sites that
    /// schedule fetches (construction and `advance`).
    Eager,
    /// Fetches run on the consumer's own context at the moment their result
    /// is awaited. No extra thread is used.
    #[default]
    Deferred,
}

/// A bounded provider of elements in stream order.
///
/// Supplies are the seam between the generic engine and a concrete backing
/// store. The engine asks for the initial load once, right after
/// construction, and then for refills of one window at a time. A supply may
/// return fewer elements than the budget; that signals end of stream and is
/// never retried.
pub trait Supply: Send + 'static {
    /// Element type produced by this supply.
    type Item: Send + 'static;

    /// First read after construction. The budget is three windows.
    fn fetch_initial(&mut self, budget: u32) -> Result<Vec<Self::Item>, SourceError>;

    /// Subsequent top-up reads. The budget is one window.
    fn fetch_refill(&mut self, budget: u32) -> Result<Vec<Self::Item>, SourceError>;
}

#[derive(Debug, Clone, Copy)]
enum FetchKind {
    Initial,
    Refill,
}

/// The single outstanding fetch, when there is one.
enum Fetch<S: Supply> {
    /// Running on a blocking worker. The flag flips with release ordering
    /// right before the task returns; the consumer polls it with acquire
    /// ordering.
    Background {
        task: JoinHandle<(S, Result<Vec<S::Item>, SourceError>)>,
        done: Arc<AtomicBool>,
    },
    /// Recorded but not yet run.
    Deferred {
        supply: S,
        kind: FetchKind,
        budget: u32,
    },
}

fn run_fetch<S: Supply>(
    supply: &mut S,
    kind: FetchKind,
    budget: u32,
) -> Result<Vec<S::Item>, SourceError> {
    match kind {
        FetchKind::Initial => supply.fetch_initial(budget),
        FetchKind::Refill => supply.fetch_refill(budget),
    }
}

/// A window source that overlaps consumption with background fetches.
///
/// The working buffer reserves room for three windows up front: the initial
/// fetch fills it, and a refill of one window is scheduled every time the
/// consumer has advanced a full window past the last fold. The refill has a
/// whole window of advances to complete before the consumer can possibly
/// starve on it.
pub struct StreamingSource<S: Supply> {
    window: u32,
    policy: LaunchPolicy,
    data: Vec<S::Item>,
    start: usize,
    /// Present exactly when no fetch is outstanding; a scheduled fetch takes
    /// the supply with it and the fold puts it back.
    supply: Option<S>,
    fetch: Option<Fetch<S>>,
    failed: Option<String>,
}

impl<S: Supply> StreamingSource<S> {
    /// Builds the source and immediately schedules the initial fetch of
    /// three windows' worth of elements.
    pub fn new(supply: S, window_size: u32, policy: LaunchPolicy) -> Result<Self, SourceError> {
        if window_size == 0 {
            return Err(SourceError::Construction(
                "window size must be at least 1".to_string(),
            ));
        }
        let mut source = StreamingSource {
            window: window_size,
            policy,
            data: Vec::with_capacity(window_size as usize * 3),
            start: 0,
            supply: Some(supply),
            fetch: None,
            failed: None,
        };
        source.schedule(FetchKind::Initial);
        Ok(source)
    }

    fn has_window(&self) -> bool {
        self.data.len().saturating_sub(self.start) >= self.window as usize
    }

    /// True when a background fetch has completed but not yet been folded.
    fn ready(&self) -> bool {
        match &self.fetch {
            Some(Fetch::Background { done, .. }) => done.load(Ordering::Acquire),
            _ => false,
        }
    }

    fn schedule(&mut self, kind: FetchKind) {
        // One fetch outstanding at most: a missing supply means one is
        // already in flight.
        let Some(mut supply) = self.supply.take() else {
            return;
        };
        let budget = match kind {
            FetchKind::Initial => self.window.saturating_mul(3),
            FetchKind::Refill => self.window,
        };
        debug!("scheduling {:?} fetch, budget {}", kind, budget);
        match self.policy {
            LaunchPolicy::Eager => {
                let done = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&done);
                let task = tokio::task::spawn_blocking(move || {
                    let outcome = run_fetch(&mut supply, kind, budget);
                    flag.store(true, Ordering::Release);
                    (supply, outcome)
                });
                self.fetch = Some(Fetch::Background { task, done });
            }
            LaunchPolicy::Deferred => {
                self.fetch = Some(Fetch::Deferred {
                    supply,
                    kind,
                    budget,
                });
            }
        }
    }

    /// Drains the outstanding fetch into the buffer: awaits the result if it
    /// is still running, discards the consumed prefix, appends the batch and
    /// rewinds the cursor to the front of the buffer.
    async fn fold(&mut self) -> Result<(), SourceError> {
        let (supply, outcome) = match self.fetch.take() {
            Some(Fetch::Background { task, .. }) => match task.await {
                Ok(pair) => pair,
                Err(e) => return Err(self.fail(format!("background fetch aborted: {}", e))),
            },
            Some(Fetch::Deferred {
                mut supply,
                kind,
                budget,
            }) => {
                let outcome = run_fetch(&mut supply, kind, budget);
                (supply, outcome)
            }
            None => return Ok(()),
        };
        self.supply = Some(supply);
        let batch = match outcome {
            Ok(batch) => batch,
            Err(e) => return Err(self.fail(e.to_string())),
        };
        debug!(
            "folding {} fetched elements, discarding {} consumed",
            batch.len(),
            self.start
        );
        self.data.drain(..self.start);
        self.start = 0;
        self.data.extend(batch);
        Ok(())
    }

    fn fail(&mut self, cause: String) -> SourceError {
        self.failed = Some(cause.clone());
        SourceError::SupplyFailed(cause)
    }

    /// Brings the buffer up to date before any observation: folds a
    /// completed fetch, and if the buffer has dropped below one window,
    /// folds the outstanding fetch even if that means waiting on it.
    async fn check(&mut self) -> Result<(), SourceError> {
        if let Some(cause) = &self.failed {
            return Err(SourceError::SupplyFailed(cause.clone()));
        }
        if self.ready() {
            self.fold().await?;
        }
        while !self.has_window() && self.fetch.is_some() {
            self.fold().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Supply> WindowSource<S::Item> for StreamingSource<S> {
    async fn current(&mut self) -> Result<&[S::Item], SourceError> {
        self.check().await?;
        if !self.has_window() {
            return Err(SourceError::Exhausted);
        }
        Ok(&self.data[self.start..self.start + self.window as usize])
    }

    async fn advance(&mut self) -> Result<(), SourceError> {
        self.check().await?;
        if !self.has_window() {
            return Err(SourceError::Exhausted);
        }
        self.start += 1;
        if self.start == self.window as usize {
            // A full window has been consumed since the last fold: exactly
            // two windows remain buffered, so the refill has W advances of
            // headroom before the consumer can starve.
            self.schedule(FetchKind::Refill);
        }
        Ok(())
    }

    async fn exhausted(&mut self) -> Result<bool, SourceError> {
        self.check().await?;
        Ok(!self.has_window())
    }

    fn window_size(&self) -> u32 {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Hands out `0..total` in stream order and records every budget it was
    /// asked for. Optionally fails on the n-th fetch.
    struct ScriptedSupply {
        next: u32,
        total: u32,
        calls: usize,
        fail_on_call: Option<usize>,
        budgets: Arc<Mutex<Vec<u32>>>,
    }

    impl ScriptedSupply {
        fn new(total: u32) -> Self {
            ScriptedSupply {
                next: 0,
                total,
                calls: 0,
                fail_on_call: None,
                budgets: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing_on(total: u32, call: usize) -> Self {
            let mut supply = Self::new(total);
            supply.fail_on_call = Some(call);
            supply
        }

        fn take(&mut self, budget: u32) -> Result<Vec<u32>, SourceError> {
            self.budgets.lock().unwrap().push(budget);
            let call = self.calls;
            self.calls += 1;
            if self.fail_on_call == Some(call) {
                return Err(SourceError::SupplyFailed("scripted failure".to_string()));
            }
            let n = budget.min(self.total - self.next);
            let batch = (self.next..self.next + n).collect();
            self.next += n;
            Ok(batch)
        }
    }

    impl Supply for ScriptedSupply {
        type Item = u32;

        fn fetch_initial(&mut self, budget: u32) -> Result<Vec<u32>, SourceError> {
            self.take(budget)
        }

        fn fetch_refill(&mut self, budget: u32) -> Result<Vec<u32>, SourceError> {
            self.take(budget)
        }
    }

    async fn collect_windows(
        source: &mut StreamingSource<ScriptedSupply>,
    ) -> Vec<Vec<u32>> {
        let mut windows = Vec::new();
        while !source.exhausted().await.unwrap() {
            windows.push(source.current().await.unwrap().to_vec());
            source.advance().await.unwrap();
        }
        windows
    }

    #[tokio::test]
    async fn windows_follow_supply_order_deferred() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(40), 10, LaunchPolicy::Deferred).unwrap();
        let windows = collect_windows(&mut source).await;
        assert_eq!(windows.len(), 31);
        for (i, window) in windows.iter().enumerate() {
            let expected: Vec<u32> = (i as u32..i as u32 + 10).collect();
            assert_eq!(window, &expected);
        }
    }

    #[tokio::test]
    async fn windows_follow_supply_order_eager() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(40), 10, LaunchPolicy::Eager).unwrap();
        let windows = collect_windows(&mut source).await;
        assert_eq!(windows.len(), 31);
        for (i, window) in windows.iter().enumerate() {
            let expected: Vec<u32> = (i as u32..i as u32 + 10).collect();
            assert_eq!(window, &expected);
        }
    }

    #[tokio::test]
    async fn initial_budget_is_three_windows_refills_are_one() {
        let supply = ScriptedSupply::new(40);
        let budgets = Arc::clone(&supply.budgets);
        let mut source = StreamingSource::new(supply, 10, LaunchPolicy::Deferred).unwrap();
        collect_windows(&mut source).await;
        let budgets = budgets.lock().unwrap();
        assert_eq!(budgets[0], 30);
        assert!(budgets[1..].iter().all(|&b| b == 10));
    }

    #[tokio::test]
    async fn fold_rewinds_cursor_to_buffer_front() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(60), 10, LaunchPolicy::Deferred).unwrap();
        // First observation folds the initial fetch.
        source.current().await.unwrap();
        assert_eq!(source.start, 0);
        // Drain past the buffered 30 elements so the deferred refill must be
        // folded; the cursor must land back at the front.
        for _ in 0..21 {
            source.advance().await.unwrap();
        }
        let window = source.current().await.unwrap();
        assert_eq!(window, &(21..31).collect::<Vec<u32>>()[..]);
        assert_eq!(window.len(), source.window_size() as usize);
        assert_eq!(source.start, 0);
    }

    #[tokio::test]
    async fn at_most_one_fetch_outstanding() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(100), 5, LaunchPolicy::Eager).unwrap();
        for _ in 0..80 {
            if source.exhausted().await.unwrap() {
                break;
            }
            source.advance().await.unwrap();
            let outstanding = source.fetch.is_some() as usize + source.supply.is_some() as usize;
            // The supply is either held by the source or by the one fetch.
            assert_eq!(outstanding, 1);
        }
    }

    #[tokio::test]
    async fn short_initial_fetch_degrades_gracefully() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(12), 10, LaunchPolicy::Deferred).unwrap();
        let windows = collect_windows(&mut source).await;
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2], (2..12).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn empty_supply_is_exhausted_immediately() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(0), 4, LaunchPolicy::Deferred).unwrap();
        assert!(source.exhausted().await.unwrap());
        assert_eq!(source.current().await, Err(SourceError::Exhausted));
    }

    #[tokio::test]
    async fn advancing_past_the_end_is_an_error() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(6), 5, LaunchPolicy::Deferred).unwrap();
        // Two windows: the step past the final one is legal.
        source.advance().await.unwrap();
        source.advance().await.unwrap();
        assert!(source.exhausted().await.unwrap());
        assert_eq!(source.advance().await, Err(SourceError::Exhausted));
        assert_eq!(source.current().await, Err(SourceError::Exhausted));
    }

    #[tokio::test]
    async fn supply_error_is_terminal() {
        // Call 0 is the initial fetch; call 1 is the first refill.
        let mut source = StreamingSource::new(
            ScriptedSupply::failing_on(100, 1),
            10,
            LaunchPolicy::Deferred,
        )
        .unwrap();
        let mut seen_failure = false;
        for _ in 0..40 {
            match source.advance().await {
                Ok(()) => {}
                Err(SourceError::SupplyFailed(cause)) => {
                    assert_eq!(cause, "scripted failure");
                    seen_failure = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(seen_failure);
        // Terminal: every later call repeats the cause.
        assert_eq!(
            source.exhausted().await,
            Err(SourceError::SupplyFailed("scripted failure".to_string()))
        );
        assert_eq!(
            source.current().await,
            Err(SourceError::SupplyFailed("scripted failure".to_string()))
        );
    }

    #[tokio::test]
    async fn zero_window_is_rejected() {
        let result = StreamingSource::new(ScriptedSupply::new(10), 0, LaunchPolicy::Deferred);
        assert!(matches!(result, Err(SourceError::Construction(_))));
    }

    #[tokio::test]
    async fn single_window_size_yields_singletons() {
        let mut source =
            StreamingSource::new(ScriptedSupply::new(7), 1, LaunchPolicy::Deferred).unwrap();
        let windows = collect_windows(&mut source).await;
        assert_eq!(windows.len(), 7);
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window, &[i as u32]);
        }
    }
}

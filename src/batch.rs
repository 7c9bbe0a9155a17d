use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::{stream::FuturesUnordered, StreamExt};

use crate::{ClientError, Result};

/// Progress notification, sent once per finished item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    /// Items finished so far, including this one.
    pub completed: usize,
    pub total: usize,
    /// Position of the item in the input.
    pub index: usize,
    pub succeeded: bool,
}

type ProgressFn = dyn Fn(BatchProgress) + Send + Sync;

/// Controls a windowed batch run.
#[derive(Clone)]
pub struct BatchOptions {
    /// Items sent per window; each window completes before the next starts.
    pub concurrency: usize,
    /// Stop after the first window that contains a failure.
    pub fail_fast: bool,
    on_progress: Option<Arc<ProgressFn>>,
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("concurrency", &self.concurrency)
            .field("fail_fast", &self.fail_fast)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fail_fast: false,
            on_progress: None,
        }
    }
}

impl BatchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(BatchProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

/// A failed batch item.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub key: String,
    pub error: ClientError,
}

/// Outcome of a batch run; both lists are ordered by input index.
#[derive(Debug)]
pub struct BatchResult<T> {
    pub succeeded: Vec<(usize, T)>,
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchResult<T> {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs `op` over `items` in windows of `options.concurrency`.
///
/// A failing item never cancels its window siblings. With `fail_fast`, no
/// further window is started and the lowest-index failure is returned.
pub(crate) async fn run_windowed<I, T, K, F, Fut>(
    items: Vec<I>,
    options: &BatchOptions,
    key_of: K,
    op: F,
) -> Result<BatchResult<T>>
where
    K: Fn(&I) -> String,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = items.len();
    let window = options.concurrency.max(1);
    let mut completed = 0usize;
    let mut result = BatchResult {
        succeeded: Vec::with_capacity(total),
        failed: Vec::new(),
    };

    let mut pending = items.into_iter().enumerate().peekable();
    while pending.peek().is_some() {
        let mut in_flight: FuturesUnordered<_> = pending
            .by_ref()
            .take(window)
            .map(|(index, item)| {
                let key = key_of(&item);
                let call = op(item);
                async move { (index, key, call.await) }
            })
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(size = in_flight.len(), completed, total, "starting batch window");

        let mut window_failed = false;
        while let Some((index, key, outcome)) = in_flight.next().await {
            completed += 1;
            let succeeded = outcome.is_ok();
            match outcome {
                Ok(value) => result.succeeded.push((index, value)),
                Err(error) => {
                    window_failed = true;
                    result.failed.push(BatchFailure { index, key, error });
                }
            }
            if let Some(callback) = &options.on_progress {
                callback(BatchProgress {
                    completed,
                    total,
                    index,
                    succeeded,
                });
            }
        }

        if options.fail_fast && window_failed {
            result.failed.sort_by_key(|failure| failure.index);
            let first = result.failed.swap_remove(0);
            return Err(first.error);
        }
    }

    result.succeeded.sort_by_key(|(index, _)| *index);
    result.failed.sort_by_key(|failure| failure.index);
    Ok(result)
}

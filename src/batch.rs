//! Batch application of one filter to many frames.
//!
//! Frames are independent, so they may run on a rayon pool. Output order
//! always matches input order. Cancellation is checked before each frame
//! starts; frames already running finish normally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::config::FilterConfig;
use crate::error::{FilterError, FilterResult};
use crate::frame::Frame;
use crate::registry::{Family, Filter, Registry};

/// Shared flag to stop a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag so the runner can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Result of a batch that may have been cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    /// Outputs for the longest run of finished frames starting at index 0.
    pub frames: Vec<Frame>,
    /// Frames that finished, including any after the first skipped one.
    pub completed: usize,
    pub cancelled: bool,
}

/// Applies a named filter to an ordered sequence of frames.
pub struct BatchRunner {
    registry: Arc<Registry>,
    pool: Option<rayon::ThreadPool>,
    parallel: bool,
    token: CancellationToken,
}

impl BatchRunner {
    /// Parallel runner on the global rayon pool.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            pool: None,
            parallel: true,
            token: CancellationToken::new(),
        }
    }

    /// Runner using the batch settings of `config` and a registry built from it.
    pub fn from_config(config: &FilterConfig) -> FilterResult<Self> {
        let registry = Arc::new(Registry::from_config(config)?);
        let mut runner = Self::new(registry).with_parallel(config.batch.parallel);
        if config.batch.workers > 0 {
            runner = runner.with_workers(config.batch.workers)?;
        }
        Ok(runner)
    }

    /// Use a dedicated pool of `workers` threads.
    pub fn with_workers(mut self, workers: usize) -> FilterResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("filter-batch-{}", i))
            .build()
            .map_err(|e| FilterError::config(format!("failed to build worker pool: {}", e)))?;
        self.pool = Some(pool);
        Ok(self)
    }

    /// Share an existing token, e.g. one held by a UI stop button.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Token that cancels this runner's batches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Apply `name` from `family` to every frame.
    ///
    /// # Returns
    /// One output per input, in input order. Fails with the error of the
    /// lowest-indexed failing frame, or `Cancelled` if the token was set
    /// before every frame had started.
    pub fn apply_all(&self, family: Family, name: &str, frames: &[Frame]) -> FilterResult<Vec<Frame>> {
        let output = self.apply_all_partial(family, name, frames)?;
        if output.cancelled {
            return Err(FilterError::Cancelled {
                completed: output.completed,
            });
        }
        Ok(output.frames)
    }

    /// Like [`apply_all`](Self::apply_all), but a cancelled batch still
    /// hands back the frames finished before the first skipped one.
    pub fn apply_all_partial(&self, family: Family, name: &str, frames: &[Frame]) -> FilterResult<BatchOutput> {
        let filter = self.registry.resolve(family, name)?;
        let started = Instant::now();
        tracing::info!(
            family = %family,
            filter = filter.name(),
            frames = frames.len(),
            parallel = self.parallel,
            "batch started"
        );

        let results = if self.parallel {
            match &self.pool {
                Some(pool) => pool.install(|| self.run_parallel(filter, frames)),
                None => self.run_parallel(filter, frames),
            }
        } else {
            self.run_sequential(filter, frames)
        };

        let output = Self::collect(results)?;
        if output.cancelled {
            tracing::info!(
                filter = filter.name(),
                completed = output.completed,
                kept = output.frames.len(),
                "batch cancelled"
            );
        } else {
            tracing::info!(
                filter = filter.name(),
                frames = output.frames.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "batch finished"
            );
        }
        Ok(output)
    }

    pub fn enhance_all(&self, name: &str, frames: &[Frame]) -> FilterResult<Vec<Frame>> {
        self.apply_all(Family::Enhance, name, frames)
    }

    pub fn stylize_all(&self, name: &str, frames: &[Frame]) -> FilterResult<Vec<Frame>> {
        self.apply_all(Family::Style, name, frames)
    }

    fn run_one(&self, filter: Filter, index: usize, frame: &Frame) -> Option<FilterResult<Frame>> {
        if self.token.is_cancelled() {
            return None;
        }
        Some(self.registry.apply_indexed(filter, frame, index))
    }

    fn run_parallel(&self, filter: Filter, frames: &[Frame]) -> Vec<Option<FilterResult<Frame>>> {
        frames
            .par_iter()
            .enumerate()
            .map(|(i, frame)| self.run_one(filter, i, frame))
            .collect()
    }

    fn run_sequential(&self, filter: Filter, frames: &[Frame]) -> Vec<Option<FilterResult<Frame>>> {
        let mut results = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            let result = self.run_one(filter, i, frame);
            let stop = result.is_none();
            results.push(result);
            if stop {
                break;
            }
        }
        results
    }

    fn collect(results: Vec<Option<FilterResult<Frame>>>) -> FilterResult<BatchOutput> {
        let mut frames = Vec::with_capacity(results.len());
        let mut completed = 0;
        let mut cancelled = false;
        for result in results {
            match result {
                Some(Ok(frame)) => {
                    completed += 1;
                    if !cancelled {
                        frames.push(frame);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => cancelled = true,
            }
        }
        Ok(BatchOutput {
            frames,
            completed,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::oil_paint::{HistogramOilPaint, OilPaintProvider};
    use ndarray::{Array3, ArrayView3};
    use std::sync::atomic::AtomicUsize;

    /// Oil paint that trips the token on its `limit`-th call.
    struct CancelAfter {
        token: CancellationToken,
        calls: AtomicUsize,
        limit: usize,
    }

    impl OilPaintProvider for CancelAfter {
        fn oil_paint(&self, input: ArrayView3<u8>, size: usize, dyn_ratio: u8) -> FilterResult<Array3<u8>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
                self.token.cancel();
            }
            HistogramOilPaint.oil_paint(input, size, dyn_ratio)
        }
    }

    fn cancelling_runner(limit: usize) -> BatchRunner {
        let token = CancellationToken::new();
        let provider = CancelAfter {
            token: token.clone(),
            calls: AtomicUsize::new(0),
            limit,
        };
        let registry = Registry::new().with_oil_paint_provider(Arc::new(provider));
        BatchRunner::new(Arc::new(registry))
            .with_parallel(false)
            .with_cancellation_token(token)
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::filled(6, 4, [(i * 20) as u8, 100, 200]).unwrap())
            .collect()
    }

    #[test]
    fn test_order_preserved() {
        let runner = BatchRunner::new(Arc::new(Registry::new()));
        let input = frames(8);
        let out = runner.apply_all(Family::Enhance, "sharpen", &input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_empty_batch() {
        let runner = BatchRunner::new(Arc::new(Registry::new()));
        assert!(runner.apply_all(Family::Style, "cartoon", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let registry = Arc::new(Registry::new().with_vintage_seed(11));
        let input = frames(5);
        let par = BatchRunner::new(registry.clone())
            .with_workers(2)
            .unwrap()
            .stylize_all("vintage", &input)
            .unwrap();
        let seq = BatchRunner::new(registry)
            .with_parallel(false)
            .stylize_all("vintage", &input)
            .unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn test_cancelled_before_start() {
        let runner = BatchRunner::new(Arc::new(Registry::new())).with_parallel(false);
        runner.cancellation_token().cancel();
        let err = runner.apply_all(Family::Enhance, "sharpen", &frames(3)).unwrap_err();
        assert!(matches!(err, FilterError::Cancelled { completed: 0 }));
    }

    #[test]
    fn test_reset_allows_reuse() {
        let runner = BatchRunner::new(Arc::new(Registry::new()));
        let token = runner.cancellation_token();
        token.cancel();
        token.reset();
        assert_eq!(runner.enhance_all("sharpen", &frames(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_error_reported() {
        let runner = BatchRunner::new(Arc::new(Registry::new()));
        let mut input = frames(3);
        input[1] = Frame::from_plane(ndarray::Array2::<u8>::zeros((4, 6))).unwrap();
        let err = runner.enhance_all("sharpen", &input).unwrap_err();
        assert!(matches!(err, FilterError::InvalidFrame { .. }));
    }

    #[test]
    fn test_cancelled_mid_batch_keeps_finished_frames() {
        let input = frames(5);
        let output = cancelling_runner(2)
            .apply_all_partial(Family::Style, "oil_painting", &input)
            .unwrap();
        assert!(output.cancelled);
        assert_eq!(output.completed, 2);
        let registry = Registry::new();
        let expected: Vec<Frame> = input[..2]
            .iter()
            .map(|f| registry.stylize("oil_painting", f).unwrap())
            .collect();
        assert_eq!(output.frames, expected);
    }

    #[test]
    fn test_cancelled_mid_batch_reports_count() {
        let err = cancelling_runner(3)
            .stylize_all("oil_painting", &frames(5))
            .unwrap_err();
        assert!(matches!(err, FilterError::Cancelled { completed: 3 }));
    }

    #[test]
    fn test_partial_without_cancel_is_complete() {
        let runner = BatchRunner::new(Arc::new(Registry::new()));
        let output = runner.apply_all_partial(Family::Enhance, "sharpen", &frames(4)).unwrap();
        assert!(!output.cancelled);
        assert_eq!(output.completed, 4);
        assert_eq!(output.frames, frames(4));
    }
}

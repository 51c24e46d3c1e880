//! Reusable bounded-concurrency stage runner.
//!
//! A [`Stage`] executes one async work function over a queue of items with a
//! hard cap on how many invocations run simultaneously. The pipeline
//! instantiates it three times (read, generate, write) with independent
//! concurrency limits.
//!
//! The contract, precisely:
//!
//! - [`Stage::submit`] never blocks beyond the enqueue itself; the input
//!   queue is unbounded. Backpressure is applied to *execution*: the driver
//!   acquires a semaphore permit before spawning each item, so in-flight
//!   invocations never exceed the configured limit.
//! - [`Stage::complete`] signals end of input, then waits until every queued
//!   and in-flight item has finished. Work functions that feed a downstream
//!   stage hold a [`StageSender`] clone; those clones drop when the upstream
//!   stage drains, which is how completion chains through a linear pipeline
//!   without any explicit signaling protocol.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// Cloneable submission handle for a [`Stage`].
///
/// Held by upstream work functions so they can forward outputs downstream.
/// The stage's queue stays open until the stage itself is completed *and*
/// every sender clone has dropped.
pub struct StageSender<T> {
    tx: mpsc::UnboundedSender<T>,
    name: &'static str,
}

// Manual Clone: deriving would require T: Clone.
impl<T> Clone for StageSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            name: self.name,
        }
    }
}

impl<T> StageSender<T> {
    /// Enqueue one item for the stage.
    ///
    /// By construction the stage's driver outlives every sender, so a failed
    /// send indicates a driver that already shut down; the item is dropped
    /// with a warning rather than propagated, since there is no caller that
    /// could meaningfully retry.
    pub fn submit(&self, item: T) {
        if self.tx.send(item).is_err() {
            warn!(stage = self.name, "submit after stage shutdown; item dropped");
        }
    }
}

/// A bounded-concurrency worker pool over an unbounded input queue.
pub struct Stage<T> {
    tx: mpsc::UnboundedSender<T>,
    driver: JoinHandle<()>,
    name: &'static str,
}

impl<T: Send + 'static> Stage<T> {
    /// Spawn a stage running `work` with at most `max_concurrency`
    /// invocations in flight.
    ///
    /// `work` is invoked once per submitted item. It owns the item and is
    /// responsible for forwarding its output (or recording its error) —
    /// the runner itself is agnostic about what the work does.
    ///
    /// Callers validate `max_concurrency > 0` before spawning; the pipeline
    /// rejects zero at configuration time.
    pub fn spawn<F, Fut>(name: &'static str, max_concurrency: usize, work: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<T>();
        let work = Arc::new(work);

        let driver = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(max_concurrency));
            let mut tasks: JoinSet<()> = JoinSet::new();

            while let Some(item) = rx.recv().await {
                // Reap already-finished tasks so the set doesn't grow with
                // the total item count.
                while let Some(res) = tasks.try_join_next() {
                    if let Err(err) = res {
                        warn!(stage = name, "worker task failed: {err}");
                    }
                }

                // Acquiring before spawning is what enforces the cap: the
                // driver stalls here (items keep queuing in the channel)
                // until a running invocation releases its permit.
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    // The semaphore is never closed; unreachable in practice.
                    break;
                };
                let work = Arc::clone(&work);
                tasks.spawn(async move {
                    let _permit = permit;
                    work(item).await;
                });
            }

            // Input closed: drain everything still in flight.
            while let Some(res) = tasks.join_next().await {
                if let Err(err) = res {
                    warn!(stage = name, "worker task failed: {err}");
                }
            }
            debug!(stage = name, "stage drained");
        });

        Self { tx, driver, name }
    }

    /// Enqueue one item. Never blocks beyond the enqueue itself.
    pub fn submit(&self, item: T) {
        if self.tx.send(item).is_err() {
            warn!(stage = self.name, "submit after stage shutdown; item dropped");
        }
    }

    /// A cloneable handle for submitting from other stages' work functions.
    #[must_use]
    pub fn sender(&self) -> StageSender<T> {
        StageSender {
            tx: self.tx.clone(),
            name: self.name,
        }
    }

    /// Signal that no further items will be submitted through this handle,
    /// then wait for the stage to drain.
    ///
    /// Returns once every queued and in-flight invocation has finished.
    /// Outstanding [`StageSender`] clones keep the queue open, so a
    /// downstream stage completed after its upstream drains is guaranteed to
    /// have seen every forwarded item.
    pub async fn complete(self) {
        drop(self.tx);
        if let Err(err) = self.driver.await {
            warn!(stage = self.name, "stage driver failed: {err}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks the high-water mark of simultaneous invocations.
    #[derive(Default)]
    struct ConcurrencyProbe {
        current: AtomicUsize,
        max: AtomicUsize,
    }

    impl ConcurrencyProbe {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        fn observed_max(&self) -> usize {
            self.max.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_concurrency_of_one() {
        let probe = Arc::new(ConcurrencyProbe::default());
        let done = Arc::new(AtomicUsize::new(0));

        let stage = {
            let probe = Arc::clone(&probe);
            let done = Arc::clone(&done);
            Stage::spawn("test", 1, move |_item: usize| {
                let probe = Arc::clone(&probe);
                let done = Arc::clone(&done);
                async move {
                    probe.enter();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    probe.exit();
                    done.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        for i in 0..20 {
            stage.submit(i);
        }
        stage.complete().await;

        assert_eq!(done.load(Ordering::SeqCst), 20);
        assert_eq!(probe.observed_max(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn never_exceeds_concurrency_of_four() {
        let probe = Arc::new(ConcurrencyProbe::default());
        let done = Arc::new(AtomicUsize::new(0));

        let stage = {
            let probe = Arc::clone(&probe);
            let done = Arc::clone(&done);
            Stage::spawn("test", 4, move |_item: usize| {
                let probe = Arc::clone(&probe);
                let done = Arc::clone(&done);
                async move {
                    probe.enter();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    probe.exit();
                    done.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        for i in 0..100 {
            stage.submit(i);
        }
        stage.complete().await;

        assert_eq!(done.load(Ordering::SeqCst), 100);
        assert!(probe.observed_max() <= 4, "max was {}", probe.observed_max());
    }

    #[tokio::test]
    async fn completes_with_zero_items() {
        let stage = Stage::spawn("empty", 2, |_item: ()| async {});
        stage.complete().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn completion_waits_for_queued_items() {
        let done = Arc::new(AtomicUsize::new(0));
        let stage = {
            let done = Arc::clone(&done);
            Stage::spawn("test", 2, move |_item: usize| {
                let done = Arc::clone(&done);
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        // Far more items than the concurrency limit; all must still run
        // before complete() returns.
        for i in 0..50 {
            stage.submit(i);
        }
        stage.complete().await;
        assert_eq!(done.load(Ordering::SeqCst), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn linked_stages_propagate_completion() {
        let collected = Arc::new(std::sync::Mutex::new(Vec::new()));

        let downstream = {
            let collected = Arc::clone(&collected);
            Stage::spawn("down", 2, move |item: usize| {
                let collected = Arc::clone(&collected);
                async move {
                    collected.lock().unwrap().push(item);
                }
            })
        };
        let forward = downstream.sender();

        let upstream = Stage::spawn("up", 3, move |item: usize| {
            let forward = forward.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                forward.submit(item * 10);
            }
        });

        for i in 0..10 {
            upstream.submit(i);
        }
        upstream.complete().await;
        downstream.complete().await;

        let mut seen = collected.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn panicking_worker_does_not_wedge_completion() {
        let done = Arc::new(AtomicUsize::new(0));
        let stage = {
            let done = Arc::clone(&done);
            Stage::spawn("test", 2, move |item: usize| {
                let done = Arc::clone(&done);
                async move {
                    assert!(item != 3, "boom");
                    done.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        for i in 0..6 {
            stage.submit(i);
        }
        stage.complete().await;
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }
}

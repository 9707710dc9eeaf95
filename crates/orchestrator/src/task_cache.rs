//! Single-slot memoization of an in-flight async task.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callers arriving while a task is in flight join it instead of starting a
/// second one. The slot is cleared once the task reaches an outcome, so the
/// next call after completion starts fresh.
pub struct TaskCache<T: Clone> {
    slot: Mutex<Option<(u64, Shared<BoxFuture<'static, T>>)>>,
    next_run: AtomicU64,
}

impl<T: Clone> Default for TaskCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            next_run: AtomicU64::new(1),
        }
    }
}

impl<T> TaskCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight task, or start one with `start`.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (run, task) = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some((run, task)) => (*run, task.clone()),
                None => {
                    let run = self.next_run.fetch_add(1, Ordering::Relaxed);
                    let task = start().boxed().shared();
                    *slot = Some((run, task.clone()));
                    (run, task)
                }
            }
        };

        let outcome = task.await;

        let mut slot = self.slot.lock();
        if matches!(slot.as_ref(), Some((current, _)) if *current == run) {
            *slot = None;
        }
        outcome
    }

    /// Forget the in-flight task; callers already awaiting it are unaffected.
    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

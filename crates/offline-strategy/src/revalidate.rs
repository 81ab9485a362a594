//! Background revalidation tasks.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::{JoinError, JoinHandle};

/// Tracks spawned background revalidations.
///
/// Tasks run on the tokio runtime independently of the request that spawned
/// them, and keep running if a [`Revalidator::settle`] waiting on them is
/// cancelled. Nothing guarantees they finish before the runtime shuts down;
/// hosts that want every pending write to land call `settle`.
#[derive(Debug, Default)]
pub struct Revalidator {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Revalidator {
    /// Create an empty revalidator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a background task.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        // Reap finished tasks so the list does not grow without bound.
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(tokio::spawn(task));
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Wait for every outstanding task, including ones spawned while waiting.
    ///
    /// Returns how many tasks were awaited. Cancelling the returned future
    /// leaves unfinished tasks running and tracked.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let next = lock(&self.tasks).pop();
            let Some(handle) = next else {
                return settled;
            };
            let waiting = Requeue {
                tasks: &self.tasks,
                handle: Some(handle),
            };
            if let Err(err) = waiting.join().await {
                tracing::warn!(error = %err, "revalidation task did not complete");
            }
            settled += 1;
        }
    }
}

/// A handle taken out for joining. Put back if the join is abandoned.
struct Requeue<'a> {
    tasks: &'a Mutex<Vec<JoinHandle<()>>>,
    handle: Option<JoinHandle<()>>,
}

impl Requeue<'_> {
    async fn join(mut self) -> Result<(), JoinError> {
        let result = match self.handle.as_mut() {
            Some(handle) => handle.await,
            None => Ok(()),
        };
        self.handle = None;
        result
    }
}

impl Drop for Requeue<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            lock(self.tasks).push(handle);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! FIFO update serialization

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use arbor_core::ProjectError;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

type Job = Pin<Box<dyn Future<Output = Result<(), ProjectError>> + Send>>;

struct QueuedTask {
    job: Job,
    done: oneshot::Sender<Result<(), ProjectError>>,
}

/// A FIFO task queue bound to one project. At most one unit of work runs at
/// a time and units complete in arrival order, no matter how long any one
/// unit's I/O takes. A failed unit reports on its completion channel and
/// the worker moves on, so all graph mutation logic downstream can be
/// written as if single-threaded.
pub struct TaskQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<QueuedTask>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedTask>();
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                let result = task.job.await;
                if let Err(err) = &result {
                    debug!(error = %err, "queued update failed");
                }
                // Receiver may have been dropped by a fire-and-forget caller.
                let _ = task.done.send(result);
            }
        });
        TaskQueue {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Enqueue a unit of work. The returned channel resolves with the
    /// unit's outcome once every previously enqueued unit has settled.
    pub fn push<F>(&self, job: F) -> oneshot::Receiver<Result<(), ProjectError>>
    where
        F: Future<Output = Result<(), ProjectError>> + Send + 'static,
    {
        let (done, done_rx) = oneshot::channel();
        let task = QueuedTask {
            job: Box::pin(job),
            done,
        };
        let guard = self.tx.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => {
                if let Err(mpsc::error::SendError(task)) = tx.send(task) {
                    let _ = task.done.send(Err(ProjectError::Disposed));
                }
            }
            None => {
                let _ = task.done.send(Err(ProjectError::Disposed));
            }
        }
        done_rx
    }

    /// Enqueue and wait for the unit's own outcome.
    pub async fn run<F>(&self, job: F) -> Result<(), ProjectError>
    where
        F: Future<Output = Result<(), ProjectError>> + Send + 'static,
    {
        match self.push(job).await {
            Ok(result) => result,
            Err(_) => Err(ProjectError::Disposed),
        }
    }

    /// Stop accepting work. Already-enqueued units still drain through the
    /// worker (their continuations are expected to observe disposal and
    /// no-op).
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        TaskQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn units_complete_in_arrival_order() {
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut completions = Vec::new();
        for i in 0..5usize {
            let log = log.clone();
            completions.push(queue.push(async move {
                // Later units sleep less; order must still hold.
                tokio::time::sleep(Duration::from_millis(20 - 4 * i as u64)).await;
                log.lock().unwrap().push(i);
                Ok(())
            }));
        }
        for completion in completions {
            completion.await.unwrap().unwrap();
        }

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn failed_unit_does_not_block_the_next() {
        let queue = TaskQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let failed = queue.push(async { Err(ProjectError::Disposed) });
        let ran_clone = ran.clone();
        let succeeded = queue.push(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(failed.await.unwrap().is_err());
        assert!(succeeded.await.unwrap().is_ok());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closed_queue_rejects_new_work() {
        let queue = TaskQueue::new();
        queue.close();
        assert!(queue.is_closed());

        let result = queue.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(ProjectError::Disposed)));
    }
}

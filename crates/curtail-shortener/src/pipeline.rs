use std::sync::Arc;

use curtail_core::DeleteStore;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// One unit of deletion work: a user and at most `batch_size` of their
/// short keys. Jobs are independent, order-insensitive, and safe to
/// replay (soft-delete of a deleted row is a no-op).
#[derive(Debug, Clone)]
struct DeleteJob {
    user_id: String,
    short_keys: Vec<String>,
}

#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// The pipeline has been shut down; no further jobs are accepted.
    #[error("deletion queue is closed")]
    QueueClosed,
}

/// Asynchronous bulk soft-deletion.
///
/// A bulk request is sharded into bounded jobs on a shared queue,
/// consumed by a worker pool whose size is fixed at construction.
/// `submit` returns once the jobs are enqueued; the caller gets no
/// per-key confirmation, and a job dequeued by a worker always runs to
/// completion. A backend error is terminal for that job: it is
/// reported through tracing and the worker moves on to the next job,
/// never tearing down the pool.
pub struct DeletionPipeline {
    tx: mpsc::Sender<DeleteJob>,
    batch_size: usize,
    workers: Vec<JoinHandle<()>>,
}

impl DeletionPipeline {
    /// Spawns the worker pool. `queue_capacity` bounds the shared
    /// queue; a full queue makes `submit` wait (backpressure) rather
    /// than grow without limit.
    pub fn spawn<D: DeleteStore>(
        store: Arc<D>,
        workers: usize,
        batch_size: usize,
        queue_capacity: usize,
    ) -> Self {
        assert!(workers > 0, "worker pool must have at least one worker");
        assert!(batch_size > 0, "batch size must be positive");

        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let store = Arc::clone(&store);
                tokio::spawn(worker_loop(worker, rx, store))
            })
            .collect();

        Self {
            tx,
            batch_size,
            workers,
        }
    }

    /// Shards `short_keys` into jobs of at most the configured batch
    /// size and enqueues them. Returns as soon as everything is
    /// enqueued; deletion happens asynchronously.
    pub async fn submit(&self, user_id: &str, short_keys: Vec<String>) -> Result<(), SubmitError> {
        for chunk in short_keys.chunks(self.batch_size) {
            let job = DeleteJob {
                user_id: user_id.to_string(),
                short_keys: chunk.to_vec(),
            };
            self.tx
                .send(job)
                .await
                .map_err(|_| SubmitError::QueueClosed)?;
        }
        Ok(())
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue and waits for the workers to drain it.
    ///
    /// In a server process the pipeline lives for the process lifetime
    /// and this runs only during graceful shutdown; tests use it to
    /// observe the fully drained state.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Supervised worker loop: pulls jobs until the queue closes, applies
/// each with one backend call, and survives backend failures.
async fn worker_loop<D: DeleteStore>(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<DeleteJob>>>,
    store: Arc<D>,
) {
    loop {
        // Hold the receiver lock only while dequeuing, so other
        // workers can pull the next job while this one is busy.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            debug!(worker, "deletion queue closed, worker exiting");
            break;
        };

        match store
            .soft_delete_batch(&job.user_id, &job.short_keys)
            .await
        {
            Ok(()) => {
                debug!(
                    worker,
                    user_id = %job.user_id,
                    keys = job.short_keys.len(),
                    "delete job applied"
                );
            }
            Err(e) => {
                // Terminal for this job; the worker itself lives on.
                error!(
                    worker,
                    user_id = %job.user_id,
                    keys = job.short_keys.len(),
                    error = %e,
                    "delete job failed"
                );
            }
        }
    }
}

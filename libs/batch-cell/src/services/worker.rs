use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::{BatchError, PoolStats, ShutdownReport, WorkerConfig};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Default)]
struct WorkerCounters {
    in_flight: AtomicUsize,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// Result of one submitted task, joined independently of its siblings.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

impl<T> TaskHandle<T> {
    pub async fn join(self) -> Result<T, BatchError> {
        self.rx.await.map_err(|_| BatchError::TaskLost)
    }
}

/// Fixed-size pool of tokio workers pulling from one shared queue.
///
/// At most `worker_count` tasks execute at any moment. A panicking task is
/// contained to that task; its handle resolves to [`BatchError::TaskLost`]
/// and the worker moves on.
pub struct BatchWorkPool {
    config: WorkerConfig,
    sender: RwLock<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<WorkerCounters>,
}

impl BatchWorkPool {
    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start(config: WorkerConfig) -> Self {
        let worker_count = config.worker_count.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(WorkerCounters::default());

        let workers = (0..worker_count)
            .map(|i| {
                let worker_name = format!("{}-{}", config.pool_id, i);
                let receiver = Arc::clone(&receiver);
                let counters = Arc::clone(&counters);
                tokio::spawn(worker_loop(worker_name, receiver, counters))
            })
            .collect();

        info!("Started batch pool {} with {} workers", config.pool_id, worker_count);

        Self {
            config: WorkerConfig { worker_count, ..config },
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    pub async fn is_shutdown(&self) -> bool {
        self.sender.read().await.is_none()
    }

    /// Queue a task. Fails once [`BatchWorkPool::shutdown`] has begun.
    pub async fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>, BatchError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // The caller may have stopped waiting; that is not an error here.
            let _ = tx.send(task.await);
        });

        let sender = self.sender.read().await;
        let queued = match sender.as_ref() {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        };

        if !queued {
            return Err(BatchError::PoolShutdown { pool_id: self.config.pool_id.clone() });
        }

        Ok(TaskHandle { rx })
    }

    /// Run `task` once per key and wait for all of them.
    ///
    /// Output order follows `keys`, but callers should key results by the id
    /// rather than rely on completion order. A task that panics or is aborted
    /// yields `Err(TaskLost)` for its key only.
    pub async fn run_keyed<K, T, F, Fut>(
        &self,
        keys: Vec<K>,
        task: F,
    ) -> Result<Vec<(K, Result<T, BatchError>)>, BatchError>
    where
        K: Send + 'static,
        F: Fn(&K) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::with_capacity(keys.len());
        for key in keys {
            let handle = self.submit(task(&key)).await?;
            handles.push((key, handle));
        }

        let results = futures::future::join_all(
            handles
                .into_iter()
                .map(|(key, handle)| async move { (key, handle.join().await) }),
        )
        .await;

        Ok(results)
    }

    pub async fn stats(&self) -> PoolStats {
        PoolStats {
            worker_count: self.config.worker_count,
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            panicked: self.counters.panicked.load(Ordering::SeqCst),
            accepting: !self.is_shutdown().await,
        }
    }

    /// Stop accepting work, let workers drain the queue for up to the grace
    /// period, then abort whatever is still running. Idempotent.
    #[instrument(skip(self), fields(pool_id = %self.config.pool_id))]
    pub async fn shutdown(&self) -> ShutdownReport {
        let sender = self.sender.write().await.take();
        if sender.is_none() {
            debug!("Batch pool already shut down");
            return ShutdownReport { drained: true, aborted_workers: 0 };
        }
        // Dropping the last sender closes the queue; workers exit once it is empty.
        drop(sender);

        info!("Initiating graceful shutdown for batch pool {}", self.config.pool_id);

        let workers = std::mem::take(&mut *self.workers.lock().await);
        let grace = self.config.graceful_shutdown_timeout;
        let deadline = Instant::now() + grace;

        // A handle that completed is consumed here; only unfinished ones are kept.
        let mut stragglers = Vec::new();
        for mut worker in workers {
            if timeout_at(deadline, &mut worker).await.is_err() {
                stragglers.push(worker);
            }
        }

        let drained = stragglers.is_empty();
        let aborted_workers = stragglers.len();
        if !drained {
            warn!(
                "Batch pool {} did not drain within {:?}, aborting {} workers",
                self.config.pool_id, grace, aborted_workers
            );
            for worker in &stragglers {
                worker.abort();
            }
            for worker in stragglers {
                let _ = worker.await;
            }
        }

        info!("Batch pool {} shutdown complete", self.config.pool_id);
        ShutdownReport { drained, aborted_workers }
    }
}

async fn worker_loop(
    worker_name: String,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    counters: Arc<WorkerCounters>,
) {
    debug!("Worker loop started: {}", worker_name);

    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        counters.in_flight.fetch_add(1, Ordering::SeqCst);
        let outcome = AssertUnwindSafe(job).catch_unwind().await;
        counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(_) => {
                counters.panicked.fetch_add(1, Ordering::SeqCst);
                error!("Worker {} recovered from a panicking task", worker_name);
            }
        }
    }

    debug!("Worker loop ended: {}", worker_name);
}

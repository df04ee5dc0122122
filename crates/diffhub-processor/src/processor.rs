use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use diffhub_diff::DiffGenerator;
use diffhub_notify::{MessageBus, NotificationFanout, Target};
use diffhub_store::{ClaimOutcome, ComparisonRequestStore, DiffResultStore};
use diffhub_types::{comparison_channel, ComparisonRequest, ComparisonStatus, DiffResult, RequestId};

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, ProcessorResult};
use crate::event::CompletionEvent;
use crate::queue::WorkQueue;

/// Everything a worker needs, shared by all workers.
struct Shared {
    requests: Arc<dyn ComparisonRequestStore>,
    results: Arc<dyn DiffResultStore>,
    generator: DiffGenerator,
    fanout: Arc<NotificationFanout>,
    bus: Option<Arc<dyn MessageBus>>,
}

/// Worker pool that drives requests from `Pending` to a terminal status.
pub struct ComparisonProcessor {
    shared: Shared,
    config: ProcessorConfig,
}

impl ComparisonProcessor {
    pub fn new(
        requests: Arc<dyn ComparisonRequestStore>,
        results: Arc<dyn DiffResultStore>,
        generator: DiffGenerator,
        fanout: Arc<NotificationFanout>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            shared: Shared {
                requests,
                results,
                generator,
                fanout,
                bus: None,
            },
            config,
        }
    }

    /// Also publish a `RequestCompleted` message on `bus` for every finished
    /// request.
    pub fn with_bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.shared.bus = Some(bus);
        self
    }

    /// Spawn the workers on the current tokio runtime.
    pub fn start(self) -> ProcessorHandle {
        let queue = WorkQueue::new(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(self.shared);
        let count = self.config.workers.max(1);

        let workers = (0..count)
            .map(|index| {
                let worker = Worker {
                    index,
                    shared: Arc::clone(&shared),
                    queue: queue.clone(),
                    shutdown: shutdown_rx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        info!(
            workers = count,
            queue_capacity = ?self.config.queue_capacity,
            "comparison processor started"
        );
        ProcessorHandle {
            queue,
            accepting: AtomicBool::new(true),
            shutdown: shutdown_tx,
            workers: Mutex::new(workers),
        }
    }
}

/// Control surface of a running [`ComparisonProcessor`].
///
/// Dropping the handle also stops the workers.
pub struct ProcessorHandle {
    queue: WorkQueue,
    accepting: AtomicBool,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ProcessorHandle {
    /// Queue `id` for processing. Safe to call from many tasks at once and
    /// for ids that are already processing or finished; a worker that
    /// dequeues such an id does nothing.
    pub async fn enqueue(&self, id: RequestId) -> ProcessorResult<()> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(ProcessorError::ShuttingDown);
        }
        self.queue.enqueue(id).await?;
        debug!(request_id = %id, queued = self.queue.len(), "enqueued");
        Ok(())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Stop accepting work, signal the workers, and wait for them to exit.
    ///
    /// Requests still queued stay `Pending`. A request being processed is
    /// aborted and marked `Failed`.
    pub async fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.send_replace(true);
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "worker task ended abnormally");
            }
        }
        info!(left_pending = self.queue.len(), "comparison processor stopped");
    }
}

impl std::fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("queue_len", &self.queue_len())
            .field("running", &self.is_running())
            .finish()
    }
}

struct Worker {
    index: usize,
    shared: Arc<Shared>,
    queue: WorkQueue,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker = self.index, "worker started");
        loop {
            if *self.shutdown.borrow() {
                break;
            }
            let next = tokio::select! {
                biased;
                _ = self.shutdown.changed() => None,
                id = self.queue.dequeue() => id,
            };
            let Some(id) = next else {
                break;
            };
            self.process(id).await;
        }
        debug!(worker = self.index, "worker stopped");
    }

    /// One loop iteration. Never fails: every error ends up in the request
    /// record or the log.
    async fn process(&mut self, id: RequestId) {
        let request = match self.shared.requests.claim(&id) {
            Ok(ClaimOutcome::Claimed(request)) => request,
            Ok(ClaimOutcome::AlreadyClaimed) => {
                debug!(request_id = %id, "already claimed by another worker");
                return;
            }
            Ok(ClaimOutcome::Terminal(status)) => {
                debug!(request_id = %id, %status, "already finished");
                return;
            }
            Err(e) => {
                warn!(request_id = %id, error = %e, "cannot claim request");
                return;
            }
        };
        debug!(worker = self.index, request_id = %id, "claimed");

        let event = match self.generate(&request).await {
            Ok(result) => self.complete(result),
            Err(message) => self.fail(id, message),
        };
        self.emit(&event);
    }

    /// Run the diff on its own task so a panic is contained and a shutdown
    /// can abort it. Dropping the task also kills its git processes.
    async fn generate(&mut self, request: &ComparisonRequest) -> Result<DiffResult, String> {
        let generator = self.shared.generator.clone();
        let id = request.request_id;
        let path = request.repository_path.clone();
        let from = request.from_branch.clone();
        let into = request.into_branch.clone();
        let mut task =
            tokio::spawn(async move { generator.generate_diff(id, &path, &from, &into).await });

        tokio::select! {
            joined = &mut task => match joined {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) if e.is_panic() => Err("internal error: diff generation panicked".to_string()),
                Err(_) => Err("diff generation was cancelled".to_string()),
            },
            _ = self.shutdown.changed() => {
                task.abort();
                Err("processing aborted: service shutting down".to_string())
            }
        }
    }

    fn complete(&self, result: DiffResult) -> CompletionEvent {
        let id = result.request_id;
        let summary = result.summary();
        let stored = self
            .shared
            .results
            .put(result)
            .and_then(|()| self.shared.requests.complete(&id, Utc::now()));
        match stored {
            Ok(_) => {
                info!(request_id = %id, %summary, "comparison completed");
                CompletionEvent {
                    request_id: id,
                    status: ComparisonStatus::Completed,
                    summary,
                }
            }
            Err(e) => self.fail(id, e.to_string()),
        }
    }

    fn fail(&self, id: RequestId, message: String) -> CompletionEvent {
        warn!(request_id = %id, error = %message, "comparison failed");
        if let Err(e) = self.shared.requests.fail(&id, &message, Utc::now()) {
            error!(request_id = %id, error = %e, "cannot record failure");
        }
        CompletionEvent {
            request_id: id,
            status: ComparisonStatus::Failed,
            summary: message,
        }
    }

    fn emit(&self, event: &CompletionEvent) {
        let channel = comparison_channel(&event.request_id);
        let report = self
            .shared
            .fanout
            .publish(Target::Channel(channel), &event.to_push_message());
        if let Some(bus) = &self.shared.bus {
            bus.publish(event.to_bus_message());
        }
        debug!(
            request_id = %event.request_id,
            delivered = report.delivered_count(),
            "completion event emitted"
        );
    }
}
